pub mod error;
pub mod memory;
pub mod records;
pub mod schema;
pub mod sqlite;
pub mod traits;

pub use error::StorageError;
pub use memory::MemoryKvStore;
pub use records::{read_record, write_record};
pub use sqlite::SqliteKvStore;
pub use traits::*;
