pub mod clock;
pub mod conflict;
pub mod draft;
pub mod error;
pub mod field_value;
pub mod ids;
pub mod validation;

pub use clock::{Clock, ManualTimeSource, SystemTimeSource, TimeSource, Timestamp};
pub use conflict::{ConflictDetector, DraftConflict, GroupRoster};
pub use draft::{Draft, EntityType, Payload};
pub use error::CoreError;
pub use field_value::FieldValue;
pub use ids::*;
pub use validation::{IssueCode, ValidationIssue, ValidationResult, completeness, validate};
