use std::time::Duration;

use playbook_storage::DEFAULT_NAMESPACE;
use serde::{Deserialize, Serialize};

const DAY: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub autosave_enabled: bool,
    pub autosave_debounce: Duration,
    /// History entries older than this are dropped at `configure()`.
    pub history_retention: Duration,
    pub max_history_depth: usize,
    pub storage_namespace: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            autosave_enabled: true,
            autosave_debounce: Duration::from_secs(5),
            history_retention: DAY * 7,
            max_history_depth: 100,
            storage_namespace: DEFAULT_NAMESPACE.to_string(),
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Defaults overridden by whatever `lookup` returns. Unparseable values
    /// keep the default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut cfg = Self::default();

        if let Some(v) = lookup("PLAYBOOK_AUTOSAVE_ENABLED") {
            cfg.autosave_enabled = parse_bool(&v, cfg.autosave_enabled);
        }
        if let Some(v) = lookup("PLAYBOOK_AUTOSAVE_DEBOUNCE_MS")
            && let Some(ms) = parse_u64(&v)
        {
            cfg.autosave_debounce = Duration::from_millis(ms);
        }
        if let Some(v) = lookup("PLAYBOOK_HISTORY_RETENTION_DAYS")
            && let Some(days) = parse_u64(&v)
            && let Ok(days) = u32::try_from(days.max(1))
        {
            cfg.history_retention = DAY * days;
        }
        if let Some(v) = lookup("PLAYBOOK_HISTORY_MAX_DEPTH")
            && let Some(depth) = parse_u64(&v)
            && let Ok(depth) = usize::try_from(depth.max(1))
        {
            cfg.max_history_depth = depth;
        }
        if let Some(v) = lookup("PLAYBOOK_STORAGE_NAMESPACE") {
            let trimmed = v.trim();
            if !trimmed.is_empty() {
                cfg.storage_namespace = trimmed.to_string();
            }
        }

        cfg
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.max_history_depth == 0 {
            return Err("max_history_depth must be greater than 0".to_string());
        }
        if self.storage_namespace.trim().is_empty() {
            return Err("storage_namespace must not be empty".to_string());
        }
        Ok(())
    }
}

fn parse_bool(s: &str, default: bool) -> bool {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => default,
    }
}

fn parse_u64(value: &str) -> Option<u64> {
    value.trim().parse::<u64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults() {
        let cfg = EngineConfig::default();
        assert!(cfg.autosave_enabled);
        assert_eq!(cfg.autosave_debounce, Duration::from_secs(5));
        assert_eq!(cfg.history_retention, Duration::from_secs(7 * 86_400));
        assert_eq!(cfg.storage_namespace, "playbook");
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn overrides_apply() {
        let cfg = EngineConfig::from_lookup(lookup(&[
            ("PLAYBOOK_AUTOSAVE_ENABLED", "off"),
            ("PLAYBOOK_AUTOSAVE_DEBOUNCE_MS", "250"),
            ("PLAYBOOK_HISTORY_RETENTION_DAYS", "2"),
            ("PLAYBOOK_HISTORY_MAX_DEPTH", "20"),
            ("PLAYBOOK_STORAGE_NAMESPACE", " coach "),
        ]));
        assert!(!cfg.autosave_enabled);
        assert_eq!(cfg.autosave_debounce, Duration::from_millis(250));
        assert_eq!(cfg.history_retention, Duration::from_secs(2 * 86_400));
        assert_eq!(cfg.max_history_depth, 20);
        assert_eq!(cfg.storage_namespace, "coach");
    }

    #[test]
    fn garbage_keeps_defaults() {
        let cfg = EngineConfig::from_lookup(lookup(&[
            ("PLAYBOOK_AUTOSAVE_ENABLED", "maybe"),
            ("PLAYBOOK_AUTOSAVE_DEBOUNCE_MS", "soon"),
            ("PLAYBOOK_STORAGE_NAMESPACE", "  "),
        ]));
        assert_eq!(cfg, EngineConfig::default());
    }

    #[test]
    fn out_of_range_retention_keeps_default() {
        let too_many = (u64::from(u32::MAX) + 1).to_string();
        let cfg = EngineConfig::from_lookup(lookup(&[("PLAYBOOK_HISTORY_RETENTION_DAYS", too_many.as_str())]));
        assert_eq!(cfg.history_retention, EngineConfig::default().history_retention);

        let cfg = EngineConfig::from_lookup(lookup(&[("PLAYBOOK_HISTORY_RETENTION_DAYS", "0")]));
        assert_eq!(cfg.history_retention, DAY);
    }
}
