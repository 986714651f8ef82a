//! Runtime settings read from `NEPHROCARE_*` environment variables.

use std::path::PathBuf;

pub const MODEL_DIR_ENV: &str = "NEPHROCARE_MODEL_DIR";
pub const REQUIRE_MANIFEST_ENV: &str = "NEPHROCARE_REQUIRE_MANIFEST";
pub const INCLUDE_EXPLANATION_ENV: &str = "NEPHROCARE_INCLUDE_EXPLANATION";
pub const LOG_MODE_ENV: &str = "NEPHROCARE_LOG_MODE";
pub const LOG_FILE_ENV: &str = "NEPHROCARE_LOG_FILE";

const DEFAULT_MODEL_DIR: &str = "models";
const DEFAULT_LOG_FILE: &str = "nephrocare.log";

/// Where log lines go. Stdout is reserved for the JSON response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogMode {
    #[default]
    Stderr,
    File,
}

impl LogMode {
    fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "file" => Self::File,
            _ => Self::Stderr,
        }
    }
}

/// Resolved runtime settings.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub model_dir: PathBuf,
    /// Reject model artifacts not bound by `manifest.json`
    pub require_manifest: bool,
    pub include_explanation: bool,
    pub log_mode: LogMode,
    pub log_file: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from(DEFAULT_MODEL_DIR),
            require_manifest: false,
            include_explanation: true,
            log_mode: LogMode::Stderr,
            log_file: PathBuf::from(DEFAULT_LOG_FILE),
        }
    }
}

impl Settings {
    /// Read settings from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read settings through `lookup`; unset or empty values keep defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        Self {
            model_dir: get(MODEL_DIR_ENV).map_or(defaults.model_dir, PathBuf::from),
            require_manifest: get(REQUIRE_MANIFEST_ENV)
                .map_or(defaults.require_manifest, |v| parse_bool(&v)),
            include_explanation: get(INCLUDE_EXPLANATION_ENV)
                .map_or(defaults.include_explanation, |v| parse_bool(&v)),
            log_mode: get(LOG_MODE_ENV).map_or(defaults.log_mode, |v| LogMode::parse(&v)),
            log_file: get(LOG_FILE_ENV).map_or(defaults.log_file, PathBuf::from),
        }
    }
}

/// `1`, `true` and `yes` (any case) are true; everything else is false.
#[must_use]
pub fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings(vars: &[(&str, &str)]) -> Settings {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        Settings::from_lookup(|name| map.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let s = settings(&[]);
        assert_eq!(s, Settings::default());
        assert_eq!(s.model_dir, PathBuf::from("models"));
        assert!(s.include_explanation);
        assert!(!s.require_manifest);
        assert_eq!(s.log_mode, LogMode::Stderr);
    }

    #[test]
    fn test_overrides() {
        let s = settings(&[
            (MODEL_DIR_ENV, "/srv/models"),
            (REQUIRE_MANIFEST_ENV, "YES"),
            (INCLUDE_EXPLANATION_ENV, "0"),
            (LOG_MODE_ENV, "file"),
            (LOG_FILE_ENV, "/var/log/nephrocare.log"),
        ]);
        assert_eq!(s.model_dir, PathBuf::from("/srv/models"));
        assert!(s.require_manifest);
        assert!(!s.include_explanation);
        assert_eq!(s.log_mode, LogMode::File);
        assert_eq!(s.log_file, PathBuf::from("/var/log/nephrocare.log"));
    }

    #[test]
    fn test_empty_values_keep_defaults() {
        let s = settings(&[(MODEL_DIR_ENV, "  "), (INCLUDE_EXPLANATION_ENV, "")]);
        assert_eq!(s.model_dir, PathBuf::from("models"));
        assert!(s.include_explanation);
    }

    #[test]
    fn test_parse_bool() {
        for v in ["1", "true", "TRUE", "yes", "Yes"] {
            assert!(parse_bool(v), "{v}");
        }
        for v in ["0", "false", "no", "on", ""] {
            assert!(!parse_bool(v), "{v}");
        }
    }

    #[test]
    fn test_unknown_log_mode_is_stderr() {
        assert_eq!(LogMode::parse("stdout"), LogMode::Stderr);
        assert_eq!(LogMode::parse(" FILE "), LogMode::File);
    }
}
