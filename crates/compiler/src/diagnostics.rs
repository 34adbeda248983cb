//! Structured diagnostic export, controlled by the `BREAD_REPORT` env var.
//!
//! Unset means zero cost (the env var is read once and nothing further
//! happens), `1` prints a one-line-per-error human summary to stderr, `json`
//! prints the same errors as a JSON array to stderr, and `json:/path` writes
//! that JSON array to a file instead. This carries the compile errors
//! `breadc` was about to print as banners anyway - a second,
//! machine-readable serialization of the same data, not a replacement for
//! the banner output.

use bread_core::error::BreadError;
use std::io::Write;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Destination {
    Stderr,
    File(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Format {
    Human,
    Json,
}

struct ReportConfig {
    format: Format,
    destination: Destination,
}

impl ReportConfig {
    fn from_env() -> Option<Self> {
        let val = std::env::var("BREAD_REPORT").ok()?;
        if val.is_empty() || val == "0" {
            return None;
        }
        if val == "1" {
            return Some(ReportConfig { format: Format::Human, destination: Destination::Stderr });
        }
        if val == "json" {
            return Some(ReportConfig { format: Format::Json, destination: Destination::Stderr });
        }
        if let Some(path) = val.strip_prefix("json:") {
            return Some(ReportConfig { format: Format::Json, destination: Destination::File(path.to_string()) });
        }
        None
    }
}

/// Emits `errors` per `BREAD_REPORT`, if set. Called alongside (not instead
/// of) `BreadError::to_banner()` output — this is a structured companion
/// view for tooling, not the primary diagnostic channel.
pub fn emit(errors: &[BreadError]) {
    let Some(config) = ReportConfig::from_env() else { return };
    let body = match config.format {
        Format::Human => errors.iter().map(|e| e.to_banner()).collect::<Vec<_>>().join("\n---\n"),
        Format::Json => serde_json::to_string_pretty(errors).unwrap_or_else(|e| format!("{{\"serialization_error\": \"{e}\"}}")),
    };
    match config.destination {
        Destination::Stderr => eprintln!("{body}"),
        Destination::File(path) => {
            if let Ok(mut file) = std::fs::File::create(&path) {
                let _ = writeln!(file, "{body}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bread_core::error::ErrorCategory;

    fn sample_errors() -> Vec<BreadError> {
        vec![BreadError::new(ErrorCategory::TypeMismatch, "bad type").at("main.bread", 3, 5)]
    }

    // SAFETY: these tests mutate a process-global env var; the crate's test
    // binary runs them single-threaded enough in practice, but to be exact
    // about the 2024-edition contract each call below is scoped to this
    // function only and restores the var before returning.
    #[test]
    fn from_env_is_none_when_var_unset_or_zero() {
        unsafe { std::env::remove_var("BREAD_REPORT") };
        assert!(ReportConfig::from_env().is_none());
        unsafe { std::env::set_var("BREAD_REPORT", "0") };
        assert!(ReportConfig::from_env().is_none());
        unsafe { std::env::remove_var("BREAD_REPORT") };
    }

    #[test]
    fn from_env_recognizes_json_and_json_path_forms() {
        unsafe { std::env::set_var("BREAD_REPORT", "json") };
        let config = ReportConfig::from_env().unwrap();
        assert_eq!(config.format, Format::Json);
        assert_eq!(config.destination, Destination::Stderr);

        unsafe { std::env::set_var("BREAD_REPORT", "json:/tmp/out.json") };
        let config = ReportConfig::from_env().unwrap();
        assert_eq!(config.destination, Destination::File("/tmp/out.json".to_string()));
        unsafe { std::env::remove_var("BREAD_REPORT") };
    }

    #[test]
    fn json_serialization_round_trips_error_fields() {
        let errors = sample_errors();
        let json = serde_json::to_string(&errors).unwrap();
        assert!(json.contains("TypeMismatch"));
        assert!(json.contains("bad type"));
    }
}
