//! Config parsing and types
//!
//! Handles parsing of JSON config documents, normalizing every supported
//! 2.x schema version to [`MAX_VERSION`].

pub mod merge;
pub mod types;
pub mod units;
pub mod validate;

pub use merge::{merge, merge_all};
pub use types::*;

use crate::IgnitionError;
use crate::report::{Entry, EntryKind, Report};
use semver::Version;
use serde_json::Value;
use serde_json::error::Category;
use tracing::debug;

/// Parse raw bytes into a config.
///
/// Diagnostics are appended to `report`. Inputs that are readable but are not
/// configs at all (empty, cloud-config, scripts) return the corresponding
/// benign error without adding report entries.
pub fn parse(raw: &[u8], report: &mut Report) -> Result<Config, IgnitionError> {
    if raw.iter().all(u8::is_ascii_whitespace) {
        return Err(IgnitionError::Empty);
    }
    if is_cloud_config(raw) {
        return Err(IgnitionError::CloudConfig);
    }
    if is_script(raw) {
        return Err(IgnitionError::Script);
    }

    let mut local = Report::default();
    let result = parse_json(raw, &mut local);
    report.merge(local);
    result
}

fn parse_json(raw: &[u8], report: &mut Report) -> Result<Config, IgnitionError> {
    let value: Value = serde_json::from_slice(raw).map_err(|e| json_error(raw, e, report))?;

    check_version(&value, report)?;

    // Deserialize from the bytes again so type errors keep their position
    let mut config: Config =
        serde_json::from_slice(raw).map_err(|e| json_error(raw, e, report))?;

    report.merge(validate::validate(&config));
    if report.is_fatal() {
        return Err(IgnitionError::InvalidConfig);
    }

    config.ignition.version = Some(MAX_VERSION.to_string());
    debug!("parsed config with {} report entries", report.entries.len());
    Ok(config)
}

/// Check `ignition.version` against the supported 2.x range
fn check_version(value: &Value, report: &mut Report) -> Result<Version, IgnitionError> {
    let Some(raw) = value.pointer("/ignition/version").and_then(Value::as_str) else {
        report.add_error("ignition.version is missing");
        return Err(IgnitionError::InvalidVersion("missing".to_string()));
    };

    let version = Version::parse(raw).map_err(|e| {
        report.add_error(format!("ignition.version {:?} is not a version: {}", raw, e));
        IgnitionError::InvalidVersion(raw.to_string())
    })?;

    let max = max_version();
    if version.major != max.major || version > max || !version.pre.is_empty() {
        report.add_error(format!(
            "ignition.version {} is not supported (supported: {}.0.0 to {})",
            version, max.major, max
        ));
        return Err(IgnitionError::UnsupportedVersion(raw.to_string()));
    }

    Ok(version)
}

fn max_version() -> Version {
    Version::new(2, 3, 0)
}

/// Record a JSON error in the report, highlighting the offending line
///
/// serde's messages for data errors quote the offending value, which may be
/// a secret. Those messages only go into the highlight, which is redacted
/// before logging. The entry message and the returned error carry just the
/// position.
fn json_error(raw: &[u8], err: serde_json::Error, report: &mut Report) -> IgnitionError {
    let (line, column) = (err.line(), err.column());

    let (entry, highlight, error) = match err.classify() {
        Category::Data => (
            Entry::new(EntryKind::Error, "value does not match the config schema"),
            Some(err.to_string()),
            IgnitionError::InvalidValue { line, column },
        ),
        _ => (
            Entry::new(EntryKind::Error, err.to_string()),
            None,
            IgnitionError::Json(err),
        ),
    };

    if line == 0 {
        report.add(match highlight {
            Some(highlight) => entry.with_highlight(highlight),
            None => entry,
        });
        return error;
    }

    let text = String::from_utf8_lossy(raw);
    let mut excerpt = text.lines().nth(line - 1).unwrap_or_default().to_string();
    if let Some(detail) = highlight {
        excerpt = format!("{}\n{}", excerpt, detail);
    }
    report.add(entry.at(line, column).with_highlight(excerpt));
    error
}

/// Check if this looks like a cloud-config (starts with #cloud-config)
pub fn is_cloud_config(data: &[u8]) -> bool {
    data.trim_ascii_start().starts_with(b"#cloud-config")
}

/// Check if this looks like an executable script (starts with a shebang)
pub fn is_script(data: &[u8]) -> bool {
    data.starts_with(b"#!")
}
