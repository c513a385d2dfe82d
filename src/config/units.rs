//! systemd and networkd unit validation
//!
//! Checks unit names against the unit types systemd and networkd know,
//! parses unit contents, and cross-checks the `[Install]` section against
//! the unit's enable flag.

use super::{NetworkdUnit, SystemdDropin, SystemdUnit};
use crate::report::Report;
use std::path::Path;

/// Longest line systemd accepts in a unit file
pub const LINE_MAX: usize = 2048;

const SYSTEMD_UNIT_TYPES: &[&str] = &[
    "service",
    "socket",
    "device",
    "mount",
    "automount",
    "swap",
    "target",
    "path",
    "timer",
    "snapshot",
    "slice",
    "scope",
];

const NETWORKD_UNIT_TYPES: &[&str] = &["link", "netdev", "network"];

/// One `Key=Value` option of a unit file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitOption {
    pub section: String,
    pub name: String,
    pub value: String,
}

/// Parse unit file text into its options.
pub fn parse_unit(contents: &str) -> Result<Vec<UnitOption>, String> {
    let mut options = Vec::new();
    let mut section: Option<String> = None;
    let mut lines = contents.lines().enumerate();

    while let Some((idx, raw)) = lines.next() {
        let lineno = idx + 1;
        if raw.len() > LINE_MAX {
            return Err(format!("line {} exceeds {} bytes", lineno, LINE_MAX));
        }

        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }

        if line.starts_with('[') {
            let name = line
                .strip_prefix('[')
                .and_then(|l| l.strip_suffix(']'))
                .filter(|n| !n.is_empty() && !n.contains(['[', ']']))
                .ok_or_else(|| format!("line {}: malformed section header", lineno))?;
            section = Some(name.to_string());
            continue;
        }

        let Some(current) = section.as_ref() else {
            return Err(format!("line {}: option found before any section", lineno));
        };
        let (key, value) = line
            .split_once('=')
            .ok_or_else(|| format!("line {}: expected Key=Value", lineno))?;
        let key = key.trim();
        if key.is_empty() {
            return Err(format!("line {}: option has no name", lineno));
        }

        let mut value = value.trim().to_string();
        while value.ends_with('\\') {
            value.pop();
            value.truncate(value.trim_end().len());
            match lines.next() {
                Some((_, next)) => {
                    value.push(' ');
                    value.push_str(next.trim());
                }
                None => break,
            }
        }

        options.push(UnitOption {
            section: current.clone(),
            name: key.to_string(),
            value: value.trim().to_string(),
        });
    }

    Ok(options)
}

// Everything after the last dot, so ".service" has the extension "service"
fn extension(name: &str) -> Option<&str> {
    name.rfind('.').map(|i| &name[i + 1..])
}

pub fn is_valid_systemd_unit_name(name: &str) -> bool {
    extension(name).is_some_and(|ext| SYSTEMD_UNIT_TYPES.contains(&ext))
}

pub fn is_valid_dropin_name(name: &str) -> bool {
    extension(name) == Some("conf")
}

pub fn is_valid_networkd_unit_name(name: &str) -> bool {
    extension(name).is_some_and(|ext| NETWORKD_UNIT_TYPES.contains(&ext))
}

/// Parse contents, turning a failure into a single error entry
fn check_contents(
    name: &str,
    contents: Option<&str>,
    report: &mut Report,
) -> Option<Vec<UnitOption>> {
    match parse_unit(contents.unwrap_or_default()) {
        Ok(options) => Some(options),
        Err(e) => {
            report.add_error(format!("{:?}: invalid unit content: {}", name, e));
            None
        }
    }
}

/// Validate a systemd unit and its drop-ins
pub fn validate_systemd_unit(unit: &SystemdUnit) -> Report {
    let mut report = Report::default();

    if unit.enable.is_some() {
        report.add_deprecated(format!(
            "{:?}: the enable field has been deprecated in favor of enabled",
            unit.name
        ));
    }

    if !is_valid_systemd_unit_name(&unit.name) {
        report.add_error(format!("{:?}: invalid systemd unit extension", unit.name));
        return report;
    }

    if let Some(options) = check_contents(&unit.name, unit.contents.as_deref(), &mut report) {
        let contents_empty = unit.contents.as_deref().unwrap_or_default().is_empty();
        report.merge(validate_install_section(
            &unit.name,
            unit.is_enabled(),
            contents_empty,
            &options,
        ));
    }

    for dropin in &unit.dropins {
        report.merge(validate_dropin(dropin));
    }

    report
}

pub fn validate_dropin(dropin: &SystemdDropin) -> Report {
    let mut report = Report::default();
    if !is_valid_dropin_name(&dropin.name) {
        report.add_error(format!(
            "{:?}: invalid systemd unit drop-in extension",
            dropin.name
        ));
        return report;
    }
    check_contents(&dropin.name, dropin.contents.as_deref(), &mut report);
    report
}

pub fn validate_networkd_unit(unit: &NetworkdUnit) -> Report {
    let mut report = Report::default();
    if !is_valid_networkd_unit_name(&unit.name) {
        report.add_error(format!("{:?}: invalid networkd unit extension", unit.name));
        return report;
    }
    check_contents(&unit.name, unit.contents.as_deref(), &mut report);
    report
}

/// Warn about enabled units whose install section makes enabling a no-op.
pub fn validate_install_section(
    name: &str,
    enabled: bool,
    contents_empty: bool,
    options: &[UnitOption],
) -> Report {
    let mut report = Report::default();
    if !enabled || contents_empty {
        return report;
    }

    let install: Vec<&UnitOption> = options.iter().filter(|o| o.section == "Install").collect();
    if install.is_empty() {
        report.add_warning(format!(
            "unit {:?} is enabled, but has no install section so enable does nothing",
            name
        ));
        return report;
    }

    if is_template(name) && !install.iter().any(|o| o.name == "DefaultInstance") {
        report.add_warning(format!(
            "template unit {:?} is enabled, but has no DefaultInstance so enable does nothing",
            name
        ));
    }

    report
}

/// `foo@.service` is a template, `foo@bar.service` an instance
fn is_template(name: &str) -> bool {
    Path::new(name)
        .file_stem()
        .and_then(|s| s.to_str())
        .is_some_and(|stem| stem.ends_with('@'))
}
