//! Whole-document validation
//!
//! Walks a parsed config and collects every problem into one report.

use super::{Config, Verification, units};
use crate::fetch::verify;
use crate::report::Report;
use url::Url;

/// Validate a config document
pub fn validate(config: &Config) -> Report {
    let mut report = Report::default();

    let directives = &config.ignition.config;
    for reference in directives.append.iter().chain(directives.replace.iter()) {
        validate_source("config reference", &reference.source, &mut report);
        validate_verification(&reference.verification, &mut report);
        validate_compression(reference.compression.as_deref(), &mut report);
    }

    for ca in config.certificate_authorities() {
        validate_source("certificate authority", &ca.source, &mut report);
        validate_verification(&ca.verification, &mut report);
    }

    let storage = &config.storage;
    for file in &storage.files {
        validate_path(&file.path, &mut report);
        if let Some(source) = &file.contents.source {
            validate_source("file contents", source, &mut report);
        }
        validate_verification(&file.contents.verification, &mut report);
        validate_compression(file.contents.compression.as_deref(), &mut report);
    }
    for directory in &storage.directories {
        validate_path(&directory.path, &mut report);
    }
    for link in &storage.links {
        validate_path(&link.path, &mut report);
    }

    for unit in &config.systemd.units {
        report.merge(units::validate_systemd_unit(unit));
    }
    for unit in &config.networkd.units {
        report.merge(units::validate_networkd_unit(unit));
    }

    report
}

// The source itself is left out of messages: data URLs may carry secrets.
fn validate_source(what: &str, source: &str, report: &mut Report) {
    if source.is_empty() {
        report.add_error(format!("{} has no source", what));
        return;
    }
    if let Err(e) = Url::parse(source) {
        report.add_error(format!("{} source is not a valid URL: {}", what, e));
    }
}

fn validate_verification(verification: &Verification, report: &mut Report) {
    if let Some(hash) = &verification.hash
        && let Err(e) = verify::parse_hash(hash)
    {
        report.add_error(e.to_string());
    }
}

fn validate_compression(compression: Option<&str>, report: &mut Report) {
    match compression {
        None | Some("") | Some("gzip") => {}
        Some(other) => report.add_error(format!("unsupported compression {:?}", other)),
    }
}

fn validate_path(path: &str, report: &mut Report) {
    if !path.starts_with('/') {
        report.add_error(format!("path {:?} is not absolute", path));
    }
}
