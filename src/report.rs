//! Diagnostic reports
//!
//! Parsing, validation and fetching collect their findings into a [`Report`]
//! instead of logging directly, so the caller decides when entries are
//! emitted and what gets stripped from them first.

use serde::Serialize;
use std::fmt;

/// Severity of a report entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Error,
    Warning,
    Deprecated,
    Info,
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryKind::Error => write!(f, "error"),
            EntryKind::Warning => write!(f, "warning"),
            EntryKind::Deprecated => write!(f, "deprecated"),
            EntryKind::Info => write!(f, "info"),
        }
    }
}

/// A single diagnostic record
///
/// `highlight` holds a verbatim excerpt of the input the entry refers to.
/// Fetched configs may embed secrets, so it must be cleared before the
/// entry reaches a log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Entry {
    pub kind: EntryKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub highlight: Option<String>,
}

impl Entry {
    pub fn new(kind: EntryKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            line: None,
            column: None,
            highlight: None,
        }
    }

    /// Attach a source position (1-based)
    pub fn at(mut self, line: usize, column: usize) -> Self {
        self.line = Some(line);
        self.column = Some(column);
        self
    }

    pub fn with_highlight(mut self, highlight: impl Into<String>) -> Self {
        self.highlight = Some(highlight.into());
        self
    }
}

impl fmt::Display for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.line, self.column) {
            (Some(line), Some(column)) => write!(
                f,
                "{} at line {}, column {}: {}",
                self.kind, line, column, self.message
            )?,
            _ => write!(f, "{}: {}", self.kind, self.message)?,
        }
        if let Some(highlight) = self.highlight.as_deref().filter(|h| !h.is_empty()) {
            write!(f, "\n{}", highlight)?;
        }
        Ok(())
    }
}

/// Ordered, appendable collection of diagnostic entries
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Report {
    pub entries: Vec<Entry>,
}

impl Report {
    pub fn add(&mut self, entry: Entry) {
        self.entries.push(entry);
    }

    pub fn add_error(&mut self, message: impl Into<String>) {
        self.add(Entry::new(EntryKind::Error, message));
    }

    pub fn add_warning(&mut self, message: impl Into<String>) {
        self.add(Entry::new(EntryKind::Warning, message));
    }

    pub fn add_deprecated(&mut self, message: impl Into<String>) {
        self.add(Entry::new(EntryKind::Deprecated, message));
    }

    pub fn add_info(&mut self, message: impl Into<String>) {
        self.add(Entry::new(EntryKind::Info, message));
    }

    /// Append all entries of `other`, preserving order
    pub fn merge(&mut self, other: Report) {
        self.entries.extend(other.entries);
    }

    /// Whether any entry is an error
    pub fn is_fatal(&self) -> bool {
        self.entries.iter().any(|e| e.kind == EntryKind::Error)
    }

    pub fn is_deprecated(&self) -> bool {
        self.entries.iter().any(|e| e.kind == EntryKind::Deprecated)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Take all entries out, leaving the report empty
    pub fn drain(&mut self) -> Report {
        std::mem::take(self)
    }

    /// Copy of this report with every highlight cleared
    pub fn redacted(&self) -> Report {
        Report {
            entries: self
                .entries
                .iter()
                .cloned()
                .map(|mut e| {
                    e.highlight = None;
                    e
                })
                .collect(),
        }
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for entry in &self.entries {
            writeln!(f, "{}", entry)?;
        }
        Ok(())
    }
}
