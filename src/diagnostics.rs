//! Non-fatal findings reported while resolving resources.
//!
//! Resolution never fails because the documentation is inconsistent or a
//! lookup is ambiguous. Those conditions are logged through `tracing` and
//! recorded in a [`Diagnostics`] sink shared by every resource built from the
//! same [`ApiContext`](crate::ApiContext).

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;

/// A link references an undocumented operation id, or none at all.
pub const MISSING_OPERATION: &str = "missing-operation";

/// More than one parent link can provide the requested semantic key.
pub const AMBIGUOUS_REMOTE_VALUE: &str = "ambiguous-remote-value";

/// Severity level for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// A single diagnostic message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: String,
    pub message: String,
}

impl Diagnostic {
    pub fn warning(code: &str, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            code: code.to_string(),
            message: message.into(),
        }
    }

    pub fn error(code: &str, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            code: code.to_string(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let level = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "{}[{}]: {}", level, self.code, self.message)
    }
}

/// Cloneable sink collecting diagnostics. Clones share the same entries.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    entries: Arc<Mutex<Entries>>,
}

#[derive(Debug, Default)]
struct Entries {
    reported: Vec<Diagnostic>,
    /// `(code, subject)` pairs already reported through `report_once`.
    subjects: HashSet<(String, String)>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Log the diagnostic and keep it for later inspection.
    pub fn report(&self, diagnostic: Diagnostic) {
        match diagnostic.severity {
            Severity::Error => {
                tracing::error!(code = %diagnostic.code, "{}", diagnostic.message)
            }
            Severity::Warning => {
                tracing::warn!(code = %diagnostic.code, "{}", diagnostic.message)
            }
        }
        self.lock().reported.push(diagnostic);
    }

    /// Report unless the same code was already reported for `subject`.
    ///
    /// Returns true if the diagnostic was recorded.
    pub fn report_once(&self, subject: &str, diagnostic: Diagnostic) -> bool {
        let first = self
            .lock()
            .subjects
            .insert((diagnostic.code.clone(), subject.to_string()));
        if first {
            self.report(diagnostic);
        }
        first
    }

    /// Copy of every diagnostic reported so far.
    pub fn snapshot(&self) -> Vec<Diagnostic> {
        self.lock().reported.clone()
    }

    /// Remove and return every diagnostic reported so far.
    ///
    /// Subjects seen by `report_once` are forgotten too.
    pub fn take(&self) -> Vec<Diagnostic> {
        let mut entries = self.lock();
        entries.subjects.clear();
        std::mem::take(&mut entries.reported)
    }

    pub fn len(&self) -> usize {
        self.lock().reported.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().reported.is_empty()
    }

    // A panic while holding the lock cannot leave the entries half-written.
    fn lock(&self) -> MutexGuard<'_, Entries> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
