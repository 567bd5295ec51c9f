//! Accumulated diagnostics.
//!
//! Expected domain conditions (an unresolved reference, a duplicate name, an
//! export lookup miss) are never returned as errors. Each phase pushes a
//! [`Diagnostic`] into a [`Diagnostics`] collection and keeps going; callers
//! inspect the collection afterwards to decide whether the output is usable.
//!
//! ```
//! use interop_core::{DeclKey, Diagnostic, DiagnosticKind, Diagnostics};
//!
//! let mut diagnostics = Diagnostics::new();
//! diagnostics.push(Diagnostic::new(
//!     DiagnosticKind::UnresolvedReference,
//!     Some(DeclKey::typedef("LPFOO")),
//!     "no declaration named 'FOO'",
//! ));
//!
//! assert!(!diagnostics.has_errors());
//! assert_eq!(diagnostics.warning_count(), 1);
//! ```

use std::fmt;

use crate::DeclKey;

/// How serious a diagnostic is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Severity {
    /// Output is missing something the input asked for.
    Error,
    /// Output is usable but degraded (an opaque reference, an unresolved value).
    Warning,
    /// Informational only.
    Info,
}

impl Severity {
    pub const fn as_str(self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Info => "info",
        }
    }
}

/// The condition a diagnostic reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticKind {
    /// A named reference matched no typedef, defined type or builtin.
    UnresolvedReference,
    /// A constant or enum member expression could not be given a value.
    UnresolvedConstant,
    /// An expression used an operator or form the evaluator cannot represent.
    UnrepresentableExpression,
    /// Two entries share a name within one category.
    DuplicateDeclaration,
    /// No configured module exports a procedure.
    ExportNotFound,
    /// More than one configured module exports a procedure; the first wins.
    AmbiguousExport,
    /// A persisted entry could not be read and was skipped.
    MalformedEntry,
    /// Two different bodies wanted the same managed type name; the later one
    /// was emitted under a suffixed name.
    RenamedType,
}

impl DiagnosticKind {
    /// Severity this kind is reported at.
    pub const fn severity(self) -> Severity {
        match self {
            DiagnosticKind::DuplicateDeclaration | DiagnosticKind::MalformedEntry => {
                Severity::Error
            }
            DiagnosticKind::UnresolvedReference
            | DiagnosticKind::UnresolvedConstant
            | DiagnosticKind::UnrepresentableExpression
            | DiagnosticKind::RenamedType => Severity::Warning,
            DiagnosticKind::ExportNotFound | DiagnosticKind::AmbiguousExport => Severity::Info,
        }
    }
}

/// A single diagnostic with the identity of the declaration it concerns.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Diagnostic {
    pub severity: Severity,
    pub kind: DiagnosticKind,
    /// The offending declaration, when there is one.
    pub subject: Option<DeclKey>,
    pub message: String,
}

impl Diagnostic {
    /// A diagnostic at the default severity for `kind`.
    pub fn new(kind: DiagnosticKind, subject: Option<DeclKey>, message: impl Into<String>) -> Self {
        Self {
            severity: kind.severity(),
            kind,
            subject,
            message: message.into(),
        }
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.subject {
            Some(subject) => write!(f, "{}: {}: {}", self.severity.as_str(), subject, self.message),
            None => write!(f, "{}: {}", self.severity.as_str(), self.message),
        }
    }
}

/// An ordered collection of diagnostics.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Diagnostics {
    diagnostics: Vec<Diagnostic>,
    has_errors: bool,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        if diagnostic.is_error() {
            self.has_errors = true;
        }
        self.diagnostics.push(diagnostic);
    }

    /// Shorthand for pushing a diagnostic at its default severity.
    pub fn report(
        &mut self,
        kind: DiagnosticKind,
        subject: Option<DeclKey>,
        message: impl Into<String>,
    ) {
        self.push(Diagnostic::new(kind, subject, message));
    }

    /// Move all of `other`'s diagnostics onto the end of this collection.
    pub fn append(&mut self, other: Diagnostics) {
        self.has_errors |= other.has_errors;
        self.diagnostics.extend(other.diagnostics);
    }

    pub fn has_errors(&self) -> bool {
        self.has_errors
    }

    pub fn has_warnings(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Warning)
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn clear(&mut self) {
        self.diagnostics.clear();
        self.has_errors = false;
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter()
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.with_severity(Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.with_severity(Severity::Warning)
    }

    pub fn infos(&self) -> impl Iterator<Item = &Diagnostic> {
        self.with_severity(Severity::Info)
    }

    fn with_severity(&self, severity: Severity) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(move |d| d.severity == severity)
    }

    /// Diagnostics of one kind.
    pub fn of_kind(&self, kind: DiagnosticKind) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(move |d| d.kind == kind)
    }

    /// Diagnostics about one declaration.
    pub fn about<'a>(&'a self, subject: &'a DeclKey) -> impl Iterator<Item = &'a Diagnostic> {
        self.diagnostics
            .iter()
            .filter(move |d| d.subject.as_ref() == Some(subject))
    }

    pub fn count(&self) -> usize {
        self.diagnostics.len()
    }

    pub fn error_count(&self) -> usize {
        self.errors().count()
    }

    pub fn warning_count(&self) -> usize {
        self.warnings().count()
    }

    pub fn info_count(&self) -> usize {
        self.infos().count()
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.diagnostics
    }
}

impl Extend<Diagnostic> for Diagnostics {
    fn extend<I: IntoIterator<Item = Diagnostic>>(&mut self, iter: I) {
        for diagnostic in iter {
            self.push(diagnostic);
        }
    }
}

impl FromIterator<Diagnostic> for Diagnostics {
    fn from_iter<I: IntoIterator<Item = Diagnostic>>(iter: I) -> Self {
        let mut diagnostics = Diagnostics::new();
        diagnostics.extend(iter);
        diagnostics
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.diagnostics.iter()
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for diagnostic in &self.diagnostics {
            writeln!(f, "{diagnostic}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severities_follow_kind() {
        assert_eq!(DiagnosticKind::DuplicateDeclaration.severity(), Severity::Error);
        assert_eq!(DiagnosticKind::UnresolvedReference.severity(), Severity::Warning);
        assert_eq!(DiagnosticKind::ExportNotFound.severity(), Severity::Info);
    }

    #[test]
    fn error_flag_tracks_pushes() {
        let mut d = Diagnostics::new();
        d.report(DiagnosticKind::ExportNotFound, None, "miss");
        assert!(!d.has_errors());
        d.report(
            DiagnosticKind::DuplicateDeclaration,
            Some(DeclKey::defined("S1")),
            "staged twice",
        );
        assert!(d.has_errors());
        assert_eq!(d.error_count(), 1);
        assert_eq!(d.info_count(), 1);
        d.clear();
        assert!(!d.has_errors());
        assert!(d.is_empty());
    }

    #[test]
    fn append_carries_error_flag() {
        let mut a = Diagnostics::new();
        let b: Diagnostics = [Diagnostic::new(DiagnosticKind::MalformedEntry, None, "bad")]
            .into_iter()
            .collect();
        a.append(b);
        assert!(a.has_errors());
        assert_eq!(a.count(), 1);
    }

    #[test]
    fn filters_by_subject() {
        let key = DeclKey::constant("A");
        let mut d = Diagnostics::new();
        d.report(DiagnosticKind::UnresolvedConstant, Some(key.clone()), "pending");
        d.report(DiagnosticKind::UnresolvedConstant, Some(DeclKey::constant("B")), "pending");
        assert_eq!(d.about(&key).count(), 1);
        assert_eq!(d.of_kind(DiagnosticKind::UnresolvedConstant).count(), 2);
    }

    #[test]
    fn display_includes_subject() {
        let diag = Diagnostic::new(
            DiagnosticKind::UnresolvedReference,
            Some(DeclKey::typedef("LPFOO")),
            "no declaration named 'FOO'",
        );
        assert_eq!(
            diag.to_string(),
            "warning: typedef 'LPFOO': no declaration named 'FOO'"
        );
    }
}
