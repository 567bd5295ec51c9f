//! Hard failures for each phase.
//!
//! Expected domain conditions are [`Diagnostics`](crate::Diagnostics); the
//! types here are for conditions that abort the phase they occur in.
//!
//! ```text
//! InteropError (top-level wrapper)
//! ├── StoreError   - persisted snapshot structurally unreadable
//! ├── ExportError  - module export tables could not be acquired
//! └── EvalError    - a constant expression cannot be represented
//! ```

use thiserror::Error;

// ============================================================================
// Store Errors
// ============================================================================

/// Failures reading or writing a persisted store snapshot.
///
/// Per-entry problems are not errors; they are reported as diagnostics and the
/// entry is skipped.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    /// The snapshot is not a structurally valid document.
    #[error("malformed snapshot: {reason}")]
    MalformedSnapshot { reason: String },

    /// The snapshot was written by an incompatible format version.
    #[error("unsupported snapshot version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },

    /// The store could not be encoded.
    #[error("failed to encode snapshot: {reason}")]
    Encode { reason: String },
}

// ============================================================================
// Export Errors
// ============================================================================

/// Failures acquiring a module's export table.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExportError {
    /// No module with this name could be located. The export resolver skips
    /// such modules and moves on to the next candidate.
    #[error("module '{module}' not found")]
    ModuleNotFound { module: String },

    /// The module exists but could not be opened.
    #[error("failed to open module '{module}': {reason}")]
    Acquire { module: String, reason: String },

    /// The module was opened but its export table is unreadable.
    #[error("failed to read exports of '{module}': {reason}")]
    Parse { module: String, reason: String },
}

impl ExportError {
    pub fn module(&self) -> &str {
        match self {
            ExportError::ModuleNotFound { module }
            | ExportError::Acquire { module, .. }
            | ExportError::Parse { module, .. } => module,
        }
    }

    /// Whether resolution can continue with the next module.
    pub fn is_skippable(&self) -> bool {
        matches!(self, ExportError::ModuleNotFound { .. })
    }
}

// ============================================================================
// Evaluation Errors
// ============================================================================

/// Reasons a constant expression cannot be represented as a literal.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("expression is empty")]
    EmptyExpression,

    #[error("unsupported operator or token '{token}'")]
    UnsupportedOperator { token: String },

    #[error("unknown identifier '{name}'")]
    UnknownIdentifier { name: String },

    /// The identifier names a constant that has not been evaluated yet.
    #[error("identifier '{name}' has not been evaluated yet")]
    PendingIdentifier { name: String },

    #[error("malformed literal '{text}'")]
    MalformedLiteral { text: String },

    #[error("division by zero")]
    DivisionByZero,

    /// The result does not fit any 64-bit integer type.
    #[error("value out of range")]
    OutOfRange,
}

impl EvalError {
    /// Whether retrying after more constants are evaluated could succeed.
    pub fn is_pending(&self) -> bool {
        matches!(self, EvalError::PendingIdentifier { .. })
    }
}

// ============================================================================
// Top-level
// ============================================================================

/// Any hard failure of the conversion pipeline.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InteropError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Export(#[from] ExportError),

    #[error(transparent)]
    Eval(#[from] EvalError),
}
