//! Failures of the conversion facade.

use thiserror::Error;

use interop_core::InteropError;

/// A conversion could not start or a phase failed outright.
///
/// Unresolved names, unvalued constants and the like are not errors; they
/// arrive as diagnostics on the [`ConversionOutput`](crate::ConversionOutput).
#[derive(Debug, Error)]
pub enum ConvertError {
    /// The configuration document could not be read.
    #[error("invalid configuration: {0}")]
    Config(#[source] serde_json::Error),

    /// The declaration set document could not be read.
    #[error("invalid declaration set: {0}")]
    Input(#[source] serde_json::Error),

    #[error(transparent)]
    Interop(#[from] InteropError),
}

pub type ConvertResult<T> = Result<T, ConvertError>;
