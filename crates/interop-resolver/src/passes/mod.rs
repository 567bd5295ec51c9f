//! Resolver passes.
//!
//! - [`linking`]: Pass 1 - attach named references to their targets
//! - [`values`]: Pass 2 - evaluate constants and enum members
//! - [`calling_convention`]: Pass 3 - bind procedures to their exporting module

pub mod calling_convention;
pub mod linking;
pub mod values;

pub use calling_convention::{CallingConventionOutput, CallingConventionPass};
pub use linking::{LinkingOutput, LinkingPass};
pub use values::{ValueOutput, ValuePass};
