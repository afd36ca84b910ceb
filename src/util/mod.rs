//! Basic types: errors and POD bindings.

mod error;
mod pod;

pub use error::{Error, Result};
pub use pod::{Bool, FbomPod};
