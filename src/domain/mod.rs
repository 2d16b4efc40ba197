//! Core domain types for daneel

mod error;
mod output;

pub use error::{DaneelError, Result};
pub use output::{Output, StructuredPayload};
