//! CLI command implementations

pub mod actions;
pub mod document;
pub mod relay;
pub mod run;
