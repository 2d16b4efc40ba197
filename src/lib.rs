//! Daneel - helpers for driving agentic coding assistants
//!
//! Daneel wraps an interactive command in a pseudo-terminal and relays the
//! user's terminal to it. A reserved key (Ctrl-A by default) opens a menu of
//! actions that type into or act upon the running program. Around that sit
//! the non-interactive helpers the built-in workflows are made of:
//!
//! - [`exec::validate`] and [`exec::claude_code`] run a command with retries,
//!   handing each failure to a repair hook before trying again.
//! - [`document::update_yaml`] patches one field of a YAML file.
//! - [`document::checkbox_progress`] measures a markdown checklist.
//! - [`git::changed_files`] lists what the assistant should look at.

pub mod action;
pub mod config;
pub mod document;
pub mod domain;
pub mod exec;
pub mod git;
pub mod pty;
pub mod workflow;

pub use domain::*;
