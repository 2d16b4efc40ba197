//! Built-in workflows run by `daneel run <name>`
//!
//! A workflow drives the coding assistant over the files changed in the
//! repository and then validates the result, feeding failures back to the
//! assistant until the validation command passes.

mod marker;

pub use marker::{AssistantRepair, MarkerWorkflow};

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Result;
use async_trait::async_trait;

use crate::config::Config;
use crate::exec::{AssistantOptions, RunOptions};
use crate::git::find_git_root;

/// Everything a workflow needs to know about where and how to run.
#[derive(Debug, Clone)]
pub struct WorkflowContext {
    /// Repository root the workflow operates on
    pub root: PathBuf,
    pub assistant: AssistantOptions,
    /// Shell command that decides whether the work is done
    pub validate_command: String,
    pub validate: RunOptions,
}

impl WorkflowContext {
    pub fn new(work_dir: &Path, config: &Config) -> Self {
        let root = find_git_root(work_dir).unwrap_or_else(|| work_dir.to_path_buf());

        let mut assistant = AssistantOptions::from_settings(&config.assistant);
        assistant.run.cwd = Some(root.clone());

        Self {
            validate_command: config.validate.command.clone(),
            validate: RunOptions::from_validate_settings(&config.validate).with_cwd(&root),
            assistant,
            root,
        }
    }
}

/// A named, script-like routine.
#[async_trait]
pub trait Workflow: Send + Sync {
    fn name(&self) -> &str;

    /// One-line summary for listings.
    fn description(&self) -> &str;

    async fn run(&self, ctx: &WorkflowContext) -> Result<()>;
}

/// Workflows by name, sorted.
#[derive(Default)]
pub struct WorkflowRegistry {
    workflows: BTreeMap<String, Box<dyn Workflow>>,
}

impl WorkflowRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding `implement` and `fix_review`.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(MarkerWorkflow::implement()));
        registry.register(Box::new(MarkerWorkflow::fix_review()));
        registry
    }

    pub fn register(&mut self, workflow: Box<dyn Workflow>) {
        self.workflows.insert(workflow.name().to_string(), workflow);
    }

    pub fn get(&self, name: &str) -> Option<&dyn Workflow> {
        self.workflows.get(name).map(|w| w.as_ref())
    }

    /// The workflow a bare `daneel <name>` invocation refers to, if any.
    ///
    /// Only a single word counts; anything with arguments is a command line
    /// to relay.
    pub fn for_invocation(&self, command: &[String]) -> Option<&dyn Workflow> {
        match command {
            [name] => self.get(name),
            _ => None,
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.workflows.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn Workflow> {
        self.workflows.values().map(|w| w.as_ref())
    }

    /// Message for a name that is not registered.
    pub fn not_found_message(&self, name: &str) -> String {
        format!(
            "Action '{}' not found. Available actions: {}",
            name,
            self.names().collect::<Vec<_>>().join(", ")
        )
    }
}
