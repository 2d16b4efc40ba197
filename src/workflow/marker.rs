//! Workflows that resolve marker comments left in changed files

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use tracing::info;

use super::{Workflow, WorkflowContext};
use crate::domain::Output;
use crate::exec::{claude_code, validate, AssistantOptions, Repair};
use crate::git::changed_files;

/// Asks the assistant to act on every `marker` comment in the changed files,
/// then validates.
#[derive(Debug, Clone)]
pub struct MarkerWorkflow {
    name: &'static str,
    description: &'static str,
    marker: &'static str,
    instructions: &'static str,
}

impl MarkerWorkflow {
    /// Implement code described by `IMPLEMENT` comments.
    pub fn implement() -> Self {
        Self {
            name: "implement",
            description: "Implement code requested by IMPLEMENT comments in changed files",
            marker: "IMPLEMENT",
            instructions: "These comments indicate that the function or code needs to be \
                implemented. Implement the required functionality for each 'IMPLEMENT' comment \
                and remove the 'IMPLEMENT' comment from the code. Create new functions or \
                classes as needed to fulfill the requirements. Create unit tests for the \
                implemented functionality if they do not already exist.",
        }
    }

    /// Address review notes left as `xxx` comments.
    pub fn fix_review() -> Self {
        Self {
            name: "fix_review",
            description: "Fix review notes left as xxx comments in changed files",
            marker: "xxx",
            instructions: "These comments indicate that the code needs to be fixed. For each \
                comment starting with 'xxx', address the issue mentioned in the comment and \
                remove the 'xxx' comment from the code.",
        }
    }

    pub fn marker(&self) -> &str {
        self.marker
    }

    /// Prompt for the first assistant run over `files`.
    pub fn prompt(&self, files: &[String]) -> String {
        format!(
            "Read the following files and search for comments starting with '{}' : {}. {}",
            self.marker,
            files.join(","),
            self.instructions
        )
    }
}

#[async_trait]
impl Workflow for MarkerWorkflow {
    fn name(&self) -> &str {
        self.name
    }

    fn description(&self) -> &str {
        self.description
    }

    async fn run(&self, ctx: &WorkflowContext) -> Result<()> {
        let files: Vec<String> = changed_files(&ctx.root)?
            .iter()
            .map(|p| p.display().to_string())
            .collect();
        if files.is_empty() {
            bail!(
                "No changed files in {} to search for '{}' comments",
                ctx.root.display(),
                self.marker
            );
        }
        info!("{}: {} changed file(s)", self.name, files.len());

        claude_code(&self.prompt(&files), &ctx.assistant)
            .await
            .with_context(|| format!("Workflow '{}' failed to run the assistant", self.name))?;

        let mut repair = AssistantRepair::new(ctx.assistant.clone(), &ctx.validate_command);
        validate(&ctx.validate_command, &mut repair, &ctx.validate)
            .await
            .with_context(|| format!("Workflow '{}' did not pass validation", self.name))?;

        Ok(())
    }
}

/// Repair hook that hands failing validation output back to the assistant.
#[derive(Debug, Clone)]
pub struct AssistantRepair {
    options: AssistantOptions,
    command: String,
}

impl AssistantRepair {
    pub fn new(options: AssistantOptions, command: impl Into<String>) -> Self {
        Self {
            options,
            command: command.into(),
        }
    }

    pub fn prompt(&self, failure: &Output) -> String {
        format!(
            "The implementation you provided did not pass the tests in {}. \
             Here is the output from the failed tests:\n{}\n\
             Please fix the implementation so that all tests pass.",
            self.command,
            failure.combined()
        )
    }
}

#[async_trait]
impl Repair for AssistantRepair {
    async fn repair(&mut self, failure: &Output) -> crate::domain::Result<Output> {
        claude_code(&self.prompt(failure), &self.options).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_lists_files_and_marker() {
        let workflow = MarkerWorkflow::fix_review();
        let prompt = workflow.prompt(&["src/a.rs".to_string(), "src/b.rs".to_string()]);
        assert!(prompt.contains("comments starting with 'xxx' : src/a.rs,src/b.rs."));
        assert!(prompt.contains("remove the 'xxx' comment"));
    }

    #[test]
    fn implement_asks_for_tests() {
        let prompt = MarkerWorkflow::implement().prompt(&["lib.rs".to_string()]);
        assert!(prompt.contains("'IMPLEMENT'"));
        assert!(prompt.contains("Create unit tests"));
    }

    #[test]
    fn repair_prompt_carries_failure_output() {
        let repair = AssistantRepair::new(AssistantOptions::default(), "./test.sh");
        let prompt = repair.prompt(&Output::new("1 failed", "assertion error"));
        assert!(prompt.contains("did not pass the tests in ./test.sh"));
        assert!(prompt.contains("1 failed"));
        assert!(prompt.contains("assertion error"));
    }
}
