//! Actions offered by the relay's menu
//!
//! An action is a named operation run against the relayed process. Actions
//! are declared in TOML manifests and collected from a handful of
//! directories by [`ActionDiscovery`].

mod discovery;
mod manifest;
mod menu;

pub use discovery::ActionDiscovery;
pub use manifest::{load_manifest, ActionKind, ActionManifest, ActionSpec, ManifestAction};
pub use menu::{show_action_menu, MenuOutcome};

use anyhow::Result;

use crate::pty::ProcessHandle;

/// A named operation that can be run on a relayed process.
pub trait Action {
    /// Label shown in the menu.
    fn name(&self) -> &str;

    fn execute(&self, process: &mut dyn ProcessHandle) -> Result<()>;
}

/// Actions in the order they were registered, which is also menu order.
#[derive(Default)]
pub struct ActionRegistry {
    actions: Vec<Box<dyn Action>>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, action: Box<dyn Action>) {
        self.actions.push(action);
    }

    /// Look up by 1-based menu position.
    pub fn get(&self, position: usize) -> Option<&dyn Action> {
        position
            .checked_sub(1)
            .and_then(|i| self.actions.get(i))
            .map(|a| a.as_ref())
    }

    pub fn find(&self, name: &str) -> Option<&dyn Action> {
        self.actions
            .iter()
            .find(|a| a.name() == name)
            .map(|a| a.as_ref())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.actions.iter().map(|a| a.name())
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn Action> {
        self.actions.iter().map(|a| a.as_ref())
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

impl std::fmt::Debug for ActionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Named(&'static str);

    impl Action for Named {
        fn name(&self) -> &str {
            self.0
        }
        fn execute(&self, _process: &mut dyn ProcessHandle) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn positions_are_one_based() {
        let mut registry = ActionRegistry::new();
        registry.register(Box::new(Named("first")));
        registry.register(Box::new(Named("second")));

        assert!(registry.get(0).is_none());
        assert_eq!(registry.get(1).map(|a| a.name()), Some("first"));
        assert_eq!(registry.get(2).map(|a| a.name()), Some("second"));
        assert!(registry.get(3).is_none());
        assert_eq!(registry.names().collect::<Vec<_>>(), ["first", "second"]);
    }

    #[test]
    fn find_by_name() {
        let mut registry = ActionRegistry::new();
        registry.register(Box::new(Named("Git Status")));
        assert!(registry.find("Git Status").is_some());
        assert!(registry.find("git status").is_none());
    }
}
