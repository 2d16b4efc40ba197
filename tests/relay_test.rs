//! Relay input handling against a scripted process and menu, plus the
//! pass-through relay against real children

use std::io::Cursor;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use daneel::action::{Action, ActionRegistry, ActionSpec, ActionKind, ManifestAction};
use daneel::pty::{
    relay_streams, InputKey, ProcessHandle, ReadOutcome, Relay, StreamMenu, DEFAULT_TRIGGER,
    KEY_EOT, KEY_INTERRUPT, KEY_SUSPEND,
};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Event {
    Sent(Vec<u8>),
    Interrupt,
    Eof,
    Suspend,
}

#[derive(Default)]
struct ScriptedProcess {
    events: Vec<Event>,
}

impl ScriptedProcess {
    fn sent_bytes(&self) -> Vec<u8> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Event::Sent(bytes) => Some(bytes.clone()),
                _ => None,
            })
            .flatten()
            .collect()
    }
}

impl ProcessHandle for ScriptedProcess {
    fn send(&mut self, data: &[u8]) -> Result<()> {
        self.events.push(Event::Sent(data.to_vec()));
        Ok(())
    }
    fn interrupt(&mut self) -> Result<()> {
        self.events.push(Event::Interrupt);
        Ok(())
    }
    fn send_eof(&mut self) -> Result<()> {
        self.events.push(Event::Eof);
        Ok(())
    }
    fn suspend(&mut self) -> Result<()> {
        self.events.push(Event::Suspend);
        Ok(())
    }
    fn is_alive(&mut self) -> bool {
        true
    }
    fn read_output(&mut self, _buf: &mut [u8], _timeout: Duration) -> Result<ReadOutcome> {
        Ok(ReadOutcome::Timeout)
    }
}

/// Records that it ran
struct Recorder {
    name: &'static str,
    log: Arc<Mutex<Vec<&'static str>>>,
}

impl Action for Recorder {
    fn name(&self) -> &str {
        self.name
    }
    fn execute(&self, _process: &mut dyn ProcessHandle) -> Result<()> {
        self.log.lock().unwrap().push(self.name);
        Ok(())
    }
}

fn recording_registry(log: &Arc<Mutex<Vec<&'static str>>>) -> ActionRegistry {
    let mut registry = ActionRegistry::new();
    for name in ["first", "second"] {
        registry.register(Box::new(Recorder {
            name,
            log: log.clone(),
        }));
    }
    registry
}

#[test]
fn out_of_range_selection_keeps_relaying() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let actions = recording_registry(&log);
    let relay = Relay::new(&actions, DEFAULT_TRIGGER);
    let mut process = ScriptedProcess::default();
    let mut menu = StreamMenu::new(Cursor::new(b"9\n".to_vec()), Vec::new());

    let mut keys = Vec::new();
    for byte in [DEFAULT_TRIGGER, b'l', b's', b'\r'] {
        keys.push(relay.handle_input(byte, &mut process, &mut menu).unwrap());
    }

    assert_eq!(keys[0], InputKey::Trigger);
    let shown = String::from_utf8(menu.output().clone()).unwrap();
    assert!(shown.contains("Available actions:\n1. first\n2. second\n"));
    assert!(shown.contains("Invalid selection."));
    assert!(log.lock().unwrap().is_empty());
    assert_eq!(process.sent_bytes(), b"ls\r");
}

#[test]
fn selection_runs_exactly_the_chosen_action() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let actions = recording_registry(&log);
    let relay = Relay::new(&actions, DEFAULT_TRIGGER);
    let mut process = ScriptedProcess::default();
    let mut menu = StreamMenu::new(Cursor::new(b"2\n".to_vec()), Vec::new());

    relay
        .handle_input(DEFAULT_TRIGGER, &mut process, &mut menu)
        .unwrap();

    assert_eq!(*log.lock().unwrap(), ["second"]);
    assert!(process.events.is_empty());
}

#[test]
fn control_keys_are_translated_in_order() {
    let actions = ActionRegistry::new();
    let relay = Relay::new(&actions, DEFAULT_TRIGGER);
    let mut process = ScriptedProcess::default();
    let mut menu = StreamMenu::new(Cursor::new(Vec::new()), Vec::new());

    for byte in [b'a', KEY_INTERRUPT, KEY_EOT, KEY_SUSPEND, b'b'] {
        relay.handle_input(byte, &mut process, &mut menu).unwrap();
    }

    assert_eq!(
        process.events,
        vec![
            Event::Sent(b"a".to_vec()),
            Event::Interrupt,
            Event::Eof,
            Event::Suspend,
            Event::Sent(b"b".to_vec()),
        ]
    );
}

#[test]
fn empty_menu_reports_no_actions() {
    let actions = ActionRegistry::new();
    let relay = Relay::new(&actions, DEFAULT_TRIGGER);
    let mut process = ScriptedProcess::default();
    let mut menu = StreamMenu::new(Cursor::new(b"1\n".to_vec()), Vec::new());

    relay
        .handle_input(DEFAULT_TRIGGER, &mut process, &mut menu)
        .unwrap();

    let shown = String::from_utf8(menu.output().clone()).unwrap();
    assert!(shown.contains("No actions available."));
    assert!(process.events.is_empty());
}

#[test]
fn manifest_action_types_into_the_process() {
    let spec = ActionSpec {
        name: "Git Status".to_string(),
        message: None,
        kind: ActionKind::Send {
            input: "git status\n".to_string(),
            expect: None,
            timeout_secs: 30,
        },
    };
    let mut actions = ActionRegistry::new();
    actions.register(Box::new(ManifestAction::new(spec, "actions/git.toml").unwrap()));

    let relay = Relay::new(&actions, DEFAULT_TRIGGER);
    let mut process = ScriptedProcess::default();
    let mut menu = StreamMenu::new(Cursor::new(b"1\n".to_vec()), Vec::new());

    relay
        .handle_input(DEFAULT_TRIGGER, &mut process, &mut menu)
        .unwrap();

    assert_eq!(process.sent_bytes(), b"git status\n");
}

#[cfg(unix)]
fn sh(script: &str) -> Vec<String> {
    vec!["sh".to_string(), "-c".to_string(), script.to_string()]
}

#[cfg(unix)]
#[test]
fn passthrough_returns_child_output_and_exit_code() {
    let dir = tempfile::TempDir::new().unwrap();
    let mut output = Vec::new();

    let status = relay_streams(&sh("echo hi; exit 3"), dir.path(), std::io::empty(), &mut output)
        .expect("relay");

    assert_eq!(status.exit_code(), 3);
    assert!(String::from_utf8_lossy(&output).contains("hi"));
}

#[cfg(unix)]
#[test]
fn passthrough_feeds_input_to_the_child() {
    let dir = tempfile::TempDir::new().unwrap();
    let mut output = Vec::new();

    let status = relay_streams(
        &sh("read line; echo \"got:$line\""),
        dir.path(),
        Cursor::new(b"ping\n".to_vec()),
        &mut output,
    )
    .expect("relay");

    assert!(status.success());
    assert!(String::from_utf8_lossy(&output).contains("got:ping"));
}

#[cfg(unix)]
#[test]
fn passthrough_ends_input_with_eof() {
    let dir = tempfile::TempDir::new().unwrap();
    let mut output = Vec::new();

    let status = relay_streams(
        &sh("cat >/dev/null; echo drained"),
        dir.path(),
        std::io::empty(),
        &mut output,
    )
    .expect("relay");

    assert!(status.success());
    assert!(String::from_utf8_lossy(&output).contains("drained"));
}

#[cfg(unix)]
#[test]
fn passthrough_rejects_an_empty_command() {
    let dir = tempfile::TempDir::new().unwrap();
    let err = relay_streams(&[], dir.path(), std::io::empty(), &mut Vec::new()).unwrap_err();
    assert!(err.to_string().contains("No command given"));
}
