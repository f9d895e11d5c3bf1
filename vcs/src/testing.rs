use crate::runner::{CommandOutput, CommandRunner, CommandSpec, RunnerResult};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Answers commands from a table keyed by the space-joined argument list,
/// and remembers every argument list it was asked to run.
pub struct ScriptedRunner {
    responses: HashMap<String, CommandOutput>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self {
            responses: HashMap::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn respond(mut self, args: impl Into<String>, output: &str, code: i32) -> Self {
        self.responses
            .insert(args.into(), CommandOutput::new(output, code));
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
    async fn run(&self, spec: &CommandSpec) -> RunnerResult<CommandOutput> {
        let key = spec.args.join(" ");
        self.calls.lock().unwrap().push(key.clone());
        Ok(self.responses.get(&key).cloned().unwrap_or_else(|| {
            CommandOutput::new("", 128).with_stderr(format!("fatal: unscripted command: {}", key))
        }))
    }

    fn runner_name(&self) -> &'static str {
        "scripted"
    }
}

/// Lists `entries` for any `ls-tree` and answers every other command with
/// `blob` after `delay`, tracking how many commands were running at once.
pub struct CountingRunner {
    entries: Vec<String>,
    delay: Duration,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl CountingRunner {
    pub fn new(entries: usize, delay: Duration) -> Self {
        Self {
            entries: (0..entries).map(|i| format!("entry{}", i)).collect(),
            delay,
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CommandRunner for CountingRunner {
    async fn run(&self, spec: &CommandSpec) -> RunnerResult<CommandOutput> {
        if spec.args.iter().any(|arg| arg == "ls-tree") {
            let listing: String = self.entries.iter().map(|e| format!("{}\0", e)).collect();
            return Ok(CommandOutput::new(listing, 0));
        }

        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(running, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(CommandOutput::new("blob\n", 0))
    }

    fn runner_name(&self) -> &'static str {
        "counting"
    }
}
