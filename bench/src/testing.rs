//! Scripted [`RemoteShell`] for driving collectors without a testbed.

use std::{
    cell::RefCell,
    collections::VecDeque,
    path::Path,
    time::Duration,
};

use crate::{
    remote::{CommandOutput, RemoteShell},
    types::BenchmarkResult,
};

type Responder = Box<dyn Fn(&str, &str) -> Option<CommandOutput>>;

/// Records every call and answers `run` from a list of responders.
///
/// Responders are tried in order; queued one-shot replies matching a command
/// substring take precedence. Unmatched commands succeed with empty output.
#[derive(Default)]
pub struct ScriptedShell {
    responders: Vec<Responder>,
    queued: RefCell<VecDeque<(String, CommandOutput)>>,
    pub calls: RefCell<Vec<String>>,
}

impl ScriptedShell {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answers every command containing `needle`.
    pub fn respond(mut self, needle: &str, output: CommandOutput) -> Self {
        let needle = needle.to_string();
        self.responders.push(Box::new(move |_: &str, command: &str| {
            command.contains(&needle).then(|| output.clone())
        }));
        self
    }

    /// Answers commands with a function of the host and command.
    pub fn respond_with(
        mut self,
        responder: impl Fn(&str, &str) -> Option<CommandOutput> + 'static,
    ) -> Self {
        self.responders.push(Box::new(responder));
        self
    }

    /// Answers the next command containing `needle` once.
    pub fn queue(self, needle: &str, output: CommandOutput) -> Self {
        self.queued
            .borrow_mut()
            .push_back((needle.to_string(), output));
        self
    }

    /// Recorded calls containing `needle`.
    pub fn calls_matching(&self, needle: &str) -> Vec<String> {
        self.calls
            .borrow()
            .iter()
            .filter(|c| c.contains(needle))
            .cloned()
            .collect()
    }

    fn answer(&self, host: &str, command: &str) -> CommandOutput {
        let mut queued = self.queued.borrow_mut();
        if let Some(index) = queued.iter().position(|(n, _)| command.contains(n.as_str())) {
            if let Some((_, output)) = queued.remove(index) {
                return output;
            }
        }
        drop(queued);

        self.responders
            .iter()
            .find_map(|r| r(host, command))
            .unwrap_or_else(|| ok(""))
    }
}

pub fn ok(stdout: &str) -> CommandOutput {
    CommandOutput {
        status: Some(0),
        stdout: stdout.to_string(),
        stderr: String::new(),
    }
}

pub fn failed(status: i32) -> CommandOutput {
    CommandOutput {
        status: Some(status),
        stdout: String::new(),
        stderr: "failed".to_string(),
    }
}

impl RemoteShell for ScriptedShell {
    fn run(&self, host: &str, command: &str) -> BenchmarkResult<CommandOutput> {
        self.calls.borrow_mut().push(format!("{host}$ {}", command.trim()));
        Ok(self.answer(host, command))
    }

    fn run_with_timeout(
        &self,
        host: &str,
        command: &str,
        _timeout: Duration,
    ) -> BenchmarkResult<CommandOutput> {
        self.run(host, command)
    }

    fn spawn(&self, host: &str, command: &str) -> BenchmarkResult<()> {
        self.calls
            .borrow_mut()
            .push(format!("{host}$ {} &", command.trim()));
        Ok(())
    }

    fn copy_to(&self, host: &str, local: &Path, remote: &str) -> BenchmarkResult<()> {
        self.calls
            .borrow_mut()
            .push(format!("scp {} {host}:{remote}", local.display()));
        Ok(())
    }
}
