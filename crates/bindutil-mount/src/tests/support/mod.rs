//! Shared fakes and fixtures for mount lifecycle tests.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::runner::{CommandRunner, ToolOutput};
use crate::tools::{SearchPathLocator, ToolLocator};
use crate::unmount::RetryPolicy;

/// Tools the fakes never resolve from the real search path.
const MOUNT_FAMILY: [&str; 4] = ["bindfs", "mount", "fusermount", "umount"];

/// Policy with a short interval so retry tests stay fast.
pub fn fast_policy(attempts: u32) -> RetryPolicy {
    RetryPolicy::new(attempts, Duration::from_millis(10))
}

/// Resolves tools from a fixed table.
///
/// With `commands_from_path` set, names outside the mount family fall back
/// to the real search path so supervised children can be real programs.
#[derive(Debug, Default)]
pub struct FakeLocator {
    tools: HashMap<String, PathBuf>,
    commands_from_path: bool,
}

impl FakeLocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tool(mut self, name: &str) -> Self {
        self.tools
            .insert(name.to_owned(), PathBuf::from("/fake/bin").join(name));
        self
    }

    pub fn with_commands_from_path(mut self) -> Self {
        self.commands_from_path = true;
        self
    }

    /// Linux host with `bindfs`, `fusermount` and `umount`.
    pub fn linux_bindfs() -> Self {
        Self::new()
            .with_tool("bindfs")
            .with_tool("fusermount")
            .with_tool("umount")
            .with_commands_from_path()
    }
}

impl ToolLocator for FakeLocator {
    fn locate(&self, program: &str) -> Option<PathBuf> {
        if let Some(path) = self.tools.get(program) {
            return Some(path.clone());
        }
        if self.commands_from_path && !MOUNT_FAMILY.contains(&program) {
            return SearchPathLocator.locate(program);
        }
        None
    }
}

/// A recorded tool invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCall {
    pub program: PathBuf,
    pub args: Vec<OsString>,
}

impl ToolCall {
    pub fn program_name(&self) -> String {
        self.program
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Replays queued tool results and records every call.
///
/// Once the queue is empty every call succeeds with no output.
#[derive(Debug, Default)]
pub struct ScriptedRunner {
    responses: RefCell<VecDeque<io::Result<ToolOutput>>>,
    calls: RefCell<Vec<ToolCall>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, output: ToolOutput) -> &Self {
        self.responses.borrow_mut().push_back(Ok(output));
        self
    }

    pub fn push_busy(&self, times: usize) -> &Self {
        for _ in 0..times {
            self.push(ToolOutput::failed(
                1,
                "umount: /mnt/view: target is busy (Device or resource busy)",
            ));
        }
        self
    }

    pub fn push_io_error(&self, message: &str) -> &Self {
        self.responses
            .borrow_mut()
            .push_back(Err(io::Error::other(message.to_owned())));
        self
    }

    pub fn calls(&self) -> Vec<ToolCall> {
        self.calls.borrow().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.borrow().len()
    }

    pub fn calls_to(&self, name: &str) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|call| call.program_name() == name)
            .count()
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, program: &Path, args: &[OsString]) -> io::Result<ToolOutput> {
        self.calls.borrow_mut().push(ToolCall {
            program: program.to_path_buf(),
            args: args.to_vec(),
        });
        self.responses
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Ok(ToolOutput::succeeded("")))
    }
}

/// Absolute path to a POSIX shell.
pub fn shell() -> PathBuf {
    ["/bin/sh", "/usr/bin/sh"]
        .into_iter()
        .map(PathBuf::from)
        .find(|path| path.exists())
        .expect("no POSIX shell available")
}
