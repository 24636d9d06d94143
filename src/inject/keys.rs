//! Arrow-key injection with testable command execution.
//!
//! Slide navigation is a single OS-level key event: right arrow for the next
//! slide, left arrow for the previous one. Keys are injected through ydotool
//! so injection works on Wayland as well as X11.
//!
//! The `CommandExecutor` trait enables full testability without external
//! dependencies.

use crate::error::{DeckhandError, Result};
use std::process::Command;

/// Trait for executing system commands.
///
/// Object-safe, Send + Sync for use in concurrent contexts.
/// Enables testability by allowing mock implementations.
pub trait CommandExecutor: Send + Sync {
    /// Execute a command with arguments.
    ///
    /// Returns the stdout of the command on success.
    /// Returns an error if the command fails or is not found.
    fn execute(&self, command: &str, args: &[&str]) -> Result<String>;
}

impl CommandExecutor for Box<dyn CommandExecutor> {
    fn execute(&self, command: &str, args: &[&str]) -> Result<String> {
        (**self).execute(command, args)
    }
}

/// Production command executor using std::process::Command.
#[derive(Debug, Clone, Default)]
pub struct SystemCommandExecutor;

impl SystemCommandExecutor {
    pub fn new() -> Self {
        Self
    }
}

impl CommandExecutor for SystemCommandExecutor {
    fn execute(&self, command: &str, args: &[&str]) -> Result<String> {
        let output = Command::new(command).args(args).output().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                DeckhandError::InjectionToolNotFound {
                    tool: command.to_string(),
                }
            } else if e.kind() == std::io::ErrorKind::PermissionDenied {
                DeckhandError::InjectionPermissionDenied {
                    message: format!(
                        "Permission denied executing {}: {}.\n\
                        Hint: If using ydotool, ensure the ydotoold daemon is running and you have permissions.\n\
                        Try: sudo systemctl start ydotool",
                        command, e
                    ),
                }
            } else {
                DeckhandError::InjectionFailed {
                    message: format!("Failed to execute {}: {}", command, e),
                }
            }
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(DeckhandError::InjectionFailed {
                message: format!(
                    "{} failed with status {:?}: {}",
                    command, output.status, stderr
                ),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

/// An arrow key the injector can press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrowKey {
    Left,
    Right,
}

impl ArrowKey {
    /// Linux input event code for the key (KEY_LEFT / KEY_RIGHT).
    pub fn code(&self) -> u16 {
        match self {
            ArrowKey::Left => 105,
            ArrowKey::Right => 106,
        }
    }
}

/// Key injector that uses CommandExecutor for system interaction.
pub struct KeyInjector<E: CommandExecutor> {
    executor: E,
}

impl<E: CommandExecutor> KeyInjector<E> {
    /// Create a new KeyInjector with the given executor.
    pub fn new(executor: E) -> Self {
        Self { executor }
    }

    /// Press and release one arrow key.
    ///
    /// Uses ydotool to emit a key-down followed by a key-up event.
    ///
    /// # Requirements
    /// - ydotool (with ydotoold daemon running)
    ///
    /// # Installation
    /// Ubuntu/Debian: `sudo apt install ydotool`
    /// Arch: `sudo pacman -S ydotool`
    ///
    /// # Setup
    /// Ensure ydotoold daemon is running:
    /// `sudo systemctl enable --now ydotool`
    pub fn press(&self, key: ArrowKey) -> Result<()> {
        let code = key.code();
        let down = format!("{}:1", code);
        let up = format!("{}:0", code);

        self.executor
            .execute("ydotool", &["key", &down, &up])
            .map_err(|e| match &e {
                DeckhandError::InjectionToolNotFound { tool } if tool == "ydotool" => {
                    DeckhandError::InjectionFailed {
                        message: "ydotool not found. Install ydotool and start the daemon:\n\
                            Ubuntu/Debian: sudo apt install ydotool\n\
                            Arch: sudo pacman -S ydotool\n\
                            Then start the daemon: sudo systemctl enable --now ydotool"
                            .to_string(),
                    }
                }
                _ => e,
            })?;
        Ok(())
    }

    /// Access the underlying executor (used by tests to inspect calls).
    pub fn executor(&self) -> &E {
        &self.executor
    }
}

impl KeyInjector<SystemCommandExecutor> {
    /// Create a KeyInjector with the system command executor.
    pub fn system() -> Self {
        Self::new(SystemCommandExecutor::new())
    }
}

/// Recording executor that captures calls but always succeeds.
///
/// Shared between unit and integration tests; interior mutability keeps it
/// usable behind `&self` from concurrent dispatch paths.
#[derive(Debug, Default)]
pub struct RecordingExecutor {
    calls: std::sync::Mutex<Vec<(String, Vec<String>)>>,
}

impl RecordingExecutor {
    pub fn new() -> Self {
        Self {
            calls: std::sync::Mutex::new(Vec::new()),
        }
    }

    /// Get all recorded calls.
    pub fn calls(&self) -> Vec<(String, Vec<String>)> {
        match self.calls.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Get the number of recorded calls.
    pub fn call_count(&self) -> usize {
        self.calls().len()
    }
}

impl CommandExecutor for RecordingExecutor {
    fn execute(&self, command: &str, args: &[&str]) -> Result<String> {
        let mut calls = match self.calls.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        calls.push((
            command.to_string(),
            args.iter().map(|s| s.to_string()).collect(),
        ));
        Ok(String::new())
    }
}

/// Mock command executor for testing.
///
/// Records all command executions and returns configured responses.
#[derive(Debug, Default)]
pub struct MockCommandExecutor {
    calls: std::sync::Mutex<Vec<(String, Vec<String>)>>,
    responses: std::sync::Mutex<std::collections::VecDeque<Result<String>>>,
}

impl MockCommandExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a successful response to the queue.
    pub fn with_response(self, response: &str) -> Self {
        if let Ok(mut responses) = self.responses.lock() {
            responses.push_back(Ok(response.to_string()));
        }
        self
    }

    /// Add an error response to the queue.
    pub fn with_error(self, error: DeckhandError) -> Self {
        if let Ok(mut responses) = self.responses.lock() {
            responses.push_back(Err(error));
        }
        self
    }

    /// Get all recorded calls.
    pub fn calls(&self) -> Vec<(String, Vec<String>)> {
        match self.calls.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Get the number of recorded calls.
    pub fn call_count(&self) -> usize {
        self.calls().len()
    }
}

impl CommandExecutor for MockCommandExecutor {
    fn execute(&self, command: &str, args: &[&str]) -> Result<String> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push((
                command.to_string(),
                args.iter().map(|s| s.to_string()).collect(),
            ));
        }

        // Return the next configured response or a default success
        self.responses
            .lock()
            .ok()
            .and_then(|mut responses| responses.pop_front())
            .unwrap_or_else(|| Ok(String::new()))
    }
}
