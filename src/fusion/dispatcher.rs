//! Serialized action execution.

use crate::error::{DeckhandError, Result};
use crate::fusion::action::Action;
use crate::inject::keys::{CommandExecutor, KeyInjector, SystemCommandExecutor};
use std::sync::{Mutex, MutexGuard};

/// Executes navigation actions through the key-injection collaborator,
/// exactly once per call.
///
/// The gesture loop and the voice pipeline both dispatch through one shared
/// instance; a coarse lock around the injection call keeps near-simultaneous
/// cross-channel actions from interleaving inside the keystroke tool.
/// Ordering between them is not defined and does not need to be.
pub struct ActionDispatcher {
    injector: Mutex<KeyInjector<Box<dyn CommandExecutor>>>,
    quiet: bool,
}

impl ActionDispatcher {
    /// Create a dispatcher over the given command executor.
    pub fn new(executor: Box<dyn CommandExecutor>) -> Self {
        Self {
            injector: Mutex::new(KeyInjector::new(executor)),
            quiet: false,
        }
    }

    /// Create a dispatcher using the system command executor.
    pub fn system() -> Self {
        Self::new(Box::new(SystemCommandExecutor::new()))
    }

    /// Configure whether dispatched actions are echoed to stderr.
    pub fn with_quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    /// Execute one navigation action.
    ///
    /// Holds the injection lock for the duration of the key press so two
    /// dispatch attempts can never corrupt each other's key sequence.
    pub fn dispatch(&self, action: Action) -> Result<()> {
        let injector = self.lock()?;

        if !self.quiet {
            eprintln!("deckhand: {}", action.label());
        }

        injector.press(action.key())
    }

    fn lock(&self) -> Result<MutexGuard<'_, KeyInjector<Box<dyn CommandExecutor>>>> {
        self.injector
            .lock()
            .map_err(|e| DeckhandError::InjectionFailed {
                message: format!("Failed to lock injector: {}", e),
            })
    }
}
