//! Navigation actions and input channels.

use crate::inject::keys::ArrowKey;

/// A navigation command, the only artifact that crosses from either input
/// modality into the dispatcher. Carries no payload; execution is idempotent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    /// Advance to the next slide.
    Next,
    /// Return to the previous slide.
    Previous,
}

impl Action {
    /// The arrow key whose press realizes this action.
    pub fn key(&self) -> ArrowKey {
        match self {
            Action::Next => ArrowKey::Right,
            Action::Previous => ArrowKey::Left,
        }
    }

    /// Human-readable label for log output.
    pub fn label(&self) -> &'static str {
        match self {
            Action::Next => "next slide",
            Action::Previous => "previous slide",
        }
    }
}

/// An input modality with its own cooldown clock.
///
/// A voice command and a gesture within the cooldown of each other do not
/// suppress one another; each modality rate-limits only itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Gesture,
    Voice,
}

impl Channel {
    pub(crate) const COUNT: usize = 2;

    pub(crate) fn index(&self) -> usize {
        match self {
            Channel::Gesture => 0,
            Channel::Voice => 1,
        }
    }
}
