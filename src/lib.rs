//! deckhand - presentation control from hand gestures and voice commands
//!
//! Two continuously-sampled input modalities (hand motion from a camera,
//! spoken commands from a microphone) fused into one ordered stream of
//! slide-navigation actions.

// Enforce error handling discipline
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::let_underscore_must_use)]

pub mod audio;
#[cfg(feature = "cli")]
pub mod app;
#[cfg(feature = "cli")]
pub mod cli;
pub mod clock;
pub mod config;
pub mod defaults;
pub mod error;
pub mod fusion;
pub mod gesture;
pub mod inject;
pub mod video;
pub mod voice;

// Core traits (observe → fuse → dispatch)
pub use audio::capture::AudioCapture;
pub use gesture::detector::HandDetector;
pub use inject::keys::{CommandExecutor, KeyInjector, SystemCommandExecutor};
pub use video::camera::FrameSource;
pub use video::preview::Preview;
pub use voice::transcriber::Transcriber;

// Fusion core
pub use fusion::action::{Action, Channel};
pub use fusion::cooldown::CooldownGate;
pub use fusion::dispatcher::ActionDispatcher;
pub use fusion::orchestrator::{FusionConfig, FusionLoop, FusionParts};

// Error handling
pub use error::{DeckhandError, Result};

// Config
pub use config::Config;
