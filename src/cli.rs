//! Command-line interface for deckhand
//!
//! Provides argument parsing using clap derive macros. The bare command
//! runs the fusion loop; everything else is optional overrides.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Presentation control from hand gestures and voice commands
#[derive(Parser, Debug)]
#[command(
    name = "deckhand",
    version,
    about = "Presentation control from hand gestures and voice commands"
)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Path to configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Suppress output (quiet mode)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose output
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Audio input device (e.g., hw:0)
    #[arg(long, value_name = "DEVICE")]
    pub device: Option<String>,

    /// Camera device index
    #[arg(long, value_name = "INDEX")]
    pub camera: Option<u32>,

    /// Whisper model (default: small). Use small.en for English-only optimized
    #[arg(long, value_name = "MODEL")]
    pub model: Option<String>,

    /// Language hint for transcription (default: en)
    #[arg(long, value_name = "LANG")]
    pub language: Option<String>,

    /// Rolling audio window length (default: 5s). Examples: 5s, 10s, 1m
    #[arg(long, short = 'b', value_name = "DURATION", value_parser = parse_buffer_secs)]
    pub buffer: Option<u32>,
}

/// Parse a window duration string into seconds.
///
/// Supports any duration format accepted by `humantime`: bare numbers
/// (seconds), single-unit (`5s`, `2m`), and compound (`1m30s`).
fn parse_buffer_secs(s: &str) -> Result<u32, String> {
    let s = s.trim();
    // Bare number → seconds
    if let Ok(secs) = s.parse::<u32>() {
        return Ok(secs);
    }
    humantime::parse_duration(s)
        .map_err(|e| e.to_string())
        .and_then(|d| {
            u32::try_from(d.as_secs()).map_err(|_| "duration too long".to_string())
        })
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List available audio input devices
    Devices,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_invocation_runs_the_fusion_loop() {
        let cli = Cli::parse_from(["deckhand"]);
        assert!(cli.command.is_none());
        assert!(!cli.quiet);
        assert_eq!(cli.verbose, 0);
    }

    #[test]
    fn test_devices_subcommand() {
        let cli = Cli::parse_from(["deckhand", "devices"]);
        assert!(matches!(cli.command, Some(Commands::Devices)));
    }

    #[test]
    fn test_overrides() {
        let cli = Cli::parse_from([
            "deckhand",
            "--device",
            "pipewire",
            "--camera",
            "1",
            "--model",
            "base.en",
            "--language",
            "en",
            "--quiet",
        ]);
        assert_eq!(cli.device.as_deref(), Some("pipewire"));
        assert_eq!(cli.camera, Some(1));
        assert_eq!(cli.model.as_deref(), Some("base.en"));
        assert!(cli.quiet);
    }

    #[test]
    fn test_parse_buffer_secs_bare_number() {
        assert_eq!(parse_buffer_secs("5"), Ok(5));
    }

    #[test]
    fn test_parse_buffer_secs_units() {
        assert_eq!(parse_buffer_secs("10s"), Ok(10));
        assert_eq!(parse_buffer_secs("2m"), Ok(120));
        assert_eq!(parse_buffer_secs("1m30s"), Ok(90));
    }

    #[test]
    fn test_parse_buffer_secs_rejects_garbage() {
        assert!(parse_buffer_secs("soon").is_err());
    }

    #[test]
    fn test_buffer_flag() {
        let cli = Cli::parse_from(["deckhand", "-b", "10s"]);
        assert_eq!(cli.buffer, Some(10));
    }
}
