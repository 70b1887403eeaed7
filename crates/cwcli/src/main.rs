//! cwcli - command-line front end for chordwise
//!
//! Subcommands:
//! - `cwcli chord <notes>...` - Name the chord a set of notes forms
//! - `cwcli key <events>` - Replay note events and guess the key
//! - `cwcli check --target <chord> <notes>...` - Grade a voicing
//! - `cwcli chords` - List the chord library
//! - `cwcli config` - Show the effective configuration

use std::path::PathBuf;

use anyhow::{Context, Result};
use chordconf::ChordwiseConfig;
use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "cwcli")]
#[command(about = "Chord, key and performance analysis for keyboard input")]
#[command(version)]
struct Cli {
    /// Config file, used instead of ./chordwise.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Name the chord formed by a set of notes (e.g. C4 E4 G4)
    Chord {
        /// Notes with octaves
        #[arg(required = true)]
        notes: Vec<String>,

        /// Show every candidate, not just the best
        #[arg(short, long)]
        all: bool,

        /// Spell and number the chord in this key (e.g. "F major")
        #[arg(short, long)]
        key: Option<String>,
    },

    /// Replay JSON-lines note events and guess the key
    Key {
        /// Event file, or - for stdin
        events: PathBuf,

        /// Evaluate at this time in ms (default: last event)
        #[arg(long)]
        at: Option<f64>,

        /// Number of guesses to show
        #[arg(short, long, default_value = "5")]
        top: usize,
    },

    /// Grade played notes against a target chord
    Check {
        /// Target chord (e.g. "C maj7/E")
        #[arg(short, long)]
        target: String,

        /// Played notes with octaves
        #[arg(required = true)]
        notes: Vec<String>,
    },

    /// List the chord library
    Chords {
        /// Only chords built on this triad (5, sus2, sus4, min, maj, b5, dim, aug)
        #[arg(long)]
        triad: Option<String>,
    },

    /// Show the effective configuration and where it came from
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let (config, sources) = ChordwiseConfig::load_with_sources_from(cli.config.as_deref())
        .context("loading configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_new(&config.telemetry.log_level)
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    debug!(
        files = ?sources.files,
        env_overrides = ?sources.env_overrides,
        "loaded configuration"
    );

    let output = if cli.json {
        commands::Output::Json
    } else {
        commands::Output::Text
    };

    match cli.command {
        Commands::Chord { notes, all, key } => {
            commands::chord(&notes, all, key.as_deref(), output)?;
        }
        Commands::Key { events, at, top } => {
            commands::key(&config, &events, at, top, output)?;
        }
        Commands::Check { target, notes } => {
            commands::check(&config, &target, &notes, output)?;
        }
        Commands::Chords { triad } => {
            commands::chords(triad.as_deref(), output)?;
        }
        Commands::Config => {
            commands::config(&config, &sources, output)?;
        }
    }

    Ok(())
}
