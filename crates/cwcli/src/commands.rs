//! CLI command implementations

use std::io::Read;
use std::path::Path;

use anyhow::{bail, Context, Result};
use chordconf::{ChordwiseConfig, ConfigSources};
use chordwise::{
    detect_chords, name_interval, out_of_key_ratio, parse_events, parse_notes, roman_numeral,
    score_chord, Chord, DisplayContext, HarmonyAnalyzer, HeuristicAnalyzer, Key, Listener, Note,
    NoteEvent, TriadName, ARCHETYPES,
};
use serde_json::json;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Output {
    Text,
    Json,
}

fn print_json(value: &serde_json::Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn note_list(notes: &[Note]) -> String {
    if notes.is_empty() {
        return "-".to_string();
    }
    notes.iter().map(|n| n.to_string()).collect::<Vec<_>>().join(" ")
}

/// Detect and print chords for a set of notes
pub fn chord(names: &[String], all: bool, key: Option<&str>, output: Output) -> Result<()> {
    let notes = parse_notes(names).context("parsing notes")?;
    let key: Option<Key> = key
        .map(|k| k.parse::<Key>().with_context(|| format!("parsing key {:?}", k)))
        .transpose()?;

    let candidates = detect_chords(&notes)?;
    let shown = if all {
        &candidates[..]
    } else {
        &candidates[..candidates.len().min(1)]
    };

    let context = DisplayContext {
        key,
        ..DisplayContext::default()
    };

    match output {
        Output::Json => {
            let rows: Vec<_> = shown
                .iter()
                .map(|chord| {
                    json!({
                        "chord": chord,
                        "name": chord.to_string(),
                        "display": chord.for_display(&context),
                        "score": score_chord(chord),
                        "roman": key.as_ref().map(|k| roman_numeral(k, chord)),
                    })
                })
                .collect();
            print_json(&json!(rows))?;
        }
        Output::Text => {
            if shown.is_empty() {
                println!("no chord detected");
            }
            for chord in shown {
                let mut line = chord.for_display(&context);
                if let Some(k) = &key {
                    line.push_str(&format!("  ({} in {})", roman_numeral(k, chord), k));
                }
                if all {
                    line.push_str(&format!("  score {}", score_chord(chord)));
                }
                if !chord.accidentals.is_empty() {
                    let extra: Vec<String> =
                        chord.accidentals.iter().map(|a| name_interval(*a)).collect();
                    line.push_str(&format!("  + {}", extra.join(", ")));
                }
                println!("{}", line);
            }
        }
    }

    Ok(())
}

fn read_events(path: &Path) -> Result<Vec<NoteEvent>> {
    let text = if path == Path::new("-") {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("reading events from stdin")?;
        text
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("reading events from {}", path.display()))?
    };
    Ok(parse_events(&text)?)
}

/// Replay note events through a listener and print key guesses
pub fn key(
    config: &ChordwiseConfig,
    events: &Path,
    at: Option<f64>,
    top: usize,
    output: Output,
) -> Result<()> {
    let events = read_events(events)?;
    let mut listener = Listener::new(config);

    let mut last_ms: f64 = 0.0;
    for event in &events {
        listener
            .apply(event)
            .with_context(|| format!("applying {:?}", event))?;
        let end = match event {
            NoteEvent::Instant { t, length, .. } => t + length,
            other => other.t(),
        };
        last_ms = last_ms.max(end);
    }

    let now = at.unwrap_or(last_ms);
    let chosen = listener.refresh(now).copied();
    let guesses: Vec<_> = listener.tracker().guesses().iter().take(top).collect();
    let histogram = listener.histogram().computed();

    match output {
        Output::Json => {
            print_json(&json!({
                "at_ms": now,
                "key": chosen.map(|k| k.to_string()),
                "out_of_key": chosen.map(|k| out_of_key_ratio(histogram, &k)),
                "guesses": guesses,
                "histogram": histogram,
            }))?;
        }
        Output::Text => match chosen {
            Some(key) => {
                for guess in &guesses {
                    println!("{:<16} {:.3}", guess.name(), guess.score);
                }
                println!(
                    "out of key: {:.1}%",
                    out_of_key_ratio(histogram, &key) * 100.0
                );
            }
            None => println!("no key detected"),
        },
    }

    Ok(())
}

/// Grade a voicing against a target chord
pub fn check(config: &ChordwiseConfig, target: &str, names: &[String], output: Output) -> Result<()> {
    let target = Chord::lookup(target).with_context(|| format!("looking up {:?}", target))?;
    let played = parse_notes(names).context("parsing notes")?;

    let analyzer = HeuristicAnalyzer::from_config(config);
    let result = analyzer.evaluate(&played, &target)?;

    match output {
        Output::Json => {
            print_json(&json!({
                "target": target,
                "played": played,
                "evaluation": result,
            }))?;
        }
        Output::Text => {
            let performed = &result.performed;
            println!("target:   {}", target);
            println!("played:   {}", note_list(&played));
            println!("correct:  {}", if result.correct { "yes" } else { "no" });
            println!("root:     {}", performed.root);
            println!(
                "bass:     {}",
                performed.bass.map_or_else(|| "-".to_string(), |b| b.to_string())
            );
            println!("missing:  {}", note_list(&performed.missing));
            println!("extra:    {}", note_list(&performed.accidentals));
            println!("goal:     {}", note_list(&result.goal_notes));
        }
    }

    Ok(())
}

/// List chord archetypes
pub fn chords(triad: Option<&str>, output: Output) -> Result<()> {
    let triad = match triad {
        Some(name) => match TriadName::parse(name) {
            Some(triad) => Some(triad),
            None => bail!(
                "Unknown triad: '{}'\n\nKnown triads: {}",
                name,
                TriadName::ALL
                    .iter()
                    .map(|t| t.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        },
        None => None,
    };

    let archetypes: Vec<_> = ARCHETYPES
        .iter()
        .filter(|a| triad.map_or(true, |t| a.triad == t))
        .collect();

    match output {
        Output::Json => {
            let rows: Vec<_> = archetypes
                .iter()
                .map(|a| {
                    json!({
                        "names": a.names,
                        "triad": a.triad,
                        "extensions": a.extensions,
                    })
                })
                .collect();
            print_json(&json!(rows))?;
        }
        Output::Text => {
            for archetype in archetypes {
                let extensions: Vec<String> = archetype
                    .extensions
                    .iter()
                    .map(|e| name_interval(*e as i32))
                    .collect();
                let mut line = format!(
                    "{:<18} [{}]",
                    archetype.names.join(", "),
                    archetype.triad
                );
                if !extensions.is_empty() {
                    line.push_str(&format!(" + {}", extensions.join(", ")));
                }
                println!("{}", line);
            }
        }
    }

    Ok(())
}

/// Print the effective configuration
pub fn config(config: &ChordwiseConfig, sources: &ConfigSources, output: Output) -> Result<()> {
    match output {
        Output::Json => {
            print_json(&json!({
                "config": config,
                "files": sources.files,
                "env_overrides": sources.env_overrides,
            }))?;
        }
        Output::Text => {
            print!("{}", config.to_toml());
            println!();
            if sources.files.is_empty() {
                println!("# no config files loaded, using defaults");
            }
            for file in &sources.files {
                println!("# loaded: {}", file.display());
            }
            for var in &sources.env_overrides {
                println!("# env override: {}", var);
            }
        }
    }
    Ok(())
}
