//! midihelper - command-line helper for Standard MIDI Files.
//!
//! # Usage
//!
//! ```bash
//! midihelper show song.mid                          # every event, default format
//! midihelper show song.mid --filter note_on,note_off --format "%T %t"
//! midihelper notes song.mid --format "%s %l %n"     # reconstructed notes
//! midihelper create "c e g ceg1" out.mid            # notation to MIDI file
//! ```
//!
//! Set `RUST_LOG=debug` to see parse and write diagnostics on stderr.

use anyhow::{bail, Context, Result};
use midihelper::format::{DEFAULT_EVENT_FORMAT, DEFAULT_NOTE_FORMAT};
use midihelper::{
    build_from_notation, format_event, format_note, parse_notation, read_file, reconstruct_notes,
    write_file, BuildOptions, EventFilter,
};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

const USAGE: &str = "\
midihelper - inspect and create Standard MIDI Files

Usage:
  midihelper show FILE [--format FMT] [--filter TYPES] [--json]
  midihelper notes FILE [--format FMT] [--json]
  midihelper create NOTATION OUTPUT [--beat-duration TICKS] [--velocity VEL]

Options:
  --format FMT          Output template (show: \"[%x] dt=%T %d\", notes: \"%s %l %c %p %i\")
  --filter TYPES        Comma-separated event types to show, or * for all (default *)
  --json                Print JSON instead of formatted lines
  --beat-duration TICKS Ticks per quarter-note duration code (default 600)
  --velocity VEL        Note-on velocity 0-127 (default 100)
  -h, --help            Print this help message

Event tokens: %b bytes, %x hex, %T delta time, %t type, %d fields
Note tokens:  %s start, %l duration, %e end, %c channel, %p pitch, %n name, %i instrument";

/// The selected subcommand with its arguments.
#[derive(Debug, PartialEq)]
enum Command {
    /// Print every (filtered) event of a file.
    Show {
        path: PathBuf,
        format: String,
        filter: EventFilter,
        json: bool,
    },
    /// Print the notes reconstructed from a file.
    Notes {
        path: PathBuf,
        format: String,
        json: bool,
    },
    /// Write a file built from note notation.
    Create {
        notation: String,
        output: PathBuf,
        options: BuildOptions,
    },
    /// Print usage.
    Help,
}

/// Command-line options for the application.
struct CliOptions {
    command: Command,
}

impl CliOptions {
    /// Parses the process arguments.
    fn parse() -> Result<Self> {
        let args: Vec<String> = std::env::args().skip(1).collect();
        Self::parse_from(&args)
    }

    fn help() -> Self {
        Self {
            command: Command::Help,
        }
    }

    /// Parses arguments (without the program name).
    ///
    /// Supports:
    /// - `show FILE [--format FMT] [--filter TYPES] [--json]`
    /// - `notes FILE [--format FMT] [--json]`
    /// - `create NOTATION OUTPUT [--beat-duration TICKS] [--velocity VEL]`
    /// - `--help` or `-h` in place of the subcommand or any option
    fn parse_from(args: &[String]) -> Result<Self> {
        if args.is_empty() || is_help(&args[0]) {
            return Ok(Self::help());
        }

        let subcommand = args[0].as_str();
        let mut positional: Vec<&str> = Vec::new();
        let mut format: Option<String> = None;
        let mut filter = EventFilter::All;
        let mut json = false;
        let mut options = BuildOptions::default();
        let mut i = 1;

        while i < args.len() {
            let arg = args[i].as_str();
            match arg {
                _ if is_help(arg) => return Ok(Self::help()),
                "--json" => json = true,
                "--format" | "--filter" | "--beat-duration" | "--velocity" => {
                    i += 1;
                    let Some(value) = args.get(i) else {
                        bail!("{} requires a value", arg);
                    };
                    match arg {
                        "--format" => format = Some(value.clone()),
                        "--filter" => filter = EventFilter::parse(value),
                        "--beat-duration" => {
                            options.beat_duration = value
                                .parse()
                                .with_context(|| format!("invalid beat duration: {}", value))?;
                        }
                        _ => {
                            let velocity: u8 = value
                                .parse()
                                .with_context(|| format!("invalid velocity: {}", value))?;
                            if velocity > 127 {
                                bail!("velocity must be between 0 and 127, got {}", velocity);
                            }
                            options.velocity = velocity;
                        }
                    }
                }
                other if other.starts_with("--") => {
                    bail!("unknown option: {} (use --help for usage)", other)
                }
                other => positional.push(other),
            }
            i += 1;
        }

        let command = match (subcommand, positional.as_slice()) {
            ("show", [path]) => Command::Show {
                path: PathBuf::from(*path),
                format: format.unwrap_or_else(|| DEFAULT_EVENT_FORMAT.to_string()),
                filter,
                json,
            },
            ("notes", [path]) => Command::Notes {
                path: PathBuf::from(*path),
                format: format.unwrap_or_else(|| DEFAULT_NOTE_FORMAT.to_string()),
                json,
            },
            ("create", [notation, output]) => Command::Create {
                notation: notation.to_string(),
                output: PathBuf::from(*output),
                options,
            },
            ("show" | "notes" | "create", _) => {
                bail!("wrong number of arguments for {} (use --help for usage)", subcommand)
            }
            (other, _) => bail!("unknown command: {} (use --help for usage)", other),
        };

        Ok(Self { command })
    }
}

fn is_help(arg: &str) -> bool {
    arg == "--help" || arg == "-h"
}

/// Prints the events of a file, one line per event.
fn show(path: &Path, format: &str, filter: &EventFilter, json: bool) -> Result<()> {
    let file =
        read_file(path).with_context(|| format!("Failed to read MIDI file: {}", path.display()))?;

    let mut out = BufWriter::new(io::stdout().lock());
    if json {
        let events: Vec<_> = file
            .tracks
            .iter()
            .flat_map(|t| t.iter())
            .filter(|e| filter.matches(e))
            .collect();
        serde_json::to_writer_pretty(&mut out, &events).context("Failed to write JSON")?;
        writeln!(out)?;
    } else {
        for event in file.tracks.iter().flat_map(|t| t.iter()) {
            if filter.matches(event) {
                writeln!(out, "{}", format_event(format, event)?)?;
            }
        }
    }
    out.flush()?;
    Ok(())
}

/// Prints the reconstructed notes of a file in start order.
fn notes(path: &Path, format: &str, json: bool) -> Result<()> {
    let file =
        read_file(path).with_context(|| format!("Failed to read MIDI file: {}", path.display()))?;
    let notes = reconstruct_notes(&file);

    let mut out = BufWriter::new(io::stdout().lock());
    if json {
        serde_json::to_writer_pretty(&mut out, &notes).context("Failed to write JSON")?;
        writeln!(out)?;
    } else {
        for note in &notes {
            writeln!(out, "{}", format_note(format, note))?;
        }
    }
    out.flush()?;
    Ok(())
}

/// Parses notation, builds the file in memory, then writes it out.
fn create(notation: &str, output: &Path, options: &BuildOptions) -> Result<()> {
    let chords = parse_notation(notation).context("Failed to parse note notation")?;
    let file = build_from_notation(&chords, options).context("Failed to build MIDI file")?;
    write_file(output, &file)
        .with_context(|| format!("Failed to write MIDI file: {}", output.display()))?;
    tracing::info!(
        "wrote {} chords to {}",
        chords.len(),
        output.display()
    );
    Ok(())
}

/// Main entry point.
fn main() -> Result<()> {
    let cli = CliOptions::parse()?;

    // Diagnostics go to stderr so stdout stays clean for formatted output
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    match &cli.command {
        Command::Show {
            path,
            format,
            filter,
            json,
        } => show(path, format, filter, *json),
        Command::Notes { path, format, json } => notes(path, format, *json),
        Command::Create {
            notation,
            output,
            options,
        } => create(notation, output, options),
        Command::Help => {
            println!("{}", USAGE);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Command> {
        let args: Vec<String> = args.iter().map(|s| s.to_string()).collect();
        CliOptions::parse_from(&args).map(|cli| cli.command)
    }

    #[test]
    fn test_show_defaults() {
        assert_eq!(
            parse(&["show", "song.mid"]).unwrap(),
            Command::Show {
                path: PathBuf::from("song.mid"),
                format: DEFAULT_EVENT_FORMAT.to_string(),
                filter: EventFilter::All,
                json: false,
            }
        );
    }

    #[test]
    fn test_show_options() {
        assert_eq!(
            parse(&["show", "--filter", "note_on", "song.mid", "--format", "%t"]).unwrap(),
            Command::Show {
                path: PathBuf::from("song.mid"),
                format: "%t".to_string(),
                filter: EventFilter::Types(vec!["note_on".to_string()]),
                json: false,
            }
        );
    }

    #[test]
    fn test_create_options() {
        assert_eq!(
            parse(&["create", "c e g", "out.mid", "--velocity", "80"]).unwrap(),
            Command::Create {
                notation: "c e g".to_string(),
                output: PathBuf::from("out.mid"),
                options: BuildOptions {
                    velocity: 80,
                    ..BuildOptions::default()
                },
            }
        );
    }

    #[test]
    fn test_errors() {
        assert!(parse(&["show"]).is_err());
        assert!(parse(&["play", "x.mid"]).is_err());
        assert!(parse(&["create", "c", "out.mid", "--velocity", "200"]).is_err());
        assert!(parse(&["notes", "x.mid", "--format"]).is_err());
        assert!(parse(&["notes", "x.mid", "--bogus"]).is_err());
    }

    #[test]
    fn test_help() {
        assert_eq!(parse(&[]).unwrap(), Command::Help);
        assert_eq!(parse(&["show", "-h"]).unwrap(), Command::Help);
        assert_eq!(parse(&["--help"]).unwrap(), Command::Help);
    }

    #[test]
    fn test_help_flag_as_option_value() {
        assert_eq!(
            parse(&["show", "x.mid", "--format", "-h"]).unwrap(),
            Command::Show {
                path: PathBuf::from("x.mid"),
                format: "-h".to_string(),
                filter: EventFilter::All,
                json: false,
            }
        );
    }
}
