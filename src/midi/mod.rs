//! Standard MIDI File codec and note-level interpretation.
//!
//! This module provides the container types for a parsed file (header fields
//! plus tracks of timed events), the binary reader and writer, note
//! reconstruction, and the note-notation front end used to synthesize files.

mod builder;
mod error;
mod event;
mod notation;
mod note;
mod reader;
mod writer;

pub mod varint;

pub use builder::{build_from_notation, BuildOptions};
pub use error::{MidiError, Result};
pub use event::{
    data_length, is_channel_status, meta_type_name, Event, TimedEvent, ESCAPE_STATUS,
    META_END_OF_TRACK, META_SET_TEMPO, META_TRACK_NAME, META_STATUS, SYSEX_STATUS,
};
pub use notation::{parse_notation, Chord, DEFAULT_DURATION_CODE};
pub use note::{reconstruct_notes, track_notes, Note};

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Standard MIDI note names for display purposes.
/// Maps MIDI note number (0-127) to note name within an octave.
pub const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Number of distinct MIDI pitches.
pub const PITCH_COUNT: usize = 128;

/// Number of MIDI channels.
pub const CHANNEL_COUNT: usize = 16;

/// Converts a MIDI note number to a human-readable note name with octave.
///
/// # Examples
///
/// ```
/// use midihelper::midi::note_to_name;
///
/// let name = note_to_name(60); // Middle C
/// assert_eq!(name, "C4");
/// ```
pub fn note_to_name(note: u8) -> String {
    let octave = (note / 12) as i8 - 1; // MIDI octave convention
    let note_index = (note % 12) as usize;
    format!("{}{}", NOTE_NAMES[note_index], octave)
}

/// An ordered stream of timed events with its own clock starting at 0.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    /// Events in playback order.
    pub events: Vec<TimedEvent>,
}

impl Track {
    /// Creates an empty track.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an event after `delta_time` ticks.
    pub fn push(&mut self, delta_time: u32, event: Event) {
        self.events.push(TimedEvent::new(delta_time, event));
    }

    /// Number of events in the track.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Returns true if the track holds no events.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Iterates over the events in order.
    pub fn iter(&self) -> std::slice::Iter<'_, TimedEvent> {
        self.events.iter()
    }

    /// Returns true if the last event is an end-of-track meta event.
    pub fn ends_with_end_of_track(&self) -> bool {
        self.events
            .last()
            .is_some_and(|e| e.event.is_end_of_track())
    }
}

impl From<Vec<TimedEvent>> for Track {
    fn from(events: Vec<TimedEvent>) -> Self {
        Self { events }
    }
}

impl<'a> IntoIterator for &'a Track {
    type Item = &'a TimedEvent;
    type IntoIter = std::slice::Iter<'a, TimedEvent>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.iter()
    }
}

/// A complete Standard MIDI File.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MidiFile {
    /// SMF format: 0 (single track), 1 (parallel tracks) or 2 (sequential).
    pub format: u16,

    /// Raw division word from the header. With the top bit clear this is the
    /// number of ticks per quarter note; with it set it is an SMPTE division,
    /// which is stored but not interpreted.
    pub division: u16,

    /// Tracks in file order.
    pub tracks: Vec<Track>,
}

impl MidiFile {
    /// Creates an empty file with metrical timing.
    pub fn new(format: u16, ticks_per_beat: u16) -> Self {
        Self {
            format,
            division: ticks_per_beat & 0x7FFF,
            tracks: Vec::new(),
        }
    }

    /// Ticks per quarter note, or None for SMPTE timing.
    pub fn ticks_per_beat(&self) -> Option<u16> {
        if self.division & 0x8000 == 0 {
            Some(self.division)
        } else {
            None
        }
    }

    /// Total number of events across all tracks.
    pub fn event_count(&self) -> usize {
        self.tracks.iter().map(Track::len).sum()
    }
}

/// Reads and parses a MIDI file from disk.
///
/// # Errors
///
/// Returns `Io` if the file cannot be read, or any fatal parse error.
pub fn read_file<P: AsRef<Path>>(path: P) -> Result<MidiFile> {
    let data = fs::read(path)?;
    MidiFile::parse(&data)
}

/// Serializes a MIDI file and writes it to disk.
///
/// The whole file is encoded in memory first, so nothing is written when
/// encoding fails.
///
/// # Errors
///
/// Returns `ValueTooLarge` if an event cannot be encoded, or `Io` if the
/// file cannot be written.
pub fn write_file<P: AsRef<Path>>(path: P, file: &MidiFile) -> Result<()> {
    let data = file.to_bytes()?;
    fs::write(path, data)?;
    Ok(())
}
