//! midihelper - inspect and create Standard MIDI Files.
//!
//! The library holds the SMF codec (variable-length quantities, events,
//! reader, writer), note reconstruction, the note-notation front end, and the
//! percent-token formatting used by the command-line tool.

pub mod format;
pub mod midi;

// Re-export commonly used types
pub use format::{format_event, format_note, EventFilter};
pub use midi::{
    build_from_notation, parse_notation, read_file, reconstruct_notes, write_file, BuildOptions,
    Chord, Event, MidiError, MidiFile, Note, TimedEvent, Track,
};
