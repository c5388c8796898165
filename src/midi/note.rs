//! Note reconstruction from event streams.
//!
//! A note is derived from a note-on/note-off pair in one track, tagged with
//! the instrument (program) selected on its channel at the time it ended.

use super::event::Event;
use super::{MidiFile, Track, CHANNEL_COUNT, PITCH_COUNT};
use serde::{Deserialize, Serialize};

/// A single sounding note with tick-based timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    /// MIDI channel (0-15).
    pub channel: u8,

    /// MIDI note number (0-127). 60 = Middle C (C4).
    pub pitch: u8,

    /// Program number active on the channel when the note was closed.
    pub instrument: u8,

    /// Start time in ticks from the beginning of the track.
    pub start_tick: u64,

    /// Duration in ticks. Always greater than zero.
    pub duration_ticks: u64,
}

impl Note {
    /// Returns the end tick of this note (start + duration).
    pub fn end_tick(&self) -> u64 {
        self.start_tick.saturating_add(self.duration_ticks)
    }
}

/// Per-track reconstruction state. Reset for every track.
struct TrackState {
    /// Absolute tick of the current event.
    clock: u64,
    /// Tick at which each pitch was last turned on, if it is sounding.
    note_start: [Option<u64>; PITCH_COUNT],
    /// Last program selected on each channel.
    channel_instrument: [u8; CHANNEL_COUNT],
}

impl TrackState {
    fn new() -> Self {
        Self {
            clock: 0,
            note_start: [None; PITCH_COUNT],
            channel_instrument: [0; CHANNEL_COUNT],
        }
    }

    /// Closes the note sounding on `pitch`, if any, at the current tick.
    fn close(&mut self, channel: u8, pitch: u8, notes: &mut Vec<Note>) {
        let Some(start_tick) = self.note_start[pitch as usize].take() else {
            tracing::trace!("dropping note off for silent pitch {} at tick {}", pitch, self.clock);
            return;
        };

        let duration_ticks = self.clock - start_tick;
        if duration_ticks == 0 {
            return;
        }

        notes.push(Note {
            channel,
            pitch,
            instrument: self.channel_instrument[(channel & 0x0F) as usize],
            start_tick,
            duration_ticks,
        });
    }

    /// Applies one event after advancing the clock.
    fn apply(&mut self, delta_time: u32, event: &Event, notes: &mut Vec<Note>) {
        self.clock += delta_time as u64;

        match *event {
            Event::NoteOn {
                channel,
                pitch,
                velocity,
            } => {
                let pitch = pitch & 0x7F;
                if velocity == 0 {
                    // Note on with velocity 0 = note off
                    self.close(channel, pitch, notes);
                } else {
                    // Retrigger closes the sounding note at this same tick
                    if self.note_start[pitch as usize].is_some() {
                        self.close(channel, pitch, notes);
                    }
                    self.note_start[pitch as usize] = Some(self.clock);
                }
            }
            Event::NoteOff { channel, pitch, .. } => self.close(channel, pitch & 0x7F, notes),
            Event::ProgramChange { channel, program } => {
                self.channel_instrument[(channel & 0x0F) as usize] = program;
            }
            _ => {}
        }
    }
}

/// Reconstructs the notes of a single track, in the order they end.
pub fn track_notes(track: &Track) -> Vec<Note> {
    let mut state = TrackState::new();
    let mut notes = Vec::new();

    for timed in track {
        state.apply(timed.delta_time, &timed.event, &mut notes);
    }

    let dangling = state.note_start.iter().filter(|s| s.is_some()).count();
    if dangling > 0 {
        tracing::debug!("{} notes still sounding at end of track", dangling);
    }

    notes
}

/// Reconstructs all notes of a file, ordered by start tick.
///
/// Each track is replayed independently with its own clock, sounding-note
/// table, and channel instruments. Notes starting on the same tick keep
/// their relative order of emission.
pub fn reconstruct_notes(file: &MidiFile) -> Vec<Note> {
    let mut notes: Vec<Note> = file.tracks.iter().flat_map(track_notes).collect();
    notes.sort_by_key(|n| n.start_tick);
    notes
}
