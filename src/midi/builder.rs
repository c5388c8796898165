//! Builds a one-track MIDI file from parsed note notation.
//!
//! Each chord becomes a block of simultaneous note-ons followed by note-offs
//! after the chord's duration. The first note-off carries the whole elapsed
//! time; the rest follow at delta 0.

use super::error::{MidiError, Result};
use super::event::Event;
use super::notation::Chord;
use super::{varint, MidiFile, Track};

/// Settings for [`build_from_notation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildOptions {
    /// Ticks in a quarter note's worth of sound. A chord with duration code
    /// `d` lasts `beat_duration * 4 / d` ticks (truncating).
    pub beat_duration: u32,
    /// Note-on velocity (0-127).
    pub velocity: u8,
    /// Division written into the header.
    pub ticks_per_beat: u16,
    /// Channel all notes are written on (0-15).
    pub channel: u8,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            beat_duration: 600,
            velocity: 100,
            ticks_per_beat: 480,
            channel: 0,
        }
    }
}

/// Builds a format 1 file with a single track playing `chords` in order.
///
/// The track ends with an explicit end-of-track event.
///
/// # Errors
///
/// Returns `ValueTooLarge` if a chord's duration does not fit in a delta time.
pub fn build_from_notation(chords: &[Chord], options: &BuildOptions) -> Result<MidiFile> {
    let channel = options.channel & 0x0F;
    let velocity = options.velocity & 0x7F;
    let mut track = Track::new();

    for chord in chords {
        let ticks = options.beat_duration as u64 * 4 / chord.duration_code.max(1) as u64;
        let duration = u32::try_from(ticks)
            .ok()
            .filter(|&d| d <= varint::MAX_VALUE)
            .ok_or(MidiError::ValueTooLarge(ticks))?;

        for &pitch in &chord.pitches {
            track.push(
                0,
                Event::NoteOn {
                    channel,
                    pitch,
                    velocity,
                },
            );
        }

        for (i, &pitch) in chord.pitches.iter().enumerate() {
            let delta_time = if i == 0 { duration } else { 0 };
            track.push(
                delta_time,
                Event::NoteOff {
                    channel,
                    pitch,
                    velocity: 0,
                },
            );
        }
    }

    track.push(0, Event::end_of_track());

    tracing::debug!(
        "built {} chords into {} events",
        chords.len(),
        track.len()
    );

    let mut file = MidiFile::new(1, options.ticks_per_beat);
    file.tracks.push(track);
    Ok(file)
}
