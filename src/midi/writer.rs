//! Standard MIDI File (SMF) serialization.
//!
//! # Format Details
//!
//! - Header chunk: `MThd`, length 6, format, track count, division
//! - One `MTrk` chunk per track with an exact byte length
//! - Channel voice events use running status: the status byte is omitted
//!   when it equals the status of the immediately preceding event
//! - Meta and SysEx events always carry their status byte and clear running
//!   status
//! - Every track ends with an end-of-track meta event, appended if missing

use super::error::{MidiError, Result};
use super::event::{Event, TimedEvent};
use super::{varint, MidiFile, Track};

impl MidiFile {
    /// Serializes the file into a byte buffer.
    ///
    /// # Errors
    ///
    /// Returns `ValueTooLarge` if a delta time or payload length does not fit
    /// in a variable-length quantity, or if there are more than 65535 tracks.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let track_count = u16::try_from(self.tracks.len())
            .map_err(|_| MidiError::ValueTooLarge(self.tracks.len() as u64))?;

        let mut buffer = Vec::new();

        // Header chunk (MThd)
        buffer.extend_from_slice(b"MThd");
        buffer.extend_from_slice(&6u32.to_be_bytes());
        buffer.extend_from_slice(&self.format.to_be_bytes());
        buffer.extend_from_slice(&track_count.to_be_bytes());
        buffer.extend_from_slice(&self.division.to_be_bytes());

        for track in &self.tracks {
            let track_data = build_track_data(track)?;
            write_track_chunk(&mut buffer, &track_data)?;
        }

        tracing::debug!(
            "serialized {} tracks into {} bytes",
            self.tracks.len(),
            buffer.len()
        );
        Ok(buffer)
    }
}

/// Encodes one event with its delta time, updating `running_status`.
fn write_event(
    timed: &TimedEvent,
    running_status: &mut Option<u8>,
    buffer: &mut Vec<u8>,
) -> Result<()> {
    varint::write(timed.delta_time, buffer)?;

    let status = timed.event.status();
    if timed.event.is_channel_voice() {
        if *running_status != Some(status) {
            buffer.push(status);
            *running_status = Some(status);
        }
    } else {
        buffer.push(status);
        *running_status = None;
    }

    timed.event.write_body(buffer)
}

/// Builds the event stream of a track chunk.
fn build_track_data(track: &Track) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    let mut running_status = None;

    for timed in track {
        write_event(timed, &mut running_status, &mut buffer)?;
    }

    if !track.ends_with_end_of_track() {
        let end = TimedEvent::new(0, Event::end_of_track());
        write_event(&end, &mut running_status, &mut buffer)?;
    }

    Ok(buffer)
}

/// Appends a track chunk (MTrk header, exact length, data) to the output.
fn write_track_chunk(buffer: &mut Vec<u8>, track_data: &[u8]) -> Result<()> {
    let length = u32::try_from(track_data.len())
        .map_err(|_| MidiError::ValueTooLarge(track_data.len() as u64))?;
    buffer.extend_from_slice(b"MTrk");
    buffer.extend_from_slice(&length.to_be_bytes());
    buffer.extend_from_slice(track_data);
    Ok(())
}
