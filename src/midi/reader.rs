//! Standard MIDI File (SMF) parsing.
//!
//! Parses a byte buffer into a [`MidiFile`]. Supports SMF formats 0, 1 and 2.
//!
//! # Leniency
//!
//! - A track whose end-of-track event comes before its declared chunk length
//!   is reported as a `TrackLengthMismatch` warning; the declared length wins
//!   and the remaining bytes are skipped.
//! - A track without an end-of-track event is accepted as-is.
//! - Channel data bytes with the top bit set are masked to 7 bits.
//! - Meta and SysEx events neither use nor reset running status.

use super::error::{MidiError, Result};
use super::event::{data_length, Event, ESCAPE_STATUS, META_STATUS, SYSEX_STATUS};
use super::{varint, MidiFile, Track};

/// Size of the fixed header fields (format, track count, division).
const HEADER_FIELDS_LENGTH: usize = 6;

/// Bounds-checked forward reader over a byte slice.
///
/// `base` is the absolute file offset of `data[0]`, used in error reports.
struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
    base: usize,
}

impl<'a> Cursor<'a> {
    fn new(data: &'a [u8], base: usize) -> Self {
        Self { data, pos: 0, base }
    }

    /// Absolute file offset of the next unread byte.
    fn offset(&self) -> usize {
        self.base + self.pos
    }

    fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    fn peek(&self, what: &'static str) -> Result<u8> {
        self.data
            .get(self.pos)
            .copied()
            .ok_or(MidiError::TruncatedInput(what))
    }

    fn take(&mut self, len: usize, what: &'static str) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|&end| end <= self.data.len())
            .ok_or(MidiError::TruncatedInput(what))?;
        let bytes = &self.data[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    fn read_u8(&mut self, what: &'static str) -> Result<u8> {
        let byte = self.peek(what)?;
        self.pos += 1;
        Ok(byte)
    }

    fn read_u16(&mut self, what: &'static str) -> Result<u16> {
        let bytes = self.take(2, what)?;
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    fn read_u32(&mut self, what: &'static str) -> Result<u32> {
        let bytes = self.take(4, what)?;
        Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn read_varint(&mut self) -> Result<u32> {
        let (value, consumed) = varint::decode(self.data, self.pos)?;
        self.pos += consumed;
        Ok(value)
    }

    /// Reads a VLQ length followed by that many bytes.
    fn read_length_prefixed(&mut self, what: &'static str) -> Result<&'a [u8]> {
        let len = self.read_varint()? as usize;
        self.take(len, what)
    }
}

impl MidiFile {
    /// Parses a complete Standard MIDI File from memory.
    ///
    /// Recoverable problems are logged and otherwise ignored; use
    /// [`MidiFile::parse_with_warnings`] to inspect them.
    ///
    /// # Errors
    ///
    /// Returns `BadHeader`, `TruncatedInput` or `InvalidStatusByte` when the
    /// data cannot be parsed.
    pub fn parse(data: &[u8]) -> Result<MidiFile> {
        Self::parse_with_warnings(data).map(|(file, _)| file)
    }

    /// Parses a complete Standard MIDI File, also returning the recoverable
    /// problems found along the way.
    ///
    /// The only warning currently produced is `TrackLengthMismatch`.
    pub fn parse_with_warnings(data: &[u8]) -> Result<(MidiFile, Vec<MidiError>)> {
        let mut cursor = Cursor::new(data, 0);
        let mut warnings = Vec::new();

        let magic = cursor.take(4, "header chunk magic")?;
        if magic != b"MThd" {
            return Err(MidiError::BadHeader(format!(
                "expected MThd, found {:02X?}",
                magic
            )));
        }

        let header_length = cursor.read_u32("header chunk length")? as usize;
        if header_length < HEADER_FIELDS_LENGTH {
            return Err(MidiError::BadHeader(format!(
                "header chunk length {} is shorter than {}",
                header_length, HEADER_FIELDS_LENGTH
            )));
        }

        let format = cursor.read_u16("format")?;
        if format > 2 {
            return Err(MidiError::BadHeader(format!("unknown format {}", format)));
        }
        let track_count = cursor.read_u16("track count")?;
        let division = cursor.read_u16("division")?;

        // Newer revisions may extend the header; skip what we don't know
        cursor.take(header_length - HEADER_FIELDS_LENGTH, "header chunk")?;

        let mut tracks = Vec::with_capacity(track_count as usize);
        for index in 0..track_count as usize {
            let magic = cursor.take(4, "track chunk magic")?;
            if magic != b"MTrk" {
                return Err(MidiError::BadHeader(format!(
                    "track {}: expected MTrk, found {:02X?}",
                    index, magic
                )));
            }
            let length = cursor.read_u32("track chunk length")? as usize;
            let base = cursor.offset();
            let body = cursor.take(length, "track chunk")?;
            tracks.push(parse_track(index, body, base, &mut warnings)?);
        }

        if !cursor.is_empty() {
            tracing::debug!(
                "ignoring {} trailing bytes after the last track",
                data.len() - cursor.offset()
            );
        }

        let file = MidiFile {
            format,
            division,
            tracks,
        };
        tracing::debug!(
            "parsed format {} file with {} tracks, {} events",
            file.format,
            file.tracks.len(),
            file.event_count()
        );

        Ok((file, warnings))
    }
}

/// Parses the event stream of one track chunk.
///
/// Stops at the end of `body` or at the first end-of-track event, whichever
/// comes first.
fn parse_track(
    index: usize,
    body: &[u8],
    base: usize,
    warnings: &mut Vec<MidiError>,
) -> Result<Track> {
    let mut cursor = Cursor::new(body, base);
    let mut running_status: Option<u8> = None;
    let mut track = Track::new();
    let mut ended = false;

    while !cursor.is_empty() {
        let delta_time = cursor.read_varint()?;
        let event = read_event(&mut cursor, &mut running_status)?;
        let is_end = event.is_end_of_track();
        track.push(delta_time, event);
        if is_end {
            ended = true;
            break;
        }
    }

    if !cursor.is_empty() {
        let mismatch = MidiError::TrackLengthMismatch {
            track: index,
            declared: body.len(),
            consumed: cursor.pos,
        };
        tracing::warn!("{}", mismatch);
        warnings.push(mismatch);
    } else if !ended {
        tracing::warn!("track {}: missing end of track event", index);
    }

    tracing::debug!("track {}: {} events", index, track.len());
    Ok(track)
}

/// Reads one event (without its delta time), applying running status.
fn read_event(cursor: &mut Cursor<'_>, running_status: &mut Option<u8>) -> Result<Event> {
    let offset = cursor.offset();
    let first = cursor.peek("status byte")?;

    let status = if first & 0x80 == 0 {
        // Running status: the byte is data, reuse the previous status
        running_status.ok_or(MidiError::InvalidStatusByte {
            byte: first,
            offset,
        })?
    } else {
        cursor.read_u8("status byte")?
    };

    match status {
        0x80..=0xEF => {
            *running_status = Some(status);
            let data = cursor.take(data_length(status), "channel message data")?;
            Ok(Event::from_channel_message(status, data))
        }
        META_STATUS => {
            let meta_type = cursor.read_u8("meta event type")?;
            let payload = cursor.read_length_prefixed("meta event payload")?;
            Ok(Event::Meta {
                meta_type,
                payload: payload.to_vec(),
            })
        }
        SYSEX_STATUS => {
            let payload = cursor.read_length_prefixed("sysex payload")?;
            Ok(Event::SysEx {
                payload: payload.to_vec(),
            })
        }
        ESCAPE_STATUS => {
            let payload = cursor.read_length_prefixed("escape payload")?;
            Ok(Event::Escape {
                payload: payload.to_vec(),
            })
        }
        // System common and realtime messages cannot appear in a file
        _ => Err(MidiError::InvalidStatusByte {
            byte: status,
            offset,
        }),
    }
}
