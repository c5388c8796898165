//! MIDI event representation.
//!
//! Events carry their own data but not their timing; a [`TimedEvent`] pairs an
//! event with the delta time that precedes it in a track.

use super::error::Result;
use super::varint;
use serde::{Deserialize, Serialize};

/// Status byte introducing a meta event.
pub const META_STATUS: u8 = 0xFF;
/// Status byte introducing a System Exclusive message.
pub const SYSEX_STATUS: u8 = 0xF0;
/// Status byte introducing an escape sequence (SysEx continuation).
pub const ESCAPE_STATUS: u8 = 0xF7;

/// Meta event type for end-of-track.
pub const META_END_OF_TRACK: u8 = 0x2F;
/// Meta event type for tempo changes (microseconds per quarter note).
pub const META_SET_TEMPO: u8 = 0x51;
/// Meta event type for track names.
pub const META_TRACK_NAME: u8 = 0x03;

/// Number of data bytes following each channel voice status nibble (0x8..=0xE).
///
/// Indexed by the high nibble of the status byte. Entries below 0x8 and 0xF
/// are unused.
const DATA_LENGTH_BY_STATUS: [usize; 16] = [0, 0, 0, 0, 0, 0, 0, 0, 2, 2, 2, 2, 1, 1, 2, 0];

/// Returns how many data bytes follow a channel voice status byte.
pub fn data_length(status: u8) -> usize {
    DATA_LENGTH_BY_STATUS[(status >> 4) as usize]
}

/// Returns true if `status` is a channel voice status byte (0x80..=0xEF).
pub fn is_channel_status(status: u8) -> bool {
    (0x80..=0xEF).contains(&status)
}

/// A single MIDI event as stored in a track.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    /// Note on: channel, pitch, velocity. Velocity 0 acts as a note off.
    NoteOn { channel: u8, pitch: u8, velocity: u8 },
    /// Note off: channel, pitch, release velocity
    NoteOff { channel: u8, pitch: u8, velocity: u8 },
    /// Program change: channel, program number
    ProgramChange { channel: u8, program: u8 },
    /// Control change: channel, controller, value
    ControlChange { channel: u8, controller: u8, value: u8 },
    /// Any other channel voice message (aftertouch, pitch bend), kept with its
    /// full status byte and raw data bytes.
    ChannelVoice { status: u8, data: Vec<u8> },
    /// Meta event: type byte and payload (without the length prefix)
    Meta { meta_type: u8, payload: Vec<u8> },
    /// System Exclusive message. The payload excludes the leading 0xF0.
    SysEx { payload: Vec<u8> },
    /// Escape sequence. The payload excludes the leading 0xF7.
    Escape { payload: Vec<u8> },
}

impl Event {
    /// Builds a channel voice event from a status byte and its data bytes.
    ///
    /// `data` must hold at least [`data_length`]`(status)` bytes; they are
    /// masked to 7 bits.
    pub fn from_channel_message(status: u8, data: &[u8]) -> Self {
        let channel = status & 0x0F;
        let d0 = data.first().copied().unwrap_or(0) & 0x7F;
        let d1 = data.get(1).copied().unwrap_or(0) & 0x7F;
        match status >> 4 {
            0x8 => Event::NoteOff {
                channel,
                pitch: d0,
                velocity: d1,
            },
            0x9 => Event::NoteOn {
                channel,
                pitch: d0,
                velocity: d1,
            },
            0xB => Event::ControlChange {
                channel,
                controller: d0,
                value: d1,
            },
            0xC => Event::ProgramChange {
                channel,
                program: d0,
            },
            _ => Event::ChannelVoice {
                status,
                data: [d0, d1][..data_length(status)].to_vec(),
            },
        }
    }

    /// Creates an end-of-track meta event.
    pub fn end_of_track() -> Self {
        Event::Meta {
            meta_type: META_END_OF_TRACK,
            payload: Vec::new(),
        }
    }

    /// Returns true for the end-of-track meta event.
    pub fn is_end_of_track(&self) -> bool {
        matches!(
            self,
            Event::Meta {
                meta_type: META_END_OF_TRACK,
                ..
            }
        )
    }

    /// Returns true for channel voice events, the only kind that may use
    /// running status.
    pub fn is_channel_voice(&self) -> bool {
        is_channel_status(self.status())
    }

    /// Returns the status byte that introduces this event on the wire.
    pub fn status(&self) -> u8 {
        match self {
            Event::NoteOff { channel, .. } => 0x80 | (channel & 0x0F),
            Event::NoteOn { channel, .. } => 0x90 | (channel & 0x0F),
            Event::ControlChange { channel, .. } => 0xB0 | (channel & 0x0F),
            Event::ProgramChange { channel, .. } => 0xC0 | (channel & 0x0F),
            Event::ChannelVoice { status, .. } => *status,
            Event::Meta { .. } => META_STATUS,
            Event::SysEx { .. } => SYSEX_STATUS,
            Event::Escape { .. } => ESCAPE_STATUS,
        }
    }

    /// Returns the MIDI channel (0-15) for channel voice events.
    pub fn channel(&self) -> Option<u8> {
        if self.is_channel_voice() {
            Some(self.status() & 0x0F)
        } else {
            None
        }
    }

    /// Writes everything that follows the status byte.
    ///
    /// Channel voice events write their data bytes. Meta events write the type
    /// byte, the VLQ payload length, then the payload. SysEx and escape events
    /// write the VLQ payload length, then the payload.
    ///
    /// # Errors
    ///
    /// Returns `ValueTooLarge` if a payload is too long for a VLQ length.
    pub fn write_body(&self, buffer: &mut Vec<u8>) -> Result<()> {
        match self {
            Event::NoteOn {
                pitch, velocity, ..
            }
            | Event::NoteOff {
                pitch, velocity, ..
            } => {
                buffer.push(pitch & 0x7F);
                buffer.push(velocity & 0x7F);
            }
            Event::ControlChange {
                controller, value, ..
            } => {
                buffer.push(controller & 0x7F);
                buffer.push(value & 0x7F);
            }
            Event::ProgramChange { program, .. } => buffer.push(program & 0x7F),
            Event::ChannelVoice { status, data } => {
                // Pad or cut to the fixed arity of the status
                for i in 0..data_length(*status) {
                    buffer.push(data.get(i).copied().unwrap_or(0) & 0x7F);
                }
            }
            Event::Meta { meta_type, payload } => {
                buffer.push(*meta_type);
                varint::write(varint::length_to_u32(payload.len())?, buffer)?;
                buffer.extend_from_slice(payload);
            }
            Event::SysEx { payload } | Event::Escape { payload } => {
                varint::write(varint::length_to_u32(payload.len())?, buffer)?;
                buffer.extend_from_slice(payload);
            }
        }
        Ok(())
    }

    /// Returns the event as it would appear in a file with an explicit status
    /// byte, for display.
    ///
    /// SysEx and escape events are shown as status byte plus payload, without
    /// the length prefix used in files.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut buffer = vec![self.status()];
        match self {
            Event::SysEx { payload } | Event::Escape { payload } => {
                buffer.extend_from_slice(payload)
            }
            _ => self.write_body(&mut buffer)?,
        }
        Ok(buffer)
    }

    /// Short lowercase name of the event kind, e.g. `note_on` or `set_tempo`.
    pub fn type_name(&self) -> &'static str {
        match self {
            Event::NoteOn { .. } => "note_on",
            Event::NoteOff { .. } => "note_off",
            Event::ControlChange { .. } => "control_change",
            Event::ProgramChange { .. } => "program_change",
            Event::ChannelVoice { status, .. } => match status >> 4 {
                0xA => "polytouch",
                0xD => "aftertouch",
                0xE => "pitchwheel",
                _ => "channel_voice",
            },
            Event::Meta { meta_type, .. } => meta_type_name(*meta_type),
            Event::SysEx { .. } => "sysex",
            Event::Escape { .. } => "escape",
        }
    }

    /// Ordered `(name, value)` pairs describing the event's fields.
    ///
    /// Does not include the type or the delta time; see [`TimedEvent::fields`].
    pub fn fields(&self) -> Vec<(&'static str, String)> {
        match self {
            Event::NoteOn {
                channel,
                pitch,
                velocity,
            }
            | Event::NoteOff {
                channel,
                pitch,
                velocity,
            } => vec![
                ("channel", channel.to_string()),
                ("note", pitch.to_string()),
                ("velocity", velocity.to_string()),
            ],
            Event::ControlChange {
                channel,
                controller,
                value,
            } => vec![
                ("channel", channel.to_string()),
                ("control", controller.to_string()),
                ("value", value.to_string()),
            ],
            Event::ProgramChange { channel, program } => vec![
                ("channel", channel.to_string()),
                ("program", program.to_string()),
            ],
            Event::ChannelVoice { status, data } => {
                let channel = ("channel", (status & 0x0F).to_string());
                let d0 = data.first().copied().unwrap_or(0);
                let d1 = data.get(1).copied().unwrap_or(0);
                match status >> 4 {
                    0xA => vec![
                        channel,
                        ("note", d0.to_string()),
                        ("value", d1.to_string()),
                    ],
                    0xD => vec![channel, ("value", d0.to_string())],
                    0xE => {
                        // 14-bit little-endian value, centered at 8192
                        let bend = ((d1 as i32) << 7 | d0 as i32) - 8192;
                        vec![channel, ("pitch", bend.to_string())]
                    }
                    _ => vec![channel, ("data", format!("{:?}", data))],
                }
            }
            Event::Meta { meta_type, payload } => meta_fields(*meta_type, payload),
            Event::SysEx { payload } | Event::Escape { payload } => {
                vec![("data", format!("{:?}", payload))]
            }
        }
    }
}

/// Returns the display name of a meta event type.
pub fn meta_type_name(meta_type: u8) -> &'static str {
    match meta_type {
        0x00 => "sequence_number",
        0x01 => "text",
        0x02 => "copyright",
        META_TRACK_NAME => "track_name",
        0x04 => "instrument_name",
        0x05 => "lyrics",
        0x06 => "marker",
        0x07 => "cue_marker",
        0x20 => "channel_prefix",
        0x21 => "midi_port",
        META_END_OF_TRACK => "end_of_track",
        META_SET_TEMPO => "set_tempo",
        0x54 => "smpte_offset",
        0x58 => "time_signature",
        0x59 => "key_signature",
        0x7F => "sequencer_specific",
        _ => "unknown_meta",
    }
}

/// Key names indexed by `sharps + 7` (negative counts are flats).
const MAJOR_KEYS: [&str; 15] = [
    "Cb", "Gb", "Db", "Ab", "Eb", "Bb", "F", "C", "G", "D", "A", "E", "B", "F#", "C#",
];
const MINOR_KEYS: [&str; 15] = [
    "Abm", "Ebm", "Bbm", "Fm", "Cm", "Gm", "Dm", "Am", "Em", "Bm", "F#m", "C#m", "G#m", "D#m",
    "A#m",
];

/// Decodes the well-known meta payloads; anything else is shown as raw data.
fn meta_fields(meta_type: u8, payload: &[u8]) -> Vec<(&'static str, String)> {
    match (meta_type, payload) {
        (0x00, [hi, lo]) => vec![("number", (u16::from_be_bytes([*hi, *lo])).to_string())],
        (0x01..=0x07, text) => vec![("text", String::from_utf8_lossy(text).into_owned())],
        (0x20, [channel]) => vec![("channel", channel.to_string())],
        (0x21, [port]) => vec![("port", port.to_string())],
        (META_END_OF_TRACK, []) => Vec::new(),
        (META_SET_TEMPO, [a, b, c]) => {
            let tempo = u32::from_be_bytes([0, *a, *b, *c]);
            vec![("tempo", tempo.to_string())]
        }
        (0x58, [numerator, denominator_power, clocks, thirty_seconds]) => vec![
            ("numerator", numerator.to_string()),
            (
                "denominator",
                1u32.checked_shl(*denominator_power as u32)
                    .unwrap_or(0)
                    .to_string(),
            ),
            ("clocks_per_click", clocks.to_string()),
            ("notated_32nd_notes_per_beat", thirty_seconds.to_string()),
        ],
        (0x59, [sharps, mode]) => {
            let index = (*sharps as i8) as i32 + 7;
            let keys = if *mode == 1 { &MINOR_KEYS } else { &MAJOR_KEYS };
            match usize::try_from(index).ok().and_then(|i| keys.get(i)) {
                Some(key) => vec![("key", key.to_string())],
                None => vec![("data", format!("{:?}", payload))],
            }
        }
        _ => vec![("data", format!("{:?}", payload))],
    }
}

/// An event paired with the number of ticks since the previous event in the
/// same track.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimedEvent {
    /// Ticks elapsed since the previous event in the track.
    pub delta_time: u32,
    /// The MIDI event.
    pub event: Event,
}

impl TimedEvent {
    /// Creates a new timed event.
    pub fn new(delta_time: u32, event: Event) -> Self {
        Self { delta_time, event }
    }

    /// Explicit-status byte encoding of the event.
    pub fn bytes(&self) -> Result<Vec<u8>> {
        self.event.to_bytes()
    }

    /// Uppercase hex of [`TimedEvent::bytes`], space separated (`90 3C 64`).
    pub fn hex(&self) -> Result<String> {
        Ok(self
            .bytes()?
            .iter()
            .map(|b| format!("{:02X}", b))
            .collect::<Vec<_>>()
            .join(" "))
    }

    /// Event type name; see [`Event::type_name`].
    pub fn type_name(&self) -> &'static str {
        self.event.type_name()
    }

    /// Field list for generic display: `type` first, `time` last.
    pub fn fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = vec![("type", self.type_name().to_string())];
        fields.extend(self.event.fields());
        fields.push(("time", self.delta_time.to_string()));
        fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_length() {
        assert_eq!(data_length(0x80), 2);
        assert_eq!(data_length(0x9F), 2);
        assert_eq!(data_length(0xC3), 1);
        assert_eq!(data_length(0xD0), 1);
        assert_eq!(data_length(0xE5), 2);
    }

    #[test]
    fn test_from_channel_message() {
        assert_eq!(
            Event::from_channel_message(0x93, &[60, 100]),
            Event::NoteOn {
                channel: 3,
                pitch: 60,
                velocity: 100
            }
        );
        assert_eq!(
            Event::from_channel_message(0xC1, &[5]),
            Event::ProgramChange {
                channel: 1,
                program: 5
            }
        );
        // Aftertouch kept opaque with a single data byte
        assert_eq!(
            Event::from_channel_message(0xD2, &[0x40]),
            Event::ChannelVoice {
                status: 0xD2,
                data: vec![0x40]
            }
        );
        // Top bit of data bytes is masked off
        assert_eq!(
            Event::from_channel_message(0x80, &[0xBC, 0x80]),
            Event::NoteOff {
                channel: 0,
                pitch: 60,
                velocity: 0
            }
        );
    }

    #[test]
    fn test_status_and_channel() {
        let on = Event::NoteOn {
            channel: 9,
            pitch: 36,
            velocity: 90,
        };
        assert_eq!(on.status(), 0x99);
        assert_eq!(on.channel(), Some(9));
        assert!(on.is_channel_voice());

        let eot = Event::end_of_track();
        assert_eq!(eot.status(), 0xFF);
        assert_eq!(eot.channel(), None);
        assert!(eot.is_end_of_track());
        assert!(!eot.is_channel_voice());
    }

    #[test]
    fn test_bytes_and_hex() {
        let on = TimedEvent::new(
            0,
            Event::NoteOn {
                channel: 0,
                pitch: 60,
                velocity: 100,
            },
        );
        assert_eq!(on.bytes().unwrap(), vec![0x90, 60, 100]);
        assert_eq!(on.hex().unwrap(), "90 3C 64");

        let tempo = TimedEvent::new(
            0,
            Event::Meta {
                meta_type: META_SET_TEMPO,
                payload: vec![0x07, 0xA1, 0x20],
            },
        );
        assert_eq!(tempo.hex().unwrap(), "FF 51 03 07 A1 20");

        let sysex = TimedEvent::new(
            0,
            Event::SysEx {
                payload: vec![0x7E, 0x7F, 0xF7],
            },
        );
        assert_eq!(sysex.hex().unwrap(), "F0 7E 7F F7");
    }

    #[test]
    fn test_type_names() {
        assert_eq!(Event::end_of_track().type_name(), "end_of_track");
        assert_eq!(
            Event::ChannelVoice {
                status: 0xE0,
                data: vec![0, 64]
            }
            .type_name(),
            "pitchwheel"
        );
        assert_eq!(meta_type_name(0x58), "time_signature");
        assert_eq!(meta_type_name(0x4B), "unknown_meta");
    }

    #[test]
    fn test_fields() {
        let on = TimedEvent::new(
            480,
            Event::NoteOn {
                channel: 2,
                pitch: 64,
                velocity: 80,
            },
        );
        let rendered: Vec<String> = on
            .fields()
            .into_iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect();
        assert_eq!(
            rendered,
            vec!["type=note_on", "channel=2", "note=64", "velocity=80", "time=480"]
        );
    }

    #[test]
    fn test_meta_fields() {
        let tempo = Event::Meta {
            meta_type: META_SET_TEMPO,
            payload: vec![0x07, 0xA1, 0x20],
        };
        assert_eq!(tempo.fields(), vec![("tempo", "500000".to_string())]);

        let name = Event::Meta {
            meta_type: META_TRACK_NAME,
            payload: b"Piano".to_vec(),
        };
        assert_eq!(name.fields(), vec![("text", "Piano".to_string())]);

        let time_sig = Event::Meta {
            meta_type: 0x58,
            payload: vec![6, 3, 24, 8],
        };
        assert_eq!(time_sig.fields()[1], ("denominator", "8".to_string()));

        let key_sig = Event::Meta {
            meta_type: 0x59,
            payload: vec![0xFE, 0], // two flats, major
        };
        assert_eq!(key_sig.fields(), vec![("key", "Bb".to_string())]);

        let bend = Event::ChannelVoice {
            status: 0xE0,
            data: vec![0x00, 0x40],
        };
        assert_eq!(bend.fields()[1], ("pitch", "0".to_string()));
    }
}
