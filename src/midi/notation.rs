//! Compact note-notation parser.
//!
//! A notation string is a whitespace-separated list of chords. Each chord is
//! one or more pitch letters, each optionally followed by `#` (sharp) or `-`
//! (flat), then an optional duration code:
//!
//! ```text
//! c e g4     three quarter notes: C4, E4, G4
//! ceg2       C major triad as a half note
//! C#8 b-     C#5 eighth note, then Bb4 quarter note
//! ```
//!
//! Lowercase letters are the octave starting at middle C (60); uppercase
//! letters are one octave higher. The duration code is the fraction of a
//! whole note (1 = whole, 4 = quarter, 8 = eighth) and defaults to 4.

use super::error::{MidiError, Result};

/// Duration code used when a chord does not specify one (quarter note).
pub const DEFAULT_DURATION_CODE: u32 = 4;

/// Pitch of lowercase `c`.
const LOWER_OCTAVE_C: u8 = 60;

/// One parsed chord: pitches sounding together for one duration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chord {
    /// MIDI note numbers in the order written.
    pub pitches: Vec<u8>,
    /// Fraction of a whole note: 1 = whole, 4 = quarter, etc.
    pub duration_code: u32,
}

/// Semitone offset of a note letter from C, and whether it is uppercase.
fn letter_offset(letter: char) -> Option<(u8, bool)> {
    let offset = match letter.to_ascii_lowercase() {
        'c' => 0,
        'd' => 2,
        'e' => 4,
        'f' => 5,
        'g' => 7,
        'a' => 9,
        'b' => 11,
        _ => return None,
    };
    Some((offset, letter.is_ascii_uppercase()))
}

/// Parses a single chord token such as `ceg2` or `f#`.
fn parse_chord(token: &str) -> Result<Chord> {
    let unparsable = || MidiError::UnparsableToken(token.to_string());
    let mut pitches = Vec::new();
    let mut chars = token.char_indices().peekable();
    let mut duration_start = token.len();

    while let Some(&(index, letter)) = chars.peek() {
        let Some((offset, upper)) = letter_offset(letter) else {
            duration_start = index;
            break;
        };
        chars.next();

        let mut pitch = LOWER_OCTAVE_C + offset + if upper { 12 } else { 0 };
        match chars.peek() {
            Some(&(_, '#')) => {
                pitch += 1;
                chars.next();
            }
            Some(&(_, '-')) => {
                pitch -= 1;
                chars.next();
            }
            _ => {}
        }
        pitches.push(pitch);
    }

    if pitches.is_empty() {
        return Err(unparsable());
    }

    let digits = &token[duration_start..];
    let duration_code = if digits.is_empty() {
        DEFAULT_DURATION_CODE
    } else if digits.bytes().all(|b| b.is_ascii_digit()) {
        digits
            .parse::<u32>()
            .ok()
            .filter(|&code| code > 0)
            .ok_or_else(unparsable)?
    } else {
        return Err(unparsable());
    };

    Ok(Chord {
        pitches,
        duration_code,
    })
}

/// Parses a full notation string into chords, in order.
///
/// # Errors
///
/// Returns `UnparsableToken` with the offending token for the first token
/// that does not match the grammar.
pub fn parse_notation(text: &str) -> Result<Vec<Chord>> {
    text.split_whitespace().map(parse_chord).collect()
}
