//! Error types for reading, writing, and building MIDI files.

use thiserror::Error;

/// Errors raised by the MIDI codec and the note-notation parser.
///
/// Everything except [`MidiError::TrackLengthMismatch`] aborts the current
/// operation. A length mismatch is only ever reported as a warning by
/// [`MidiFile::parse_with_warnings`](super::MidiFile::parse_with_warnings).
#[derive(Debug, Error)]
pub enum MidiError {
    /// Chunk magic, header length, or declared format is invalid.
    #[error("bad header: {0}")]
    BadHeader(String),

    /// The buffer ended before a field could be read.
    #[error("truncated input while reading {0}")]
    TruncatedInput(&'static str),

    /// A byte was found where a status byte was expected and no running
    /// status was available to fall back on.
    #[error("invalid status byte 0x{byte:02X} at offset {offset}")]
    InvalidStatusByte { byte: u8, offset: usize },

    /// A track's declared chunk length disagrees with where its events end.
    #[error("track {track}: declared length {declared} bytes, events end after {consumed}")]
    TrackLengthMismatch {
        track: usize,
        declared: usize,
        consumed: usize,
    },

    /// A value does not fit in a 28-bit variable-length quantity.
    #[error("value {0} does not fit in a variable-length quantity")]
    ValueTooLarge(u64),

    /// A note-notation token does not match the grammar.
    #[error("unparsable token: {0:?}")]
    UnparsableToken(String),

    /// Reading or writing a file failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias used across the codec.
pub type Result<T> = std::result::Result<T, MidiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let err = MidiError::InvalidStatusByte {
            byte: 0x3C,
            offset: 22,
        };
        assert_eq!(err.to_string(), "invalid status byte 0x3C at offset 22");

        let err = MidiError::UnparsableToken("x4".to_string());
        assert_eq!(err.to_string(), "unparsable token: \"x4\"");
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: MidiError = io.into();
        assert!(matches!(err, MidiError::Io(_)));
    }
}
