//! Percent-token formatting of events and notes for terminal output.
//!
//! Templates are scanned once, left to right. A `%` followed by a recognized
//! token character is replaced by the corresponding field; `%%` produces a
//! literal `%`; anything else is copied verbatim. Substituted text is never
//! scanned again.
//!
//! Event tokens:
//!
//! | Token | Value                                          |
//! |-------|------------------------------------------------|
//! | `%b`  | raw bytes in decimal, space separated          |
//! | `%x`  | raw bytes in hex, space separated              |
//! | `%T`  | delta time in ticks                            |
//! | `%t`  | event type name                                |
//! | `%d`  | all fields as `name=value`, space separated    |
//!
//! Note tokens:
//!
//! | Token | Value                 |
//! |-------|-----------------------|
//! | `%s`  | start tick            |
//! | `%l`  | duration in ticks     |
//! | `%e`  | end tick              |
//! | `%c`  | channel               |
//! | `%p`  | pitch number          |
//! | `%n`  | pitch name, e.g. `C4` |
//! | `%i`  | instrument (program)  |

use crate::midi::{note_to_name, Note, Result, TimedEvent};

/// Default template for `show`.
pub const DEFAULT_EVENT_FORMAT: &str = "[%x] dt=%T %d";

/// Default template for `notes`.
pub const DEFAULT_NOTE_FORMAT: &str = "%s %l %c %p %i";

/// Replaces `%`-tokens in `template` using `resolve`.
///
/// `resolve` returns None for characters that are not tokens, in which case
/// the `%` and the character are kept as written.
pub fn substitute<F>(template: &str, resolve: F) -> String
where
    F: Fn(char) -> Option<String>,
{
    let mut output = String::with_capacity(template.len());
    let mut chars = template.chars();

    while let Some(c) = chars.next() {
        if c != '%' {
            output.push(c);
            continue;
        }
        match chars.next() {
            Some('%') => output.push('%'),
            Some(token) => match resolve(token) {
                Some(value) => output.push_str(&value),
                None => {
                    output.push('%');
                    output.push(token);
                }
            },
            None => output.push('%'),
        }
    }

    output
}

/// Formats a timed event with the event tokens.
///
/// # Errors
///
/// Fails only if the event cannot be encoded (oversized payload).
pub fn format_event(template: &str, event: &TimedEvent) -> Result<String> {
    let bytes = event.bytes()?;
    let hex = event.hex()?;

    Ok(substitute(template, |token| match token {
        'b' => Some(
            bytes
                .iter()
                .map(|b| b.to_string())
                .collect::<Vec<_>>()
                .join(" "),
        ),
        'x' => Some(hex.clone()),
        'T' => Some(event.delta_time.to_string()),
        't' => Some(event.type_name().to_string()),
        'd' => Some(
            event
                .fields()
                .iter()
                .map(|(name, value)| format!("{}={}", name, value))
                .collect::<Vec<_>>()
                .join(" "),
        ),
        _ => None,
    }))
}

/// Formats a reconstructed note with the note tokens.
pub fn format_note(template: &str, note: &Note) -> String {
    substitute(template, |token| match token {
        's' => Some(note.start_tick.to_string()),
        'l' => Some(note.duration_ticks.to_string()),
        'e' => Some(note.end_tick().to_string()),
        'c' => Some(note.channel.to_string()),
        'p' => Some(note.pitch.to_string()),
        'n' => Some(note_to_name(note.pitch)),
        'i' => Some(note.instrument.to_string()),
        _ => None,
    })
}

/// Selects events by type name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum EventFilter {
    /// Every event passes.
    #[default]
    All,
    /// Only events whose type name is listed pass.
    Types(Vec<String>),
}

impl EventFilter {
    /// Parses `*` or a comma-separated list of type names such as
    /// `note_on,note_off`.
    pub fn parse(list: &str) -> Self {
        if list.trim() == "*" {
            return EventFilter::All;
        }
        EventFilter::Types(
            list.split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
        )
    }

    /// Returns true if `event` should be shown.
    pub fn matches(&self, event: &TimedEvent) -> bool {
        match self {
            EventFilter::All => true,
            EventFilter::Types(types) => types.iter().any(|t| t == event.type_name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::midi::Event;

    fn note_on() -> TimedEvent {
        TimedEvent::new(
            96,
            Event::NoteOn {
                channel: 0,
                pitch: 60,
                velocity: 100,
            },
        )
    }

    #[test]
    fn test_default_event_format() {
        assert_eq!(
            format_event(DEFAULT_EVENT_FORMAT, &note_on()).unwrap(),
            "[90 3C 64] dt=96 type=note_on channel=0 note=60 velocity=100 time=96"
        );
    }

    #[test]
    fn test_event_tokens() {
        assert_eq!(
            format_event("%t|%b|%T", &note_on()).unwrap(),
            "note_on|144 60 100|96"
        );
        let eot = TimedEvent::new(0, Event::end_of_track());
        assert_eq!(
            format_event("%x %d", &eot).unwrap(),
            "FF 2F 00 type=end_of_track time=0"
        );
    }

    #[test]
    fn test_unknown_and_escaped_tokens() {
        assert_eq!(
            format_event("100%% %q %", &note_on()).unwrap(),
            "100% %q %"
        );
    }

    #[test]
    fn test_single_pass() {
        // A text event containing a token is not expanded again
        let text = TimedEvent::new(
            0,
            Event::Meta {
                meta_type: 0x01,
                payload: b"%T".to_vec(),
            },
        );
        assert_eq!(
            format_event("%d", &text).unwrap(),
            "type=text text=%T time=0"
        );
    }

    #[test]
    fn test_note_format() {
        let note = Note {
            channel: 1,
            pitch: 69,
            instrument: 24,
            start_tick: 960,
            duration_ticks: 240,
        };
        assert_eq!(format_note(DEFAULT_NOTE_FORMAT, &note), "960 240 1 69 24");
        assert_eq!(format_note("%n@%s", &note), "A4@960");
        assert_eq!(format_note("%s-%e", &note), "960-1200");
    }

    #[test]
    fn test_filter() {
        let eot = TimedEvent::new(0, Event::end_of_track());

        let all = EventFilter::parse("*");
        assert!(all.matches(&note_on()));
        assert!(all.matches(&eot));

        let notes_only = EventFilter::parse("note_on, note_off");
        assert!(notes_only.matches(&note_on()));
        assert!(!notes_only.matches(&eot));

        assert_eq!(
            EventFilter::parse("set_tempo,"),
            EventFilter::Types(vec!["set_tempo".to_string()])
        );
    }
}
