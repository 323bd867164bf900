//! Terminal rendering of replies.
//!
//! While a reply streams, [`LiveReply`] prints only what is new since the last
//! update. Once it settles, [`format_reply`] lays out any `<think>` sections
//! apart from the answer.

use std::io::{self, Write};

use chatwire_core::Message;

const THINK_OPEN: &str = "<think>";
const THINK_CLOSE: &str = "</think>";

/// A piece of reply text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment<'a> {
    /// Model reasoning between think tags.
    Think(&'a str),
    /// Text meant for the user.
    Answer(&'a str),
}

/// Split `text` on think tags.
///
/// An opening tag starts reasoning until the next closing tag; an unclosed
/// section runs to the end. Tags themselves are dropped, as are empty pieces.
pub fn split_think(text: &str) -> Vec<Segment<'_>> {
    let mut segments = Vec::new();
    let mut rest = text;
    let mut thinking = false;

    loop {
        let next = [(THINK_OPEN, true), (THINK_CLOSE, false)]
            .into_iter()
            .filter_map(|(tag, state)| rest.find(tag).map(|index| (index, tag, state)))
            .min_by_key(|(index, _, _)| *index);

        let Some((index, tag, state)) = next else {
            push_segment(&mut segments, rest, thinking);
            break;
        };
        push_segment(&mut segments, &rest[..index], thinking);
        thinking = state;
        rest = &rest[index + tag.len()..];
    }

    segments
}

fn push_segment<'a>(segments: &mut Vec<Segment<'a>>, piece: &'a str, thinking: bool) {
    if piece.is_empty() {
        return;
    }
    segments.push(if thinking {
        Segment::Think(piece)
    } else {
        Segment::Answer(piece)
    });
}

/// Lay out a settled reply: reasoning as an indented block, then the answer.
pub fn format_reply(text: &str) -> String {
    let mut out = String::new();
    for segment in split_think(text) {
        match segment {
            Segment::Think(thought) => {
                for line in thought.trim().lines() {
                    out.push_str("  │ ");
                    out.push_str(line);
                    out.push('\n');
                }
            }
            Segment::Answer(answer) => {
                let answer = answer.trim();
                if !answer.is_empty() {
                    out.push_str(answer);
                    out.push('\n');
                }
            }
        }
    }
    out
}

/// Whether `text` has think sections worth a separate layout.
pub fn has_think(text: &str) -> bool {
    text.contains(THINK_OPEN)
}

/// Incremental printer for one streaming reply.
#[derive(Debug, Default)]
pub struct LiveReply {
    printed: usize,
    last_status: Option<String>,
}

impl LiveReply {
    pub fn new() -> Self {
        Self::default()
    }

    /// Print whatever changed since the last call.
    ///
    /// Before the first token this is the status label (once per change);
    /// afterwards it is the newly appended text.
    pub fn update(&mut self, message: &Message, out: &mut impl Write) -> io::Result<()> {
        if message.text.is_empty() {
            if let Some(status) = &message.status_text {
                if self.last_status.as_ref() != Some(status) {
                    writeln!(out, "[{status}]")?;
                    self.last_status = Some(status.clone());
                }
            }
            return out.flush();
        }

        // Reply text only ever grows at the end.
        if let Some(delta) = message.text.get(self.printed..) {
            if !delta.is_empty() {
                write!(out, "{delta}")?;
                self.printed = message.text.len();
            }
        }
        out.flush()
    }

    /// Whether any reply text was printed.
    pub fn printed_text(&self) -> bool {
        self.printed > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatwire_core::{Conversation, StreamEvent};

    #[test]
    fn plain_text_is_one_answer() {
        assert_eq!(split_think("hello"), vec![Segment::Answer("hello")]);
        assert!(split_think("").is_empty());
    }

    #[test]
    fn think_then_answer() {
        assert_eq!(
            split_think("<think>weigh options</think>Take the bus."),
            vec![Segment::Think("weigh options"), Segment::Answer("Take the bus.")]
        );
    }

    #[test]
    fn unclosed_think_runs_to_end() {
        assert_eq!(
            split_think("Sure. <think>still going"),
            vec![Segment::Answer("Sure. "), Segment::Think("still going")]
        );
    }

    #[test]
    fn stray_close_tag_is_dropped() {
        assert_eq!(split_think("</think>ok"), vec![Segment::Answer("ok")]);
    }

    #[test]
    fn format_indents_reasoning() {
        let formatted = format_reply("<think>\nline one\nline two\n</think>\n\nAnswer.");
        assert_eq!(formatted, "  │ line one\n  │ line two\nAnswer.\n");
    }

    #[test]
    fn live_reply_prints_status_then_deltas() {
        let mut conversation = Conversation::new("Basic", "mistral");
        let id = conversation.begin_stream().unwrap();
        let mut live = LiveReply::new();
        let mut out = Vec::new();

        live.update(conversation.message(id).unwrap(), &mut out).unwrap();
        live.update(conversation.message(id).unwrap(), &mut out).unwrap();

        chatwire_core::apply_event(&mut conversation, id, &StreamEvent::Token { text: "Hel".into() });
        live.update(conversation.message(id).unwrap(), &mut out).unwrap();
        chatwire_core::apply_event(&mut conversation, id, &StreamEvent::Token { text: "lo".into() });
        live.update(conversation.message(id).unwrap(), &mut out).unwrap();

        assert_eq!(String::from_utf8(out).unwrap(), "[Thinking...]\nHello");
        assert!(live.printed_text());
    }
}
