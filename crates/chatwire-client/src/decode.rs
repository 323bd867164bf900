//! Event decoding: `data:` lines to [`StreamEvent`]s.
//!
//! Each event line is `data: ` followed by a JSON object. Any subset of these
//! fields may be present:
//!
//! | field        | meaning                                              |
//! |--------------|------------------------------------------------------|
//! | `status`     | transient progress; `message` carries the label      |
//! | `token`      | incremental text (an empty string counts as absent)  |
//! | `done`       | `true` marks completion                              |
//! | `session_id` | backend session, assigned once                       |
//!
//! A line yields one primary event, picked in the order status, token,
//! completion, session. Completion carries the session (if any) as a
//! secondary event that is applied first. A token line with `done: true`
//! (the backend's shape for one-shot replies and errors) keeps the token as
//! its primary event and is followed by the session and the completion. A
//! payload that does not parse is reported as [`StreamEvent::Malformed`] and
//! the stream goes on.

use chatwire_core::{SessionId, StreamEvent};
use serde::Deserialize;

/// Prefix marking an event line.
pub const EVENT_PREFIX: &str = "data: ";

/// Events decoded from a single line, in application order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedLine {
    event: StreamEvent,
    session: Option<SessionId>,
    completes: bool,
}

impl DecodedLine {
    fn single(event: StreamEvent) -> Self {
        Self {
            event,
            session: None,
            completes: false,
        }
    }

    fn completion(session: Option<SessionId>) -> Self {
        Self {
            event: StreamEvent::Completed,
            session,
            completes: true,
        }
    }

    /// The primary event of the line.
    #[must_use]
    pub fn event(&self) -> &StreamEvent {
        &self.event
    }

    /// Session ID carried alongside a completion, if any.
    #[must_use]
    pub fn session(&self) -> Option<&SessionId> {
        self.session.as_ref()
    }

    /// Whether the line ends the stream.
    #[must_use]
    pub fn completes(&self) -> bool {
        self.completes
    }
}

impl IntoIterator for DecodedLine {
    type Item = StreamEvent;
    type IntoIter = std::vec::IntoIter<StreamEvent>;

    /// Primary event first unless it is the completion itself; then the
    /// session; then the completion.
    fn into_iter(self) -> Self::IntoIter {
        let mut events = Vec::with_capacity(3);
        if self.event != StreamEvent::Completed {
            events.push(self.event);
        }
        if let Some(id) = self.session {
            events.push(StreamEvent::SessionAssigned { id });
        }
        if self.completes {
            events.push(StreamEvent::Completed);
        }
        events.into_iter()
    }
}

/// Raw payload fields; every one is optional on the wire.
#[derive(Debug, Default, Deserialize)]
struct Payload {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    done: Option<bool>,
    #[serde(default)]
    session_id: Option<serde_json::Value>,
}

impl Payload {
    fn status_label(&mut self) -> Option<String> {
        let status = self.status.take().filter(|s| !s.is_empty())?;
        Some(self.message.take().filter(|m| !m.is_empty()).unwrap_or(status))
    }
}

/// Decode one line.
///
/// Returns `None` for lines that are not events (blank separators, comments,
/// other fields) and for event objects that carry nothing actionable.
#[must_use]
pub fn decode_line(line: &str) -> Option<DecodedLine> {
    let raw = line.strip_prefix(EVENT_PREFIX)?;

    let Some(mut payload) = parse_payload(raw) else {
        return Some(DecodedLine::single(StreamEvent::Malformed {
            raw: raw.to_string(),
        }));
    };

    let Ok(session) = parse_session(payload.session_id.take()) else {
        return Some(DecodedLine::single(StreamEvent::Malformed {
            raw: raw.to_string(),
        }));
    };

    let status = payload.status_label();
    let token = payload.token.take().filter(|t| !t.is_empty());
    let done = payload.done == Some(true);

    let decoded = match (status, token, done, session) {
        (Some(label), _, _, _) => DecodedLine::single(StreamEvent::Status { label }),
        (None, Some(text), false, _) => DecodedLine::single(StreamEvent::Token { text }),
        (None, Some(text), true, session) => DecodedLine {
            event: StreamEvent::Token { text },
            session,
            completes: true,
        },
        (None, None, true, session) => DecodedLine::completion(session),
        (None, None, false, Some(id)) => {
            DecodedLine::single(StreamEvent::SessionAssigned { id })
        }
        (None, None, false, None) => return None,
    };
    Some(decoded)
}

/// Parse the payload, requiring a JSON object with well-typed known fields.
fn parse_payload(raw: &str) -> Option<Payload> {
    let value: serde_json::Value = serde_json::from_str(raw).ok()?;
    if !value.is_object() {
        return None;
    }
    serde_json::from_value(value).ok()
}

/// Read an opaque session ID: strings and numbers are accepted, `null` and
/// empty strings mean absent, anything else is malformed.
fn parse_session(value: Option<serde_json::Value>) -> Result<Option<SessionId>, ()> {
    match value {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::String(s)) => Ok(SessionId::new(s).ok()),
        Some(serde_json::Value::Number(n)) => Ok(SessionId::new(n.to_string()).ok()),
        Some(_) => Err(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn events(line: &str) -> Vec<StreamEvent> {
        decode_line(line).map(|d| d.into_iter().collect()).unwrap_or_default()
    }

    fn sid(s: &str) -> SessionId {
        SessionId::new(s).unwrap()
    }

    #[test]
    fn non_event_lines_are_ignored() {
        assert_eq!(decode_line(""), None);
        assert_eq!(decode_line(": keep-alive"), None);
        assert_eq!(decode_line("event: token"), None);
        assert_eq!(decode_line("data:{\"token\":\"x\"}"), None);
    }

    #[test]
    fn token_line() {
        assert_eq!(
            events(r#"data: {"token":"Hel"}"#),
            vec![StreamEvent::Token { text: "Hel".into() }]
        );
    }

    #[test]
    fn token_with_done_false() {
        assert_eq!(
            events(r#"data: {"token":"lo","done":false}"#),
            vec![StreamEvent::Token { text: "lo".into() }]
        );
    }

    #[test]
    fn status_label_prefers_message() {
        assert_eq!(
            events(r#"data: {"status":"loading","message":"Fetching weather..."}"#),
            vec![StreamEvent::Status { label: "Fetching weather...".into() }]
        );
        assert_eq!(
            events(r#"data: {"status":"loading"}"#),
            vec![StreamEvent::Status { label: "loading".into() }]
        );
    }

    #[test]
    fn status_wins_over_token() {
        assert_eq!(
            events(r#"data: {"status":"loading","token":"x","done":true}"#),
            vec![StreamEvent::Status { label: "loading".into() }]
        );
    }

    #[test]
    fn token_with_done_appends_then_completes() {
        let decoded =
            decode_line(r#"data: {"token":"Error: boom","done":true,"session_id":"abc"}"#).unwrap();
        assert_eq!(decoded.event(), &StreamEvent::Token { text: "Error: boom".into() });
        assert!(decoded.completes());
        assert_eq!(
            decoded.into_iter().collect::<Vec<_>>(),
            vec![
                StreamEvent::Token { text: "Error: boom".into() },
                StreamEvent::SessionAssigned { id: sid("abc") },
                StreamEvent::Completed,
            ]
        );
        assert_eq!(
            events(r#"data: {"token":"Unknown agent.","done":true}"#),
            vec![StreamEvent::Token { text: "Unknown agent.".into() }, StreamEvent::Completed]
        );
    }

    #[test]
    fn empty_token_with_done_completes() {
        assert_eq!(
            events(r#"data: {"token":"","done":true,"full_response":"Hello"}"#),
            vec![StreamEvent::Completed]
        );
    }

    #[test]
    fn session_is_emitted_before_completion() {
        let decoded = decode_line(r#"data: {"done":true,"session_id":"abc"}"#).unwrap();
        assert_eq!(decoded.event(), &StreamEvent::Completed);
        assert_eq!(decoded.session(), Some(&sid("abc")));
        assert_eq!(
            decoded.into_iter().collect::<Vec<_>>(),
            vec![StreamEvent::SessionAssigned { id: sid("abc") }, StreamEvent::Completed]
        );
    }

    #[test]
    fn lone_session_is_primary() {
        assert_eq!(
            events(r#"data: {"session_id":"abc"}"#),
            vec![StreamEvent::SessionAssigned { id: sid("abc") }]
        );
    }

    #[test]
    fn numeric_session_id_is_opaque_text() {
        assert_eq!(
            events(r#"data: {"done":true,"session_id":42}"#),
            vec![StreamEvent::SessionAssigned { id: sid("42") }, StreamEvent::Completed]
        );
    }

    #[test]
    fn null_or_empty_session_is_absent() {
        assert_eq!(events(r#"data: {"done":true,"session_id":null}"#), vec![StreamEvent::Completed]);
        assert_eq!(events(r#"data: {"done":true,"session_id":""}"#), vec![StreamEvent::Completed]);
    }

    #[test]
    fn nothing_actionable_yields_none() {
        assert_eq!(decode_line(r#"data: {}"#), None);
        assert_eq!(decode_line(r#"data: {"token":"","done":false}"#), None);
        assert_eq!(decode_line(r#"data: {"unrelated":1}"#), None);
    }

    #[test]
    fn malformed_payloads() {
        for raw in [
            "{not json",
            "[1,2,3]",
            "\"just a string\"",
            "",
            r#"{"token":5}"#,
            r#"{"done":"yes"}"#,
            r#"{"session_id":{"nested":true},"done":true}"#,
        ] {
            let line = format!("{EVENT_PREFIX}{raw}");
            assert_eq!(
                events(&line),
                vec![StreamEvent::Malformed { raw: raw.to_string() }],
                "payload {raw:?}"
            );
        }
    }
}
