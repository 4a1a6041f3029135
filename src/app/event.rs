use crate::connection::Outcome;
use crate::time::DurationMs;
use core::slice::Iter;
use serde_derive::{Deserialize, Serialize};
use std::fmt;

/// What happened during one I/O attempt of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Kind {
    Connect,
    ConnectSuccess,
    ConnectFail,
    ServerClosedConnection,
    SetReadDeadlineFailed,
    SetWriteDeadlineFailed,
    ReadMessage,
    ReadMessageTimeout,
    ReadMessageNetError,
    ReadMessageError,
    ReadMessageSuccess,
    WriteMessage,
    WriteMessageTimeout,
    WriteMessageNetError,
    WriteMessageError,
    WriteMessageSuccess,
    ClientCloseConnection,
    ClientCloseConnectionSuccess,
    ClientCloseConnectionFailed,
}

/// Protocol phase that produced an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Connect,
    SendText,
    ReadMessage,
    ClientClose,
    ExpectedServerClose,
    UnexpectedServerClose,
}

/// Written as the bare value. Binary values are base64 strings and read
/// back as `Text`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Integer(i64),
    Text(String),
    Binary(#[serde(with = "crate::reporter::serialize::base64_bytes")] Vec<u8>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub created_at: DurationMs,
    pub kind: Kind,
    pub step: Step,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorDetail>,
}

/// Ordered, append-only record of a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Log(Vec<Event>);

impl Kind {
    pub fn is_write_failure(self) -> bool {
        matches!(
            self,
            Kind::WriteMessageTimeout | Kind::WriteMessageNetError | Kind::WriteMessageError
        )
    }

    pub fn is_read_failure(self) -> bool {
        matches!(
            self,
            Kind::ReadMessageTimeout | Kind::ReadMessageNetError | Kind::ReadMessageError
        )
    }

    pub fn for_read(outcome: Outcome) -> Kind {
        match outcome {
            Outcome::Success => Kind::ReadMessageSuccess,
            Outcome::Timeout => Kind::ReadMessageTimeout,
            Outcome::PeerClosed(_) => Kind::ServerClosedConnection,
            Outcome::NetworkError => Kind::ReadMessageNetError,
            Outcome::OtherError => Kind::ReadMessageError,
        }
    }

    pub fn for_write(outcome: Outcome) -> Kind {
        match outcome {
            Outcome::Success => Kind::WriteMessageSuccess,
            Outcome::Timeout => Kind::WriteMessageTimeout,
            Outcome::PeerClosed(_) => Kind::ServerClosedConnection,
            Outcome::NetworkError => Kind::WriteMessageNetError,
            Outcome::OtherError => Kind::WriteMessageError,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Kind::Connect => "connect",
            Kind::ConnectSuccess => "connect_success",
            Kind::ConnectFail => "connect_fail",
            Kind::ServerClosedConnection => "server_closed_connection",
            Kind::SetReadDeadlineFailed => "set_read_deadline_failed",
            Kind::SetWriteDeadlineFailed => "set_write_deadline_failed",
            Kind::ReadMessage => "read_message",
            Kind::ReadMessageTimeout => "read_message_timeout",
            Kind::ReadMessageNetError => "read_message_net_error",
            Kind::ReadMessageError => "read_message_error",
            Kind::ReadMessageSuccess => "read_message_success",
            Kind::WriteMessage => "write_message",
            Kind::WriteMessageTimeout => "write_message_timeout",
            Kind::WriteMessageNetError => "write_message_net_error",
            Kind::WriteMessageError => "write_message_error",
            Kind::WriteMessageSuccess => "write_message_success",
            Kind::ClientCloseConnection => "client_close_connection",
            Kind::ClientCloseConnectionSuccess => "client_close_connection_success",
            Kind::ClientCloseConnectionFailed => "client_close_connection_failed",
        }
    }
}

impl Step {
    pub fn as_str(self) -> &'static str {
        match self {
            Step::Connect => "connect",
            Step::SendText => "send_text",
            Step::ReadMessage => "read_message",
            Step::ClientClose => "client_close",
            Step::ExpectedServerClose => "expected_server_close",
            Step::UnexpectedServerClose => "unexpected_server_close",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Event {
    /// An event stamped with zero; the recorder of the run sets the time.
    pub fn new(kind: Kind, step: Step) -> Self {
        Self {
            created_at: DurationMs::default(),
            kind,
            step,
            message: String::new(),
            value: None,
            error: None,
        }
    }

    pub fn with_message<S: Into<String>>(mut self, message: S) -> Self {
        self.message = message.into();
        self
    }

    pub fn with_value(mut self, value: Value) -> Self {
        self.value = Some(value);
        self
    }

    pub fn with_error<E: fmt::Display + ?Sized>(mut self, error: &E) -> Self {
        self.error = Some(ErrorDetail {
            message: error.to_string(),
        });
        self
    }
}

impl Log {
    pub(crate) fn push(&mut self, event: Event) {
        self.0.push(event);
    }

    #[inline]
    pub fn iter(&self) -> Iter<'_, Event> {
        self.0.iter()
    }

    pub fn last(&self) -> Option<&Event> {
        self.0.last()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[cfg(test)]
    pub fn kinds(&self) -> Vec<Kind> {
        self.0.iter().map(|event| event.kind).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io;
    use std::time::Duration;

    #[test]
    fn test_kind_and_step_serialize_snake_case() {
        assert_eq!(
            serde_json::to_value(Kind::ReadMessageNetError).unwrap(),
            json!("read_message_net_error")
        );
        assert_eq!(
            serde_json::to_value(Step::UnexpectedServerClose).unwrap(),
            json!("unexpected_server_close")
        );
        for kind in &[Kind::ConnectFail, Kind::ClientCloseConnectionSuccess, Kind::SetWriteDeadlineFailed] {
            assert_eq!(serde_json::to_value(kind).unwrap(), json!(kind.as_str()));
        }
        assert_eq!(Step::SendText.to_string(), "send_text");
    }

    #[test]
    fn test_failure_sets() {
        assert!(Kind::WriteMessageTimeout.is_write_failure());
        assert!(Kind::WriteMessageError.is_write_failure());
        assert!(!Kind::WriteMessageSuccess.is_write_failure());
        assert!(Kind::ReadMessageNetError.is_read_failure());
        assert!(!Kind::ServerClosedConnection.is_read_failure());
        assert!(!Kind::ReadMessageTimeout.is_write_failure());
    }

    #[test]
    fn test_outcome_maps_to_direction_specific_kind() {
        assert_eq!(Kind::for_read(Outcome::Timeout), Kind::ReadMessageTimeout);
        assert_eq!(Kind::for_write(Outcome::Timeout), Kind::WriteMessageTimeout);
        assert_eq!(Kind::for_read(Outcome::PeerClosed(1000)), Kind::ServerClosedConnection);
        assert_eq!(Kind::for_write(Outcome::NetworkError), Kind::WriteMessageNetError);
        assert_eq!(Kind::for_read(Outcome::OtherError), Kind::ReadMessageError);
        assert_eq!(Kind::for_write(Outcome::Success), Kind::WriteMessageSuccess);
    }

    #[test]
    fn test_event_omits_empty_fields() {
        let mut event = Event::new(Kind::Connect, Step::Connect);
        event.created_at = Duration::from_micros(1_500).into();

        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({ "created_at": 1.5, "kind": "connect", "step": "connect" })
        );
    }

    #[test]
    fn test_event_carries_value_and_error() {
        let err = io::Error::new(io::ErrorKind::ConnectionReset, "connection reset by peer");
        let event = Event::new(Kind::ServerClosedConnection, Step::ReadMessage)
            .with_message("going away")
            .with_value(Value::Integer(1001))
            .with_error(&err);

        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["message"], "going away");
        assert_eq!(value["value"], json!(1001));
        assert_eq!(value["error"], json!({ "message": "connection reset by peer" }));

        let binary = serde_json::to_value(Value::Binary(vec![0xde, 0xad])).unwrap();
        assert_eq!(binary, json!("3q0="));

        let back: Event = serde_json::from_value(value).unwrap();
        assert_eq!(back.value, Some(Value::Integer(1001)));
        let text: Value = serde_json::from_value(json!("going away")).unwrap();
        assert_eq!(text, Value::Text("going away".to_owned()));
    }
}
