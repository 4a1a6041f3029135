use crate::app::assert::Assertable;
use crate::app::event::Log;
use crate::configuration::manifest::TestDefinition;
use crate::connection::Frame;
use crate::time::DurationMs;
use chrono::{DateTime, Local};
use serde_derive::{Deserialize, Serialize};
use std::convert::TryFrom;
use uuid::Uuid;

/// A data frame received during a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "MessageRecord", try_from = "MessageRecord")]
pub struct ReceivedMessage {
    pub received_at: DurationMs,
    pub body: Frame,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum FrameType {
    Text,
    Binary,
}

/// Record form of a message, binary bodies are base64 encoded.
#[derive(Serialize, Deserialize)]
struct MessageRecord {
    received_at: DurationMs,
    #[serde(rename = "type")]
    frame_type: FrameType,
    body: String,
}

impl From<ReceivedMessage> for MessageRecord {
    fn from(message: ReceivedMessage) -> Self {
        let (frame_type, body) = match message.body {
            Frame::Text(text) => (FrameType::Text, text),
            Frame::Binary(data) => (FrameType::Binary, base64::encode(&data)),
        };
        Self {
            received_at: message.received_at,
            frame_type,
            body,
        }
    }
}

impl TryFrom<MessageRecord> for ReceivedMessage {
    type Error = base64::DecodeError;

    fn try_from(record: MessageRecord) -> Result<Self, Self::Error> {
        let body = match record.frame_type {
            FrameType::Text => Frame::Text(record.body),
            FrameType::Binary => Frame::Binary(base64::decode(&record.body)?),
        };
        Ok(Self {
            received_at: record.received_at,
            body,
        })
    }
}

/// Everything one run of a test observed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestResult {
    pub id: Uuid,
    /// The test the result belongs to, with defaults applied.
    pub test: TestDefinition,
    pub started_at: DateTime<Local>,
    /// True if connect succeeded.
    pub connect_ok: bool,
    pub messages_received: u32,
    pub messages: Vec<ReceivedMessage>,
    pub server_close_code: u16,
    pub close_ok: bool,
    pub log: Log,
}

impl TestResult {
    pub fn new(id: Uuid, test: TestDefinition, started_at: DateTime<Local>) -> Self {
        Self {
            id,
            test,
            started_at,
            connect_ok: false,
            messages_received: 0,
            messages: Vec::new(),
            server_close_code: 0,
            close_ok: false,
            log: Log::default(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.test.assert(self)
    }

    /// Time from the start of the run to its last event.
    pub fn elapsed(&self) -> DurationMs {
        self.log
            .last()
            .map(|event| event.created_at)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::{ReceivedMessage, TestResult};
    use crate::app::event::{Event, Kind, Step, Value};
    use crate::configuration::manifest::TestDefinition;
    use crate::connection::Frame;
    use crate::time::DurationMs;
    use chrono::Local;
    use serde_json::json;
    use std::time::Duration;
    use uuid::Uuid;

    fn at(nanos: u64) -> DurationMs {
        Duration::from_nanos(nanos).into()
    }

    fn finished_result() -> TestResult {
        let test = TestDefinition::builder()
            .name("record")
            .url("ws://127.0.0.1:9000/")
            .send_text_message("hello")
            .expect_messages(2)
            .expect_server_close(1000)
            .max_duration(Duration::from_secs(2))
            .build()
            .unwrap()
            .with_defaults();
        let mut result = TestResult::new(Uuid::new_v4(), test, Local::now());
        result.connect_ok = true;
        result.messages_received = 2;
        result.server_close_code = 1000;
        result.messages = vec![
            ReceivedMessage {
                received_at: at(3_141_592),
                body: Frame::Text("hi".to_owned()),
            },
            ReceivedMessage {
                received_at: at(4_000_001),
                body: Frame::Binary(vec![0, 159, 146, 150]),
            },
        ];
        let events = vec![
            (at(10_004), Event::new(Kind::Connect, Step::Connect)),
            (at(1_234_567), Event::new(Kind::ConnectSuccess, Step::Connect)),
            (
                at(3_141_000),
                Event::new(Kind::ReadMessageSuccess, Step::ReadMessage).with_value(Value::Integer(1)),
            ),
            (
                at(5_555_555),
                Event::new(Kind::ServerClosedConnection, Step::ExpectedServerClose)
                    .with_message("bye")
                    .with_value(Value::Integer(1000))
                    .with_error("connection closed by peer with code 1000: bye"),
            ),
        ];
        for (created_at, mut event) in events {
            event.created_at = created_at;
            result.log.push(event);
        }
        result
    }

    fn assert_close(left: DurationMs, right: DurationMs) {
        let delta = (left.as_millis_f64() - right.as_millis_f64()).abs();
        assert!(delta <= 0.01, "{} and {} differ by {}ms", left, right, delta);
    }

    #[test]
    fn test_message_record_form() {
        let text = ReceivedMessage {
            received_at: at(1_500_000),
            body: Frame::Text("hi".to_owned()),
        };
        let binary = ReceivedMessage {
            received_at: at(2_000_000),
            body: Frame::Binary(vec![1, 2, 3]),
        };

        assert_eq!(
            serde_json::to_value(&text).unwrap(),
            json!({ "received_at": 1.5, "type": "text", "body": "hi" })
        );
        assert_eq!(
            serde_json::to_value(&binary).unwrap(),
            json!({ "received_at": 2.0, "type": "binary", "body": "AQID" })
        );
        assert!(serde_json::from_value::<ReceivedMessage>(
            json!({ "received_at": 1, "type": "binary", "body": "not base64!" })
        )
        .is_err());
    }

    #[test]
    fn test_record_has_expected_fields() {
        let value = serde_json::to_value(&finished_result()).unwrap();
        let object = value.as_object().unwrap();
        for field in &[
            "id",
            "test",
            "started_at",
            "connect_ok",
            "messages_received",
            "messages",
            "server_close_code",
            "close_ok",
            "log",
        ] {
            assert!(object.contains_key(*field), "missing {}", field);
        }
        assert_eq!(value["test"]["message_read_timeout"], "1s");
        assert_eq!(value["log"][1]["kind"], "connect_success");
    }

    #[test]
    fn test_record_round_trip_keeps_fields() {
        let result = finished_result();
        let text = serde_json::to_string_pretty(&result).unwrap();
        let back: TestResult = serde_json::from_str(&text).unwrap();

        assert_eq!(back.id, result.id);
        assert_eq!(back.test, result.test);
        assert_eq!(back.started_at, result.started_at);
        assert_eq!(back.connect_ok, result.connect_ok);
        assert_eq!(back.messages_received, result.messages_received);
        assert_eq!(back.server_close_code, result.server_close_code);
        assert_eq!(back.close_ok, result.close_ok);

        assert_eq!(back.messages.len(), result.messages.len());
        for (left, right) in back.messages.iter().zip(result.messages.iter()) {
            assert_eq!(left.body, right.body);
            assert_close(left.received_at, right.received_at);
        }

        assert_eq!(back.log.len(), result.log.len());
        for (left, right) in back.log.iter().zip(result.log.iter()) {
            assert_eq!(left.kind, right.kind);
            assert_eq!(left.step, right.step);
            assert_eq!(left.message, right.message);
            assert_eq!(left.value, right.value);
            assert_eq!(left.error, right.error);
            assert_close(left.created_at, right.created_at);
        }
    }

    #[test]
    fn test_elapsed_is_last_event_time() {
        let result = finished_result();
        assert_eq!(result.elapsed(), at(5_555_555));

        let empty = TestResult::new(Uuid::new_v4(), result.test.clone(), Local::now());
        assert_eq!(empty.elapsed(), DurationMs::default());
    }
}
