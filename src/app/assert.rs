use crate::app::event::Step;
use crate::app::result::TestResult;
use crate::configuration::manifest::TestDefinition;

pub trait Assertable<T> {
    fn assert(&self, data: &T) -> bool;
}

impl Assertable<TestResult> for TestDefinition {
    fn assert(&self, result: &TestResult) -> bool {
        if self.expect_server_close != 0 && result.server_close_code != self.expect_server_close {
            trace!(
                "{} expected server close code {}, got {}",
                result.id,
                self.expect_server_close,
                result.server_close_code
            );
            return false;
        }

        if self.expect_messages != 0 && result.messages_received != self.expect_messages {
            trace!(
                "{} expected {} messages, got {}",
                result.id,
                self.expect_messages,
                result.messages_received
            );
            return false;
        }

        if !self.max_duration.is_zero() {
            if result.log.is_empty() {
                trace!("{} has an empty log, cannot check its duration", result.id);
                return false;
            }
            match result.log.last() {
                None => return false,
                Some(event) if event.created_at > self.max_duration.ms() => {
                    trace!(
                        "{} took {}, longer than {}",
                        result.id,
                        event.created_at,
                        self.max_duration
                    );
                    return false;
                }
                Some(_) => {}
            }
        }

        for event in result.log.iter() {
            if event.kind.is_write_failure() {
                trace!("{} write failed with {}", result.id, event.kind);
                return false;
            }
            if event.step == Step::ReadMessage && event.kind.is_read_failure() {
                trace!("{} read failed with {}", result.id, event.kind);
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod test {
    use super::Assertable;
    use crate::app::event::{Event, Kind, Step};
    use crate::app::result::TestResult;
    use crate::configuration::manifest::TestDefinition;
    use chrono::Local;
    use std::time::Duration;
    use uuid::Uuid;

    fn result_for(test: TestDefinition, events: &[(u64, Kind, Step)]) -> TestResult {
        let mut result = TestResult::new(Uuid::new_v4(), test, Local::now());
        for (millis, kind, step) in events {
            let mut event = Event::new(*kind, *step);
            event.created_at = Duration::from_millis(*millis).into();
            result.log.push(event);
        }
        result
    }

    fn definition() -> TestDefinition {
        TestDefinition::builder()
            .name("assert")
            .url("ws://127.0.0.1:9000/")
            .build()
            .unwrap()
    }

    #[test]
    fn test_no_expectations_and_clean_log_succeeds() {
        let result = result_for(
            definition(),
            &[(0, Kind::Connect, Step::Connect), (1, Kind::ConnectFail, Step::Connect)],
        );

        assert!(result.test.assert(&result));
        assert!(result.is_success());
    }

    #[test]
    fn test_server_close_code_must_match() {
        let mut test = definition();
        test.expect_server_close = 1000;
        let mut result = result_for(test, &[(0, Kind::Connect, Step::Connect)]);

        result.server_close_code = 1011;
        assert!(!result.is_success());

        result.server_close_code = 1000;
        assert!(result.is_success());
    }

    #[test]
    fn test_message_count_must_match() {
        let mut test = definition();
        test.expect_messages = 2;
        let mut result = result_for(test, &[(0, Kind::Connect, Step::Connect)]);

        result.messages_received = 1;
        assert!(!result.is_success());

        result.messages_received = 2;
        assert!(result.is_success());
    }

    #[test]
    fn test_max_duration_checks_last_event() {
        let mut test = definition();
        test.max_duration = Duration::from_millis(10).into();

        let empty = result_for(test.clone(), &[]);
        assert!(!empty.is_success());

        let fast = result_for(
            test.clone(),
            &[(0, Kind::Connect, Step::Connect), (10, Kind::ConnectFail, Step::Connect)],
        );
        assert!(fast.is_success());

        let slow = result_for(
            test,
            &[(0, Kind::Connect, Step::Connect), (11, Kind::ConnectFail, Step::Connect)],
        );
        assert!(!slow.is_success());
    }

    #[test]
    fn test_any_write_failure_fails() {
        for kind in &[
            Kind::WriteMessageTimeout,
            Kind::WriteMessageNetError,
            Kind::WriteMessageError,
        ] {
            let result = result_for(definition(), &[(0, *kind, Step::SendText)]);
            assert!(!result.is_success(), "{} passed", kind);
        }
    }

    #[test]
    fn test_read_failure_fails_only_in_read_loop() {
        let in_loop = result_for(
            definition(),
            &[(0, Kind::ReadMessageNetError, Step::ReadMessage)],
        );
        assert!(!in_loop.is_success());

        let close_check = result_for(
            definition(),
            &[(0, Kind::ReadMessageTimeout, Step::UnexpectedServerClose)],
        );
        assert!(close_check.is_success());
    }
}
