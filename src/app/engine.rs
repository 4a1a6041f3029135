use crate::app::cancel::Cancellation;
use crate::app::error::Error;
use crate::app::event::{Event, Kind, Step, Value};
use crate::app::result::{ReceivedMessage, TestResult};
use crate::configuration::manifest::TestDefinition;
use crate::connection::{classify, Channel, Dialer, Frame, Outcome, TransportError};
use crate::time::DurationMs;
use chrono::Local;
use std::io;
use std::ops::ControlFlow;
use std::time::Instant;
use uuid::{Builder, Uuid};

type StepResult = Result<ControlFlow<()>, DeadlineFailure>;

/// Runs tests against endpoints reached through `D`.
#[derive(Debug, Clone)]
pub struct Engine<D> {
    dialer: D,
}

/// Log and result of the run in progress.
struct Recorder {
    start: Instant,
    result: TestResult,
}

struct DeadlineFailure {
    step: Step,
    source: io::Error,
}

impl<D: Dialer> Engine<D> {
    pub fn new(dialer: D) -> Self {
        Self { dialer }
    }

    /// Runs `test` once: connect, optional send, read loop, close check,
    /// client close.
    ///
    /// Connection and protocol failures end the run early but still return
    /// `Ok`, the log tells what happened. The cancellation flag is not
    /// consulted while a run is in progress.
    pub fn run(&self, test: &TestDefinition, _cancellation: &Cancellation) -> Result<TestResult, Error> {
        if test.name.is_empty() {
            return Err(Error::EmptyName);
        }
        let id = generate_id()?;
        let test = test.clone().with_defaults();
        if let Ok(data) = serde_json::to_string_pretty(&test) {
            debug!("{} new test {}", id, data);
        }

        let mut recorder = Recorder::start(id, test);
        let mut channel = match connect(&mut recorder, &self.dialer) {
            Some(channel) => channel,
            None => return Ok(recorder.finish()),
        };
        let exchanged = exchange(&mut recorder, &mut channel);
        drop(channel);
        match exchanged {
            Ok(()) => Ok(recorder.finish()),
            Err(failure) => Err(Error::Deadline {
                step: failure.step,
                source: failure.source,
                result: Box::new(recorder.finish()),
            }),
        }
    }
}

impl Recorder {
    fn start(id: Uuid, test: TestDefinition) -> Self {
        Self {
            start: Instant::now(),
            result: TestResult::new(id, test, Local::now()),
        }
    }

    fn id(&self) -> Uuid {
        self.result.id
    }

    fn test(&self) -> &TestDefinition {
        &self.result.test
    }

    fn elapsed(&self) -> DurationMs {
        self.start.elapsed().into()
    }

    fn record(&mut self, mut event: Event) {
        event.created_at = self.elapsed();
        self.result.log.push(event);
    }

    fn receive(&mut self, frame: Frame) {
        let received_at = self.elapsed();
        self.result.messages.push(ReceivedMessage {
            received_at,
            body: frame,
        });
        self.result.messages_received += 1;
    }

    fn peer_closed(&mut self, step: Step, code: u16, err: &TransportError) {
        let reason = match err {
            TransportError::Closed { reason, .. } => reason.as_str(),
            _ => "",
        };
        info!("{} connection closed by server {} {}", self.id(), code, reason);
        self.result.server_close_code = code;
        self.record(
            Event::new(Kind::ServerClosedConnection, step)
                .with_message(reason)
                .with_value(Value::Integer(i64::from(code)))
                .with_error(err),
        );
    }

    fn finish(self) -> TestResult {
        self.result
    }
}

fn generate_id() -> Result<Uuid, Error> {
    let mut bytes = [0u8; 16];
    getrandom::getrandom(&mut bytes).map_err(|err| Error::Identifier(err.to_string()))?;
    Ok(Builder::from_random_bytes(bytes).into_uuid())
}

fn connect<D: Dialer>(recorder: &mut Recorder, dialer: &D) -> Option<D::Channel> {
    let url = recorder.test().url.clone();
    recorder.record(Event::new(Kind::Connect, Step::Connect));
    info!("{} Connecting to {}", recorder.id(), url);
    match dialer.dial(&url, recorder.test().handshake_timeout.get()) {
        Ok(channel) => {
            recorder.record(Event::new(Kind::ConnectSuccess, Step::Connect));
            recorder.result.connect_ok = true;
            info!("{} connected", recorder.id());
            Some(channel)
        }
        Err(err) => {
            recorder.record(Event::new(Kind::ConnectFail, Step::Connect).with_error(&err));
            warn!("{} Cannot connect to websocket: {}", recorder.id(), err);
            None
        }
    }
}

fn exchange<C: Channel>(recorder: &mut Recorder, channel: &mut C) -> Result<(), DeadlineFailure> {
    if let Some(text) = recorder.test().text_to_send().map(str::to_owned) {
        if send_text(recorder, channel, &text)?.is_break() {
            return Ok(());
        }
    }

    while recorder.result.messages_received < recorder.test().expect_messages {
        if read_message(recorder, channel, Step::ReadMessage, false)?.is_break() {
            return Ok(());
        }
    }

    let close_check = if recorder.test().expect_server_close != 0 {
        read_message(recorder, channel, Step::ExpectedServerClose, false)?
    } else {
        read_message(recorder, channel, Step::UnexpectedServerClose, true)?
    };
    if close_check.is_break() {
        return Ok(());
    }

    client_close(recorder, channel)
}

fn send_text<C: Channel>(recorder: &mut Recorder, channel: &mut C, text: &str) -> StepResult {
    let step = Step::SendText;
    let deadline = Instant::now() + recorder.test().message_write_timeout.get();
    if let Err(source) = channel.set_write_deadline(deadline) {
        recorder.record(Event::new(Kind::SetWriteDeadlineFailed, step).with_error(&source));
        return Err(DeadlineFailure { step, source });
    }
    recorder.record(Event::new(Kind::WriteMessage, step));

    let result = channel.write_text(text);
    match (classify(&result), result) {
        (_, Ok(())) => {
            recorder.record(Event::new(Kind::WriteMessageSuccess, step));
            Ok(ControlFlow::Continue(()))
        }
        (Outcome::PeerClosed(code), Err(err)) => {
            recorder.peer_closed(step, code, &err);
            Ok(ControlFlow::Break(()))
        }
        (outcome, Err(err)) => {
            recorder.record(Event::new(Kind::for_write(outcome), step).with_error(&err));
            warn!("{} write failed: {}", recorder.id(), err);
            debug!("{} {:?}", recorder.id(), err);
            Ok(ControlFlow::Break(()))
        }
    }
}

/// Reads one message. With `ignore_timeout` a timeout is logged and the
/// run goes on; every other failure ends it.
fn read_message<C: Channel>(
    recorder: &mut Recorder,
    channel: &mut C,
    step: Step,
    ignore_timeout: bool,
) -> StepResult {
    let deadline = Instant::now() + recorder.test().message_read_timeout.get();
    if let Err(source) = channel.set_read_deadline(deadline) {
        recorder.record(Event::new(Kind::SetReadDeadlineFailed, step).with_error(&source));
        return Err(DeadlineFailure { step, source });
    }
    recorder.record(Event::new(Kind::ReadMessage, step));

    let result = channel.read_frame();
    match (classify(&result), result) {
        (_, Ok(frame)) => {
            recorder.record(
                Event::new(Kind::ReadMessageSuccess, step).with_value(Value::Integer(frame.opcode())),
            );
            match &frame {
                Frame::Text(text) => debug!("{} {}", recorder.id(), text),
                Frame::Binary(data) => debug!("{} <{} bytes>", recorder.id(), data.len()),
            }
            recorder.receive(frame);
            Ok(ControlFlow::Continue(()))
        }
        (Outcome::PeerClosed(code), Err(err)) => {
            recorder.peer_closed(step, code, &err);
            Ok(ControlFlow::Break(()))
        }
        (Outcome::Timeout, Err(_)) if ignore_timeout => {
            recorder.record(Event::new(Kind::ReadMessageTimeout, step));
            debug!("{} no further message before the read timeout", recorder.id());
            Ok(ControlFlow::Continue(()))
        }
        (outcome, Err(err)) => {
            recorder.record(Event::new(Kind::for_read(outcome), step).with_error(&err));
            warn!("{} read failed during {}: {}", recorder.id(), step, err);
            debug!("{} {:?}", recorder.id(), err);
            Ok(ControlFlow::Break(()))
        }
    }
}

fn client_close<C: Channel>(recorder: &mut Recorder, channel: &mut C) -> Result<(), DeadlineFailure> {
    let step = Step::ClientClose;
    let deadline = Instant::now() + recorder.test().message_write_timeout.get();
    if let Err(source) = channel.set_write_deadline(deadline) {
        recorder.record(Event::new(Kind::SetWriteDeadlineFailed, step).with_error(&source));
        return Err(DeadlineFailure { step, source });
    }
    recorder.record(Event::new(Kind::ClientCloseConnection, step));
    info!("{} Requesting connection closure", recorder.id());

    match channel.close() {
        Ok(()) => {
            recorder.record(Event::new(Kind::ClientCloseConnectionSuccess, step));
            recorder.result.close_ok = true;
        }
        Err(err) => {
            recorder.record(Event::new(Kind::ClientCloseConnectionFailed, step).with_error(&err));
            warn!("{} Error while closing websocket: {}", recorder.id(), err);
        }
    }
    Ok(())
}
