//! A transport that plays back canned results, for driving the engine
//! through paths a real server can't reliably produce.

use crate::connection::{Channel, Dialer, Frame, TransportError};
use std::collections::VecDeque;
use std::io;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Default)]
pub struct ScriptedDialer {
    pub connect: Option<TransportError>,
    /// Played back in order, a drained script times out.
    pub reads: Vec<Result<Frame, TransportError>>,
    pub write: Option<TransportError>,
    pub close: Option<TransportError>,
    pub refuse_deadlines: bool,
}

#[derive(Debug)]
pub struct ScriptedChannel {
    reads: VecDeque<Result<Frame, TransportError>>,
    write: Option<TransportError>,
    close: Option<TransportError>,
    refuse_deadlines: bool,
}

impl ScriptedDialer {
    pub fn reading(reads: Vec<Result<Frame, TransportError>>) -> Self {
        Self {
            reads,
            ..Self::default()
        }
    }

    pub fn refusing(err: TransportError) -> Self {
        Self {
            connect: Some(err),
            ..Self::default()
        }
    }
}

impl Dialer for ScriptedDialer {
    type Channel = ScriptedChannel;

    fn dial(&self, _url: &str, _timeout: Duration) -> Result<ScriptedChannel, TransportError> {
        if let Some(err) = &self.connect {
            return Err(err.clone());
        }
        Ok(ScriptedChannel {
            reads: self.reads.iter().cloned().collect(),
            write: self.write.clone(),
            close: self.close.clone(),
            refuse_deadlines: self.refuse_deadlines,
        })
    }
}

impl ScriptedChannel {
    fn deadline(&self) -> io::Result<()> {
        if self.refuse_deadlines {
            Err(io::Error::new(io::ErrorKind::Other, "deadlines not supported"))
        } else {
            Ok(())
        }
    }
}

impl Channel for ScriptedChannel {
    fn set_read_deadline(&mut self, _deadline: Instant) -> io::Result<()> {
        self.deadline()
    }

    fn set_write_deadline(&mut self, _deadline: Instant) -> io::Result<()> {
        self.deadline()
    }

    fn read_frame(&mut self) -> Result<Frame, TransportError> {
        self.reads.pop_front().unwrap_or(Err(TransportError::Timeout))
    }

    fn write_text(&mut self, _text: &str) -> Result<(), TransportError> {
        self.write.clone().map_or(Ok(()), Err)
    }

    fn close(&mut self) -> Result<(), TransportError> {
        self.close.clone().map_or(Ok(()), Err)
    }
}
