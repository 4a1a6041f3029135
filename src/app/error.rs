use crate::app::event::Step;
use crate::app::result::TestResult;
use std::io;
use thiserror::Error;

/// Errors that abort a run. Protocol level failures are never raised, they
/// end up in the result log.
#[derive(Debug, Error)]
pub enum Error {
    #[error("test name cannot be empty")]
    EmptyName,
    #[error("cannot generate run id: {0}")]
    Identifier(String),
    /// The transport refused a deadline. Carries what the run recorded so far.
    #[error("cannot set deadline during {step}: {source}")]
    Deadline {
        step: Step,
        source: io::Error,
        result: Box<TestResult>,
    },
}
