pub(crate) mod assert;
pub(crate) mod cancel;
pub(crate) mod engine;
pub(crate) mod error;
pub(crate) mod event;
pub(crate) mod result;
#[cfg(test)]
pub(crate) mod scripted;

use crate::app::cancel::Cancellation;
use crate::app::engine::Engine;
use crate::app::error::Error;
use crate::configuration::manifest::TestDefinition;
use crate::connection::Dialer;
use crate::reporter::{ReportError, Reporter};
use std::process::exit;
use std::sync::Arc;
use std::thread;

/// Runs every test on its own thread, `runs` times each (0 = until
/// cancelled).
pub struct App<D> {
    tests: Vec<TestDefinition>,
    runs: u64,
    engine: Arc<Engine<D>>,
    reporter: Arc<Reporter>,
    cancellation: Cancellation,
}

/// Repeat loop of a single test.
struct Worker<D> {
    test: TestDefinition,
    runs: u64,
    engine: Arc<Engine<D>>,
    reporter: Arc<Reporter>,
    cancellation: Cancellation,
}

impl<D> App<D>
where
    D: Dialer + Send + Sync + 'static,
{
    pub fn new(
        engine: Engine<D>,
        reporter: Reporter,
        tests: Vec<TestDefinition>,
        runs: u64,
        cancellation: Cancellation,
    ) -> Self {
        App {
            tests,
            runs,
            engine: Arc::new(engine),
            reporter: Arc::new(reporter),
            cancellation,
        }
    }

    pub fn run(self) {
        info!("Registered {} tests", self.tests.len());
        let mut handles = Vec::with_capacity(self.tests.len());
        for test in self.tests {
            let worker = Worker {
                test,
                runs: self.runs,
                engine: Arc::clone(&self.engine),
                reporter: Arc::clone(&self.reporter),
                cancellation: self.cancellation.clone(),
            };
            handles.push(thread::spawn(move || {
                if let Err(err) = worker.run() {
                    error!("Failed to report test result: {}", err);
                    exit(1);
                }
            }));
        }
        for handle in handles {
            if handle.join().is_err() {
                error!("Test worker panicked");
            }
        }
    }
}

impl<D: Dialer> Worker<D> {
    /// Returns the number of completed runs.
    fn run(&self) -> Result<u64, ReportError> {
        let mut completed = 0;
        while self.runs == 0 || completed < self.runs {
            if self.cancellation.is_cancelled() {
                info!("Test '{}' cancelled after {} runs", self.test.name, completed);
                break;
            }
            self.run_once()?;
            completed += 1;

            let last = self.runs != 0 && completed >= self.runs;
            if !last && !self.cancellation.sleep(self.test.sleep.get()) {
                info!("Test '{}' cancelled after {} runs", self.test.name, completed);
                break;
            }
        }
        Ok(completed)
    }

    fn run_once(&self) -> Result<(), ReportError> {
        let result = match self.engine.run(&self.test, &self.cancellation) {
            Ok(result) => result,
            Err(Error::Deadline { step, source, result }) => {
                error!("{} cannot set deadline during {}: {}", result.id, step, source);
                *result
            }
            Err(err) => {
                error!("Test '{}' could not run: {}", self.test.name, err);
                return Ok(());
            }
        };
        if !result.is_success() {
            warn!("{} TEST UNSUCCESSFUL", result.id);
        }
        self.reporter.report(&result)?;
        Ok(())
    }
}
