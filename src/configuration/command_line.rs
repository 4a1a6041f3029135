use crate::configuration::constants::{cargo_env::CARGO_PKG_NAME, command_line_test};
use crate::configuration::manifest::{Manifest, ManifestError, TestDefinition};
use clap::arg_enum;
use log::LevelFilter;
use std::path::PathBuf;
use structopt::StructOpt;

arg_enum! {
    #[derive(Debug)]
    pub enum LogLevel {
        Off, Error, Warn, Info, Debug, Trace,
    }
}

#[derive(StructOpt, Debug)]
#[structopt(name = CARGO_PKG_NAME)]
pub struct Opt {
    /// ws/wss url to test
    #[structopt(long = "test.url")]
    pub url: Option<String>,

    /// Tests file to load urls/rules from. Supported: YAML, JSON, TOML, HJSON.
    /// Either a bare list of tests or a map with the list under `tests`
    #[structopt(long, parse(from_os_str))]
    pub tests: Option<PathBuf>,

    /// Directory to output result files into
    #[structopt(long, parse(from_os_str))]
    pub dir: Option<PathBuf>,

    /// Number of times to run each test (0=run forever)
    #[structopt(short = "n", long = "runs", default_value = "1")]
    pub runs: u64,

    /// Sets a logging level
    #[structopt(case_insensitive = true, long, short = "L", possible_values = &LogLevel::variants(), env = "LOG_LEVEL")]
    pub logging: Option<LogLevel>,

    /// File to which application will write logs
    #[structopt(long, short = "O", env = "LOG_OUTPUT_FILE")]
    pub log_output_file: Option<PathBuf>,
}

impl Opt {
    /// Takes the requested log level out of the options, Info if unset.
    pub fn take_log_level(&mut self) -> LevelFilter {
        self.logging.take().unwrap_or(LogLevel::Info).into()
    }

    /// Collects the tests to run, either the single ad hoc `--test.url`
    /// test or the contents of the `--tests` file.
    pub fn resolve_tests(&self) -> Result<Vec<TestDefinition>, ManifestError> {
        let tests = match (&self.url, &self.tests) {
            (Some(_), Some(_)) => return Err(ManifestError::Conflicting),
            (Some(url), None) => vec![command_line_definition(url)?],
            (None, Some(file)) => Manifest::load(file.clone())?.tests,
            (None, None) => Vec::new(),
        };
        if tests.is_empty() {
            return Err(ManifestError::Empty);
        }
        Ok(tests)
    }
}

fn command_line_definition(url: &str) -> Result<TestDefinition, ManifestError> {
    TestDefinition::builder()
        .name(command_line_test::NAME)
        .url(url)
        .handshake_timeout(command_line_test::HANDSHAKE_TIMEOUT)
        .message_read_timeout(command_line_test::MESSAGE_READ_TIMEOUT)
        .sleep(command_line_test::SLEEP)
        .build()
        .map_err(|err| ManifestError::Definition(err.to_string()))
}

impl Into<LevelFilter> for LogLevel {
    fn into(self) -> LevelFilter {
        match self {
            LogLevel::Off => LevelFilter::Off,
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}
