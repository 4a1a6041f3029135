use crate::configuration::constants::defaults;
use crate::time::Duration;
use config::{Config, ConfigError, File, FileFormat};
use serde_derive::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// One WebSocket endpoint test.
///
/// Zero durations mean "unset": timeouts fall back to their defaults when
/// the test runs, `max_duration` and `sleep` stay disabled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Builder)]
pub struct TestDefinition {
    /// Test name, used in output file names.
    #[builder(setter(into))]
    pub name: String,

    /// The ws:// or wss:// endpoint to test.
    #[builder(setter(into))]
    pub url: String,

    /// Defaults to 30s.
    #[serde(default)]
    #[builder(setter(into), default)]
    pub handshake_timeout: Duration,

    /// Defaults to 1s.
    #[serde(default)]
    #[builder(setter(into), default)]
    pub message_read_timeout: Duration,

    /// Defaults to 1s.
    #[serde(default)]
    #[builder(setter(into), default)]
    pub message_write_timeout: Duration,

    /// Sent as a text frame right after connecting.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(setter(into, strip_option), default)]
    pub send_text_message: Option<String>,

    /// Number of messages the server has to send.
    #[serde(default)]
    #[builder(default)]
    pub expect_messages: u32,

    /// Close code the server is expected to close with, 1000 is a normal
    /// close. Left at 0 the close code is not checked.
    #[serde(default)]
    #[builder(default)]
    pub expect_server_close: u16,

    /// Fails the test if it takes longer than this. The run is not aborted.
    #[serde(default)]
    #[builder(setter(into), default)]
    pub max_duration: Duration,

    /// Pause between two runs of the same test.
    #[serde(default)]
    #[builder(setter(into), default)]
    pub sleep: Duration,
}

impl TestDefinition {
    pub fn builder() -> TestDefinitionBuilder {
        TestDefinitionBuilder::default()
    }

    /// Fills in unset timeouts.
    pub fn with_defaults(mut self) -> Self {
        if self.handshake_timeout.is_zero() {
            self.handshake_timeout = defaults::HANDSHAKE_TIMEOUT.into();
        }
        if self.message_read_timeout.is_zero() {
            self.message_read_timeout = defaults::MESSAGE_READ_TIMEOUT.into();
        }
        if self.message_write_timeout.is_zero() {
            self.message_write_timeout = defaults::MESSAGE_WRITE_TIMEOUT.into();
        }
        self
    }

    pub fn text_to_send(&self) -> Option<&str> {
        self.send_text_message
            .as_deref()
            .filter(|text| !text.is_empty())
    }
}

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("error loading tests file: {0}")]
    Config(#[from] ConfigError),
    #[error("--test.url and --tests are mutually exclusive")]
    Conflicting,
    #[error("no tests found, use --test.url or --tests to load")]
    Empty,
    #[error("invalid test definition: {0}")]
    Definition(String),
}

/// Tests file. Supported: YAML, JSON, TOML, HJSON.
///
/// The tests live under a `tests` key. YAML and JSON files may also hold a
/// bare list of tests.
#[derive(Debug, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub tests: Vec<TestDefinition>,
}

impl Manifest {
    pub fn load(file: PathBuf) -> Result<Self, ConfigError> {
        let mut config = Config::new();
        match bare_list(&file) {
            Some((wrapped, format)) => config.merge(File::from_str(&wrapped, format))?,
            None => config.merge(File::from(file))?,
        };
        config.try_into()
    }
}

/// Wraps a top level list of tests under the `tests` key.
fn bare_list(file: &Path) -> Option<(String, FileFormat)> {
    let extension = file.extension()?.to_str()?.to_ascii_lowercase();
    let content = fs::read_to_string(file).ok()?;
    match extension.as_str() {
        "yaml" | "yml" => {
            let first = content
                .lines()
                .map(str::trim)
                .find(|line| !line.is_empty() && !line.starts_with('#') && *line != "---")?;
            if first.starts_with('-') {
                let body: Vec<&str> = content
                    .trim_start_matches('\u{feff}')
                    .lines()
                    .filter(|line| line.trim_end() != "---")
                    .collect();
                Some((format!("tests:\n{}", body.join("\n")), FileFormat::Yaml))
            } else {
                None
            }
        }
        "json" if content.trim_start().starts_with('[') => {
            Some((format!("{{\"tests\": {}}}", content), FileFormat::Json))
        }
        _ => None,
    }
}
