pub mod serialize;

use crate::app::result::TestResult;
use std::fs;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

const FILE_TIMESTAMP_FORMAT: &str = "%Y-%m-%d__%H%M%S%.f";

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("cannot serialize test result: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("cannot create output directory {path:?}: {source}")]
    CreateDir { path: PathBuf, source: io::Error },
    #[error("cannot write test result to {path:?}: {source}")]
    Write { path: PathBuf, source: io::Error },
}

/// Logs every result record and, with an output directory, writes each one
/// to its own JSON file.
#[derive(Debug, Clone, Default)]
pub struct Reporter {
    dir: Option<PathBuf>,
}

impl Reporter {
    pub fn new(dir: Option<PathBuf>) -> Result<Self, ReportError> {
        if let Some(path) = &dir {
            fs::create_dir_all(path).map_err(|source| ReportError::CreateDir {
                path: path.clone(),
                source,
            })?;
        }
        Ok(Self { dir })
    }

    /// Returns the path of the written file, if any.
    pub fn report(&self, result: &TestResult) -> Result<Option<PathBuf>, ReportError> {
        let data = serde_json::to_string_pretty(result)?;
        let verdict = if result.is_success() { "passed" } else { "failed" };
        info!(
            "{} test '{}' {} in {} with {} events",
            result.id,
            result.test.name,
            verdict,
            result.elapsed(),
            result.log.len()
        );
        info!("{} {}", result.id, data);

        let dir = match &self.dir {
            Some(dir) => dir,
            None => return Ok(None),
        };
        let path = dir.join(file_name(result));
        fs::write(&path, data).map_err(|source| ReportError::Write {
            path: path.clone(),
            source,
        })?;
        debug!("{} result written to {:?}", result.id, path);
        Ok(Some(path))
    }
}

fn file_name(result: &TestResult) -> String {
    let name = result.test.name.replace(|c| c == '/' || c == '\\', "_");
    format!(
        "{}__{}.json",
        name,
        result.started_at.format(FILE_TIMESTAMP_FORMAT)
    )
}
