// Error taxonomy shared by the locator, the converter and the streamer.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Failure of a single converter run.
#[derive(Error, Debug)]
pub enum ConversionError {
    #[error("failed to launch converter: {0}")]
    Launch(#[source] std::io::Error),

    #[error("converter exited with {}", exit_label(.0))]
    ExitStatus(Option<i32>),

    #[error("converter did not finish within {0:?}")]
    TimedOut(Duration),

    #[error("converter exited successfully but wrote no output")]
    MissingOutput,

    #[error("failed to finalize converter output: {0}")]
    Finalize(#[source] std::io::Error),
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {}", code),
        None => "a signal".to_string(),
    }
}

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("{0}")]
    BadRequest(String),

    #[error("invalid resource identifier {0:?}")]
    InvalidIdentifier(String),

    #[error("Directory {0} not found")]
    DirectoryNotFound(String),

    #[error("File {file} not found in {id}")]
    InputNotFound { id: String, file: String },

    #[error("File not found")]
    ArtifactNotFound(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("conversion of {0} already in progress")]
    ConversionInProgress(String),

    #[error(transparent)]
    Conversion(#[from] ConversionError),

    #[error("timed out opening {0}")]
    OpenTimedOut(PathBuf),

    #[error("range not satisfiable")]
    RangeNotSatisfiable { total: u64 },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type GatewayResult<T> = Result<T, GatewayError>;
