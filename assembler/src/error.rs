use std::io;

use thiserror::Error;

/// A document whose blocks cannot be turned into scripts.
#[derive(Error, Debug)]
pub enum AssemblyError {
    #[error("invalid min-server-version \"{value}\" on block at line {line}: expected MAJOR[.MINOR[.PATCH]]")]
    InvalidMinServerVersion { line: usize, value: String },

    #[error("empty group name on block at line {line}")]
    EmptyGroupName { line: usize },
}

/// The interpreter could not be driven at all. A script that runs and fails
/// is not an error; it is an unsuccessful `ExecutionResult`.
#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("failed to start interpreter '{interpreter}': {source}")]
    Spawn {
        interpreter: String,
        #[source]
        source: io::Error,
    },

    #[error("failed waiting for interpreter: {0}")]
    Wait(#[source] io::Error),

    #[error("failed to stop timed out interpreter: {0}")]
    Kill(#[source] io::Error),

    #[error("{0} pipe was not captured")]
    MissingPipe(&'static str),

    #[error("failed reading interpreter {stream}: {source}")]
    Read {
        stream: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("output reader thread panicked")]
    ReaderPanicked,
}
