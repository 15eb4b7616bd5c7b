//! Error types for applying manifests
use std::fmt;
use std::path::PathBuf;

use http::StatusCode;
use thiserror::Error;

/// Errors returned by the entry points of this crate
#[derive(Error, Debug)]
pub enum Error {
    /// The manifest file could not be read.
    #[error("manifest [{}] could not be read: {source}", .path.display())]
    ReadManifest {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The manifest directory could not be listed.
    #[error("manifest directory [{}] could not be read: {source}", .path.display())]
    ReadDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A manifest could not be parsed. Nothing was sent to the cluster.
    #[error("{}", describe_parse(.path, .source))]
    Parse {
        path: Option<PathBuf>,
        #[source]
        source: ParseError,
    },

    /// At least one document could not be applied.
    #[error(transparent)]
    FailToExecute(#[from] FailToExecuteError),
}

fn describe_parse(path: &Option<PathBuf>, source: &ParseError) -> String {
    match path {
        Some(path) => format!("manifest [{}] is malformed: {}", path.display(), source),
        None => format!("manifest is malformed: {}", source),
    }
}

impl From<ParseError> for Error {
    fn from(source: ParseError) -> Self {
        Error::Parse { path: None, source }
    }
}

pub(crate) type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Result type of this crate
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// A manifest document which cannot be turned into API objects
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("document {document} is not well-formed YAML: {source}")]
    Yaml {
        document: usize,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("document {document} is not a mapping")]
    NotAMapping { document: usize },

    #[error("document {document} has no string field `{field}`")]
    MissingField {
        document: usize,
        field: &'static str,
    },

    #[error("document {document} is a list but `items` is not a sequence")]
    InvalidItems { document: usize },
}

/// The `apiVersion` and `kind` of a document do not name a known operation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("no API operation is known for kind [{kind}] in apiVersion [{api_version}]")]
pub struct KindResolutionError {
    pub api_version: String,
    pub kind: String,
}

/// The cluster API rejected a request
///
/// The body is kept exactly as the server sent it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Error from server ({}): {body}", reason(.status))]
pub struct ServerError {
    pub status: StatusCode,
    pub body: String,
}

fn reason(status: &StatusCode) -> &'static str {
    status.canonical_reason().unwrap_or("Unknown")
}

impl ServerError {
    /// Returns the HTTP reason phrase of the response, e.g. `Conflict`.
    pub fn reason(&self) -> &'static str {
        reason(&self.status)
    }
}

/// Failure of a single document within a batch
#[derive(Error, Debug)]
pub enum Failure {
    #[error(transparent)]
    KindResolution(#[from] KindResolutionError),

    #[error(transparent)]
    Server(#[from] ServerError),

    #[error("{kind} cannot be deleted without metadata/name")]
    MissingName { kind: String },

    #[error("request for {kind} [{name}] could not be built: {source}")]
    BuildRequest {
        kind: String,
        name: String,
        #[source]
        source: BoxError,
    },

    #[error("request for {kind} [{name}] failed: {source}")]
    Transport {
        kind: String,
        name: String,
        #[source]
        source: kube::Error,
    },
}

/// All failures of a batch, in the order they occurred
///
/// The textual form concatenates every failure, each terminated by a
/// newline. Identical failures are repeated, not merged.
#[derive(Debug, Default)]
pub struct FailToExecuteError {
    failures: Vec<Failure>,
}

impl FailToExecuteError {
    pub(crate) fn new(failures: Vec<Failure>) -> Self {
        FailToExecuteError { failures }
    }

    /// Returns the recorded failures.
    pub fn failures(&self) -> &[Failure] {
        &self.failures
    }

    /// Consumes the error and returns the recorded failures.
    pub fn into_failures(self) -> Vec<Failure> {
        self.failures
    }
}

impl fmt::Display for FailToExecuteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for failure in &self.failures {
            writeln!(f, "{}", failure)?;
        }
        Ok(())
    }
}

impl std::error::Error for FailToExecuteError {}
