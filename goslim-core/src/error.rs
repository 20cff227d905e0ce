use std::path::PathBuf;
use thiserror::Error;

pub type SlimResult<T> = Result<T, SlimError>;

#[derive(Debug, Error)]
pub enum SlimError {
    #[error("failed to read '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid ontology '{}' at line {line}: {message}", path.display())]
    Ontology {
        path: PathBuf,
        line: usize,
        message: String,
    },
    #[error("failed to write slim annotations: {0}")]
    Write(#[from] csv::Error),
}

impl SlimError {
    pub(crate) fn io<P: Into<PathBuf>>(path: P, source: std::io::Error) -> SlimError {
        SlimError::Io { path: path.into(), source }
    }
}
