use std::path::PathBuf;

/// Errors raised while extracting a subset or building a census
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse annotation file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("duplicate {kind} id {id}")]
    DuplicateId { kind: &'static str, id: u64 },

    #[error("annotation {annotation_id} references missing {kind} {id}")]
    DanglingReference {
        annotation_id: u64,
        kind: &'static str,
        id: u64,
    },

    #[error("no category with id {id} in the annotation file")]
    UnknownCategory { id: u64 },

    #[error("category name {name:?} cannot be written as an unquoted CSV field")]
    UnrepresentableName { name: String },

    #[error("failed to copy {} to {}: {source}", .from.display(), .to.display())]
    Copy {
        from: PathBuf,
        to: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write CSV report: {0}")]
    Csv(#[from] csv::Error),

    #[error("failed to build the copy thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("invalid category counts: {0}")]
    InvalidCounts(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
