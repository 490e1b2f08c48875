use std::path::PathBuf;

/// Errors surfaced by the staging index.
///
/// Every public index operation returns `Result<T, IndexError>`; nothing
/// is silently downgraded. See the write preconditions and atomic-update
/// protocol for which paths produce which variant.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    /// Bad signature, unsupported version, truncated record, a length
    /// prefix overflow, or a digest mismatch.
    #[error("corrupt index: {0}")]
    CorruptIndex(String),

    /// The `<index>.lock` file already exists.
    #[error("Index file is in use")]
    IndexBusy,

    /// Any underlying filesystem failure during read/write/rename/delete.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// `write` was attempted with an entry at a stage other than 0.
    #[error("won't write corrupt index: entry {path:?} at stage {stage}")]
    UnsupportedState { path: String, stage: u8 },

    /// `add`/`remove` of a file not under the working directory.
    #[error("path {path:?} is outside the working directory {workdir:?}")]
    PathOutsideWorkdir { path: PathBuf, workdir: PathBuf },
}

pub type Result<T> = std::result::Result<T, IndexError>;
