use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FsError {
    #[error("failed to create directory {0}")]
    CreateDirectoryFailed(PathBuf, #[source] std::io::Error),

    #[error("path {0} has no parent")]
    NoParent(PathBuf),

    #[error("failed to read {0}")]
    ReadFileFailed(PathBuf, #[source] std::io::Error),

    #[error("failed to read permissions of {0}")]
    ReadPermissionsFailed(PathBuf, #[source] std::io::Error),

    #[error("failed to remove file {0}")]
    RemoveFileFailed(PathBuf, #[source] std::io::Error),

    #[error("failed to write {0}")]
    WriteFileFailed(PathBuf, #[source] std::io::Error),

    #[error("failed to write permissions of {0}")]
    WritePermissionsFailed(PathBuf, #[source] std::io::Error),
}
