use std::io;

use apk_res_table::TableError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ResourceError {
    /// Generic I/O error while trying to read data
    #[error(transparent)]
    Io(#[from] io::Error),

    /// Error occurred while building a resource table
    #[error("got error while building resource table")]
    Table(#[from] TableError),

    /// Malformed source description
    #[error("got error while reading source description")]
    Json(#[from] serde_json::Error),

    /// Resource data is inconsistent, e.g. a cyclic style hierarchy
    #[error("corrupt resource data: {0}")]
    CorruptData(String),

    /// Got invalid input from the caller
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Output buffer can't hold the result
    #[error("buffer too small: need {needed} entries, got {got}")]
    BufferTooSmall { needed: usize, got: usize },

    /// Handle was closed, destroyed or belongs to another owner
    #[error("stale or closed handle")]
    StaleHandle,

    /// Theme used with an asset manager it was not created for
    #[error("theme belongs to a different asset manager")]
    WrongRegistry,
}
