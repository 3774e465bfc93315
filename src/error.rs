use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::coco::Identifier;

/// Errors raised while normalizing or sampling a COCO dataset
#[derive(Debug, Error)]
pub enum Error {
    #[error("image data root is not set (pass --data-root or set COCO_DATA_ROOT)")]
    MissingImageRoot,

    #[error("image id {image_id} appears more than once")]
    DuplicateImageId { image_id: Identifier },

    #[error("annotation #{annotation} references unknown image id {image_id}")]
    UnknownImageId {
        annotation: usize,
        image_id: Identifier,
    },

    #[error("malformed record: {0}")]
    MalformedRecord(String),

    #[error("failed to read {}: {source}", .path.display())]
    Read { path: PathBuf, source: io::Error },

    #[error("failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("failed to create directory {}: {source}", .path.display())]
    CreateDir { path: PathBuf, source: io::Error },

    #[error("failed to write {}: {source}", .path.display())]
    Write { path: PathBuf, source: io::Error },

    #[error("failed to serialize {}: {source}", .path.display())]
    Serialize {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("{}: {source}", .path.display())]
    InDataset {
        path: PathBuf,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Attach the dataset file the error was raised for
    pub fn in_dataset(self, path: impl Into<PathBuf>) -> Self {
        Error::InDataset {
            path: path.into(),
            source: Box::new(self),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
