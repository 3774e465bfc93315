//! COCO dataset normalizer
//!
//! This library remaps wide or inconsistent image ids of COCO detection datasets to
//! sequential integers, rewrites image paths to absolute ones and normalizes
//! annotation records. It can also carve a random subset out of a dataset.

pub mod coco;
pub mod config;
pub mod error;
pub mod normalize;
pub mod pipeline;
pub mod remap;
pub mod subset;
pub mod types;
pub mod utils;

// Re-export commonly used types and functions
pub use coco::{Annotation, Dataset, Identifier, Image};
pub use config::{NormalizeArgs, SubsetArgs};
pub use error::{Error, Result};
pub use normalize::{normalize_dataset, ImageRoot};
pub use pipeline::{convert_dataset, extract_subset, ConvertConfig, SubsetConfig};
pub use remap::RemapTable;
pub use subset::sample_subset;
pub use types::{IdSeeds, NormalizeStats};
