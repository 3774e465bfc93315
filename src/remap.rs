//! Image id remapping
//!
//! Source image ids may be arbitrarily wide numbers or strings. A
//! [`RemapTable`] replaces them with a contiguous run of `u64` ids so the
//! output round-trips through any COCO consumer.

use std::collections::{HashMap, HashSet};

use crate::coco::{Identifier, Image};
use crate::error::{Error, Result};

/// Mapping from source image ids to newly assigned ids, scoped to one dataset
#[derive(Debug, Clone)]
pub struct RemapTable {
    ids: HashMap<Identifier, u64>,
    seed: u64,
}

impl RemapTable {
    /// Assign `seed, seed + 1, ...` to `images` in order.
    ///
    /// Fails on the first image id seen twice.
    pub fn build(images: &[Image], seed: u64) -> Result<Self> {
        let mut ids = HashMap::with_capacity(images.len());
        for (new_id, image) in (seed..).zip(images) {
            if ids.insert(image.id.clone(), new_id).is_some() {
                return Err(Error::DuplicateImageId {
                    image_id: image.id.clone(),
                });
            }
        }
        Ok(Self { ids, seed })
    }

    pub fn get(&self, old: &Identifier) -> Option<u64> {
        self.ids.get(old).copied()
    }

    /// Look up the new id for the image referenced by annotation `annotation`
    pub fn resolve(&self, annotation: usize, old: &Identifier) -> Result<u64> {
        self.get(old).ok_or_else(|| Error::UnknownImageId {
            annotation,
            image_id: old.clone(),
        })
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// First id after the ones this table handed out
    pub fn next_id(&self) -> u64 {
        self.seed + self.ids.len() as u64
    }

    /// New id of an image this table was built from
    pub fn image_id(&self, image: &Image) -> Result<u64> {
        self.get(&image.id).ok_or_else(|| {
            Error::MalformedRecord(format!("image {} is not in the remap table", image.id))
        })
    }

    /// Overwrite the ids of `images` with their new ids
    pub fn apply(&self, images: &mut [Image]) -> Result<()> {
        for image in images.iter_mut() {
            image.id = self.image_id(image)?.into();
        }
        Ok(())
    }
}

/// Collect the ids of `images`, failing on the first duplicate
pub fn unique_ids(images: &[Image]) -> Result<HashSet<&Identifier>> {
    let mut seen = HashSet::with_capacity(images.len());
    for image in images {
        if !seen.insert(&image.id) {
            return Err(Error::DuplicateImageId {
                image_id: image.id.clone(),
            });
        }
    }
    Ok(seen)
}
