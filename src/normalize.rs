//! Per-file normalization: image ids and paths, annotation ids, area and crowd flag

use indicatif::ProgressBar;
use log::debug;
use std::path::{Path, PathBuf};

use crate::coco::{Annotation, Dataset, Image};
use crate::error::{Error, Result};
use crate::remap::RemapTable;
use crate::types::{IdSeeds, NormalizeStats};

/// Subdirectory of the data root that holds the image files
pub const IMAGES_SUBDIR: &str = "Images";

/// Absolute location of the image files referenced by `file_name`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRoot {
    images_dir: PathBuf,
}

impl ImageRoot {
    pub fn new(data_root: impl AsRef<Path>) -> Self {
        Self {
            images_dir: data_root.as_ref().join(IMAGES_SUBDIR),
        }
    }

    /// Build the root from an optional configured value; unset and empty are both errors
    pub fn resolve(data_root: Option<&Path>) -> Result<Self> {
        match data_root {
            Some(root) if !root.as_os_str().is_empty() => Ok(Self::new(root)),
            _ => Err(Error::MissingImageRoot),
        }
    }

    pub fn images_dir(&self) -> &Path {
        &self.images_dir
    }

    /// Join a relative image path onto the images directory
    pub fn rewrite(&self, relative: &str) -> String {
        self.images_dir.join(relative).to_string_lossy().into_owned()
    }
}

/// Give `image` its new id and absolute path
pub fn rewrite_image(image: &mut Image, new_id: u64, root: &ImageRoot) {
    image.id = new_id.into();
    image.file_name = root.rewrite(&image.file_name);
}

/// Renumber one annotation and recompute its derived fields.
///
/// `index` is the annotation's position in its source file, used for error reporting.
pub fn normalize_annotation(
    annotation: &mut Annotation,
    new_id: u64,
    table: &RemapTable,
    index: usize,
) -> Result<()> {
    let image_id = table.resolve(index, &annotation.image_id)?;
    let [_, _, width, height] = annotation.bbox;

    annotation.id = Some(new_id.into());
    annotation.image_id = image_id.into();
    annotation.area = Some(width * height);
    annotation.iscrowd = Some(false);
    Ok(())
}

/// Normalize a whole dataset in place, handing out ids from `seeds`.
///
/// On error the dataset is left partly rewritten and should be discarded.
pub fn normalize_dataset(
    dataset: &mut Dataset,
    root: &ImageRoot,
    seeds: IdSeeds,
    pb: &ProgressBar,
) -> Result<NormalizeStats> {
    let table = RemapTable::build(&dataset.images, seeds.image)?;
    debug!(
        "Built remap table for {} images starting at {}",
        table.len(),
        table.seed()
    );

    for image in dataset.images.iter_mut() {
        let new_id = table.image_id(image)?;
        rewrite_image(image, new_id, root);
        pb.inc(1);
    }

    let mut next_annotation_id = seeds.annotation;
    for (index, annotation) in dataset.annotations.iter_mut().enumerate() {
        normalize_annotation(annotation, next_annotation_id, &table, index)?;
        next_annotation_id += 1;
        pb.inc(1);
    }

    Ok(NormalizeStats {
        image_ids: seeds.image..table.next_id(),
        annotation_ids: seeds.annotation..next_annotation_id,
    })
}
