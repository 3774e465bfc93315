//! Random subset extraction for quick test runs

use log::{info, warn};
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashSet;

use crate::coco::{Dataset, Identifier};
use crate::error::{Error, Result};
use crate::normalize::normalize_annotation;
use crate::remap::{unique_ids, RemapTable};

/// Number of images `test_train.json` gets by default
pub const DEFAULT_NUM_SAMPLES: usize = 100;

/// Draw `num_samples` distinct images uniformly at random and keep only their annotations.
///
/// Selected images keep their source order and are renumbered from 1, as are
/// the retained annotations. Image paths are left as they are. Asking for
/// more images than the dataset holds returns all of them.
pub fn sample_subset<R: Rng + ?Sized>(
    mut dataset: Dataset,
    num_samples: usize,
    rng: &mut R,
) -> Result<Dataset> {
    let images = std::mem::take(&mut dataset.images);
    let annotations = std::mem::take(&mut dataset.annotations);

    let known = unique_ids(&images)?;
    let total = images.len();
    if num_samples > total {
        warn!(
            "Requested {} samples but the dataset only has {} images; taking all of them",
            num_samples, total
        );
    }

    let mut order: Vec<usize> = (0..total).collect();
    order.shuffle(rng);
    order.truncate(num_samples.min(total));
    let picked: HashSet<usize> = order.into_iter().collect();

    // Any annotation pointing outside the dataset is a corrupt source, selected or not
    for (index, annotation) in annotations.iter().enumerate() {
        if !known.contains(&annotation.image_id) {
            return Err(Error::UnknownImageId {
                annotation: index,
                image_id: annotation.image_id.clone(),
            });
        }
    }

    let mut selected: Vec<_> = images
        .into_iter()
        .enumerate()
        .filter(|(index, _)| picked.contains(index))
        .map(|(_, image)| image)
        .collect();

    let table = RemapTable::build(&selected, 1)?;
    let selected_ids: HashSet<Identifier> =
        selected.iter().map(|image| image.id.clone()).collect();
    table.apply(&mut selected)?;

    let mut kept = Vec::new();
    for (index, mut annotation) in annotations.into_iter().enumerate() {
        if !selected_ids.contains(&annotation.image_id) {
            continue;
        }
        let new_id = kept.len() as u64 + 1;
        normalize_annotation(&mut annotation, new_id, &table, index)?;
        kept.push(annotation);
    }

    info!(
        "Sampled {} of {} images with {} annotations",
        selected.len(),
        total,
        kept.len()
    );

    dataset.images = selected;
    dataset.annotations = kept;
    Ok(dataset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coco::{Annotation, Image};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashMap;

    // Image i gets i % 4 annotations, so some images have none
    fn dataset(num_images: u64) -> Dataset {
        let images = (0..num_images)
            .map(|i| Image::new(10_000_000 + i, format!("seq/{:05}.jpg", i)))
            .collect();
        let annotations = (0..num_images)
            .flat_map(|i| (0..i % 4).map(move |k| (i, k)))
            .map(|(i, k)| {
                let bbox = [0.0, 0.0, k as f64 + 1.0, 2.0];
                let mut annotation = Annotation::new(10_000_000 + i, bbox);
                annotation.iscrowd = Some(k == 2);
                annotation
            })
            .collect();
        Dataset::new(images, annotations)
    }

    #[test]
    fn test_subset_of_500_images() {
        let source = dataset(500);
        let mut rng = StdRng::seed_from_u64(42);

        let subset = sample_subset(source.clone(), 100, &mut rng).unwrap();

        assert_eq!(subset.images.len(), 100);
        let ids: Vec<_> = subset.images.iter().map(|i| i.id.as_u64().unwrap()).collect();
        assert_eq!(ids, (1..=100).collect::<Vec<_>>());

        // file_name identifies the source image, since paths are not rewritten
        let new_by_name: HashMap<&str, u64> = subset
            .images
            .iter()
            .map(|i| (i.file_name.as_str(), i.id.as_u64().unwrap()))
            .collect();
        let old_by_id: HashMap<&Identifier, &str> = source
            .images
            .iter()
            .map(|i| (&i.id, i.file_name.as_str()))
            .collect();

        let expected: Vec<u64> = source
            .annotations
            .iter()
            .filter_map(|a| new_by_name.get(old_by_id[&a.image_id]).copied())
            .collect();
        let actual: Vec<u64> = subset
            .annotations
            .iter()
            .map(|a| a.image_id.as_u64().unwrap())
            .collect();
        assert_eq!(actual, expected);

        let annotation_ids: Vec<u64> = subset
            .annotations
            .iter()
            .map(|a| a.id.as_ref().and_then(Identifier::as_u64).unwrap())
            .collect();
        assert_eq!(
            annotation_ids,
            (1..=subset.annotations.len() as u64).collect::<Vec<_>>()
        );

        for annotation in &subset.annotations {
            assert_eq!(annotation.iscrowd, Some(false));
            assert_eq!(
                annotation.area,
                Some(annotation.bbox[2] * annotation.bbox[3])
            );
        }
    }

    #[test]
    fn test_selection_keeps_source_order() {
        let mut rng = StdRng::seed_from_u64(7);

        let subset = sample_subset(dataset(50), 10, &mut rng).unwrap();

        let names: Vec<_> = subset.images.iter().map(|i| i.file_name.clone()).collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
    }

    #[test]
    fn test_oversized_request_is_capped() {
        let mut rng = StdRng::seed_from_u64(1);

        let subset = sample_subset(dataset(5), 100, &mut rng).unwrap();

        assert_eq!(subset.images.len(), 5);
        // 0 + 1 + 2 + 3 + 0
        assert_eq!(subset.annotations.len(), 6);
    }

    #[test]
    fn test_same_seed_same_subset() {
        let first = sample_subset(dataset(200), 20, &mut StdRng::seed_from_u64(3)).unwrap();
        let second = sample_subset(dataset(200), 20, &mut StdRng::seed_from_u64(3)).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn test_dangling_annotation_fails() {
        let mut source = dataset(10);
        source
            .annotations
            .push(Annotation::new(Identifier::Text("ghost".into()), [0.0; 4]));

        let err = sample_subset(source, 3, &mut StdRng::seed_from_u64(0)).unwrap_err();

        assert!(matches!(err, Error::UnknownImageId { .. }));
    }
}
