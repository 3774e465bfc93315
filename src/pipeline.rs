//! Train/val conversion and subset extraction over dataset files
//!
//! Each file is read whole, transformed in memory and only then written
//! through a temporary file that is renamed into place, so a failing stage
//! never leaves a half-written output. Stages that already finished keep
//! their output.

use log::{debug, info};
use rand::Rng;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

use crate::coco::Dataset;
use crate::error::{Error, Result};
use crate::normalize::{normalize_dataset, ImageRoot};
use crate::subset::sample_subset;
use crate::types::{IdSeeds, NormalizeStats};
use crate::utils::{create_output_directory, create_progress_bar};

pub const TRAIN_OUTPUT: &str = "instances_train.json";
pub const VAL_OUTPUT: &str = "instances_val.json";
pub const SUBSET_OUTPUT: &str = "test_train.json";

/// Inputs of a full train + val conversion
#[derive(Debug, Clone)]
pub struct ConvertConfig {
    pub train_path: PathBuf,
    pub val_path: PathBuf,
    pub dataset_name: String,
    /// Directory holding `Images/`; `None` fails the conversion before anything is written
    pub data_root: Option<PathBuf>,
    /// Directory under which `datasets/<dataset_name>/annotations` is created
    pub output_root: PathBuf,
}

#[derive(Debug, Clone)]
pub struct ConvertSummary {
    pub annotations_dir: PathBuf,
    pub train: NormalizeStats,
    pub val: NormalizeStats,
}

impl ConvertSummary {
    pub fn print_summary(&self) {
        self.train.print_summary("Train");
        self.val.print_summary("Val");
    }
}

/// Inputs of a subset extraction
#[derive(Debug, Clone)]
pub struct SubsetConfig {
    pub input_path: PathBuf,
    pub num_samples: usize,
    pub output_path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubsetSummary {
    pub output_path: PathBuf,
    pub images: usize,
    pub annotations: usize,
}

/// `<output_root>/datasets/<dataset_name>/annotations`
pub fn annotations_dir(output_root: &Path, dataset_name: &str) -> PathBuf {
    output_root
        .join("datasets")
        .join(dataset_name)
        .join("annotations")
}

/// Read and parse a COCO dataset file
pub fn load_dataset(path: &Path) -> Result<Dataset> {
    info!("Loading {}...", path.display());
    let file = File::open(path).map_err(|source| Error::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_reader(BufReader::new(file)).map_err(|source| Error::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Serialize a dataset as compact JSON
pub fn write_dataset(path: &Path, dataset: &Dataset) -> Result<()> {
    info!("Saving {}...", path.display());
    write_atomically(path, |writer| {
        serde_json::to_writer(writer, dataset).map_err(|source| Error::Serialize {
            path: path.to_path_buf(),
            source,
        })
    })
}

// Fill a temporary file next to `path` and rename it into place once complete
fn write_atomically<F>(path: &Path, fill: F) -> Result<()>
where
    F: FnOnce(&mut dyn Write) -> Result<()>,
{
    let write_error = |source: io::Error| Error::Write {
        path: path.to_path_buf(),
        source,
    };
    let dir = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let mut file = NamedTempFile::new_in(dir).map_err(write_error)?;
    {
        let mut writer = BufWriter::new(file.as_file_mut());
        fill(&mut writer)?;
        writer.flush().map_err(write_error)?;
    }
    file.persist(path).map_err(|e| write_error(e.error))?;
    Ok(())
}

/// Normalize the train file, then the val file continuing its ids.
///
/// The train output stays on disk if the val stage fails.
pub fn convert_dataset(config: &ConvertConfig) -> Result<ConvertSummary> {
    let root = ImageRoot::resolve(config.data_root.as_deref())?;
    debug!("Rewriting image paths under {}", root.images_dir().display());

    let annotations_dir = create_output_directory(&annotations_dir(
        &config.output_root,
        &config.dataset_name,
    ))?;

    let train = convert_split(
        &config.train_path,
        &annotations_dir.join(TRAIN_OUTPUT),
        &root,
        IdSeeds::default(),
        "Train",
    )?;
    let val = convert_split(
        &config.val_path,
        &annotations_dir.join(VAL_OUTPUT),
        &root,
        train.next_seeds(),
        "Val",
    )?;

    Ok(ConvertSummary {
        annotations_dir,
        train,
        val,
    })
}

fn convert_split(
    source: &Path,
    destination: &Path,
    root: &ImageRoot,
    seeds: IdSeeds,
    label: &str,
) -> Result<NormalizeStats> {
    let mut dataset = load_dataset(source)?;
    debug!(
        "{}: {} images, {} annotations",
        label,
        dataset.images.len(),
        dataset.annotations.len()
    );

    let pb = create_progress_bar(
        (dataset.images.len() + dataset.annotations.len()) as u64,
        label,
    );
    let stats = normalize_dataset(&mut dataset, root, seeds, &pb)
        .map_err(|e| e.in_dataset(source))?;
    pb.finish_with_message(format!("{} processing complete", label));

    write_dataset(destination, &dataset)?;
    Ok(stats)
}

/// Sample a subset of one dataset file and write it out
pub fn extract_subset<R: Rng + ?Sized>(
    config: &SubsetConfig,
    rng: &mut R,
) -> Result<SubsetSummary> {
    let dataset = load_dataset(&config.input_path)?;
    let subset = sample_subset(dataset, config.num_samples, rng)
        .map_err(|e| e.in_dataset(&config.input_path))?;
    write_dataset(&config.output_path, &subset)?;

    Ok(SubsetSummary {
        output_path: config.output_path.clone(),
        images: subset.images.len(),
        annotations: subset.annotations.len(),
    })
}
