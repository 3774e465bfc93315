use clap::Parser;
use std::path::PathBuf;
use std::str::FromStr;

use crate::pipeline::{ConvertConfig, SubsetConfig, SUBSET_OUTPUT};
use crate::subset::DEFAULT_NUM_SAMPLES;

/// Remap image ids, absolutize image paths and normalize annotations of a train/val COCO pair.
#[derive(Parser, Debug, Clone)]
#[command(version, long_about = None)]
pub struct NormalizeArgs {
    /// COCO annotation file of the training split
    #[arg(long = "train")]
    pub train: PathBuf,

    /// COCO annotation file of the validation split
    #[arg(long = "val")]
    pub val: PathBuf,

    /// Name of the dataset directory created under datasets/
    #[arg(long = "dataset-name")]
    pub dataset_name: String,

    /// Directory whose Images/ subdirectory holds the image files
    #[arg(long = "data-root", env = "COCO_DATA_ROOT")]
    pub data_root: Option<PathBuf>,

    /// Directory under which datasets/<dataset-name>/annotations is written
    #[arg(long = "output-root", default_value = ".")]
    pub output_root: PathBuf,
}

impl NormalizeArgs {
    pub fn to_convert_config(&self) -> ConvertConfig {
        ConvertConfig {
            train_path: self.train.clone(),
            val_path: self.val.clone(),
            dataset_name: self.dataset_name.clone(),
            data_root: self.data_root.clone(),
            output_root: self.output_root.clone(),
        }
    }
}

/// Carve a small random subset out of a COCO annotation file.
#[derive(Parser, Debug, Clone)]
#[command(version, long_about = None)]
pub struct SubsetArgs {
    /// COCO annotation file to sample from
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,

    /// Number of images to keep
    #[arg(
        short = 'n',
        long = "num-samples",
        default_value_t = DEFAULT_NUM_SAMPLES,
        value_parser = validate_sample_count
    )]
    pub num_samples: usize,

    /// Where to write the subset
    #[arg(short = 'o', long = "output", default_value = SUBSET_OUTPUT)]
    pub output: PathBuf,

    /// Seed for random sampling; a fresh one is drawn when omitted
    #[arg(long = "seed")]
    pub seed: Option<u64>,
}

impl SubsetArgs {
    pub fn to_subset_config(&self) -> SubsetConfig {
        SubsetConfig {
            input_path: self.input.clone(),
            num_samples: self.num_samples,
            output_path: self.output.clone(),
        }
    }
}

// Validate that the sample count is a positive integer
fn validate_sample_count(s: &str) -> Result<usize, String> {
    match usize::from_str(s) {
        Ok(val) if val > 0 => Ok(val),
        _ => Err("NUM_SAMPLES must be a positive integer".to_string()),
    }
}
