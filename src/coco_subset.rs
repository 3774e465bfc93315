use clap::Parser;
use log::{error, info};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::process::ExitCode;

use coco_normalize::{extract_subset, SubsetArgs};

fn main() -> ExitCode {
    // Initialize the logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = SubsetArgs::parse();

    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    info!(
        "Sampling {} images from {}...",
        args.num_samples,
        args.input.display()
    );

    match extract_subset(&args.to_subset_config(), &mut rng) {
        Ok(summary) => {
            info!(
                "Wrote {} images and {} annotations to {}",
                summary.images,
                summary.annotations,
                summary.output_path.display()
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Failed to extract subset: {}", e);
            ExitCode::FAILURE
        }
    }
}
