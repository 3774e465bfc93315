use clap::Parser;
use log::{error, info};
use std::process::ExitCode;

use coco_normalize::{convert_dataset, NormalizeArgs};

fn main() -> ExitCode {
    // Initialize the logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = NormalizeArgs::parse();

    info!("Starting COCO dataset normalization...");

    match convert_dataset(&args.to_convert_config()) {
        Ok(summary) => {
            summary.print_summary();
            info!(
                "Normalization completed successfully. Output written to {}",
                summary.annotations_dir.display()
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Failed to normalize dataset: {}", e);
            ExitCode::FAILURE
        }
    }
}
