use std::process::ExitCode;

use aiimgen::{cli::BatchCli, init_logging, load_config, write_sample_batch};
use clap::Parser;
use color_eyre::Result;
use engine::{BatchRunner, GeneratorRegistry};
use log::error;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    color_eyre::install()?;
    init_logging();
    let args = BatchCli::parse();

    if args.create_sample {
        write_sample_batch(&args.batch_file)?;
        println!("Sample batch file created: {}", args.batch_file.display());
        println!("Edit this file with your own prompts and run it with:");
        println!("aiimgen-batch {}", args.batch_file.display());
        return Ok(ExitCode::SUCCESS);
    }

    let config = load_config()?;
    let output_dir = args.output.unwrap_or_else(|| config.defaults().output_dir);
    let runner = BatchRunner::new(GeneratorRegistry::from_config(&config));

    match runner.run(&args.batch_file, &output_dir).await {
        Ok(report) => {
            println!("\n=== Batch Processing Complete ===");
            println!("{report}");
            Ok(if report.succeeded() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Err(e) => {
            error!("{e}");
            Ok(ExitCode::FAILURE)
        }
    }
}
