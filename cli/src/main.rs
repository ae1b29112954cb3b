use std::process::ExitCode;

use aiimgen::{cli::Cli, config_path, init_logging, load_config, render_settings, set_api_key};
use clap::Parser;
use color_eyre::{
    Result,
    eyre::{bail, eyre},
};
use engine::GenerationRequest;
use log::{error, info};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    color_eyre::install()?;
    init_logging();
    let args = Cli::parse();
    let mut config = load_config()?;

    if let Some(values) = &args.set_api_key {
        let [provider, key] = values.as_slice() else {
            bail!("--set-api-key takes a PROVIDER and a KEY");
        };
        let provider = set_api_key(&mut config, provider, key)?;
        println!("API key for {provider} saved to {}", config_path()?.display());
        return Ok(ExitCode::SUCCESS);
    }

    if args.config {
        println!("Config file: {}", config_path()?.display());
        println!("{}", render_settings(&config)?);
        return Ok(ExitCode::SUCCESS);
    }

    let prompt = args.prompt.ok_or(eyre!("A prompt is required"))?;
    let defaults = config.defaults();
    let request = GenerationRequest {
        prompt,
        size: args.size.unwrap_or(defaults.size),
        count: args.count.unwrap_or(defaults.count),
        output_dir: args.output.unwrap_or(defaults.output_dir),
    };

    info!("Prompt: {}", request.prompt);
    info!("Provider: {}", args.provider);
    info!("Size: {}, Count: {}", request.size, request.count);
    info!("Output: {}", request.output_dir.display());

    let generator = args.provider.make(config.api_key(args.provider));
    let paths = generator.generate(&request).await?;
    if paths.is_empty() {
        error!("No images were generated");
        return Ok(ExitCode::FAILURE);
    }

    for path in paths {
        println!("Saved: {}", path.display());
    }
    Ok(ExitCode::SUCCESS)
}
