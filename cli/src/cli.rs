use std::path::PathBuf;

use engine::{ImageSize, Provider};

/// Generate images from a text prompt with OpenAI or Stability AI.
#[derive(Debug, clap::Parser)]
#[command(name = "aiimgen", version)]
pub struct Cli {
    /// Text prompt for image generation
    #[arg(required_unless_present_any = ["config", "set_api_key"])]
    pub prompt: Option<String>,

    /// Output directory for generated images [default: defaults.output_dir]
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Image size, e.g. 1024x1024 or 512x512 [default: defaults.size]
    #[arg(long)]
    pub size: Option<ImageSize>,

    /// Number of images to generate [default: defaults.count]
    #[arg(short, long, value_parser = clap::value_parser!(u32).range(1..))]
    pub count: Option<u32>,

    #[arg(long, value_enum, default_value_t = Provider::OpenAi)]
    pub provider: Provider,

    /// Print the current settings and exit
    #[arg(long)]
    pub config: bool,

    /// Store an API key for a provider and exit
    #[arg(long, num_args = 2, value_names = ["PROVIDER", "KEY"])]
    pub set_api_key: Option<Vec<String>>,
}

/// Run every job of a batch document, one after the other.
#[derive(Debug, clap::Parser)]
#[command(name = "aiimgen-batch", version)]
pub struct BatchCli {
    /// JSON document with a top-level `jobs` array
    pub batch_file: PathBuf,

    /// Output directory, one `job_NNNN` folder per prompt [default: defaults.output_dir]
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Write an example batch document to BATCH_FILE instead of running it
    #[arg(long)]
    pub create_sample: bool,
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[test]
    fn prompt_with_overrides() {
        let cli = Cli::try_parse_from([
            "aiimgen",
            "a red fox",
            "-o",
            "out",
            "--size",
            "512x512",
            "-c",
            "2",
            "--provider",
            "stability",
        ])
        .unwrap();

        assert_eq!(cli.prompt.as_deref(), Some("a red fox"));
        assert_eq!(cli.output, Some(PathBuf::from("out")));
        assert_eq!(cli.size, Some(ImageSize::new(512, 512)));
        assert_eq!(cli.count, Some(2));
        assert_eq!(cli.provider, Provider::Stability);
    }

    #[test]
    fn defaults_are_left_to_the_config() {
        let cli = Cli::try_parse_from(["aiimgen", "a red fox"]).unwrap();
        assert_eq!(cli.output, None);
        assert_eq!(cli.size, None);
        assert_eq!(cli.count, None);
        assert_eq!(cli.provider, Provider::OpenAi);
    }

    #[test]
    fn prompt_is_optional_for_settings_commands() {
        assert!(Cli::try_parse_from(["aiimgen"]).is_err());
        assert!(Cli::try_parse_from(["aiimgen", "--config"]).unwrap().config);

        let cli = Cli::try_parse_from(["aiimgen", "--set-api-key", "openai", "sk-1"]).unwrap();
        assert_eq!(
            cli.set_api_key,
            Some(vec!["openai".to_string(), "sk-1".to_string()])
        );
        assert!(Cli::try_parse_from(["aiimgen", "--set-api-key", "openai"]).is_err());
    }

    #[test]
    fn rejects_bad_values() {
        for args in [
            ["aiimgen", "fox", "--size", "big"],
            ["aiimgen", "fox", "--count", "0"],
            ["aiimgen", "fox", "--provider", "midjourney"],
        ] {
            assert!(Cli::try_parse_from(args).is_err(), "{args:?}");
        }
    }

    #[test]
    fn batch_arguments() {
        let cli = BatchCli::try_parse_from(["aiimgen-batch", "jobs.json", "-o", "out"]).unwrap();
        assert_eq!(cli.batch_file, PathBuf::from("jobs.json"));
        assert_eq!(cli.output, Some(PathBuf::from("out")));
        assert!(!cli.create_sample);
    }
}
