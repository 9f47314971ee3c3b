use clap::{Parser, Subcommand};
use discourse_qa::commands::{CollectOptions, ServeOptions, run_collect, serve_retriever};
use discourse_qa::config::{Config, get_config_dir, run_interactive_config, show_config};
use discourse_qa::{QaError, Result};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "discourse-qa")]
#[command(about = "Collects Discourse topics and answers questions from a pre-built embedding index")]
#[command(version)]
struct Cli {
    /// Directory holding config.toml (defaults to the platform config directory)
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure Ollama connection and retriever settings
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
    /// Collect every topic from a Discourse category into a JSON file
    Collect {
        /// Category listing URL to collect from
        #[arg(long)]
        listing_url: Option<String>,
        /// File to write the collected topics to
        #[arg(long)]
        output: Option<PathBuf>,
        /// Fetch pages over plain HTTP instead of rendering them in Chrome
        #[arg(long)]
        no_browser: bool,
    },
    /// Start the HTTP retriever service
    Serve {
        /// Address to listen on (host:port)
        #[arg(long)]
        bind: Option<String>,
        /// Vector index file
        #[arg(long)]
        index: Option<PathBuf>,
        /// Metadata file parallel to the index
        #[arg(long)]
        metadata: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let config_dir = match cli.config_dir {
        Some(dir) => dir,
        None => get_config_dir()?,
    };

    match cli.command {
        Commands::Config { show } => {
            if show {
                show_config(&Config::load(&config_dir)?)?;
            } else {
                run_interactive_config(&config_dir)?;
            }
        }
        Commands::Collect {
            listing_url,
            output,
            no_browser,
        } => {
            let config = Config::load(&config_dir)?;
            let options = CollectOptions {
                listing_url,
                output,
                no_browser,
            };
            run_collect(&config, options)
                .await
                .map_err(|e| QaError::Collector(format!("{:#}", e)))?;
        }
        Commands::Serve {
            bind,
            index,
            metadata,
        } => {
            let config = Config::load(&config_dir)?;
            let options = ServeOptions {
                bind,
                index,
                metadata,
            };
            serve_retriever(&config, options).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    #[test]
    fn collect_command_defaults() {
        let cli = Cli::try_parse_from(["discourse-qa", "collect"]).expect("collect should parse");

        if let Commands::Collect {
            listing_url,
            output,
            no_browser,
        } = cli.command
        {
            assert_eq!(listing_url, None);
            assert_eq!(output, None);
            assert!(!no_browser);
        } else {
            panic!("expected collect command");
        }
        assert_eq!(cli.config_dir, None);
    }

    #[test]
    fn collect_command_with_overrides() {
        let cli = Cli::try_parse_from([
            "discourse-qa",
            "collect",
            "--listing-url",
            "https://discourse.example.com/c/kb/1",
            "--output",
            "topics.json",
            "--no-browser",
        ])
        .expect("collect should parse");

        if let Commands::Collect {
            listing_url,
            output,
            no_browser,
        } = cli.command
        {
            assert_eq!(
                listing_url.as_deref(),
                Some("https://discourse.example.com/c/kb/1")
            );
            assert_eq!(output, Some(PathBuf::from("topics.json")));
            assert!(no_browser);
        } else {
            panic!("expected collect command");
        }
    }

    #[test]
    fn serve_command_with_paths() {
        let cli = Cli::try_parse_from([
            "discourse-qa",
            "serve",
            "--bind",
            "0.0.0.0:9000",
            "--index",
            "idx.json",
            "--metadata",
            "meta.json",
        ])
        .expect("serve should parse");

        if let Commands::Serve {
            bind,
            index,
            metadata,
        } = cli.command
        {
            assert_eq!(bind.as_deref(), Some("0.0.0.0:9000"));
            assert_eq!(index, Some(PathBuf::from("idx.json")));
            assert_eq!(metadata, Some(PathBuf::from("meta.json")));
        } else {
            panic!("expected serve command");
        }
    }

    #[test]
    fn config_dir_is_global() {
        let cli = Cli::try_parse_from(["discourse-qa", "serve", "--config-dir", "/tmp/qa"])
            .expect("global flag should parse after subcommand");
        assert_eq!(cli.config_dir, Some(PathBuf::from("/tmp/qa")));
    }

    #[test]
    fn config_show_flag() {
        let cli = Cli::try_parse_from(["discourse-qa", "config", "--show"])
            .expect("config should parse");
        assert!(matches!(cli.command, Commands::Config { show: true }));
    }

    #[test]
    fn invalid_command() {
        let err = Cli::try_parse_from(["discourse-qa", "index"])
            .err()
            .expect("unknown subcommand should fail");
        assert_eq!(err.kind(), ErrorKind::InvalidSubcommand);
    }

    #[test]
    fn help_message() {
        let err = Cli::try_parse_from(["discourse-qa", "--help"])
            .err()
            .expect("help should short-circuit");
        assert_eq!(err.kind(), ErrorKind::DisplayHelp);
    }
}
