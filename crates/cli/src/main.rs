//! Codeweaver CLI — the main entry point.
//!
//! Commands:
//! - `init`     — Create the config directory and a default config.toml
//! - `serve`    — Start the HTTP gateway
//! - `generate` — One-shot generation, printed to stdout
//! - `config`   — Show the effective configuration

use clap::{Parser, Subcommand};
use codeweaver_core::Language;

mod commands;

#[derive(Parser)]
#[command(
    name = "codeweaver",
    about = "Codeweaver — LLM code generation service",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the config directory and a default config.toml
    Init,

    /// Start the HTTP gateway server
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Generate code once and print it (nothing is stored)
    Generate {
        /// Target language: javascript, python, cpp or java
        #[arg(short, long)]
        language: Language,

        /// What the code should do
        prompt: String,
    },

    /// Show the effective configuration (secrets redacted)
    Config,
}

fn init_tracing(verbose: bool, json: bool) {
    let filter = if verbose { "debug" } else { "info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));

    // Logs go to stderr so `generate` output can be piped.
    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.json_logs);

    match cli.command {
        Commands::Init => commands::init::run().await?,
        Commands::Serve { port } => commands::serve::run(port).await?,
        Commands::Generate { language, prompt } => {
            commands::generate::run(&prompt, language).await?
        }
        Commands::Config => commands::config_cmd::run().await?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_generate() {
        let cli = Cli::try_parse_from([
            "codeweaver",
            "generate",
            "--language",
            "cpp",
            "reverse a string",
        ])
        .unwrap();
        match cli.command {
            Commands::Generate { language, prompt } => {
                assert_eq!(language, Language::Cpp);
                assert_eq!(prompt, "reverse a string");
            }
            _ => panic!("expected generate"),
        }
    }

    #[test]
    fn rejects_unknown_language() {
        assert!(
            Cli::try_parse_from(["codeweaver", "generate", "-l", "rust", "x"]).is_err()
        );
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli =
            Cli::try_parse_from(["codeweaver", "serve", "--port", "8080", "--verbose", "--json-logs"])
                .unwrap();
        assert!(cli.verbose);
        assert!(cli.json_logs);
        assert!(matches!(cli.command, Commands::Serve { port: Some(8080) }));
    }
}
