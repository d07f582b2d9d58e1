use std::{net::SocketAddr, path::PathBuf};

use clap::{Args, Parser, Subcommand};

/// Promptdeck CLI definition.
#[derive(Debug, Parser)]
#[command(name = "promptdeck")]
#[command(about = "Prompt comparison workbench", version)]
pub struct Cli {
    /// Verbose (debug-level) logging.
    #[arg(long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run the HTTP API for the workbench UI.
    Serve(ServeArgs),
    /// List the prompting-pattern library.
    Patterns(PatternsArgs),
    /// Manage locally stored provider API tokens.
    Token(TokenArgs),
}

#[derive(Debug, Args, Clone)]
pub struct ServeArgs {
    #[arg(
        long,
        default_value = "127.0.0.1:8787",
        help = "Address to bind the API server on"
    )]
    pub addr: SocketAddr,

    #[arg(long, help = "Path to a deck configuration file (YAML)")]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Args, Clone, Default)]
pub struct PatternsArgs {
    #[arg(long, help = "Emit the library as JSON instead of a listing")]
    pub json: bool,
}

#[derive(Debug, Args, Clone)]
pub struct TokenArgs {
    #[command(subcommand)]
    pub action: TokenAction,
}

#[derive(Debug, Subcommand, Clone)]
pub enum TokenAction {
    /// Store (or overwrite) a provider's API token.
    Set { provider: String, token: String },
    /// Print a provider's stored token.
    Get { provider: String },
    /// Remove a provider's stored token.
    Remove { provider: String },
    /// List providers with stored tokens (tokens are not shown).
    List,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn parses_serve_command() {
        let cli = Cli::parse_from([
            "promptdeck",
            "serve",
            "--addr",
            "0.0.0.0:9000",
            "--config",
            "deck.yaml",
            "--verbose",
        ]);

        assert!(cli.verbose);
        match cli.command {
            Commands::Serve(serve) => {
                assert_eq!(serve.addr.port(), 9000);
                assert_eq!(serve.config.unwrap(), PathBuf::from("deck.yaml"));
            }
            _ => panic!("expected serve command"),
        }
    }

    #[test]
    fn parses_token_subcommands() {
        let cli = Cli::parse_from(["promptdeck", "token", "set", "openai", "sk-123"]);
        match cli.command {
            Commands::Token(TokenArgs {
                action: TokenAction::Set { provider, token },
            }) => {
                assert_eq!(provider, "openai");
                assert_eq!(token, "sk-123");
            }
            _ => panic!("expected token set command"),
        }
    }

    #[test]
    fn parses_patterns_json_flag() {
        let cli = Cli::parse_from(["promptdeck", "patterns", "--json"]);
        match cli.command {
            Commands::Patterns(args) => assert!(args.json),
            _ => panic!("expected patterns command"),
        }
    }
}
