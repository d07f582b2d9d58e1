use std::sync::Arc;

use anyhow::{Context as AnyhowContext, Result};
use clap::Parser;
use serde_json::json;

use promptdeck::{
    cli::{Cli, Commands, PatternsArgs, ServeArgs, TokenAction, TokenArgs},
    config::DeckConfig,
    dispatch::Dispatcher,
    patterns::PatternKey,
    scheduler::{SystemClock, TokioScheduler},
    server::{self, DeckState, ServeOptions},
    templating::HandlebarsRenderer,
    tokens::TokenStore,
    tracing_setup,
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let _log_guard = tracing_setup::init(cli.verbose, cli.log_json);
    match cli.command {
        Commands::Serve(args) => serve_command(args).await?,
        Commands::Patterns(args) => patterns_command(args)?,
        Commands::Token(args) => token_command(args)?,
    }
    Ok(())
}

async fn serve_command(args: ServeArgs) -> Result<()> {
    let config = match &args.config {
        Some(path) => DeckConfig::from_path(path)?,
        None => DeckConfig::default(),
    };

    let dispatcher = Dispatcher::new(
        Arc::new(TokioScheduler::new()),
        Arc::new(SystemClock::new()),
        Arc::new(HandlebarsRenderer::new()),
        config.dispatch_options(),
    );
    let options = ServeOptions {
        default_limit: config.serve.default_limit,
        poll_interval: config.poll_interval(),
    };
    let state = DeckState::new(dispatcher, config.models.clone(), options);

    tracing::info!(addr = %args.addr, default_model = %config.default_model, "starting deck server");
    server::run(args.addr, state).await
}

fn patterns_command(args: PatternsArgs) -> Result<()> {
    if args.json {
        let patterns: Vec<_> = PatternKey::ALL
            .into_iter()
            .map(|key| {
                json!({
                    "key": key.as_str(),
                    "name": key.display_name(),
                    "category": key.category().label(),
                    "template": key.template(),
                })
            })
            .collect();
        println!(
            "{}",
            serde_json::to_string_pretty(&json!({ "patterns": patterns }))?
        );
    } else {
        let mut current_category = None;
        for key in PatternKey::ALL {
            let category = key.category();
            if current_category != Some(category) {
                println!("{}:", category.label());
                current_category = Some(category);
            }
            println!("  {:<28} {}", key.as_str(), key.display_name());
        }
    }
    Ok(())
}

fn token_command(args: TokenArgs) -> Result<()> {
    let store = TokenStore::open(None).context("Failed to open token store")?;
    match args.action {
        TokenAction::Set { provider, token } => {
            store.set(&provider, &token)?;
            println!("Stored token for {provider}.");
        }
        TokenAction::Get { provider } => match store.get(&provider)? {
            Some(token) => println!("{token}"),
            None => println!("No token stored for {provider}."),
        },
        TokenAction::Remove { provider } => {
            store.remove(&provider)?;
            println!("Removed token for {provider}.");
        }
        TokenAction::List => {
            let entries = store.list()?;
            if entries.is_empty() {
                println!("No tokens stored yet.");
            } else {
                for entry in entries {
                    println!("{} (updated {})", entry.provider, entry.updated_at);
                }
            }
        }
    }
    Ok(())
}
