use clap::Parser;
use indorag::cli::commands::Cli;
use indorag::cli::commands::Commands;
use indorag::cli::handlers;
use indorag::AppConfig;
use indorag::Result;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => AppConfig::from_file(path)?,
        None => AppConfig::load()?,
    };

    if cli.verbose {
        indorag::logging::init_logging_with_level("debug")?;
    } else {
        indorag::logging::init_logging(Some(&config))?;
    }

    match cli.command {
        Commands::Ingest { force } => handlers::handle_ingest_command(&config, force).await,
        Commands::Ask {
            question,
            strategy,
            persona,
            detailed,
        } => {
            if let Some(strategy) = strategy {
                config.reranker.strategy = strategy;
            }
            if let Some(persona) = persona {
                config.persona = persona;
            }
            config.validate()?;
            handlers::handle_ask_command(&config, &question, detailed).await
        }
        Commands::Replay {
            input,
            strategy,
            persona,
            concurrency,
        } => {
            if let Some(strategy) = strategy {
                config.reranker.strategy = strategy;
            }
            if let Some(persona) = persona {
                config.persona = persona;
            }
            if let Some(concurrency) = concurrency {
                config.replay.concurrency = concurrency;
            }
            config.validate()?;
            handlers::handle_replay_command(&config, input).await
        }
        Commands::Eval { file } => handlers::handle_eval_command(&config, file).await,
        Commands::Config => handlers::handle_config_command(&config),
    }
}
