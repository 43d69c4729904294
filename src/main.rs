use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use trustcard::config::{Config, RuntimeConfig};
use trustcard::templates::TemplateLibrary;
use trustcard::{Advisor, BuildRequest};

/// Trust scorecard and build plan service
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP server (default)
    Serve {
        /// Override the bind address from config
        #[arg(long)]
        bind: Option<String>,
    },
    /// Print the offline scorecard for a seed as JSON
    Variant {
        #[arg(long, default_value_t = 1)]
        seed: i64,
        #[arg(long, default_value = "balanced")]
        tone: String,
        #[arg(long, default_value = "")]
        builder: String,
    },
    /// Print a build plan for a brief as JSON
    Build {
        #[arg(long)]
        prompt: String,
        #[arg(long, default_value = "balanced")]
        tone: String,
        #[arg(long, default_value = "")]
        builder: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Env files first so RUST_LOG from .env applies to config warnings too
    trustcard::config::load_env();
    let log_level = RuntimeConfig::load_from_env().log_level;

    // Logs go to stderr so `variant` and `build` output stays clean JSON
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_new(&log_level).unwrap_or_else(|_| EnvFilter::new("trustcard=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut config = Config::load().map_err(|e| {
        eprintln!("Failed to load configuration: {}", e);
        e
    })?;

    match cli.command.unwrap_or(Command::Serve { bind: None }) {
        Command::Serve { bind } => {
            if let Some(bind) = bind {
                config.server.bind = bind;
            }
            tracing::info!("Starting trustcard v{}", env!("CARGO_PKG_VERSION"));
            trustcard::http::start_http_server(config).await?;
        }
        Command::Variant {
            seed,
            tone,
            builder,
        } => {
            let templates = TemplateLibrary::load(config.variants.templates_path.as_deref())?;
            let advisor = Advisor::new(config, templates, None);
            let card = advisor.variant(seed, &tone, &builder);
            println!("{}", serde_json::to_string_pretty(&card)?);
        }
        Command::Build {
            prompt,
            tone,
            builder,
        } => {
            let advisor = Advisor::from_config(config)?;
            let outcome = advisor
                .build(BuildRequest {
                    prompt,
                    tone,
                    builder,
                    history: Vec::new(),
                })
                .await?;
            tracing::info!("Build plan source: {:?}", outcome.source);
            println!("{}", serde_json::to_string_pretty(&outcome.plan)?);
        }
    }

    Ok(())
}
