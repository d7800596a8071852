// empathy command line front-ends
// Emotion-aware chat on the console, on a VTube Studio avatar or in the browser

use anyhow::Result;
use clap::{Parser, Subcommand};
use empathy_cli::{app, console, logging, web, AppConfig};
use empathy_core::Classifier;
use empathy_me::StaticServer;
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::BufReader;
use tracing::info;

#[derive(Parser)]
#[command(name = "empathy")]
#[command(about = "Emotion-aware chatbot with emoji, speech and avatar output", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (JSON, TOML or YAML)
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Shorthand for --log-level debug
    #[arg(long, short, global = true)]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Console chat with emoji-decorated replies
    Chat {
        /// Speak replies aloud
        #[arg(long)]
        speech: bool,

        /// Drive VTube Studio expressions
        #[arg(long)]
        avatar: bool,
    },

    /// Console chat driving VTube Studio, with background speech
    Avatar {
        /// Skip speech output
        #[arg(long)]
        mute: bool,
    },

    /// Browser avatar served over HTTP, chat over WebSocket
    Web {
        /// Serve the emoji page instead of the avatar
        #[arg(long)]
        emoji: bool,

        /// WebSocket port
        #[arg(long)]
        port: Option<u16>,

        /// Static front-end port
        #[arg(long)]
        static_port: Option<u16>,
    },

    /// Classify text without contacting any backend
    Classify {
        /// Text to classify
        #[arg(required = true)]
        text: Vec<String>,

        /// Print the full classification as JSON
        #[arg(long)]
        json: bool,
    },
}

fn load_config(cli: &Cli) -> Result<AppConfig> {
    let mut config = match &cli.config {
        Some(path) => AppConfig::from_file(path)?,
        None => AppConfig::default(),
    };
    config.apply_env();
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }
    if cli.verbose {
        config.log_level = "debug".to_string();
    }
    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = load_config(&cli)?;
    logging::init(&config.log_level, cli.json_logs);

    match cli.command {
        Commands::Chat { speech, avatar } => chat(&config, speech, avatar).await,
        Commands::Avatar { mute } => avatar_console(&config, mute).await,
        Commands::Web { emoji, port, static_port } => {
            if emoji {
                // Emoji page lives next to the avatar on its own ports
                config.avatar.bridge.port = 8766;
                config.avatar.bridge.static_port = 8002;
                config.avatar.bridge.index_page = "emoji.html".to_string();
            }
            if let Some(port) = port {
                config.avatar.bridge.port = port;
            }
            if let Some(port) = static_port {
                config.avatar.bridge.static_port = port;
            }
            config.avatar.bridge.validate().map_err(anyhow::Error::msg)?;
            web_front_end(&config, emoji).await
        }
        Commands::Classify { text, json } => classify(&config, &text.join(" "), json),
    }
}

async fn chat(config: &AppConfig, speech: bool, avatar: bool) -> Result<()> {
    let session = app::start_session(config).await?;
    let dispatcher = app::dispatcher(Box::new(session), config, app::CONSOLE_USER_TONE)?;

    let emoji = app::attach_emoji(&dispatcher, config);
    if speech {
        app::attach_speech(&dispatcher, config, false)?;
    }
    if avatar {
        app::attach_vtube_studio(&dispatcher, config).await?;
    }

    let stdin = BufReader::new(tokio::io::stdin());
    let mut stdout = tokio::io::stdout();
    let result = console::run(&dispatcher, stdin, &mut stdout, Some(emoji)).await;
    app::close_channels(&dispatcher).await;
    Ok(result?)
}

async fn avatar_console(config: &AppConfig, mute: bool) -> Result<()> {
    let session = app::start_session(config).await?;
    let dispatcher = app::dispatcher(Box::new(session), config, app::CONSOLE_USER_TONE)?;

    app::attach_vtube_studio(&dispatcher, config).await?;
    if !mute {
        app::attach_speech(&dispatcher, config, true)?;
    }

    let stdin = BufReader::new(tokio::io::stdin());
    let mut stdout = tokio::io::stdout();
    let result = console::run(&dispatcher, stdin, &mut stdout, None).await;
    app::close_channels(&dispatcher).await;
    Ok(result?)
}

async fn web_front_end(config: &AppConfig, emoji_page: bool) -> Result<()> {
    let session = app::start_session(config).await?;
    let dispatcher = app::dispatcher(Box::new(session), config, app::WEB_USER_TONE)?;
    let (bridge, inbound) = app::attach_web(&dispatcher, config, emoji_page)?;

    let bridge_config = &config.avatar.bridge;
    let server = bridge.serve().await?;
    let site = StaticServer::start(
        &bridge_config.host,
        bridge_config.static_port,
        bridge_config.static_root.clone(),
        &bridge_config.index_page,
    )
    .await?;
    println!("Open http://localhost:{}/ in a browser (Ctrl+C to stop)", site.local_addr().port());

    web::run(&dispatcher, inbound, async {
        let _ = tokio::signal::ctrl_c().await;
    })
    .await;

    info!("Shutting down");
    site.stop();
    server.stop(Duration::from_secs(5)).await;
    app::close_channels(&dispatcher).await;
    Ok(())
}

fn classify(config: &AppConfig, text: &str, json: bool) -> Result<()> {
    let classifier = Classifier::new(config.classifier.clone())?;
    let classification = classifier.analyze(text);
    if json {
        println!("{}", serde_json::to_string_pretty(&classification)?);
    } else {
        match &classification.keyword {
            Some(keyword) => println!(
                "{}\t{:.4}\t(keyword '{}')",
                classification.tag, classification.score, keyword
            ),
            None => println!("{}\t{:.4}", classification.tag, classification.score),
        }
    }
    Ok(())
}
