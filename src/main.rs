use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use hangul_cloud::config::Config;
use hangul_cloud::font::{ensure_font_asset, load_font, HttpFontFetcher};
use hangul_cloud::pipeline::{render_file, Pipeline};
use hangul_cloud::server::{create_router, prepare, AppState};

#[derive(Parser)]
#[command(name = "hangul-cloud", version, about = "Korean word-cloud generator")]
struct Cli {
    /// Configuration file (defaults to ./hangul-cloud.toml, then the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the upload dashboard
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
    },
    /// Render one text file to a PNG
    Render {
        /// UTF-8 text file
        text: PathBuf,
        /// Mask image (PNG or JPEG)
        #[arg(long)]
        mask: Option<PathBuf>,
        /// Font file, downloaded to this path if missing
        #[arg(long)]
        font: Option<PathBuf>,
        #[arg(long, short, default_value = "wordcloud.png")]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::load_from_default(),
    };

    match cli.command.unwrap_or(Command::Serve { host: None, port: None }) {
        Command::Serve { host, port } => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            serve(config).await
        }
        Command::Render {
            text,
            mask,
            font,
            output,
        } => {
            if let Some(font) = font {
                config.font.path = font;
            }
            render(config, text, mask, output).await
        }
    }
}

async fn serve(config: Config) -> Result<()> {
    tracing::info!("Starting hangul-cloud dashboard...");

    let (font, startup) = prepare(&config, &HttpFontFetcher::new()).await;
    let state = AppState::new(font, startup, config.cloud.display_size);
    let router = create_router(state);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("invalid server address")?;
    tracing::info!("Listening on http://{}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}

async fn render(config: Config, text: PathBuf, mask: Option<PathBuf>, output: PathBuf) -> Result<()> {
    let font_path = ensure_font_asset(&config.font.path, &config.font.url, &HttpFontFetcher::new()).await?;
    let pipeline = Pipeline::from_config(&config, load_font(&font_path)?)?;

    let rendered = render_file(&pipeline, &text, mask.as_deref())
        .with_context(|| format!("failed to render {}", text.display()))?;
    for notice in &rendered.notices {
        tracing::warn!("{}", notice);
    }

    rendered.image.save(&output)?;
    tracing::info!(
        nouns = rendered.noun_count,
        words = rendered.image.placed().len(),
        "Saved word cloud"
    );
    println!("{}", output.display());

    Ok(())
}
