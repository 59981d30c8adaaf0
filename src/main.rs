mod backend;
mod extractor;
mod favorites;
mod frame;
mod guard;
mod history;
mod monitor;
mod shell;
mod ui;

use std::env;
use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use backend::BackendClient;
use favorites::Favorites;
use shell::Shell;
use ui::term::TerminalUi;

const DEFAULT_BACKEND: &str = "http://127.0.0.1:8080";

#[derive(Parser)]
#[command(name = "veil")]
#[command(about = "Terminal shell for a remote web-proxy backend")]
struct Args {
    #[arg(help = "URL to open once the backend is reachable")]
    url: Option<String>,

    #[arg(long, help = "Proxy backend origin (also read from VEIL_BACKEND)")]
    backend: Option<String>,

    #[arg(long, help = "Path of the favorites file")]
    favorites: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let origin = args
        .backend
        .or_else(|| env::var("VEIL_BACKEND").ok())
        .unwrap_or_else(|| DEFAULT_BACKEND.to_string());
    let backend = BackendClient::new(&origin)?;

    let favorites_path = args.favorites.unwrap_or_else(favorites::default_path);
    let favorites = Favorites::load(favorites_path);

    let view = TerminalUi::new()?;
    let mut shell = Shell::new(view, backend, favorites);
    if let Some(url) = args.url {
        shell.queue_navigation(&url);
    }

    shell.run().await
}
