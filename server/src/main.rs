use anyhow::{Context, Result};
use clap::Parser;
use std::net::SocketAddr;
use std::path::Path;
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "server", about = "Serve title recommendations over HTTP")]
struct Args {
    /// Directory holding meta.json and the .bin artifacts; reloaded in place by POST /admin/reload
    #[arg(long, default_value = "./data/model")]
    model: String,
    /// Socket address to listen on
    #[arg(long, default_value = "0.0.0.0:8080")]
    listen: SocketAddr,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Args::parse();
    if !Path::new(&args.model).join("meta.json").is_file() {
        anyhow::bail!("{} has no meta.json; run `indexer build --output {}` first", args.model, args.model);
    }
    let app = server::build_app(args.model.clone()).with_context(|| format!("loading model from {}", args.model))?;

    let listener = TcpListener::bind(args.listen).await?;
    tracing::info!(addr = %args.listen, model = %args.model, "serving recommendations");
    axum::serve(listener, app).await?;
    Ok(())
}
