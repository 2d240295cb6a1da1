use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use reqwest::{Client, StatusCode};
use url::Url;
use serde::Serialize;
use sha1::{Digest, Sha1};
use std::path::{Path, PathBuf};
use std::time::Duration;
use time::format_description::well_known::Rfc3339;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::time::sleep;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "fetcher")]
#[command(about = "Download a catalog export, retrying transient failures")]
struct Cli {
    /// URL of the catalog file
    #[arg(long)]
    url: String,
    /// Destination path
    #[arg(long, default_value = "./data/titles.csv")]
    output: PathBuf,
    /// Retries after the first attempt
    #[arg(long, default_value_t = 3)]
    retries: u32,
    /// Initial backoff; doubles after every failed attempt
    #[arg(long, default_value_t = 500)]
    backoff_ms: u64,
    /// Request timeout seconds
    #[arg(long, default_value_t = 30)]
    timeout_secs: u64,
    #[arg(long, default_value = "reelsim-fetcher/0.1")]
    user_agent: String,
}

/// Written next to the download as `<output>.json`.
#[derive(Serialize)]
struct Manifest<'a> {
    url: &'a str,
    bytes: u64,
    sha1: String,
    fetched_at: String,
}

#[derive(Debug)]
enum Failure {
    Transient(anyhow::Error),
    Fatal(anyhow::Error),
}

fn is_retryable(status: StatusCode) -> bool {
    status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS || status == StatusCode::REQUEST_TIMEOUT
}

fn backoff(base_ms: u64, attempt: u32) -> Duration {
    Duration::from_millis(base_ms.saturating_mul(1u64 << attempt.min(16)))
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Cli::parse();
    let url = Url::parse(&args.url).with_context(|| format!("invalid url {}", args.url))?;
    if let Some(dir) = args.output.parent() {
        fs::create_dir_all(dir).await.ok();
    }

    let client = Client::builder()
        .user_agent(args.user_agent.clone())
        .redirect(reqwest::redirect::Policy::limited(5))
        .timeout(Duration::from_secs(args.timeout_secs))
        .build()?;

    let mut attempt = 0;
    let (bytes, digest) = loop {
        match download(&client, &url, &args.output).await {
            Ok(done) => break done,
            Err(Failure::Fatal(e)) => return Err(e),
            Err(Failure::Transient(e)) if attempt < args.retries => {
                let wait = backoff(args.backoff_ms, attempt);
                tracing::warn!(attempt, error = %e, wait_ms = wait.as_millis() as u64, "download failed, retrying");
                sleep(wait).await;
                attempt += 1;
            }
            Err(Failure::Transient(e)) => bail!("giving up after {} attempts: {e}", attempt + 1),
        }
    };

    let manifest = Manifest {
        url: url.as_str(),
        bytes,
        sha1: digest.clone(),
        fetched_at: time::OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_default(),
    };
    fs::write(manifest_path(&args.output), serde_json::to_vec_pretty(&manifest)?).await?;
    tracing::info!(output = %args.output.display(), bytes, sha1 = %digest, "download complete");
    Ok(())
}

fn manifest_path(output: &Path) -> PathBuf {
    let mut name = output.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".json");
    output.with_file_name(name)
}

/// Stream the body into a `.part` sibling, then rename over `output`.
async fn download(client: &Client, url: &Url, output: &Path) -> Result<(u64, String), Failure> {
    let mut resp = match client.get(url.clone()).send().await {
        Ok(r) => r,
        Err(e) if e.is_timeout() || e.is_connect() || e.is_request() => return Err(Failure::Transient(e.into())),
        Err(e) => return Err(Failure::Fatal(e.into())),
    };
    let status = resp.status();
    if !status.is_success() {
        let err = anyhow!("{url} returned {status}");
        return Err(if is_retryable(status) { Failure::Transient(err) } else { Failure::Fatal(err) });
    }

    let part = output.with_extension("part");
    let mut file = fs::File::create(&part).await.map_err(|e| Failure::Fatal(e.into()))?;
    let mut hasher = Sha1::new();
    let mut total = 0u64;
    loop {
        match resp.chunk().await {
            Ok(Some(chunk)) => {
                hasher.update(&chunk);
                total += chunk.len() as u64;
                file.write_all(&chunk).await.map_err(|e| Failure::Fatal(e.into()))?;
            }
            Ok(None) => break,
            // body cut off mid-transfer
            Err(e) => return Err(Failure::Transient(e.into())),
        }
    }
    file.flush().await.map_err(|e| Failure::Fatal(e.into()))?;
    drop(file);
    fs::rename(&part, output).await.map_err(|e| Failure::Fatal(e.into()))?;
    Ok((total, format!("{:x}", hasher.finalize())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_statuses() {
        assert!(is_retryable(StatusCode::BAD_GATEWAY));
        assert!(is_retryable(StatusCode::TOO_MANY_REQUESTS));
        assert!(!is_retryable(StatusCode::NOT_FOUND));
        assert!(!is_retryable(StatusCode::FORBIDDEN));
    }

    #[test]
    fn backoff_doubles() {
        assert_eq!(backoff(500, 0), Duration::from_millis(500));
        assert_eq!(backoff(500, 2), Duration::from_millis(2000));
        assert_eq!(backoff(u64::MAX, 3), Duration::from_millis(u64::MAX));
    }

    #[test]
    fn manifest_sits_next_to_output() {
        assert_eq!(manifest_path(Path::new("data/titles.csv")), PathBuf::from("data/titles.csv.json"));
    }
}
