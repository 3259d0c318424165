mod basic;
mod client;

pub use basic::BasicClient;
pub use client::HttpClient;

use anyhow::{Context, Result, ensure};
use std::fs;
use std::path::Path;
use tracing::{info, warn};

/// Fetches a URL into memory.
pub async fn fetch_bytes<C: HttpClient>(client: &C, url: &str) -> Result<Vec<u8>> {
    let req = reqwest::Request::new(reqwest::Method::GET, url.parse()?);

    let resp = client.execute(req).await?;
    ensure!(
        resp.status().is_success(),
        "GET {url} returned {}",
        resp.status()
    );
    Ok(resp.bytes().await?.to_vec())
}

/// Downloads a URL to a file under `dir`, returning the number of bytes
/// written. Skips the download when the file already exists (yearly Price
/// Paid files never change once published).
pub async fn download_to_file<C: HttpClient>(
    client: &C,
    url: &str,
    dir: &Path,
    filename: &str,
) -> Result<u64> {
    let dest = dir.join(filename);
    if dest.exists() {
        let size = fs::metadata(&dest)?.len();
        info!(
            file = filename,
            size_bytes = size,
            "already downloaded, skipping"
        );
        return Ok(size);
    }

    fs::create_dir_all(dir)?;

    let bytes = fetch_bytes(client, url)
        .await
        .with_context(|| format!("downloading {url}"))?;
    if bytes.is_empty() {
        warn!(url, "empty response body");
    }

    fs::write(&dest, &bytes).with_context(|| format!("writing {}", dest.display()))?;
    info!(file = filename, size_kb = bytes.len() / 1024, "downloaded");
    Ok(bytes.len() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct FailingClient;

    #[async_trait]
    impl HttpClient for FailingClient {
        async fn execute(&self, _req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
            // No server is listening on port 1, so this yields a transport
            // error without touching the network.
            reqwest::Client::new()
                .get("http://127.0.0.1:1")
                .send()
                .await
        }
    }

    #[tokio::test]
    async fn test_fetch_bytes_propagates_client_error() {
        let client = FailingClient;
        let result = fetch_bytes(&client, "http://example.invalid/data.csv").await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_download_skips_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pp-2024.csv");
        fs::write(&path, b"cached").unwrap();

        let client = FailingClient;
        let size = download_to_file(
            &client,
            "http://example.invalid/pp-2024.csv",
            dir.path(),
            "pp-2024.csv",
        )
        .await
        .unwrap();
        assert_eq!(size, 6);
    }
}
