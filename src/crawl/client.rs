// src/crawl/client.rs
use std::time::Duration;

use reqwest::header;

use crate::utils::error::FetchError;

/// Creates a reqwest client identifying the crawler to university sites.
pub fn build_client(user_agent: &str) -> Result<reqwest::Client, FetchError> {
    let client = reqwest::Client::builder()
        .user_agent(user_agent)
        .timeout(Duration::from_secs(30))
        .build()?;
    Ok(client)
}

/// Downloads one page, sleeping `delay` first so consecutive calls stay
/// polite towards the site.
pub async fn download_page(
    client: &reqwest::Client,
    url: &str,
    delay: Duration,
) -> Result<String, FetchError> {
    tokio::time::sleep(delay).await;

    tracing::debug!("Downloading page: {}", url);
    let response = client
        .get(url)
        .header(header::ACCEPT, "text/html,application/xhtml+xml,*/*")
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS || status == reqwest::StatusCode::FORBIDDEN {
            tracing::warn!("Received {} - slow down or check the user agent.", status);
            return Err(FetchError::RateLimited(url.to_string()));
        }
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(FetchError::NotFound(url.to_string()));
        }
        return Err(FetchError::Http { status, url: url.to_string() });
    }

    let body = response.text().await?;
    tracing::debug!("Downloaded {} bytes from {}", body.len(), url);
    Ok(body)
}
