// src/fetch/mod.rs

use anyhow::{Context, Result};
use regex::Regex;
use reqwest::blocking::Client;
use std::{fs, path::Path, thread::sleep, time::Duration};
use tracing::{debug, error, info, instrument, warn};
use url::Url;

use crate::config::HttpConfig;
use crate::table::RawTable;

pub mod tables;

pub use tables::parse_tables;

/// Source of raw tables: every table on the page at `locator` whose text
/// matches the `marker` pattern, in page order.
pub trait TableFetcher {
    fn fetch_tables(&self, locator: &str, marker: &str) -> Result<Vec<RawTable>>;
}

/// Loads pages over HTTP(S), or from disk for `file://` URLs and plain paths.
pub struct HtmlFetcher {
    client: Client,
    max_retries: u32,
    backoff_ms: u64,
}

impl HtmlFetcher {
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .context("building HTTP client")?;
        Ok(Self {
            client,
            max_retries: config.max_retries,
            backoff_ms: config.backoff_ms,
        })
    }

    fn get_text_core(&self, url: &Url) -> Result<String> {
        debug!("Fetching text from {}", url);
        self.client
            .get(url.clone())
            .send()
            .with_context(|| format!("GET {} failed", url))?
            .error_for_status()
            .with_context(|| format!("Non-success status {}", url))?
            .text()
            .with_context(|| format!("Reading text from {}", url))
    }

    fn get_text_with_retry(&self, url: &Url) -> Result<String> {
        let mut attempts = 0;
        loop {
            match self.get_text_core(url) {
                Ok(t) => return Ok(t),
                Err(e) if attempts < self.max_retries => {
                    attempts += 1;
                    let backoff = backoff_delay(self.backoff_ms, attempts);
                    warn!(%url, attempt = attempts, delay_ms = backoff, error = %e, "Retrying");
                    sleep(Duration::from_millis(backoff));
                }
                Err(e) => {
                    error!(%url, error = %e, "Exhausted retries");
                    return Err(e);
                }
            }
        }
    }

    /// Page source for `locator`.
    pub fn load_page(&self, locator: &str) -> Result<String> {
        match Url::parse(locator) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => self.get_text_with_retry(&url),
            Ok(url) if url.scheme() == "file" => {
                let path = url
                    .to_file_path()
                    .map_err(|_| anyhow::anyhow!("not a local file URL: {}", locator))?;
                read_page(&path)
            }
            _ => read_page(Path::new(locator)),
        }
    }
}

/// Longest single wait between retries.
const MAX_BACKOFF_MS: u64 = 60_000;

/// `base * 2^(attempt-1)` milliseconds, saturating at [`MAX_BACKOFF_MS`].
fn backoff_delay(base_ms: u64, attempt: u32) -> u64 {
    2u64.checked_pow(attempt.saturating_sub(1))
        .and_then(|factor| base_ms.checked_mul(factor))
        .map_or(MAX_BACKOFF_MS, |ms| ms.min(MAX_BACKOFF_MS))
}

fn read_page(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("reading page {}", path.display()))
}

impl TableFetcher for HtmlFetcher {
    #[instrument(level = "info", skip(self))]
    fn fetch_tables(&self, locator: &str, marker: &str) -> Result<Vec<RawTable>> {
        let marker_re =
            Regex::new(marker).with_context(|| format!("invalid marker pattern {:?}", marker))?;
        let html = self.load_page(locator)?;
        let tables = parse_tables(&html, &marker_re);
        info!(count = tables.len(), "found tables");
        Ok(tables)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn reads_local_pages_by_path_and_file_url() -> Result<()> {
        let mut page = NamedTempFile::new()?;
        write!(
            page,
            "<table><tr><th>Office</th></tr><tr><th>Date of birth</th></tr><tr><td>1950</td></tr></table>"
        )?;

        let fetcher = HtmlFetcher::new(&HttpConfig::default())?;
        let by_path = fetcher.fetch_tables(&page.path().to_string_lossy(), "Date of birth")?;
        assert_eq!(by_path.len(), 1);
        assert_eq!(by_path[0].header_depth(), 2);

        let url = Url::from_file_path(page.path()).expect("absolute temp path");
        let by_url = fetcher.fetch_tables(url.as_str(), "Date of birth")?;
        assert_eq!(by_url, by_path);
        Ok(())
    }

    #[test]
    fn no_matching_table_is_empty_not_error() -> Result<()> {
        let mut page = NamedTempFile::new()?;
        write!(page, "<p>nothing here</p>")?;
        let fetcher = HtmlFetcher::new(&HttpConfig::default())?;
        assert!(fetcher
            .fetch_tables(&page.path().to_string_lossy(), "Date of birth")?
            .is_empty());
        Ok(())
    }

    #[test]
    fn backoff_doubles_and_saturates() {
        assert_eq!(backoff_delay(500, 1), 500);
        assert_eq!(backoff_delay(500, 3), 2000);
        assert_eq!(backoff_delay(500, 64), MAX_BACKOFF_MS);
        assert_eq!(backoff_delay(500, 200), MAX_BACKOFF_MS);
        assert_eq!(backoff_delay(u64::MAX, 2), MAX_BACKOFF_MS);
    }

    #[test]
    fn missing_page_is_an_error() -> Result<()> {
        let fetcher = HtmlFetcher::new(&HttpConfig::default())?;
        assert!(fetcher
            .fetch_tables("/definitely/not/here.html", "Date of birth")
            .is_err());
        Ok(())
    }
}
