use std::time::Duration;

use anyhow::{Context, Result};
use gambit_core::collapse_whitespace;
use gambit_dispatch::TitleFetcher;
use regex::Regex;

const FETCH_TIMEOUT: Duration = Duration::from_secs(5);

/// Extracts the text of the first `<title>` element.
pub(crate) fn extract_title(pattern: &Regex, html: &str) -> Option<String> {
    let title = collapse_whitespace(pattern.captures(html)?.get(1)?.as_str());
    (!title.is_empty()).then_some(title)
}

/// Page-title lookups over a blocking HTTP client.
///
/// Must be created and dropped outside the async runtime.
pub(crate) struct HttpTitleFetcher {
    client: reqwest::blocking::Client,
    title_pattern: Regex,
}

impl HttpTitleFetcher {
    pub(crate) fn new() -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .user_agent(concat!("gambit/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            client,
            title_pattern: Regex::new(r"(?is)<title[^>]*>(.*?)</title>")?,
        })
    }
}

impl TitleFetcher for HttpTitleFetcher {
    fn fetch_title(&self, url: &str) -> Result<Option<String>> {
        let body = self
            .client
            .get(url)
            .send()
            .with_context(|| format!("failed to fetch {url}"))?
            .error_for_status()
            .with_context(|| format!("unexpected status from {url}"))?
            .text()
            .with_context(|| format!("failed to read body of {url}"))?;
        Ok(extract_title(&self.title_pattern, &body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pattern() -> Regex {
        Regex::new(r"(?is)<title[^>]*>(.*?)</title>").expect("pattern")
    }

    #[test]
    fn unit_extracts_and_collapses_title() {
        let html = "<html><head><TITLE lang=\"en\">\n  Example\n   Domain </TITLE></head></html>";
        assert_eq!(extract_title(&pattern(), html).as_deref(), Some("Example Domain"));
    }

    #[test]
    fn unit_missing_or_blank_title_is_none() {
        assert_eq!(extract_title(&pattern(), "<html><body>hi</body></html>"), None);
        assert_eq!(extract_title(&pattern(), "<title>  </title>"), None);
    }
}
