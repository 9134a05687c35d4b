//! DuckDuckGo search backend.
//!
//! No API key is needed. Text results come from the HTML-only endpoint
//! (`html.duckduckgo.com`), which is parsed with CSS selectors. Image
//! results come from the `i.js` JSON endpoint, which requires a `vqd`
//! token scraped from the regular search page first.
//!
//! # Result links
//!
//! The HTML endpoint wraps result links in a redirect of the form
//! `//duckduckgo.com/l/?uddg=<percent-encoded target>`; [`resolve_href`]
//! unwraps it.

use super::{ImageHit, ImageQuery, SearchHit, SearchProvider, TextQuery};
use crate::error::{NewsError, Result};
use once_cell::sync::Lazy;
use rand::seq::IndexedRandom;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, instrument};
use url::Url;

const HTML_ENDPOINT: &str = "https://html.duckduckgo.com/html/";
const SITE_ENDPOINT: &str = "https://duckduckgo.com/";
const IMAGES_ENDPOINT: &str = "https://duckduckgo.com/i.js";

/// Strict safe-search on the HTML endpoint (`kp`) and on `i.js` (`p`).
const TEXT_SAFE_SEARCH: &str = "1";
const IMAGE_SAFE_SEARCH: &str = "1";

const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_4) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64; rv:125.0) Gecko/20100101 Firefox/125.0",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:125.0) Gecko/20100101 Firefox/125.0",
];

static RESULT_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("div.result").expect("valid result selector"));
static TITLE_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a.result__a").expect("valid title selector"));
static SNIPPET_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".result__snippet").expect("valid snippet selector"));
static VQD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"vqd=["']?([\d-]+)["']?"#).expect("valid vqd regex"));

#[derive(Debug, Deserialize)]
struct ImageResults {
    #[serde(default)]
    results: Vec<ImageHit>,
}

/// DuckDuckGo client. Cheap to clone; shares one connection pool.
#[derive(Debug, Clone)]
pub struct DuckDuckGo {
    http: reqwest::Client,
}

impl DuckDuckGo {
    pub fn new(timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http })
    }

    async fn vqd_token(&self, query: &str) -> Result<String> {
        let html = self
            .http
            .get(SITE_ENDPOINT)
            .header(reqwest::header::USER_AGENT, user_agent())
            .query(&[("q", query)])
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        extract_vqd(&html).ok_or_else(|| NewsError::Parse("vqd token not found".to_string()))
    }
}

impl SearchProvider for DuckDuckGo {
    #[instrument(level = "info", skip_all, fields(query = %query.query))]
    async fn text(&self, query: &TextQuery) -> Result<Vec<SearchHit>> {
        let html = self
            .http
            .post(HTML_ENDPOINT)
            .header(reqwest::header::USER_AGENT, user_agent())
            .header(reqwest::header::REFERER, "https://html.duckduckgo.com/")
            .form(&text_form(query))
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let hits = parse_text_results(&html, query.max_results);
        info!(count = hits.len(), "DuckDuckGo text search complete");
        Ok(hits)
    }

    #[instrument(level = "info", skip_all, fields(query = %query.query))]
    async fn images(&self, query: &ImageQuery) -> Result<Vec<ImageHit>> {
        let vqd = self.vqd_token(&query.query).await?;
        let results: ImageResults = self
            .http
            .get(IMAGES_ENDPOINT)
            .header(reqwest::header::USER_AGENT, user_agent())
            .header(reqwest::header::REFERER, SITE_ENDPOINT)
            .query(&image_params(query, &vqd))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let hits: Vec<ImageHit> = results
            .results
            .into_iter()
            .filter(|hit| !hit.image.is_empty())
            .take(query.max_results)
            .collect();
        debug!(count = hits.len(), "DuckDuckGo image search complete");
        Ok(hits)
    }
}

fn user_agent() -> &'static str {
    USER_AGENTS.choose(&mut rand::rng()).copied().unwrap_or(USER_AGENTS[0])
}

fn text_form(query: &TextQuery) -> [(&'static str, &str); 4] {
    [
        ("q", query.query.as_str()),
        ("kl", query.region.as_str()),
        ("kp", TEXT_SAFE_SEARCH),
        ("b", ""),
    ]
}

fn image_params<'a>(query: &'a ImageQuery, vqd: &'a str) -> [(&'static str, &'a str); 6] {
    [
        ("l", "wt-wt"),
        ("o", "json"),
        ("q", query.query.as_str()),
        ("vqd", vqd),
        ("f", ",,,,,"),
        ("p", IMAGE_SAFE_SEARCH),
    ]
}

fn extract_vqd(html: &str) -> Option<String> {
    VQD_RE.captures(html).map(|c| c[1].to_string())
}

/// Parse the HTML endpoint's result page into ranked hits, skipping ads.
fn parse_text_results(html: &str, max_results: usize) -> Vec<SearchHit> {
    let document = Html::parse_document(html);
    document
        .select(&RESULT_SELECTOR)
        .filter(|result| !result.value().classes().any(|c| c == "result--ad"))
        .filter_map(|result| {
            let anchor = result.select(&TITLE_SELECTOR).next()?;
            let href = resolve_href(anchor.value().attr("href")?)?;
            let body = result
                .select(&SNIPPET_SELECTOR)
                .next()
                .map(element_text)
                .unwrap_or_default();
            Some(SearchHit {
                title: element_text(anchor),
                body,
                href,
            })
        })
        .take(max_results)
        .collect()
}

fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .collect::<Vec<_>>()
        .join("")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Turn a result anchor's href into the target URL.
fn resolve_href(href: &str) -> Option<String> {
    let absolute = if href.starts_with("//") {
        format!("https:{href}")
    } else {
        href.to_string()
    };
    let url = Url::parse(&absolute).ok()?;

    if url.domain().is_some_and(|d| d.ends_with("duckduckgo.com")) && url.path().starts_with("/l/") {
        return url
            .query_pairs()
            .find(|(key, _)| key == "uddg")
            .map(|(_, target)| target.into_owned());
    }
    Some(url.to_string())
}
