/*!
 * arXiv metadata and source retrieval.
 *
 * - `extract_arxiv_id`: turns a bare identifier or an arxiv.org URL into an `ArxivId`
 * - `parse_atom_feed`: reads title and abstract from the query API's Atom feed
 * - `ArxivClient`: fetches the metadata and streams the source archive to disk
 */

use log::{debug, info};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use url::Url;

use crate::app_config::ArxivConfig;
use crate::errors::FetchError;

static NEW_STYLE_ID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\d{4}\.\d{4,5}(v\d+)?$").expect("Invalid new-style id regex")
});

static OLD_STYLE_ID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-z][a-z\-]*(\.[A-Z]{2})?/\d{7}(v\d+)?$").expect("Invalid old-style id regex")
});

static ENTRY_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)<entry\b[^>]*>(.*?)</entry>").expect("Invalid entry regex")
});

static ENTITY_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"&(#[0-9]+|#[xX][0-9a-fA-F]+|[a-zA-Z]+);").expect("Invalid entity regex")
});

static WHITESPACE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\s+").expect("Invalid whitespace regex")
});

/// URL path segments that precede the identifier
const ID_PATH_PREFIXES: &[&str] = &["abs", "pdf", "src", "e-print", "html", "format"];

/// A validated arXiv identifier such as `2401.01234v2` or `hep-th/9901001`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArxivId(String);

impl ArxivId {
    /// Identifier as used in API queries
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Identifier usable as a single file name component
    pub fn file_stem(&self) -> String {
        self.0.replace('/', "_")
    }
}

impl fmt::Display for ArxivId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Extract an arXiv identifier from user input
///
/// Accepts bare identifiers (new and old style, with optional version) and
/// arxiv.org URLs such as `/abs/<id>`, `/pdf/<id>` or `/pdf/<id>.pdf`.
pub fn extract_arxiv_id(input: &str) -> Result<ArxivId, FetchError> {
    let trimmed = input.trim();
    let invalid = || FetchError::InvalidIdentifier(trimmed.to_string());

    let candidate = match Url::parse(trimmed) {
        Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {
            let host = url.host_str().unwrap_or_default();
            if host != "arxiv.org" && !host.ends_with(".arxiv.org") {
                return Err(invalid());
            }

            let segments: Vec<&str> = url.path_segments()
                .map(|segments| segments.filter(|s| !s.is_empty()).collect())
                .unwrap_or_default();
            let start = segments.iter()
                .position(|segment| ID_PATH_PREFIXES.contains(segment))
                .ok_or_else(invalid)?;
            let id = segments[start + 1..].join("/");
            id.strip_suffix(".pdf").map(String::from).unwrap_or(id)
        },
        _ => trimmed.strip_prefix("arXiv:")
            .or_else(|| trimmed.strip_prefix("arxiv:"))
            .unwrap_or(trimmed)
            .to_string(),
    };

    if NEW_STYLE_ID.is_match(&candidate) || OLD_STYLE_ID.is_match(&candidate) {
        Ok(ArxivId(candidate))
    } else {
        Err(invalid())
    }
}

/// Title and abstract of a paper, threaded read-only into every translation request
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PaperMetadata {
    /// Paper title
    pub title: String,
    /// Paper abstract
    pub abstract_text: String,
}

/// Decode the XML entities that appear in Atom text nodes
fn decode_entities(text: &str) -> String {
    ENTITY_REGEX.replace_all(text, |caps: &regex::Captures| {
        let entity = &caps[1];
        let decoded = match entity {
            "amp" => Some('&'),
            "lt" => Some('<'),
            "gt" => Some('>'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            _ if entity.starts_with("#x") || entity.starts_with("#X") => {
                u32::from_str_radix(&entity[2..], 16).ok().and_then(char::from_u32)
            },
            _ if entity.starts_with('#') => entity[1..].parse::<u32>().ok().and_then(char::from_u32),
            _ => None,
        };
        decoded.map(String::from).unwrap_or_else(|| caps[0].to_string())
    }).into_owned()
}

/// Text of the first `<tag>` element in `xml`, decoded and whitespace-collapsed
fn element_text(xml: &str, tag: &str) -> Option<String> {
    let pattern = format!(r"(?s)<{tag}\b[^>]*>(.*?)</{tag}>", tag = regex::escape(tag));
    let regex = Regex::new(&pattern).ok()?;
    let raw = regex.captures(xml)?.get(1)?.as_str();
    let raw = raw.strip_prefix("<![CDATA[")
        .and_then(|inner| inner.strip_suffix("]]>"))
        .unwrap_or(raw);
    let decoded = decode_entities(raw);
    Some(WHITESPACE_REGEX.replace_all(decoded.trim(), " ").into_owned())
}

/// Parse the query API's Atom feed for one identifier
pub fn parse_atom_feed(xml: &str, id: &ArxivId) -> Result<PaperMetadata, FetchError> {
    let entry = ENTRY_REGEX.captures(xml)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .ok_or_else(|| FetchError::EntryNotFound(id.to_string()))?;

    // Unknown identifiers come back as an entry pointing at the API error page
    if element_text(entry, "id").is_some_and(|entry_id| entry_id.contains("/api/errors")) {
        return Err(FetchError::EntryNotFound(id.to_string()));
    }

    let title = element_text(entry, "title")
        .ok_or_else(|| FetchError::MissingField("title".to_string()))?;
    let abstract_text = element_text(entry, "summary")
        .ok_or_else(|| FetchError::MissingField("summary".to_string()))?;

    Ok(PaperMetadata { title, abstract_text })
}

/// Client for the arXiv query API and source endpoint
#[derive(Debug, Clone)]
pub struct ArxivClient {
    client: reqwest::Client,
    config: ArxivConfig,
}

impl ArxivClient {
    /// Create a client for the configured endpoints
    pub fn new(config: ArxivConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .user_agent(concat!("papertrans/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_default();
        Self { client, config }
    }

    /// Metadata query URL for an identifier
    pub fn metadata_url(&self, id: &ArxivId) -> Result<Url, FetchError> {
        Url::parse_with_params(&self.config.api_endpoint, &[("id_list", id.as_str())])
            .map_err(|e| FetchError::Request(format!("Invalid metadata endpoint: {}", e)))
    }

    /// Source archive URL for an identifier
    pub fn source_url(&self, id: &ArxivId) -> String {
        format!("{}/{}", self.config.source_endpoint.trim_end_matches('/'), id.as_str())
    }

    /// Fetch title and abstract
    pub async fn fetch_metadata(&self, id: &ArxivId) -> Result<PaperMetadata, FetchError> {
        let url = self.metadata_url(id)?;
        debug!("Fetching arXiv metadata: {}", url);

        let response = self.client.get(url.clone()).send().await?;
        if !response.status().is_success() {
            return Err(FetchError::Http {
                status: response.status().as_u16(),
                url: url.to_string(),
            });
        }

        let body = response.text().await?;
        let metadata = parse_atom_feed(&body, id)?;
        info!("Paper: {}", metadata.title);
        Ok(metadata)
    }

    /// Stream the source archive to `<download_dir>/<id>.tar.gz`
    pub async fn download_source(&self, id: &ArxivId, download_dir: &Path) -> Result<PathBuf, FetchError> {
        tokio::fs::create_dir_all(download_dir).await?;
        let target = download_dir.join(format!("{}.tar.gz", id.file_stem()));

        let url = self.source_url(id);
        debug!("Downloading arXiv source: {}", url);

        let mut response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(FetchError::Http {
                status: response.status().as_u16(),
                url,
            });
        }

        let mut file = tokio::fs::File::create(&target).await?;
        let mut written = 0usize;
        while let Some(chunk) = response.chunk().await? {
            file.write_all(&chunk).await?;
            written += chunk.len();
        }
        file.flush().await?;

        info!("Downloaded source archive ({} bytes): {:?}", written, target);
        Ok(target)
    }
}
