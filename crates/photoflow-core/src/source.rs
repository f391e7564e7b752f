//! Photo list loading: fetch and parse the feed of `(name, url)` entries.
//!
//! The feed is a TOML document with `[[photos]]` entries. It can come from a
//! local file or be fetched over HTTP before any scheduling begins. Entries
//! with an unparseable URL are skipped with a warning rather than failing the
//! whole list.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use url::Url;

use crate::fetch::{self, FetchLimits};
use crate::record::{PhotoLibrary, PhotoRecord};

#[derive(Debug, Deserialize)]
struct PhotoListDoc {
    #[serde(default)]
    photos: Vec<PhotoEntry>,
}

#[derive(Debug, Deserialize)]
struct PhotoEntry {
    name: String,
    url: String,
}

/// Parse a TOML photo list into a library.
pub fn parse_list(data: &str) -> Result<PhotoLibrary> {
    let doc: PhotoListDoc = toml::from_str(data).context("parse photo list")?;
    let mut records = Vec::with_capacity(doc.photos.len());
    for entry in doc.photos {
        match Url::parse(&entry.url) {
            Ok(url) => records.push(PhotoRecord::new(entry.name, url)),
            Err(err) => {
                tracing::warn!(name = %entry.name, url = %entry.url, error = %err,
                    "skipping photo entry with bad URL");
            }
        }
    }
    tracing::info!("loaded photo list with {} entries", records.len());
    Ok(PhotoLibrary::new(records))
}

/// Load a photo list from a local file.
pub fn load_from_path(path: &Path) -> Result<PhotoLibrary> {
    let data = std::fs::read_to_string(path)
        .with_context(|| format!("read photo list: {}", path.display()))?;
    parse_list(&data)
}

/// Fetch a photo list over HTTP and parse it.
pub fn load_from_url(url: &Url, limits: &FetchLimits) -> Result<PhotoLibrary> {
    let bytes = fetch::fetch_bytes(url, limits)
        .with_context(|| format!("fetch photo list: {}", url))?;
    let data = String::from_utf8(bytes).context("photo list is not valid UTF-8")?;
    parse_list(&data)
}
