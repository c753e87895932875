//! Font asset resolution.
//!
//! Hangul glyphs need a font that covers them. The font is looked up at a
//! fixed path and, when missing, downloaded once and kept there for every
//! later run.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use rusttype::Font;

use crate::error::{CloudError, Result};

/// Source of font bytes
#[async_trait]
pub trait FontFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> std::result::Result<Vec<u8>, String>;
}

/// Fetches fonts over HTTP(S)
pub struct HttpFontFetcher {
    client: reqwest::Client,
}

impl HttpFontFetcher {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for HttpFontFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FontFetcher for HttpFontFetcher {
    async fn fetch(&self, url: &str) -> std::result::Result<Vec<u8>, String> {
        let response = self.client.get(url).send().await.map_err(|e| e.to_string())?;

        if !response.status().is_success() {
            return Err(format!("HTTP {}", response.status()));
        }

        let bytes = response.bytes().await.map_err(|e| e.to_string())?;
        Ok(bytes.to_vec())
    }
}

/// Make sure a usable font exists at `path`, downloading it from `url` if needed.
///
/// An existing file is returned as is, without touching the network.
pub async fn ensure_font_asset(path: &Path, url: &str, fetcher: &dyn FontFetcher) -> Result<PathBuf> {
    if path.exists() {
        tracing::debug!(path = %path.display(), "Font already present");
        return Ok(path.to_path_buf());
    }

    let unavailable = |reason: String| CloudError::AssetUnavailable {
        path: path.to_path_buf(),
        url: url.to_string(),
        reason,
    };

    tracing::info!(path = %path.display(), url, "Font not found, downloading");

    let bytes = fetcher.fetch(url).await.map_err(|e| unavailable(format!("download failed: {}", e)))?;

    if Font::try_from_bytes(&bytes).is_none() {
        return Err(unavailable("downloaded file is not a TrueType/OpenType font".to_string()));
    }

    persist(path, &bytes).map_err(|e| unavailable(format!("could not save font: {}", e)))?;

    tracing::info!(path = %path.display(), bytes = bytes.len(), "Font downloaded");
    Ok(path.to_path_buf())
}

/// Write through a sibling file and rename, so a concurrent reader never sees
/// a partial font.
fn persist(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let mut partial = path.as_os_str().to_owned();
    partial.push(format!(".{}.part", std::process::id()));
    let partial = PathBuf::from(partial);

    std::fs::write(&partial, bytes)?;
    std::fs::rename(&partial, path).inspect_err(|_| {
        let _ = std::fs::remove_file(&partial);
    })
}

/// Read and parse the font at `path`.
pub fn load_font(path: &Path) -> Result<Font<'static>> {
    let unavailable = |reason: String| CloudError::AssetUnavailable {
        path: path.to_path_buf(),
        url: String::new(),
        reason,
    };

    let bytes = std::fs::read(path).map_err(|e| unavailable(e.to_string()))?;
    Font::try_from_vec(bytes).ok_or_else(|| unavailable("not a TrueType/OpenType font".to_string()))
}
