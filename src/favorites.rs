use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

const FAVORITES_FILE: &str = "favorites.json";

/// On-disk form of the favorites slot: a bare JSON array of URL strings,
/// the same format the slot has always used.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(transparent)]
struct Slot(Vec<String>);

/// Ordered, duplicate-free set of favorite URLs, persisted to a single JSON
/// file. Loaded once at startup; the file is rewritten in full on every
/// mutation.
#[derive(Debug)]
pub struct Favorites {
    urls: Vec<String>,
    path: PathBuf,
}

impl Favorites {
    /// Loads the favorites slot, treating a missing or unreadable file as an
    /// empty set. A corrupt slot is not an error either; favorites are not
    /// worth refusing to start over.
    pub fn load(path: PathBuf) -> Self {
        let urls = match fs::read_to_string(&path) {
            Ok(text) => match serde_json::from_str::<Slot>(&text) {
                Ok(slot) => slot.0,
                Err(e) => {
                    log::warn!("ignoring corrupt favorites file {}: {}", path.display(), e);
                    Vec::new()
                }
            },
            Err(_) => Vec::new(),
        };
        Self { urls, path }
    }

    pub fn contains(&self, url: &str) -> bool {
        self.urls.iter().any(|u| u == url)
    }

    /// Adds `url` if absent, removes it if present, then persists.
    /// Returns whether the URL is a favorite afterwards.
    pub fn toggle(&mut self, url: &str) -> Result<bool> {
        let now_favorite = match self.urls.iter().position(|u| u == url) {
            Some(index) => {
                self.urls.remove(index);
                false
            }
            None => {
                self.urls.push(url.to_string());
                true
            }
        };
        self.save()?;
        Ok(now_favorite)
    }

    /// Removes `url` if present and persists. Returns whether anything changed.
    pub fn remove(&mut self, url: &str) -> Result<bool> {
        let Some(index) = self.urls.iter().position(|u| u == url) else {
            return Ok(false);
        };
        self.urls.remove(index);
        self.save()?;
        Ok(true)
    }

    pub fn urls(&self) -> &[String] {
        &self.urls
    }

    fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let text = serde_json::to_string(&Slot(self.urls.clone()))?;
        fs::write(&self.path, text)
            .with_context(|| format!("writing favorites to {}", self.path.display()))
    }
}

/// Default slot location under the platform data directory, with a
/// current-directory fallback when no home is resolvable.
pub fn default_path() -> PathBuf {
    directories::ProjectDirs::from("", "", "veil")
        .map(|dirs| dirs.data_dir().join(FAVORITES_FILE))
        .unwrap_or_else(|| Path::new(FAVORITES_FILE).to_path_buf())
}
