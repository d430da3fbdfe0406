//! Event catalog: the events and ticket tiers shown on the page.

use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context, Result};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::models::{EventListing, TicketListing};

/// Serialized catalog file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogFile {
    /// Events in display order.
    #[serde(default)]
    pub events: Vec<EventListing>,
}

impl CatalogFile {
    /// Load a catalog file, returning `None` if it does not exist.
    pub fn load(path: impl AsRef<Path>) -> Result<Option<Self>> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(None);
        }
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read catalog {}", path.display()))?;
        let catalog = serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse catalog {}", path.display()))?;
        Ok(Some(catalog))
    }

    /// Persist the catalog, creating parent directories if needed.
    pub fn persist(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("failed to create catalog directory {}", parent.display())
            })?;
        }
        let serialized =
            serde_json::to_string_pretty(self).context("failed to serialize catalog")?;
        fs::write(path, serialized)
            .with_context(|| format!("failed to write catalog {}", path.display()))
    }

    /// A small line-up used on first run.
    pub fn sample() -> Self {
        fn tier(title: &str, price: &str, perks: &str) -> TicketListing {
            TicketListing {
                title: title.to_string(),
                price: price.to_string(),
                perks: Some(perks.to_string()),
            }
        }

        Self {
            events: vec![
                EventListing {
                    id: "nile-sunset-fest".to_string(),
                    title: "Nile Sunset Festival".to_string(),
                    date: "Fri, 14 Nov 2025".to_string(),
                    time: "17:00".to_string(),
                    location: "Al-Azhar Park, Cairo".to_string(),
                    summary: Some("Open-air music on the hill".to_string()),
                    tickets: vec![
                        tier("Early Bird", "450.00 EGP", "General admission"),
                        tier("Regular", "600.00 EGP", "General admission"),
                        tier("VIP", "1,250.00 EGP", "Front stage, lounge access"),
                    ],
                },
                EventListing {
                    id: "cairo-jazz-night".to_string(),
                    title: "Cairo Jazz Night".to_string(),
                    date: "Sat, 22 Nov 2025".to_string(),
                    time: "20:30".to_string(),
                    location: "Cairo Jazz Club, Agouza".to_string(),
                    summary: None,
                    tickets: vec![
                        tier("Standing", "300.00 EGP", "Standing area"),
                        tier("Table", "900.00 EGP", "Reserved seat, one drink"),
                    ],
                },
                EventListing {
                    id: "alex-comedy".to_string(),
                    title: "Stand-up by the Sea".to_string(),
                    date: "Thu, 4 Dec 2025".to_string(),
                    time: "21:00".to_string(),
                    location: "Bibliotheca Alexandrina".to_string(),
                    summary: Some("Arabic and English sets".to_string()),
                    tickets: vec![tier("Seat", "250.00 EGP", "Numbered seating")],
                },
            ],
        }
    }
}

/// Write the sample catalog to `path` if nothing is there yet.
pub fn ensure_default_catalog(path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if path.exists() {
        return Ok(());
    }
    info!(path = %path.display(), "Writing sample catalog");
    CatalogFile::sample().persist(path)
}

/// Thread-safe catalog that caches the file contents.
#[derive(Clone)]
pub struct Catalog {
    inner: Arc<RwLock<Inner>>,
}

struct Inner {
    path: PathBuf,
    cache: Option<Vec<EventListing>>,
}

impl Catalog {
    /// Catalog backed by the file at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Inner {
                path: path.into(),
                cache: None,
            })),
        }
    }

    /// Backing file.
    pub fn path(&self) -> PathBuf {
        self.inner.read().path.clone()
    }

    /// Drop the cache so the next read goes back to disk.
    pub fn refresh(&self) {
        self.inner.write().cache = None;
    }

    /// All events, reading the file on first use.
    pub fn events(&self) -> Result<Vec<EventListing>> {
        let mut inner = self.inner.write();
        if inner.cache.is_none() {
            let events = match CatalogFile::load(&inner.path)? {
                Some(file) => file.events,
                None => {
                    warn!(path = %inner.path.display(), "Catalog missing; no events to show");
                    Vec::new()
                }
            };
            inner.cache = Some(events);
        }
        Ok(inner.cache.clone().unwrap_or_default())
    }

    /// Event with the given id.
    pub fn event(&self, id: &str) -> Result<Option<EventListing>> {
        Ok(self.events()?.into_iter().find(|event| event.id == id))
    }

    /// Filter events using a case-insensitive substring search.
    pub fn events_matching(&self, query: &str) -> Result<Vec<EventListing>> {
        let needle = query.trim().to_lowercase();
        let events = self.events()?;
        if needle.is_empty() {
            return Ok(events);
        }
        Ok(events
            .into_iter()
            .filter(|event| event_matches(event, &needle))
            .collect())
    }
}

/// Whether `event` mentions the lowercase `needle`.
pub fn event_matches(event: &EventListing, needle: &str) -> bool {
    event.title.to_lowercase().contains(needle)
        || event.location.to_lowercase().contains(needle)
        || event.date.to_lowercase().contains(needle)
        || event
            .summary
            .as_ref()
            .map(|value| value.to_lowercase().contains(needle))
            .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn sample_catalog_round_trip() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("nested/catalog.json");
        ensure_default_catalog(&path)?;
        assert!(path.exists());

        let catalog = Catalog::new(&path);
        let events = catalog.events()?;
        assert_eq!(events.len(), 3);
        assert_eq!(events[0].tickets[2].price, "1,250.00 EGP");

        let jazz = catalog.event("cairo-jazz-night")?.expect("jazz night");
        assert_eq!(jazz.metadata().location, "Cairo Jazz Club, Agouza");
        Ok(())
    }

    #[test]
    fn filters_case_insensitively() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("catalog.json");
        CatalogFile::sample().persist(&path)?;
        let catalog = Catalog::new(&path);

        let hits = catalog.events_matching("  ALEXANDRINA ")?;
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "alex-comedy");
        assert_eq!(catalog.events_matching("")?.len(), 3);
        assert!(catalog.events_matching("opera")?.is_empty());
        Ok(())
    }

    #[test]
    fn refresh_rereads_file() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("catalog.json");
        let catalog = Catalog::new(&path);
        assert!(catalog.events()?.is_empty());

        CatalogFile::sample().persist(&path)?;
        assert!(catalog.events()?.is_empty());
        catalog.refresh();
        assert_eq!(catalog.events()?.len(), 3);
        Ok(())
    }
}
