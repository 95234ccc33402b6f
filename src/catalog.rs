//! Event catalog adapters: an in-memory snapshot and an HTTP loader.

use std::collections::HashMap;

use tracing::{info, warn};

use crate::config::CatalogConfig;
use crate::error::Result;
use crate::models::Event;
use crate::traits::EventCatalog;

/// Catalog snapshot held in memory for the duration of a request.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    events: Vec<Event>,
    index: HashMap<String, usize>,
}

impl InMemoryCatalog {
    /// Builds a catalog. Later duplicates of an event ID are dropped.
    pub fn new(events: Vec<Event>) -> Self {
        let mut unique = Vec::with_capacity(events.len());
        let mut index = HashMap::new();
        for event in events {
            if index.contains_key(&event.id) {
                warn!(event_id = %event.id, "catalog_duplicate_event");
                continue;
            }
            index.insert(event.id.clone(), unique.len());
            unique.push(event);
        }
        Self { events: unique, index }
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl EventCatalog for InMemoryCatalog {
    fn event(&self, id: &str) -> Option<&Event> {
        self.index.get(id).map(|&i| &self.events[i])
    }

    fn events(&self) -> &[Event] {
        &self.events
    }
}

/// Loads catalog snapshots from the event service.
#[derive(Debug, Clone)]
pub struct HttpCatalog {
    config: CatalogConfig,
    client: reqwest::blocking::Client,
}

impl HttpCatalog {
    pub fn new(config: CatalogConfig) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { config, client })
    }

    pub fn events_url(&self) -> String {
        format!("{}/events", self.config.base_url.trim_end_matches('/'))
    }

    /// Fetches every event. Must complete before any scoring call.
    pub fn fetch(&self) -> Result<InMemoryCatalog> {
        let events = self
            .client
            .get(self.events_url())
            .send()
            .and_then(|resp| resp.error_for_status())
            .and_then(|resp| resp.json::<Vec<Event>>())?;

        info!(events = events.len(), url = %self.events_url(), "catalog_fetched");
        Ok(InMemoryCatalog::new(events))
    }
}
