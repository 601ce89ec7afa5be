//! Saved-search alert aggregation.
//!
//! Counts are derived from the server on every fetch and never persisted. The
//! summary is best-effort: any failure, including a missing token, leaves the
//! count map empty rather than surfacing an error.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use futures::future::join_all;

use super::api_client::{resource_path, ApiClient};
use super::events::{AppEvent, EventBus};
use super::session_service::SessionContext;
use crate::error::{ClientError, Result};
use crate::models::{AlertsSummary, Listing, NewSavedSearch, SavedSearch, SavedSearchAlerts};

const SUMMARY_PATH: &str = "/saved-searches/alerts-summary";
const SAVED_SEARCHES_PATH: &str = "/saved-searches";

/// Home page banner data; only produced when something is new.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertBanner {
    pub total_new: u32,
    pub searches_with_new: usize,
}

/// Server counts are unbounded; the total pins at `u32::MAX`.
fn saturating_total(counts: &HashMap<String, u32>) -> u32 {
    counts.values().fold(0u32, |total, count| total.saturating_add(*count))
}

#[derive(Default)]
struct AlertState {
    counts: HashMap<String, u32>,
    matches: HashMap<String, SavedSearchAlerts>,
    // Latest issued request sequence per saved search id.
    match_seq: HashMap<String, u64>,
    next_match_seq: u64,
}

pub struct AlertAggregator {
    api: ApiClient,
    session: Arc<SessionContext>,
    state: Mutex<AlertState>,
    summary_seq: AtomicU64,
    events: EventBus,
}

impl AlertAggregator {
    pub fn new(api: ApiClient, session: Arc<SessionContext>) -> Self {
        Self {
            api,
            session,
            state: Mutex::new(AlertState::default()),
            summary_seq: AtomicU64::new(0),
            events: EventBus::new(),
        }
    }

    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = events;
        self
    }

    fn emit_changed(&self, state: &AlertState) {
        self.events.emit(AppEvent::AlertsUpdated {
            total_new: saturating_total(&state.counts),
        });
    }

    fn lock(&self) -> MutexGuard<'_, AlertState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Replaces the whole count map with the server summary and returns the
    /// new total. Without a token, or on any failure, the map is emptied.
    pub async fn load_summary(&self) -> u32 {
        let seq = self.summary_seq.fetch_add(1, Ordering::SeqCst) + 1;

        let result = match self.session.token() {
            Some(token) => self.api.get::<AlertsSummary>(SUMMARY_PATH, Some(&token)).await,
            None => Err(ClientError::MissingAuth),
        };

        let mut state = self.lock();
        if self.summary_seq.load(Ordering::SeqCst) != seq {
            tracing::debug!(seq, "Discarding stale alerts summary");
            return saturating_total(&state.counts);
        }

        match result {
            Ok(summary) => {
                state.counts = summary
                    .items
                    .into_iter()
                    .map(|item| (item.id, item.count))
                    .collect();
            }
            Err(ClientError::MissingAuth) => state.counts.clear(),
            Err(e) => {
                tracing::warn!("Alerts summary unavailable: {}", e);
                state.counts.clear();
            }
        }
        self.emit_changed(&state);
        saturating_total(&state.counts)
    }

    /// Fetches the concrete matches of one saved search. Only `search_id`'s
    /// entries are touched.
    pub async fn load_matches(&self, search_id: &str) -> Result<SavedSearchAlerts> {
        let token = self.session.require_token()?;
        let seq = {
            let mut state = self.lock();
            state.next_match_seq += 1;
            let seq = state.next_match_seq;
            state.match_seq.insert(search_id.to_string(), seq);
            seq
        };

        let path = resource_path(SAVED_SEARCHES_PATH, search_id, "/alerts");
        let alerts: SavedSearchAlerts = self.api.get(&path, Some(&token)).await?;

        let mut state = self.lock();
        if state.match_seq.get(search_id) == Some(&seq) {
            state.counts.insert(search_id.to_string(), alerts.new_count);
            state.matches.insert(search_id.to_string(), alerts.clone());
            self.emit_changed(&state);
        } else {
            tracing::debug!(search_id, seq, "Discarding stale saved-search matches");
        }
        Ok(alerts)
    }

    /// Loads matches for several searches concurrently; returns how many succeeded.
    pub async fn refresh_matches(&self, search_ids: &[String]) -> usize {
        let results = join_all(search_ids.iter().map(|id| self.load_matches(id))).await;
        results
            .into_iter()
            .zip(search_ids)
            .filter(|(result, id)| match result {
                Ok(_) => true,
                Err(e) => {
                    tracing::warn!(search_id = %id, "Failed to load saved-search matches: {}", e);
                    false
                }
            })
            .count()
    }

    pub fn count_for(&self, search_id: &str) -> u32 {
        self.lock().counts.get(search_id).copied().unwrap_or(0)
    }

    pub fn counts(&self) -> HashMap<String, u32> {
        self.lock().counts.clone()
    }

    pub fn matches_for(&self, search_id: &str) -> Option<SavedSearchAlerts> {
        self.lock().matches.get(search_id).cloned()
    }

    pub fn total_new(&self) -> u32 {
        saturating_total(&self.lock().counts)
    }

    pub fn has_new_alerts(&self) -> bool {
        self.total_new() > 0
    }

    pub fn banner(&self) -> Option<AlertBanner> {
        let state = self.lock();
        let total_new = saturating_total(&state.counts);
        (total_new > 0).then(|| AlertBanner {
            total_new,
            searches_with_new: state.counts.values().filter(|c| **c > 0).count(),
        })
    }

    /// Drops every count and match, e.g. after sign-out.
    pub fn reset(&self) {
        self.summary_seq.fetch_add(1, Ordering::SeqCst);
        let mut state = self.lock();
        state.counts.clear();
        state.matches.clear();
        state.match_seq.clear();
        self.emit_changed(&state);
    }

    pub async fn list_saved_searches(&self) -> Result<Vec<SavedSearch>> {
        let token = self.session.require_token()?;
        let listing: Listing<SavedSearch> = self.api.get(SAVED_SEARCHES_PATH, Some(&token)).await?;
        Ok(listing.into_items())
    }

    pub async fn create_saved_search(&self, search: &NewSavedSearch) -> Result<SavedSearch> {
        let token = self.session.require_token()?;
        self.api.post(SAVED_SEARCHES_PATH, Some(&token), search).await
    }

    /// Deletes a saved search and forgets its alert entries on success.
    pub async fn delete_saved_search(&self, search_id: &str) -> Result<()> {
        let token = self.session.require_token()?;
        self.api
            .delete(&resource_path(SAVED_SEARCHES_PATH, search_id, ""), Some(&token))
            .await?;

        let mut state = self.lock();
        state.counts.remove(search_id);
        state.matches.remove(search_id);
        state.match_seq.remove(search_id);
        self.emit_changed(&state);
        Ok(())
    }
}
