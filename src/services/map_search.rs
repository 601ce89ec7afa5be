//! Map-based discovery of active listings.
//!
//! Each [`MapSearch::load`] runs on its own task whose abort handle replaces
//! the previous one, so a newer load (or [`MapSearch::unmount`]) cancels any
//! fetch still in flight.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use reqwest::Method;
use tokio::task::AbortHandle;

use super::api_client::{ApiClient, ApiRequest};
use super::events::{AppEvent, EventBus};
use crate::error::{ClientError, Result};
use crate::models::{Listing, Property, PropertyFilter};

const PROPERTIES_PATH: &str = "/properties";
const ACTIVE_PROPERTIES_CACHE_KEY: &str = "properties:active";
pub const ACTIVE_PROPERTIES_TTL: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, PartialEq)]
pub struct MapMarker {
    pub property_id: String,
    pub lat: f64,
    pub lng: f64,
    pub title: String,
    pub price: Option<f64>,
}

impl MapMarker {
    fn from_property(property: &Property) -> Option<Self> {
        let (lat, lng) = property.coordinates()?;
        Some(Self {
            property_id: property.id.clone(),
            lat,
            lng,
            title: property.title.clone(),
            price: property.price_value(),
        })
    }
}

#[derive(Default)]
struct MapState {
    properties: Vec<Property>,
    filter: PropertyFilter,
    selected: Option<String>,
    loading: bool,
    error: Option<String>,
}

pub struct MapSearch {
    api: ApiClient,
    state: Mutex<MapState>,
    // Abort handle of the newest load, tagged with its sequence number.
    inflight: Mutex<Option<(u64, AbortHandle)>>,
    load_seq: AtomicU64,
    events: EventBus,
}

impl MapSearch {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            state: Mutex::new(MapState::default()),
            inflight: Mutex::new(None),
            load_seq: AtomicU64::new(0),
            events: EventBus::new(),
        }
    }

    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = events;
        self
    }

    fn emit_changed(&self, state: &MapState) {
        self.events.emit(AppEvent::MapUpdated {
            markers: visible_markers(state).count(),
        });
    }

    fn lock(&self) -> MutexGuard<'_, MapState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_inflight(&self) -> MutexGuard<'_, Option<(u64, AbortHandle)>> {
        self.inflight.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Fetches active listings (through the shared cache) and returns how many
    /// markers can be placed. A superseded load resolves to
    /// [`ClientError::Cancelled`] and leaves state untouched.
    pub async fn load(&self) -> Result<usize> {
        let api = self.api.clone();
        let task = tokio::spawn(async move {
            let request = ApiRequest::new(Method::GET, PROPERTIES_PATH).query("status", "ACTIVE");
            api.get_cached::<Listing<Property>>(request, ACTIVE_PROPERTIES_CACHE_KEY, ACTIVE_PROPERTIES_TTL)
                .await
        });

        let seq = self.load_seq.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some((_, previous)) = self.lock_inflight().replace((seq, task.abort_handle())) {
            previous.abort();
        }
        self.lock().loading = true;

        let outcome = task.await;

        {
            let mut inflight = self.lock_inflight();
            if inflight.as_ref().is_some_and(|(current, _)| *current == seq) {
                *inflight = None;
            }
        }

        let result = match outcome {
            Ok(result) => result,
            Err(join_error) if join_error.is_cancelled() => {
                tracing::debug!("Map search load cancelled");
                return Err(ClientError::Cancelled);
            }
            Err(join_error) => Err(ClientError::Network(join_error.to_string())),
        };

        // The abort can land after the task already finished.
        if self.load_seq.load(Ordering::SeqCst) != seq {
            tracing::debug!(seq, "Discarding superseded map search load");
            return Err(ClientError::Cancelled);
        }

        let mut state = self.lock();
        state.loading = false;
        match result {
            Ok(listing) => {
                state.properties = listing.into_items();
                state.error = None;
                self.emit_changed(&state);
                Ok(visible_markers(&state).count())
            }
            Err(e) => {
                state.error = Some(e.user_message());
                self.emit_changed(&state);
                Err(e)
            }
        }
    }

    /// Cancels any in-flight load, e.g. when the view goes away.
    pub fn unmount(&self) {
        self.load_seq.fetch_add(1, Ordering::SeqCst);
        if let Some((_, handle)) = self.lock_inflight().take() {
            handle.abort();
        }
        self.lock().loading = false;
    }

    pub fn set_filter(&self, filter: PropertyFilter) {
        let mut state = self.lock();
        state.filter = filter;
        let still_visible = state.selected.as_ref().is_some_and(|id| {
            state
                .properties
                .iter()
                .any(|p| &p.id == id && state.filter.matches(p) && p.coordinates().is_some())
        });
        if !still_visible {
            state.selected = None;
        }
        self.emit_changed(&state);
    }

    /// Markers for listings that pass the filter and have finite coordinates.
    pub fn markers(&self) -> Vec<MapMarker> {
        visible_markers(&self.lock()).collect()
    }

    pub fn select_marker(&self, property_id: &str) -> Result<Property> {
        let mut state = self.lock();
        let property = state
            .properties
            .iter()
            .find(|p| p.id == property_id && p.coordinates().is_some())
            .cloned()
            .ok_or_else(|| ClientError::not_found("property", property_id))?;
        state.selected = Some(property.id.clone());
        self.emit_changed(&state);
        Ok(property)
    }

    pub fn selected(&self) -> Option<Property> {
        let state = self.lock();
        let id = state.selected.as_ref()?;
        state.properties.iter().find(|p| &p.id == id).cloned()
    }

    pub fn is_loading(&self) -> bool {
        self.lock().loading
    }

    pub fn error(&self) -> Option<String> {
        self.lock().error.clone()
    }
}

fn visible_markers(state: &MapState) -> impl Iterator<Item = MapMarker> + '_ {
    state
        .properties
        .iter()
        .filter(|p| state.filter.matches(p))
        .filter_map(MapMarker::from_property)
}

impl Drop for MapSearch {
    fn drop(&mut self) {
        let inflight = self.inflight.get_mut().unwrap_or_else(|e| e.into_inner());
        if let Some((_, handle)) = inflight.take() {
            handle.abort();
        }
    }
}
