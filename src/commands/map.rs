use crate::error::Result;
use crate::models::{Property, PropertyFilter};
use crate::services::map_search::MapMarker;
use crate::state::AppState;

/// Loads active listings and returns the markers to place.
pub async fn load_map(state: &AppState) -> Result<Vec<MapMarker>> {
    state.map.load().await?;
    Ok(state.map.markers())
}

pub fn set_map_filter(state: &AppState, filter: PropertyFilter) -> Vec<MapMarker> {
    state.map.set_filter(filter);
    state.map.markers()
}

pub fn select_map_marker(state: &AppState, property_id: &str) -> Result<Property> {
    state.map.select_marker(property_id)
}

/// The map view went away; any load still in flight is cancelled.
pub fn leave_map(state: &AppState) {
    state.map.unmount();
}
