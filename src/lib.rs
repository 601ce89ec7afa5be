pub mod commands;
pub mod error;
pub mod models;
pub mod services;
pub mod state;

#[cfg(test)]
mod test_support;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub use error::{ClientError, Result};
pub use state::AppState;

/// Installs the `fmt` subscriber. `RUST_LOG` overrides the default filter.
pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "inmo=info,inmo_lib=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Builds the app state from the effective configuration, restores the stored
/// session and prints what the home page would show.
pub async fn run() -> Result<()> {
    let config = commands::get_effective_config()?;
    tracing::info!(api = %config.api_base_url, "Starting Inmo client");

    let state = AppState::from_config(config)?;
    state.spawn_session_listener();

    let status = commands::check_auth_status(&state);
    if !status.is_authenticated {
        println!("Not signed in.");
        return Ok(());
    }

    if let Err(e) = commands::refresh_profile(&state).await {
        if e.is_missing_auth() {
            println!("Session expired. Sign in again.");
            return Ok(());
        }
        tracing::warn!("Could not refresh profile: {}", e);
    }

    let snapshot = commands::home_snapshot(&state, "/").await;
    if let Some(name) = &snapshot.greeting_name {
        println!("Hola, {}", name);
    }
    match &snapshot.alert_banner {
        Some(banner) => println!(
            "{} new listings across {} saved searches",
            banner.total_new, banner.searches_with_new
        ),
        None => println!("No new listings for your saved searches."),
    }
    println!("Unread notifications: {}", snapshot.unread_notifications);

    Ok(())
}
