mod auth;
mod chat;
mod config;
mod events;
mod home;
mod map;
mod notifications;
mod saved_searches;

pub use auth::*;
pub use chat::*;
pub use config::*;
pub use events::*;
pub use home::*;
pub use map::*;
pub use notifications::*;
pub use saved_searches::*;
