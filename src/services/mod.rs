pub mod alert_service;
pub mod api_client;
pub mod chat_service;
pub mod config_service;
pub mod events;
pub mod file_service;
pub mod http_cache;
pub mod map_search;
pub mod notification_service;
pub mod session_service;
