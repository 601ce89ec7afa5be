use crate::error::Result;
use crate::services::config_service;

pub fn get_config() -> Result<config_service::Config> {
    config_service::load_config()
}

pub fn set_base_url(url: &str) -> Result<()> {
    config_service::set_base_url(url)
}

pub fn get_effective_config() -> Result<config_service::EffectiveConfig> {
    config_service::get_effective_config()
}
