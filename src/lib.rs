pub mod active_list;
pub mod api;
pub mod client;
pub mod config;
pub mod controller;
pub mod debounce;
pub mod error;
pub mod export;
pub mod local_cache;
pub mod models;
pub mod pricing;
pub mod store;

pub use client::{CatalogApi, HttpCatalogClient};
pub use controller::{LoadState, Notice, NoticeLevel, PriceListController};
pub use error::{CatalogError, ClientError};
pub use models::{Brand, Product, Setting, SettingKey, SettingsSnapshot};

pub fn init_logging() {
  let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
    .format_timestamp_millis()
    .try_init();
}
