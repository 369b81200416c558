use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::models::SettingKey;

pub const APP_DIR_NAME: &str = "pricelist";
pub const DB_FILE_NAME: &str = "pricelist.db";
pub const DEFAULT_BIND: &str = "127.0.0.1:8080";
pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:8080";

pub const ACTIVE_LIST_DEBOUNCE: Duration = Duration::from_secs(2);
// Logo payloads are larger, so they wait a little longer.
pub const LOGO_DEBOUNCE: Duration = Duration::from_secs(3);

/// Upper bound on the decoded size of an uploaded logo.
pub const MAX_LOGO_BYTES: usize = 2 * 1024 * 1024;

pub fn default_data_dir() -> PathBuf {
  dirs::data_dir()
    .or_else(|| std::env::current_dir().ok())
    .unwrap_or_else(|| PathBuf::from("."))
    .join(APP_DIR_NAME)
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
  pub bind: SocketAddr,
  pub db_path: PathBuf,
  pub seed_default_brands: bool,
}

impl ServerConfig {
  pub fn new(bind: SocketAddr, db_path: Option<PathBuf>, seed_default_brands: bool) -> Self {
    Self {
      bind,
      db_path: db_path.unwrap_or_else(|| default_data_dir().join(DB_FILE_NAME)),
      seed_default_brands,
    }
  }
}

#[derive(Clone, Debug)]
pub struct SyncConfig {
  pub active_list_debounce: Duration,
  pub logo_debounce: Duration,
}

impl Default for SyncConfig {
  fn default() -> Self {
    Self {
      active_list_debounce: ACTIVE_LIST_DEBOUNCE,
      logo_debounce: LOGO_DEBOUNCE,
    }
  }
}

impl SyncConfig {
  pub fn debounce_for(&self, key: SettingKey) -> Duration {
    match key {
      SettingKey::ActiveList => self.active_list_debounce,
      SettingKey::Logo => self.logo_debounce,
    }
  }
}
