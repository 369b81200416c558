use log::warn;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ClientError;
use crate::models::Product;

pub const CACHE_KEY_ACTIVE_LIST: &str = "priceList_activeList";
pub const CACHE_KEY_LOGO: &str = "priceList_logo";
const CACHE_FILE: &str = "local_storage.json";

pub struct LocalCache {
  path: PathBuf,
  entries: BTreeMap<String, String>,
}

impl LocalCache {
  pub fn open(dir: &Path) -> Result<Self, ClientError> {
    fs::create_dir_all(dir).map_err(|e| ClientError::Cache(e.to_string()))?;
    let path = dir.join(CACHE_FILE);

    let entries = if path.exists() {
      let body = fs::read_to_string(&path).map_err(|e| ClientError::Cache(e.to_string()))?;
      match serde_json::from_str::<BTreeMap<String, String>>(&body) {
        Ok(entries) => entries,
        Err(error) => {
          warn!("Discarding unreadable cache file {}: {}", path.display(), error);
          BTreeMap::new()
        }
      }
    } else {
      BTreeMap::new()
    };

    Ok(Self { path, entries })
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  pub fn get(&self, key: &str) -> Option<&str> {
    self.entries.get(key).map(String::as_str)
  }

  pub fn set(&mut self, key: &str, value: String) -> Result<(), ClientError> {
    if self.entries.get(key) == Some(&value) {
      return Ok(());
    }
    self.entries.insert(key.to_string(), value);
    self.flush()
  }

  pub fn remove(&mut self, key: &str) -> Result<(), ClientError> {
    if self.entries.remove(key).is_some() {
      self.flush()?;
    }
    Ok(())
  }

  pub fn load_active_list(&self) -> Option<Vec<Product>> {
    let raw = self.get(CACHE_KEY_ACTIVE_LIST)?;
    match serde_json::from_str(raw) {
      Ok(list) => Some(list),
      Err(error) => {
        warn!("Ignoring cached active list: {}", error);
        None
      }
    }
  }

  pub fn store_active_list(&mut self, list: &[Product]) -> Result<(), ClientError> {
    let body = serde_json::to_string(list).map_err(|e| ClientError::Cache(e.to_string()))?;
    self.set(CACHE_KEY_ACTIVE_LIST, body)
  }

  pub fn load_logo(&self) -> Option<String> {
    self
      .get(CACHE_KEY_LOGO)
      .filter(|logo| !logo.is_empty())
      .map(str::to_string)
  }

  pub fn store_logo(&mut self, logo: Option<&str>) -> Result<(), ClientError> {
    match logo {
      Some(logo) => self.set(CACHE_KEY_LOGO, logo.to_string()),
      None => self.remove(CACHE_KEY_LOGO),
    }
  }

  fn flush(&self) -> Result<(), ClientError> {
    let body =
      serde_json::to_string_pretty(&self.entries).map_err(|e| ClientError::Cache(e.to_string()))?;
    let temp_path = self.path.with_extension("json.tmp");
    fs::write(&temp_path, body).map_err(|e| ClientError::Cache(e.to_string()))?;
    fs::rename(&temp_path, &self.path).map_err(|e| {
      let _ = fs::remove_file(&temp_path);
      ClientError::Cache(e.to_string())
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::pricing::ProductDraft;

  #[test]
  fn values_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let product = ProductDraft::new("BLU", "G91", "", "5000").into_product().unwrap();
    {
      let mut cache = LocalCache::open(dir.path()).unwrap();
      cache.store_active_list(&[product.clone()]).unwrap();
      cache.store_logo(Some("data:image/png;base64,AA==")).unwrap();
    }

    let cache = LocalCache::open(dir.path()).unwrap();
    assert_eq!(cache.load_active_list(), Some(vec![product]));
    assert_eq!(cache.load_logo().as_deref(), Some("data:image/png;base64,AA=="));
  }

  #[test]
  fn removing_logo_clears_the_key() {
    let dir = tempfile::tempdir().unwrap();
    let mut cache = LocalCache::open(dir.path()).unwrap();
    cache.store_logo(Some("data:image/png;base64,AA==")).unwrap();
    cache.store_logo(None).unwrap();
    assert_eq!(cache.get(CACHE_KEY_LOGO), None);
    assert_eq!(LocalCache::open(dir.path()).unwrap().load_logo(), None);
  }

  #[test]
  fn corrupt_entries_are_ignored() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join(CACHE_FILE), "not json").unwrap();
    let mut cache = LocalCache::open(dir.path()).unwrap();
    assert_eq!(cache.load_active_list(), None);

    cache.set(CACHE_KEY_ACTIVE_LIST, "[{broken".to_string()).unwrap();
    assert_eq!(cache.load_active_list(), None);
  }
}
