use chrono::NaiveDate;
use log::{error, info, warn};
use std::sync::Arc;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

use crate::active_list::{browse_inventory, group_by_brand, ActiveList, AddOutcome, BrandGroup, InventoryListing};
use crate::client::CatalogApi;
use crate::config::{SyncConfig, MAX_LOGO_BYTES};
use crate::debounce::Debouncer;
use crate::error::ClientError;
use crate::export::PriceSheet;
use crate::local_cache::LocalCache;
use crate::models::{Brand, BrandUpdate, NewBrandInput, Product, Setting, SettingKey, SettingsSnapshot};
use crate::pricing::ProductDraft;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadState {
  Uninitialized,
  CacheLoaded,
  DurableLoaded,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoticeLevel {
  Success,
  Info,
  Warning,
  Error,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notice {
  pub level: NoticeLevel,
  pub message: String,
}

impl Notice {
  pub fn new(level: NoticeLevel, message: impl Into<String>) -> Self {
    Self {
      level,
      message: message.into(),
    }
  }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SettingsReconcile {
  pub active_list_changed: bool,
  pub logo_changed: bool,
}

pub fn validate_logo(logo: &str) -> Result<(), String> {
  let Some(rest) = logo.strip_prefix("data:image/") else {
    return Err("Logo must be an image data URI.".to_string());
  };
  let Some((_, payload)) = rest.split_once(',') else {
    return Err("Logo must be an image data URI.".to_string());
  };

  let decoded_len = payload.trim_end_matches('=').len() * 3 / 4;
  if decoded_len > MAX_LOGO_BYTES {
    return Err("Logo is too large (max 2MB).".to_string());
  }
  Ok(())
}

/// Client-side state of the price list tool: the catalog as last fetched, the
/// active list, and the logo. Catalog writes go straight to the API and are
/// reconciled by refetching; the active list and logo are written to the local
/// cache at once and to the durable store after a quiet period.
pub struct PriceListController {
  api: Arc<dyn CatalogApi>,
  cache: LocalCache,
  config: SyncConfig,
  state: LoadState,
  brands: Vec<Brand>,
  inventory: Vec<Product>,
  active_list: ActiveList,
  logo: Option<String>,
  debouncer: Debouncer<SettingKey>,
  notices: UnboundedSender<Notice>,
}

impl PriceListController {
  pub fn new(
    api: Arc<dyn CatalogApi>,
    cache: LocalCache,
    config: SyncConfig,
  ) -> (Self, UnboundedReceiver<Notice>) {
    let (notices, receiver) = unbounded_channel();
    let controller = Self {
      api,
      cache,
      config,
      state: LoadState::Uninitialized,
      brands: Vec::new(),
      inventory: Vec::new(),
      active_list: ActiveList::default(),
      logo: None,
      debouncer: Debouncer::new(),
      notices,
    };
    (controller, receiver)
  }

  pub fn state(&self) -> LoadState {
    self.state
  }

  pub fn brands(&self) -> &[Brand] {
    &self.brands
  }

  pub fn inventory(&self) -> &[Product] {
    &self.inventory
  }

  pub fn active_list(&self) -> &[Product] {
    self.active_list.entries()
  }

  pub fn logo(&self) -> Option<&str> {
    self.logo.as_deref()
  }

  pub fn has_pending_sync(&self, key: SettingKey) -> bool {
    self.debouncer.is_pending(&key)
  }

  fn notify(&self, level: NoticeLevel, message: impl Into<String>) {
    let _ = self.notices.send(Notice::new(level, message));
  }

  pub async fn start(&mut self) -> Result<(), ClientError> {
    self.load_from_cache();

    let api = self.api.clone();
    let (catalog, settings) = tokio::join!(fetch_catalog(api.as_ref()), api.load_settings());

    match settings {
      Ok(snapshot) => {
        self.apply_durable_settings(snapshot);
      }
      Err(error) => warn!("Failed to load settings from the durable store: {}", error),
    }

    let (brands, inventory) = catalog.map_err(|error| {
      error!("Failed to load catalog: {}", error);
      error
    })?;
    self.brands = brands;
    self.inventory = inventory;
    Ok(())
  }

  pub fn load_from_cache(&mut self) {
    if self.state != LoadState::Uninitialized {
      return;
    }
    if let Some(list) = self.cache.load_active_list() {
      self.active_list.set(list);
    }
    if let Some(logo) = self.cache.load_logo() {
      self.logo = Some(logo);
    }
    self.state = LoadState::CacheLoaded;
  }

  pub async fn load_durable(&mut self) -> Result<SettingsReconcile, ClientError> {
    if self.state == LoadState::Uninitialized {
      self.load_from_cache();
    }
    let snapshot = self.api.load_settings().await.map_err(|error| {
      warn!("Failed to load settings from the durable store: {}", error);
      error
    })?;
    Ok(self.apply_durable_settings(snapshot))
  }

  fn apply_durable_settings(&mut self, snapshot: SettingsSnapshot) -> SettingsReconcile {
    let mut reconcile = SettingsReconcile::default();

    if let Some(list) = snapshot.active_list {
      self.debouncer.cancel(&SettingKey::ActiveList);
      if list.as_slice() != self.active_list.entries() {
        self.active_list.set(list);
        reconcile.active_list_changed = true;
      }
      if let Err(error) = self.cache.store_active_list(self.active_list.entries()) {
        warn!("Failed to cache active list: {}", error);
      }
    }

    if let Some(logo) = snapshot.logo {
      self.debouncer.cancel(&SettingKey::Logo);
      if self.logo.as_deref() != Some(logo.as_str()) {
        self.logo = Some(logo);
        reconcile.logo_changed = true;
      }
      if let Err(error) = self.cache.store_logo(self.logo.as_deref()) {
        warn!("Failed to cache logo: {}", error);
      }
    }

    self.state = LoadState::DurableLoaded;
    reconcile
  }

  pub async fn refresh_catalog(&mut self) -> Result<(), ClientError> {
    match fetch_catalog(self.api.as_ref()).await {
      Ok((brands, inventory)) => {
        self.brands = brands;
        self.inventory = inventory;
        Ok(())
      }
      Err(error) => {
        error!("Failed to refresh catalog: {}", error);
        Err(error)
      }
    }
  }

  async fn rollback_catalog(&mut self) {
    if self.refresh_catalog().await.is_err() {
      warn!("Rollback refetch failed; local catalog may be stale");
    }
  }

  pub async fn add_brand(&mut self, name: &str, color: &str) -> Result<(), ClientError> {
    let name = name.trim().to_uppercase();
    if name.is_empty() {
      self.notify(NoticeLevel::Error, "Brand name is required.");
      return Err(ClientError::validation("Brand name is required."));
    }

    let input = NewBrandInput {
      name: name.clone(),
      color: Some(color.trim().to_string()),
    };
    match self.api.add_brand(&input).await {
      Ok(()) => {
        self.notify(NoticeLevel::Success, "Brand created.");
        self.refresh_catalog().await
      }
      Err(ClientError::Conflict(message)) => {
        self.notify(NoticeLevel::Error, format!("Brand {} already exists.", name));
        Err(ClientError::Conflict(message))
      }
      Err(error) => {
        self.notify(NoticeLevel::Error, "Could not create brand.");
        Err(error)
      }
    }
  }

  /// Moves the brand at `from` to position `to`, shows the new order at once and
  /// sends the full name sequence. On failure the catalog is refetched.
  pub async fn move_brand(&mut self, from: usize, to: usize) -> Result<(), ClientError> {
    if from >= self.brands.len() || to >= self.brands.len() {
      return Err(ClientError::validation("Brand position out of range."));
    }
    if from == to {
      return Ok(());
    }

    let brand = self.brands.remove(from);
    self.brands.insert(to, brand);
    for (index, brand) in self.brands.iter_mut().enumerate() {
      brand.order_index = index as i64;
    }

    let names: Vec<String> = self.brands.iter().map(|brand| brand.name.clone()).collect();
    match self.api.reorder_brands(&names).await {
      Ok(()) => {
        self.notify(NoticeLevel::Success, "Brand order updated.");
        Ok(())
      }
      Err(error) => {
        error!("Failed to save brand order: {}", error);
        self.notify(NoticeLevel::Error, "Could not sync brand order.");
        self.rollback_catalog().await;
        Err(error)
      }
    }
  }

  pub async fn set_brand_color(&mut self, name: &str, color: &str) -> Result<(), ClientError> {
    let color = color.trim();
    let Some(brand) = self.brands.iter_mut().find(|brand| brand.name == name) else {
      return Err(ClientError::Validation(format!("Unknown brand: {}", name)));
    };
    if color.is_empty() {
      return Err(ClientError::validation("Brand color is required."));
    }
    brand.color = color.to_string();

    let rows: Vec<BrandUpdate> = self
      .brands
      .iter()
      .map(|brand| BrandUpdate {
        name: brand.name.clone(),
        color: Some(brand.color.clone()),
        order_index: Some(brand.order_index),
      })
      .collect();
    match self.api.update_brands(&rows).await {
      Ok(()) => Ok(()),
      Err(error) => {
        error!("Failed to save brand color: {}", error);
        self.notify(NoticeLevel::Error, "Could not update brand.");
        self.rollback_catalog().await;
        Err(error)
      }
    }
  }

  pub async fn delete_brand(&mut self, name: &str) -> Result<(), ClientError> {
    let name = name.trim();
    if name.is_empty() {
      return Err(ClientError::validation("Brand name is required."));
    }

    match self.api.delete_brand(name).await {
      Ok(()) => {
        self.notify(NoticeLevel::Success, "Brand deleted.");
        self.refresh_catalog().await
      }
      Err(error) => {
        self.notify(NoticeLevel::Error, "Could not delete brand.");
        self.rollback_catalog().await;
        Err(error)
      }
    }
  }

  fn validate_draft(&self, draft: ProductDraft) -> Result<Product, ClientError> {
    draft.into_product().map_err(|message| {
      self.notify(NoticeLevel::Error, message.clone());
      ClientError::Validation(message)
    })
  }

  pub async fn add_product(&mut self, draft: ProductDraft) -> Result<Product, ClientError> {
    let product = self.validate_draft(draft)?;

    self.inventory.retain(|existing| existing.id != product.id);
    self.inventory.push(product.clone());
    let outcome = self.push_active(&product);

    match self.api.upsert_product(&product).await {
      Ok(()) => {
        self.notify(NoticeLevel::Success, "Product added.");
        Ok(product)
      }
      Err(error) => {
        error!("Failed to save product {}: {}", product.id, error);
        self.notify(NoticeLevel::Error, "Could not save product.");
        if outcome == AddOutcome::Added && self.active_list.remove(&product.id) {
          self.persist_active_list();
        }
        self.rollback_catalog().await;
        Err(error)
      }
    }
  }

  /// Rewrites a product. When brand, model or specs change the id changes too:
  /// the old row is deleted before the new one is written, and active list
  /// snapshots of the old id are replaced.
  pub async fn update_product(&mut self, old_id: &str, draft: ProductDraft) -> Result<Product, ClientError> {
    let product = self.validate_draft(draft)?;

    let api = self.api.clone();
    let result = async {
      if product.id != old_id {
        api.delete_product(old_id).await?;
      }
      api.upsert_product(&product).await
    }
    .await;

    match result {
      Ok(()) => {
        let _ = self.refresh_catalog().await;
        if self.active_list.replace(old_id, &product) > 0 {
          self.persist_active_list();
        }
        self.notify(NoticeLevel::Success, "Product updated.");
        Ok(product)
      }
      Err(error) => {
        error!("Failed to update product {}: {}", old_id, error);
        self.notify(NoticeLevel::Error, "Could not update product.");
        self.rollback_catalog().await;
        Err(error)
      }
    }
  }

  pub async fn delete_product(&mut self, id: &str) -> Result<(), ClientError> {
    if id.trim().is_empty() {
      return Err(ClientError::validation("Product id is required."));
    }

    match self.api.delete_product(id).await {
      Ok(()) => {
        self.notify(NoticeLevel::Success, "Product deleted.");
        self.refresh_catalog().await
      }
      Err(error) => {
        self.notify(NoticeLevel::Error, "Could not delete product.");
        self.rollback_catalog().await;
        Err(error)
      }
    }
  }

  fn push_active(&mut self, product: &Product) -> AddOutcome {
    let outcome = self.active_list.add(product);
    match outcome {
      AddOutcome::Added => self.persist_active_list(),
      AddOutcome::Duplicate => {
        self.notify(NoticeLevel::Warning, "Product is already in the active list.");
      }
    }
    outcome
  }

  pub fn add_to_active_list(&mut self, product: &Product) -> AddOutcome {
    let outcome = self.push_active(product);
    if outcome == AddOutcome::Added {
      self.notify(NoticeLevel::Success, "Added to the active list.");
    }
    outcome
  }

  pub fn remove_from_active_list(&mut self, id: &str) -> bool {
    let removed = self.active_list.remove(id);
    if removed {
      self.persist_active_list();
    }
    removed
  }

  pub fn set_logo(&mut self, logo: String) -> Result<(), ClientError> {
    if let Err(message) = validate_logo(&logo) {
      self.notify(NoticeLevel::Error, message.clone());
      return Err(ClientError::Validation(message));
    }
    self.logo = Some(logo);
    self.notify(NoticeLevel::Success, "Logo loaded.");
    self.persist_logo();
    Ok(())
  }

  pub fn remove_logo(&mut self) {
    self.logo = None;
    self.notify(NoticeLevel::Info, "Logo removed.");
    self.persist_logo();
  }

  pub fn browse_inventory(&self, term: &str) -> InventoryListing {
    browse_inventory(&self.inventory, term)
  }

  pub fn grouped_active_list(&self) -> Vec<BrandGroup> {
    group_by_brand(self.active_list.entries(), &self.brands)
  }

  pub fn price_sheet(&self, date: NaiveDate) -> PriceSheet {
    PriceSheet::build(self.active_list.entries(), &self.brands, self.logo.as_deref(), date)
  }

  fn persist_active_list(&mut self) {
    if self.state == LoadState::Uninitialized {
      return;
    }
    if let Err(error) = self.cache.store_active_list(self.active_list.entries()) {
      warn!("Failed to cache active list: {}", error);
    }
    self.schedule_durable(Setting::ActiveList(self.active_list.entries().to_vec()));
  }

  fn persist_logo(&mut self) {
    if self.state == LoadState::Uninitialized {
      return;
    }
    if let Err(error) = self.cache.store_logo(self.logo.as_deref()) {
      warn!("Failed to cache logo: {}", error);
    }
    self.schedule_durable(Setting::Logo(self.logo.clone()));
  }

  fn schedule_durable(&mut self, setting: Setting) {
    let key = setting.key();
    let delay = self.config.debounce_for(key);
    let api = self.api.clone();
    let notices = self.notices.clone();

    self.debouncer.schedule(key, delay, async move {
      match api.save_setting(&setting).await {
        Ok(()) => {
          info!("Saved {} to the durable store", key.as_str());
          let _ = notices.send(Notice::new(
            NoticeLevel::Success,
            format!("{} synced.", key.as_str()),
          ));
        }
        Err(error) => {
          error!("Failed to save {} to the durable store: {}", key.as_str(), error);
          let _ = notices.send(Notice::new(
            NoticeLevel::Error,
            format!("Could not sync {}.", key.as_str()),
          ));
        }
      }
    });
  }

  pub async fn flush(&mut self) -> Result<(), ClientError> {
    if self.debouncer.cancel(&SettingKey::ActiveList) {
      let setting = Setting::ActiveList(self.active_list.entries().to_vec());
      self.api.save_setting(&setting).await?;
    }
    if self.debouncer.cancel(&SettingKey::Logo) {
      self.api.save_setting(&Setting::Logo(self.logo.clone())).await?;
    }
    Ok(())
  }
}

async fn fetch_catalog(api: &dyn CatalogApi) -> Result<(Vec<Brand>, Vec<Product>), ClientError> {
  tokio::try_join!(api.list_brands(), api.list_inventory())
}
