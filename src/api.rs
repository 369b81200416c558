use axum::{
  body::Bytes,
  extract::{Query, State},
  http::StatusCode,
  response::{IntoResponse, Response},
  routing::get,
  Json, Router,
};
use log::{error, info, warn};
use rusqlite::Connection;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::config::ServerConfig;
use crate::error::CatalogError;
use crate::models::{
  Brand, BrandUpdateRequest, ErrorDto, HealthDto, NewBrandInput, Product, ProductInput, Setting,
  SettingsSnapshot, SuccessDto,
};
use crate::pricing::product_from_input;
use crate::store;

impl IntoResponse for CatalogError {
  fn into_response(self) -> Response {
    let status = match &self {
      CatalogError::Validation(_) => StatusCode::BAD_REQUEST,
      CatalogError::Conflict(_) => StatusCode::CONFLICT,
      _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
      error!("Request failed: {}", self);
    } else {
      warn!("Request rejected: {}", self);
    }
    (status, Json(ErrorDto { error: self.to_string() })).into_response()
  }
}

#[derive(Clone)]
pub struct AppState {
  db_path: Arc<PathBuf>,
}

impl AppState {
  pub fn new(db_path: PathBuf) -> Self {
    Self {
      db_path: Arc::new(db_path),
    }
  }

  async fn with_connection<T, F>(&self, work: F) -> Result<T, CatalogError>
  where
    T: Send + 'static,
    F: FnOnce(&mut Connection) -> Result<T, CatalogError> + Send + 'static,
  {
    let db_path = self.db_path.clone();
    tokio::task::spawn_blocking(move || {
      let mut connection = store::open_database(&db_path)?;
      work(&mut connection)
    })
    .await?
  }
}

pub fn router(state: AppState) -> Router {
  Router::new()
    .route(
      "/api/brands",
      get(list_brands)
        .post(add_brand)
        .put(update_brands)
        .delete(delete_brand),
    )
    .route(
      "/api/inventory",
      get(list_inventory).post(upsert_product).delete(delete_product),
    )
    .route("/api/settings", get(load_settings).post(save_setting))
    .route("/api/test-db", get(test_db))
    .with_state(state)
}

fn parse_body<T: DeserializeOwned>(body: &Bytes) -> Result<T, CatalogError> {
  serde_json::from_slice(body)
    .map_err(|error| CatalogError::Validation(format!("Invalid request body: {}", error)))
}

#[derive(Deserialize)]
struct NameQuery {
  name: Option<String>,
}

#[derive(Deserialize)]
struct IdQuery {
  id: Option<String>,
}

fn required(value: Option<String>, message: &str) -> Result<String, CatalogError> {
  value
    .map(|value| value.trim().to_string())
    .filter(|value| !value.is_empty())
    .ok_or_else(|| CatalogError::validation(message))
}

async fn list_brands(State(state): State<AppState>) -> Result<Json<Vec<Brand>>, CatalogError> {
  let brands = state.with_connection(|conn| store::list_brands(conn)).await?;
  Ok(Json(brands))
}

async fn add_brand(State(state): State<AppState>, body: Bytes) -> Result<Json<Brand>, CatalogError> {
  let input: NewBrandInput = parse_body(&body)?;
  if input.name.trim().is_empty() {
    return Err(CatalogError::validation("Name is required"));
  }

  let brand = state
    .with_connection(move |conn| store::insert_brand(conn, input))
    .await?;
  info!("Created brand {} at position {}", brand.name, brand.order_index);
  Ok(Json(brand))
}

async fn update_brands(
  State(state): State<AppState>,
  body: Bytes,
) -> Result<Json<Vec<Brand>>, CatalogError> {
  let request: BrandUpdateRequest =
    serde_json::from_slice(&body).map_err(|_| CatalogError::validation("Invalid action"))?;

  let brands = state
    .with_connection(move |conn| match request {
      BrandUpdateRequest::Reorder { brands, .. } => store::reorder_brands(conn, &brands),
      BrandUpdateRequest::Replace { brands } => store::update_brands(conn, &brands),
    })
    .await?;
  Ok(Json(brands))
}

async fn delete_brand(
  State(state): State<AppState>,
  Query(query): Query<NameQuery>,
) -> Result<Json<SuccessDto>, CatalogError> {
  let name = required(query.name, "Name is required")?;
  state
    .with_connection(move |conn| store::delete_brand(conn, &name))
    .await?;
  Ok(Json(SuccessDto::ok()))
}

async fn list_inventory(State(state): State<AppState>) -> Result<Json<Vec<Product>>, CatalogError> {
  let products = state.with_connection(|conn| store::list_inventory(conn)).await?;
  Ok(Json(products))
}

async fn upsert_product(
  State(state): State<AppState>,
  body: Bytes,
) -> Result<Json<Product>, CatalogError> {
  let input: ProductInput = parse_body(&body)?;
  let product = product_from_input(input).map_err(CatalogError::Validation)?;

  let saved = product.clone();
  state
    .with_connection(move |conn| store::upsert_product(conn, &saved))
    .await?;
  Ok(Json(product))
}

async fn delete_product(
  State(state): State<AppState>,
  Query(query): Query<IdQuery>,
) -> Result<Json<SuccessDto>, CatalogError> {
  let id = required(query.id, "ID is required")?;
  let removed = state
    .with_connection(move |conn| store::delete_product(conn, &id))
    .await?;
  if !removed {
    warn!("Delete requested for a product that does not exist");
  }
  Ok(Json(SuccessDto::ok()))
}

async fn load_settings(
  State(state): State<AppState>,
) -> Result<Json<SettingsSnapshot>, CatalogError> {
  let snapshot = state.with_connection(|conn| store::load_settings(conn)).await?;
  Ok(Json(snapshot))
}

async fn save_setting(
  State(state): State<AppState>,
  body: Bytes,
) -> Result<Json<SuccessDto>, CatalogError> {
  let raw: serde_json::Value = parse_body(&body)?;
  let key = match raw.get("key").and_then(|key| key.as_str()) {
    Some(key) if !key.trim().is_empty() => key.to_string(),
    _ => return Err(CatalogError::validation("Key is required")),
  };
  let setting: Setting = serde_json::from_value(raw)
    .map_err(|_| CatalogError::Validation(format!("Unknown or malformed setting: {}", key)))?;

  let updated_at = state
    .with_connection(move |conn| store::save_setting(conn, &setting))
    .await?;
  info!("Saved setting {} at {}", key, updated_at);
  Ok(Json(SuccessDto::ok()))
}

async fn test_db(State(state): State<AppState>) -> Response {
  match state.with_connection(|conn| store::count_brands(conn)).await {
    Ok(count) => Json(HealthDto {
      status: "success".to_string(),
      message: "Database connection OK".to_string(),
      brands: Some(count),
    })
    .into_response(),
    Err(error) => {
      error!("Database probe failed: {}", error);
      (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(HealthDto {
          status: "error".to_string(),
          message: error.to_string(),
          brands: None,
        }),
      )
        .into_response()
    }
  }
}

pub async fn serve_listener(
  listener: TcpListener,
  state: AppState,
  shutdown: CancellationToken,
) -> Result<(), CatalogError> {
  info!("Listening on http://{}", listener.local_addr()?);
  axum::serve(listener, router(state))
    .with_graceful_shutdown(async move { shutdown.cancelled().await })
    .await?;
  Ok(())
}

pub async fn serve(config: ServerConfig) -> Result<(), CatalogError> {
  let db_path = config.db_path.clone();
  let seed = config.seed_default_brands;
  tokio::task::spawn_blocking(move || store::init_database(&db_path, seed)).await??;

  let listener = TcpListener::bind(config.bind).await?;
  let shutdown = CancellationToken::new();
  let trigger = shutdown.clone();
  tokio::spawn(async move {
    if let Err(error) = tokio::signal::ctrl_c().await {
      error!("Failed to listen for Ctrl-C: {}", error);
      return;
    }
    info!("Shutting down");
    trigger.cancel();
  });

  serve_listener(listener, AppState::new(config.db_path), shutdown).await
}
