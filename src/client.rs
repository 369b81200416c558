use async_trait::async_trait;
use log::error;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;

use crate::error::ClientError;
use crate::models::{
  Brand, BrandUpdate, BrandUpdateRequest, ErrorDto, NewBrandInput, Product, ProductInput, Setting,
  SettingsSnapshot,
};

#[async_trait]
pub trait CatalogApi: Send + Sync {
  async fn list_brands(&self) -> Result<Vec<Brand>, ClientError>;
  async fn add_brand(&self, input: &NewBrandInput) -> Result<(), ClientError>;
  async fn reorder_brands(&self, names: &[String]) -> Result<(), ClientError>;
  async fn update_brands(&self, brands: &[BrandUpdate]) -> Result<(), ClientError>;
  async fn delete_brand(&self, name: &str) -> Result<(), ClientError>;
  async fn list_inventory(&self) -> Result<Vec<Product>, ClientError>;
  async fn upsert_product(&self, product: &Product) -> Result<(), ClientError>;
  async fn delete_product(&self, id: &str) -> Result<(), ClientError>;
  async fn load_settings(&self) -> Result<SettingsSnapshot, ClientError>;
  async fn save_setting(&self, setting: &Setting) -> Result<(), ClientError>;
}

#[derive(Clone)]
pub struct HttpCatalogClient {
  base_url: String,
  client: Client,
}

impl HttpCatalogClient {
  pub fn new(base_url: &str) -> Result<Self, ClientError> {
    let client = Client::builder().build()?;
    Ok(Self {
      base_url: base_url.trim_end_matches('/').to_string(),
      client,
    })
  }

  fn url(&self, path: &str) -> String {
    format!("{}{}", self.base_url, path)
  }

  async fn check(response: Response) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
      return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorDto>(&body)
      .map(|dto| dto.error)
      .unwrap_or_else(|_| body.trim().to_string());

    error!("Catalog API responded {}: {}", status, message);
    Err(match status {
      StatusCode::CONFLICT => ClientError::Conflict(message),
      StatusCode::BAD_REQUEST => ClientError::Validation(message),
      _ => ClientError::Status {
        status: status.as_u16(),
        message,
      },
    })
  }

  async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
    let response = self.client.get(self.url(path)).send().await?;
    Ok(Self::check(response).await?.json::<T>().await?)
  }
}

#[async_trait]
impl CatalogApi for HttpCatalogClient {
  async fn list_brands(&self) -> Result<Vec<Brand>, ClientError> {
    self.get_json("/api/brands").await
  }

  async fn add_brand(&self, input: &NewBrandInput) -> Result<(), ClientError> {
    let response = self
      .client
      .post(self.url("/api/brands"))
      .json(input)
      .send()
      .await?;
    Self::check(response).await?;
    Ok(())
  }

  async fn reorder_brands(&self, names: &[String]) -> Result<(), ClientError> {
    let body = BrandUpdateRequest::reorder(names.to_vec());
    let response = self
      .client
      .put(self.url("/api/brands"))
      .json(&body)
      .send()
      .await?;
    Self::check(response).await?;
    Ok(())
  }

  async fn update_brands(&self, brands: &[BrandUpdate]) -> Result<(), ClientError> {
    let body = BrandUpdateRequest::Replace {
      brands: brands.to_vec(),
    };
    let response = self
      .client
      .put(self.url("/api/brands"))
      .json(&body)
      .send()
      .await?;
    Self::check(response).await?;
    Ok(())
  }

  async fn delete_brand(&self, name: &str) -> Result<(), ClientError> {
    if name.trim().is_empty() {
      return Err(ClientError::validation("Brand name is required."));
    }
    let response = self
      .client
      .delete(self.url("/api/brands"))
      .query(&[("name", name)])
      .send()
      .await?;
    Self::check(response).await?;
    Ok(())
  }

  async fn list_inventory(&self) -> Result<Vec<Product>, ClientError> {
    self.get_json("/api/inventory").await
  }

  async fn upsert_product(&self, product: &Product) -> Result<(), ClientError> {
    let response = self
      .client
      .post(self.url("/api/inventory"))
      .json(&ProductInput::from(product))
      .send()
      .await?;
    Self::check(response).await?;
    Ok(())
  }

  async fn delete_product(&self, id: &str) -> Result<(), ClientError> {
    if id.trim().is_empty() {
      return Err(ClientError::validation("Product id is required."));
    }
    let response = self
      .client
      .delete(self.url("/api/inventory"))
      .query(&[("id", id)])
      .send()
      .await?;
    Self::check(response).await?;
    Ok(())
  }

  async fn load_settings(&self) -> Result<SettingsSnapshot, ClientError> {
    self.get_json("/api/settings").await
  }

  async fn save_setting(&self, setting: &Setting) -> Result<(), ClientError> {
    let response = self
      .client
      .post(self.url("/api/settings"))
      .json(setting)
      .send()
      .await?;
    Self::check(response).await?;
    Ok(())
  }
}
