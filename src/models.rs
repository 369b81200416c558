use serde::{Deserialize, Serialize};

pub const SETTING_ACTIVE_LIST: &str = "activeList";
pub const SETTING_LOGO: &str = "logo";

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Brand {
  pub name: String,
  pub color: String,
  pub order_index: i64,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Product {
  pub id: String,
  pub brand: String,
  pub model: String,
  #[serde(default)]
  pub specs: String,
  pub price_float: f64,
  pub price_str: String,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct NewBrandInput {
  pub name: String,
  #[serde(default)]
  pub color: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct ProductInput {
  #[serde(default)]
  pub id: Option<String>,
  #[serde(default)]
  pub brand: String,
  #[serde(default)]
  pub model: String,
  #[serde(default)]
  pub specs: Option<String>,
  pub price_float: Option<f64>,
  #[serde(default)]
  pub price_str: Option<String>,
}

impl From<&Product> for ProductInput {
  fn from(product: &Product) -> Self {
    Self {
      id: Some(product.id.clone()),
      brand: product.brand.clone(),
      model: product.model.clone(),
      specs: Some(product.specs.clone()),
      price_float: Some(product.price_float),
      price_str: Some(product.price_str.clone()),
    }
  }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct BrandUpdate {
  pub name: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub color: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub order_index: Option<i64>,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BrandAction {
  Reorder,
}

/// Body of `PUT /api/brands`: either an ordered name list tagged with
/// `"action": "reorder"` or a full list of brand rows.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(untagged)]
pub enum BrandUpdateRequest {
  Reorder {
    action: BrandAction,
    brands: Vec<String>,
  },
  Replace {
    brands: Vec<BrandUpdate>,
  },
}

impl BrandUpdateRequest {
  pub fn reorder(names: Vec<String>) -> Self {
    Self::Reorder {
      action: BrandAction::Reorder,
      brands: names,
    }
  }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SettingKey {
  #[serde(rename = "activeList")]
  ActiveList,
  #[serde(rename = "logo")]
  Logo,
}

impl SettingKey {
  pub fn as_str(&self) -> &'static str {
    match self {
      SettingKey::ActiveList => SETTING_ACTIVE_LIST,
      SettingKey::Logo => SETTING_LOGO,
    }
  }
}

/// One persisted setting. Serialises as `{"key": ..., "value": ...}`, the body
/// shape of `POST /api/settings`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "key", content = "value")]
pub enum Setting {
  #[serde(rename = "activeList")]
  ActiveList(Vec<Product>),
  #[serde(rename = "logo")]
  Logo(Option<String>),
}

impl Setting {
  pub fn key(&self) -> SettingKey {
    match self {
      Setting::ActiveList(_) => SettingKey::ActiveList,
      Setting::Logo(_) => SettingKey::Logo,
    }
  }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct SettingsSnapshot {
  #[serde(rename = "activeList", default, skip_serializing_if = "Option::is_none")]
  pub active_list: Option<Vec<Product>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub logo: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct SuccessDto {
  pub success: bool,
}

impl SuccessDto {
  pub fn ok() -> Self {
    Self { success: true }
  }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct HealthDto {
  pub status: String,
  pub message: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub brands: Option<i64>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ErrorDto {
  pub error: String,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn reorder_request_parses_name_list() {
    let body = r#"{"action":"reorder","brands":["ZTE","SAMSUNG"]}"#;
    let parsed: BrandUpdateRequest = serde_json::from_str(body).unwrap();
    assert_eq!(
      parsed,
      BrandUpdateRequest::reorder(vec!["ZTE".to_string(), "SAMSUNG".to_string()])
    );
  }

  #[test]
  fn replace_request_parses_brand_rows() {
    let body = r##"{"brands":[{"name":"ZTE","color":"#00BFFF","order_index":0},{"name":"BLU"}]}"##;
    let parsed: BrandUpdateRequest = serde_json::from_str(body).unwrap();
    match parsed {
      BrandUpdateRequest::Replace { brands } => {
        assert_eq!(brands.len(), 2);
        assert_eq!(brands[0].order_index, Some(0));
        assert_eq!(brands[1].color, None);
      }
      other => panic!("unexpected request {:?}", other),
    }
  }

  #[test]
  fn unknown_action_is_rejected() {
    let body = r#"{"action":"shuffle","brands":["ZTE"]}"#;
    assert!(serde_json::from_str::<BrandUpdateRequest>(body).is_err());
  }

  #[test]
  fn setting_uses_key_value_shape() {
    let json = serde_json::to_value(Setting::Logo(None)).unwrap();
    assert_eq!(json, serde_json::json!({"key": "logo", "value": null}));

    let parsed: Setting =
      serde_json::from_value(serde_json::json!({"key": "activeList", "value": []})).unwrap();
    assert_eq!(parsed, Setting::ActiveList(Vec::new()));
  }

  #[test]
  fn snapshot_omits_missing_keys() {
    let json = serde_json::to_string(&SettingsSnapshot::default()).unwrap();
    assert_eq!(json, "{}");
  }
}
