use crate::models::{Product, ProductInput};

pub const CURRENCY_PREFIX: &str = "RD$";
pub const MAX_PRICE: f64 = 1_000_000_000_000.0;

/// Natural key of a product: `BRAND-MODEL[-SPECS]`, uppercased, with every run of
/// whitespace collapsed into a single `-`. Empty specs add no trailing segment.
pub fn product_id(brand: &str, model: &str, specs: &str) -> String {
  let mut raw = format!("{}-{}", brand.trim(), model.trim());
  let specs = specs.trim();
  if !specs.is_empty() {
    raw.push('-');
    raw.push_str(specs);
  }

  raw
    .to_uppercase()
    .split_whitespace()
    .collect::<Vec<_>>()
    .join("-")
}

/// Reads a user-typed price. Everything except digits and `.` is dropped and the
/// longest numeric prefix is used, so `"RD$45,000.50"` reads as `45000.5`.
pub fn parse_price(raw: &str) -> Option<f64> {
  let cleaned: String = raw
    .chars()
    .filter(|c| c.is_ascii_digit() || *c == '.')
    .collect();

  let mut seen_dot = false;
  let prefix: String = cleaned
    .chars()
    .take_while(|c| {
      if *c == '.' {
        if seen_dot {
          return false;
        }
        seen_dot = true;
      }
      true
    })
    .collect();

  let value = prefix.parse::<f64>().ok()?;
  if value.is_finite() {
    Some(value)
  } else {
    None
  }
}

/// Display form stored in `price_str`: `RD$45,000.00`. Two fraction digits are
/// always shown, a third only when it is significant.
pub fn format_price(value: f64) -> String {
  let thousandths = (value.abs() * 1000.0).round() as u64;
  let sign = if value < 0.0 && thousandths > 0 { "-" } else { "" };
  let whole = thousandths / 1000;
  let fraction = thousandths % 1000;
  let fraction_text = if fraction % 10 == 0 {
    format!("{:02}", fraction / 10)
  } else {
    format!("{:03}", fraction)
  };

  format!(
    "{}{}{}.{}",
    CURRENCY_PREFIX,
    sign,
    group_thousands(whole),
    fraction_text
  )
}

fn group_thousands(value: u64) -> String {
  let digits = value.to_string();
  let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
  for (index, digit) in digits.chars().enumerate() {
    if index > 0 && (digits.len() - index) % 3 == 0 {
      grouped.push(',');
    }
    grouped.push(digit);
  }
  grouped
}

#[derive(Clone, Debug, Default)]
pub struct ProductDraft {
  pub brand: String,
  pub model: String,
  pub specs: String,
  pub price: String,
}

impl ProductDraft {
  pub fn new(brand: &str, model: &str, specs: &str, price: &str) -> Self {
    Self {
      brand: brand.to_string(),
      model: model.to_string(),
      specs: specs.to_string(),
      price: price.to_string(),
    }
  }

  pub fn into_product(self) -> Result<Product, String> {
    let brand = self.brand.trim().to_uppercase();
    let model = self.model.trim().to_uppercase();
    let specs = self.specs.trim().to_uppercase();
    if brand.is_empty() || model.is_empty() || self.price.trim().is_empty() {
      return Err("Brand, model and price are required.".to_string());
    }

    let price_float = parse_price(&self.price)
      .filter(|price| *price <= MAX_PRICE)
      .ok_or_else(|| "Invalid price.".to_string())?;

    Ok(Product {
      id: product_id(&brand, &model, &specs),
      brand,
      model,
      specs,
      price_float,
      price_str: format_price(price_float),
    })
  }
}

/// Completes an inventory write. Submitted `id` and `price_str` are kept verbatim;
/// missing ones are derived from the other fields.
pub fn product_from_input(input: ProductInput) -> Result<Product, String> {
  let brand = input.brand.trim().to_string();
  let model = input.model.trim().to_string();
  let specs = input.specs.unwrap_or_default().trim().to_string();
  if brand.is_empty() || model.is_empty() {
    return Err("Brand and model are required.".to_string());
  }

  let price_float = input
    .price_float
    .ok_or_else(|| "price_float is required.".to_string())?;
  if !price_float.is_finite() || !(0.0..=MAX_PRICE).contains(&price_float) {
    return Err(format!("Invalid price: {}", price_float));
  }

  let id = match input.id.map(|id| id.trim().to_string()) {
    Some(id) if !id.is_empty() => id,
    _ => product_id(&brand, &model, &specs),
  };
  let price_str = match input.price_str.map(|text| text.trim().to_string()) {
    Some(text) if !text.is_empty() => text,
    _ => format_price(price_float),
  };

  Ok(Product {
    id,
    brand,
    model,
    specs,
    price_float,
    price_str,
  })
}
