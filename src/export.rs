use chrono::NaiveDate;
use std::fmt::Write;

use crate::active_list::{group_by_brand, BrandGroup};
use crate::models::{Brand, Product};

const SHEET_TITLE: &str = "LISTA DE PRECIOS";
const LINE_WIDTH: usize = 56;

pub fn export_file_name(date: NaiveDate) -> String {
  format!("lista_precios_{}.png", date.format("%Y-%m-%d"))
}

#[derive(Clone, Debug, PartialEq)]
pub struct PriceSheet {
  pub date: NaiveDate,
  pub logo: Option<String>,
  pub groups: Vec<BrandGroup>,
}

impl PriceSheet {
  pub fn build(entries: &[Product], brands: &[Brand], logo: Option<&str>, date: NaiveDate) -> Self {
    Self {
      date,
      logo: logo.map(str::to_string),
      groups: group_by_brand(entries, brands),
    }
  }

  pub fn file_name(&self) -> String {
    export_file_name(self.date)
  }

  pub fn is_empty(&self) -> bool {
    self.groups.is_empty()
  }

  pub fn product_count(&self) -> usize {
    self.groups.iter().map(|group| group.products.len()).sum()
  }

  pub fn render_text(&self) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} - {}", SHEET_TITLE, self.date.format("%d/%m/%Y"));
    if self.logo.is_some() {
      let _ = writeln!(out, "[logo]");
    }

    if self.groups.is_empty() {
      let _ = writeln!(out);
      let _ = writeln!(out, "(no products in the active list)");
      return out;
    }

    for group in &self.groups {
      let _ = writeln!(out);
      match &group.color {
        Some(color) => {
          let _ = writeln!(out, "{} ({})", group.brand, color);
        }
        None => {
          let _ = writeln!(out, "{}", group.brand);
        }
      }
      for product in &group.products {
        let _ = writeln!(out, "{}", sheet_line(product));
      }
    }
    out
  }
}

fn sheet_line(product: &Product) -> String {
  let label = if product.specs.is_empty() {
    product.model.clone()
  } else {
    format!("{} {}", product.model, product.specs)
  };

  let used = label.chars().count() + product.price_str.chars().count() + 2;
  let dots = LINE_WIDTH.saturating_sub(used).max(3);
  format!("  {} {} {}", label, ".".repeat(dots), product.price_str)
}
