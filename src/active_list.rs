use std::cmp::Ordering;
use std::collections::HashMap;

use crate::models::{Brand, Product};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AddOutcome {
  Added,
  Duplicate,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ActiveList {
  entries: Vec<Product>,
}

impl ActiveList {
  pub fn new(entries: Vec<Product>) -> Self {
    Self { entries }
  }

  pub fn entries(&self) -> &[Product] {
    &self.entries
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  pub fn contains(&self, id: &str) -> bool {
    self.entries.iter().any(|entry| entry.id == id)
  }

  pub fn add(&mut self, product: &Product) -> AddOutcome {
    if self.contains(&product.id) {
      return AddOutcome::Duplicate;
    }
    self.entries.push(product.clone());
    AddOutcome::Added
  }

  pub fn remove(&mut self, id: &str) -> bool {
    let before = self.entries.len();
    self.entries.retain(|entry| entry.id != id);
    self.entries.len() != before
  }

  pub fn replace(&mut self, old_id: &str, product: &Product) -> usize {
    let mut replaced = 0;
    for entry in self.entries.iter_mut().filter(|entry| entry.id == old_id) {
      *entry = product.clone();
      replaced += 1;
    }
    replaced
  }

  pub fn set(&mut self, entries: Vec<Product>) {
    self.entries = entries;
  }
}

#[derive(Clone, Debug, PartialEq)]
pub enum InventoryListing {
  Empty,
  NoMatches { term: String },
  Matches(Vec<Product>),
}

impl InventoryListing {
  pub fn products(&self) -> &[Product] {
    match self {
      InventoryListing::Matches(products) => products,
      _ => &[],
    }
  }
}

pub fn matches_term(product: &Product, term: &str) -> bool {
  let needle = term.trim().to_lowercase();
  if needle.is_empty() {
    return true;
  }
  product.brand.to_lowercase().contains(&needle)
    || product.model.to_lowercase().contains(&needle)
    || product.specs.to_lowercase().contains(&needle)
}

pub fn browse_inventory(inventory: &[Product], term: &str) -> InventoryListing {
  if inventory.is_empty() {
    return InventoryListing::Empty;
  }

  let mut matches: Vec<Product> = inventory
    .iter()
    .filter(|product| matches_term(product, term))
    .cloned()
    .collect();
  if matches.is_empty() {
    return InventoryListing::NoMatches {
      term: term.trim().to_string(),
    };
  }

  matches.sort_by(|a, b| a.brand.cmp(&b.brand).then_with(|| a.model.cmp(&b.model)));
  InventoryListing::Matches(matches)
}

#[derive(Clone, Debug, PartialEq)]
pub struct BrandGroup {
  pub brand: String,
  /// `None` when the brand is no longer in the catalog.
  pub color: Option<String>,
  pub products: Vec<Product>,
}

/// Partitions the active list by brand. Groups follow the catalog `order_index`;
/// brands missing from the catalog come last in order of first appearance.
/// Entries keep their list order inside a group.
pub fn group_by_brand(entries: &[Product], brands: &[Brand]) -> Vec<BrandGroup> {
  let catalog: HashMap<&str, &Brand> = brands
    .iter()
    .map(|brand| (brand.name.as_str(), brand))
    .collect();

  let mut groups: Vec<BrandGroup> = Vec::new();
  let mut positions: HashMap<&str, usize> = HashMap::new();
  for entry in entries {
    match positions.get(entry.brand.as_str()) {
      Some(&position) => groups[position].products.push(entry.clone()),
      None => {
        positions.insert(entry.brand.as_str(), groups.len());
        groups.push(BrandGroup {
          brand: entry.brand.clone(),
          color: catalog
            .get(entry.brand.as_str())
            .map(|brand| brand.color.clone()),
          products: vec![entry.clone()],
        });
      }
    }
  }

  // Stable sort: unknown brands keep their first-appearance order.
  groups.sort_by(|a, b| {
    let rank_a = catalog.get(a.brand.as_str()).map(|brand| brand.order_index);
    let rank_b = catalog.get(b.brand.as_str()).map(|brand| brand.order_index);
    match (rank_a, rank_b) {
      (Some(x), Some(y)) => x.cmp(&y),
      (Some(_), None) => Ordering::Less,
      (None, Some(_)) => Ordering::Greater,
      (None, None) => Ordering::Equal,
    }
  });
  groups
}
