use chrono::Utc;
use log::{info, warn};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

use crate::error::CatalogError;
use crate::models::{
  Brand, BrandUpdate, NewBrandInput, Product, Setting, SettingsSnapshot, SETTING_ACTIVE_LIST,
  SETTING_LOGO,
};

const MIGRATION_SQL_0001: &str = include_str!("../migrations/0001_initial.sql");
const DEFAULT_BRAND_COLOR: &str = "#000000";

pub const DEFAULT_BRANDS: [(&str, &str); 20] = [
  ("SAMSUNG", "#0057B7"),
  ("INFINIX", "#2E8B57"),
  ("ZTE", "#00BFFF"),
  ("ITEL", "#FF6347"),
  ("BLU", "#4169E1"),
  ("UMIDIGI", "#8A2BE2"),
  ("MOTOROLA", "#4682B4"),
  ("TABLETAS", "#FF8C00"),
  ("TELEVISORES", "#DC143C"),
  ("CUBOT", "#6A5ACD"),
  ("TECNO", "#20B2AA"),
  ("ROVER", "#DAA520"),
  ("VORTEX", "#556B2F"),
  ("M-HORSE", "#8B4513"),
  ("RELOJ", "#DB7093"),
  ("TCL", "#E60012"),
  ("AIRES ACON.", "#87CEEB"),
  ("OUKITEL", "#1E90FF"),
  ("GENERICO", "#778899"),
  ("OTROS", "#A9A9A9"),
];

pub fn now_iso() -> String {
  Utc::now().to_rfc3339()
}

pub fn init_database(db_path: &Path, seed_defaults: bool) -> Result<(), CatalogError> {
  if let Some(parent) = db_path.parent() {
    if !parent.as_os_str().is_empty() {
      fs::create_dir_all(parent)?;
    }
  }

  let mut connection = Connection::open(db_path)?;
  connection.execute_batch(MIGRATION_SQL_0001)?;
  ensure_order_index_column(&connection)?;

  if seed_defaults {
    let seeded = seed_default_brands(&mut connection)?;
    if seeded > 0 {
      info!("Seeded {} default brands", seeded);
    }
  }

  info!("Catalog database ready at {}", db_path.display());
  Ok(())
}

pub fn open_database(db_path: &Path) -> Result<Connection, CatalogError> {
  Ok(Connection::open(db_path)?)
}

fn ensure_order_index_column(connection: &Connection) -> Result<(), CatalogError> {
  let mut statement = connection.prepare("PRAGMA table_info(brands)")?;
  let columns = statement.query_map([], |row| row.get::<usize, String>(1))?;

  let mut has_order_index = false;
  for column in columns {
    if column? == "order_index" {
      has_order_index = true;
    }
  }

  if !has_order_index {
    info!("Adding order_index column to brands");
    connection.execute_batch("ALTER TABLE brands ADD COLUMN order_index INTEGER")?;
  }
  Ok(())
}

pub fn seed_default_brands(connection: &mut Connection) -> Result<usize, CatalogError> {
  if count_brands(connection)? > 0 {
    return Ok(0);
  }

  let tx = connection.transaction()?;
  let mut inserted = 0;
  {
    let mut statement =
      tx.prepare("INSERT OR IGNORE INTO brands (name, color, order_index) VALUES (?1, ?2, ?3)")?;
    for (index, (name, color)) in DEFAULT_BRANDS.iter().enumerate() {
      inserted += statement.execute(params![name, color, index as i64])?;
    }
  }
  tx.commit()?;
  Ok(inserted)
}

pub fn count_brands(connection: &Connection) -> Result<i64, CatalogError> {
  Ok(connection.query_row("SELECT COUNT(*) FROM brands", [], |row| row.get(0))?)
}

pub fn list_brands(connection: &Connection) -> Result<Vec<Brand>, CatalogError> {
  let mut statement = connection.prepare(
    "SELECT name, color, COALESCE(order_index, 0)
     FROM brands
     ORDER BY order_index IS NULL, order_index, rowid",
  )?;

  let rows = statement.query_map([], |row| {
    Ok(Brand {
      name: row.get(0)?,
      color: row.get(1)?,
      order_index: row.get(2)?,
    })
  })?;

  let mut brands = Vec::new();
  for row in rows {
    brands.push(row?);
  }
  Ok(brands)
}

pub fn find_brand(connection: &Connection, name: &str) -> Result<Option<Brand>, CatalogError> {
  Ok(
    connection
      .query_row(
        "SELECT name, color, COALESCE(order_index, 0) FROM brands WHERE name = ?1 LIMIT 1",
        params![name],
        |row| {
          Ok(Brand {
            name: row.get(0)?,
            color: row.get(1)?,
            order_index: row.get(2)?,
          })
        },
      )
      .optional()?,
  )
}

/// Appends a brand at the end of the current order. The name is uppercased; an
/// existing name is reported as [`CatalogError::Conflict`].
pub fn insert_brand(connection: &mut Connection, input: NewBrandInput) -> Result<Brand, CatalogError> {
  let name = normalize_brand_name(&input.name);
  if name.is_empty() {
    return Err(CatalogError::validation("Brand name is required."));
  }
  let color = input
    .color
    .map(|color| color.trim().to_string())
    .filter(|color| !color.is_empty())
    .unwrap_or_else(|| DEFAULT_BRAND_COLOR.to_string());

  let tx = connection.transaction()?;
  if find_brand(&tx, &name)?.is_some() {
    return Err(CatalogError::Conflict("Brand already exists.".to_string()));
  }

  let order_index = count_brands(&tx)?;
  tx.execute(
    "INSERT INTO brands (name, color, order_index) VALUES (?1, ?2, ?3)",
    params![name, color, order_index],
  )
  .map_err(|error| match error {
    rusqlite::Error::SqliteFailure(ref failure, _)
      if failure.code == ErrorCode::ConstraintViolation =>
    {
      CatalogError::Conflict("Brand already exists.".to_string())
    }
    other => CatalogError::Database(other),
  })?;
  tx.commit()?;

  Ok(Brand {
    name,
    color,
    order_index,
  })
}

pub fn normalize_brand_name(name: &str) -> String {
  name.trim().to_uppercase()
}

fn reject_repeated_names<'a>(names: impl Iterator<Item = &'a str>) -> Result<(), CatalogError> {
  let mut seen = HashSet::new();
  for name in names {
    if !seen.insert(name) {
      return Err(CatalogError::Validation(format!(
        "Brand listed twice: {}",
        name
      )));
    }
  }
  Ok(())
}

/// Known submitted names first, then every other brand in its previous order,
/// numbered `0..n`.
fn write_dense_order(tx: &Connection, submitted: &[String]) -> Result<(), CatalogError> {
  let current = list_brands(tx)?;
  let known: HashSet<&str> = current.iter().map(|brand| brand.name.as_str()).collect();
  let listed: HashSet<&str> = submitted.iter().map(String::as_str).collect();

  let mut ordered: Vec<&str> = Vec::with_capacity(current.len());
  for name in submitted {
    if known.contains(name.as_str()) {
      ordered.push(name);
    } else {
      warn!("Skipping unknown brand '{}'", name);
    }
  }
  for brand in current.iter() {
    if !listed.contains(brand.name.as_str()) {
      ordered.push(brand.name.as_str());
    }
  }

  let mut statement = tx.prepare("UPDATE brands SET order_index = ?1 WHERE name = ?2")?;
  for (index, name) in ordered.iter().enumerate() {
    statement.execute(params![index as i64, name])?;
  }
  Ok(())
}

pub fn reorder_brands(connection: &mut Connection, names: &[String]) -> Result<Vec<Brand>, CatalogError> {
  let names: Vec<String> = names.iter().map(|name| normalize_brand_name(name)).collect();
  reject_repeated_names(names.iter().map(String::as_str))?;

  let tx = connection.transaction()?;
  write_dense_order(&tx, &names)?;
  tx.commit()?;

  list_brands(connection)
}

/// Applies brand rows in one transaction. Rows are ranked by `order_index`
/// (array position when missing) and the whole catalog is renumbered densely,
/// with brands left out following in their previous order. A missing color keeps
/// the stored one.
pub fn update_brands(connection: &mut Connection, updates: &[BrandUpdate]) -> Result<Vec<Brand>, CatalogError> {
  let mut rows: Vec<(i64, usize, String, Option<String>)> = updates
    .iter()
    .enumerate()
    .map(|(position, update)| {
      let color = update
        .color
        .as_deref()
        .map(str::trim)
        .filter(|color| !color.is_empty())
        .map(str::to_string);
      (
        update.order_index.unwrap_or(position as i64),
        position,
        normalize_brand_name(&update.name),
        color,
      )
    })
    .collect();
  reject_repeated_names(rows.iter().map(|row| row.2.as_str()))?;
  rows.sort_by_key(|row| (row.0, row.1));

  let tx = connection.transaction()?;
  {
    let mut statement = tx.prepare("UPDATE brands SET color = ?1 WHERE name = ?2")?;
    for (_, _, name, color) in rows.iter() {
      if let Some(color) = color {
        statement.execute(params![color, name])?;
      }
    }
  }
  let names: Vec<String> = rows.into_iter().map(|row| row.2).collect();
  write_dense_order(&tx, &names)?;
  tx.commit()?;

  list_brands(connection)
}

pub fn delete_brand(connection: &mut Connection, name: &str) -> Result<usize, CatalogError> {
  let name = normalize_brand_name(name);
  if name.is_empty() {
    return Err(CatalogError::validation("Brand name is required."));
  }

  let tx = connection.transaction()?;
  let removed = tx.execute("DELETE FROM inventory WHERE brand = ?1", params![name])?;
  tx.execute("DELETE FROM brands WHERE name = ?1", params![name])?;
  tx.commit()?;

  info!("Deleted brand {} with {} products", name, removed);
  Ok(removed)
}

pub fn list_inventory(connection: &Connection) -> Result<Vec<Product>, CatalogError> {
  let mut statement = connection.prepare(
    "SELECT id, brand, model, COALESCE(specs, ''), price_float, price_str FROM inventory",
  )?;

  let rows = statement.query_map([], |row| {
    Ok(Product {
      id: row.get(0)?,
      brand: row.get(1)?,
      model: row.get(2)?,
      specs: row.get(3)?,
      price_float: row.get(4)?,
      price_str: row.get(5)?,
    })
  })?;

  let mut products = Vec::new();
  for row in rows {
    products.push(row?);
  }
  Ok(products)
}

pub fn upsert_product(connection: &Connection, product: &Product) -> Result<(), CatalogError> {
  connection.execute(
    "INSERT INTO inventory (id, brand, model, specs, price_float, price_str)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6)
     ON CONFLICT(id) DO UPDATE SET
       brand = excluded.brand,
       model = excluded.model,
       specs = excluded.specs,
       price_float = excluded.price_float,
       price_str = excluded.price_str",
    params![
      product.id,
      product.brand,
      product.model,
      product.specs,
      product.price_float,
      product.price_str
    ],
  )?;
  Ok(())
}

pub fn delete_product(connection: &Connection, id: &str) -> Result<bool, CatalogError> {
  let id = id.trim();
  if id.is_empty() {
    return Err(CatalogError::validation("Product id is required."));
  }
  let removed = connection.execute("DELETE FROM inventory WHERE id = ?1", params![id])?;
  Ok(removed > 0)
}

pub fn load_settings(connection: &Connection) -> Result<SettingsSnapshot, CatalogError> {
  let mut statement = connection.prepare("SELECT key, value FROM app_settings")?;
  let rows = statement.query_map([], |row| {
    Ok((row.get::<usize, String>(0)?, row.get::<usize, Option<String>>(1)?))
  })?;

  let mut snapshot = SettingsSnapshot::default();
  for row in rows {
    let (key, value) = row?;
    let Some(value) = value else {
      continue;
    };

    match key.as_str() {
      SETTING_ACTIVE_LIST => match serde_json::from_str::<Vec<Product>>(&value) {
        Ok(list) => snapshot.active_list = Some(list),
        Err(error) => warn!("Ignoring unreadable activeList setting: {}", error),
      },
      SETTING_LOGO => match serde_json::from_str::<Option<String>>(&value) {
        Ok(logo) => snapshot.logo = logo,
        Err(error) => warn!("Ignoring unreadable logo setting: {}", error),
      },
      other => warn!("Ignoring unknown setting key '{}'", other),
    }
  }

  Ok(snapshot)
}

pub fn save_setting(connection: &Connection, setting: &Setting) -> Result<String, CatalogError> {
  let value = match setting {
    Setting::ActiveList(list) => serde_json::to_string(list)?,
    Setting::Logo(logo) => serde_json::to_string(logo)?,
  };
  let updated_at = now_iso();

  connection.execute(
    "INSERT INTO app_settings (key, value, updated_at)
     VALUES (?1, ?2, ?3)
     ON CONFLICT(key) DO UPDATE SET
       value = excluded.value,
       updated_at = excluded.updated_at",
    params![setting.key().as_str(), value, updated_at],
  )?;
  Ok(updated_at)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::pricing::ProductDraft;
  use tempfile::TempDir;

  fn fresh_store(seed: bool) -> (TempDir, Connection) {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("catalog.db");
    init_database(&db_path, seed).unwrap();
    let connection = open_database(&db_path).unwrap();
    (dir, connection)
  }

  fn brand(connection: &mut Connection, name: &str) -> Brand {
    insert_brand(
      connection,
      NewBrandInput {
        name: name.to_string(),
        color: Some("#111111".to_string()),
      },
    )
    .unwrap()
  }

  fn product(brand: &str, model: &str, price: &str) -> Product {
    ProductDraft::new(brand, model, "", price).into_product().unwrap()
  }

  fn names(brands: &[Brand]) -> Vec<&str> {
    brands.iter().map(|brand| brand.name.as_str()).collect()
  }

  #[test]
  fn seeds_default_brands_once() {
    let (_dir, mut connection) = fresh_store(true);
    let brands = list_brands(&connection).unwrap();
    assert_eq!(brands.len(), DEFAULT_BRANDS.len());
    assert_eq!(brands[0].name, "SAMSUNG");
    assert_eq!(brands[19].order_index, 19);

    assert_eq!(seed_default_brands(&mut connection).unwrap(), 0);
  }

  #[test]
  fn new_brand_goes_last_and_uppercased() {
    let (_dir, mut connection) = fresh_store(true);
    let created = insert_brand(
      &mut connection,
      NewBrandInput {
        name: " xiaomi ".to_string(),
        color: None,
      },
    )
    .unwrap();
    assert_eq!(created.name, "XIAOMI");
    assert_eq!(created.order_index, 20);
    assert_eq!(created.color, "#000000");
  }

  #[test]
  fn duplicate_brand_is_a_conflict() {
    let (_dir, mut connection) = fresh_store(false);
    brand(&mut connection, "SAMSUNG");
    let error = insert_brand(
      &mut connection,
      NewBrandInput {
        name: "samsung".to_string(),
        color: None,
      },
    )
    .unwrap_err();
    assert!(matches!(error, CatalogError::Conflict(_)));
  }

  #[test]
  fn empty_brand_name_is_rejected() {
    let (_dir, mut connection) = fresh_store(false);
    let error = insert_brand(
      &mut connection,
      NewBrandInput {
        name: "  ".to_string(),
        color: None,
      },
    )
    .unwrap_err();
    assert!(matches!(error, CatalogError::Validation(_)));
  }

  #[test]
  fn reorder_follows_submitted_sequence() {
    let (_dir, mut connection) = fresh_store(false);
    for name in ["A", "B", "C", "D"] {
      brand(&mut connection, name);
    }

    let brands = reorder_brands(
      &mut connection,
      &["C".to_string(), "A".to_string(), "GHOST".to_string()],
    )
    .unwrap();
    assert_eq!(names(&brands), vec!["C", "A", "B", "D"]);
    let indexes: Vec<i64> = brands.iter().map(|brand| brand.order_index).collect();
    assert_eq!(indexes, vec![0, 1, 2, 3]);
  }

  #[test]
  fn reorder_rejects_repeated_names_without_writing() {
    let (_dir, mut connection) = fresh_store(false);
    for name in ["A", "B"] {
      brand(&mut connection, name);
    }
    let error = reorder_brands(&mut connection, &["B".to_string(), "B".to_string()]).unwrap_err();
    assert!(matches!(error, CatalogError::Validation(_)));
    assert_eq!(names(&list_brands(&connection).unwrap()), vec!["A", "B"]);
  }

  #[test]
  fn update_applies_order_and_color() {
    let (_dir, mut connection) = fresh_store(false);
    for name in ["A", "B"] {
      brand(&mut connection, name);
    }
    let brands = update_brands(
      &mut connection,
      &[
        BrandUpdate {
          name: "B".to_string(),
          color: Some("#FF0000".to_string()),
          order_index: None,
        },
        BrandUpdate {
          name: "A".to_string(),
          color: None,
          order_index: None,
        },
      ],
    )
    .unwrap();
    assert_eq!(names(&brands), vec!["B", "A"]);
    assert_eq!(brands[0].color, "#FF0000");
    assert_eq!(brands[1].color, "#111111");
  }

  #[test]
  fn partial_update_keeps_order_strict() {
    let (_dir, mut connection) = fresh_store(false);
    for name in ["A", "B", "C"] {
      brand(&mut connection, name);
    }
    let brands = update_brands(
      &mut connection,
      &[BrandUpdate {
        name: "C".to_string(),
        color: None,
        order_index: Some(0),
      }],
    )
    .unwrap();
    assert_eq!(names(&brands), vec!["C", "A", "B"]);
    let indexes: Vec<i64> = brands.iter().map(|brand| brand.order_index).collect();
    assert_eq!(indexes, vec![0, 1, 2]);
  }

  #[test]
  fn tied_update_indexes_fall_back_to_row_position() {
    let (_dir, mut connection) = fresh_store(false);
    for name in ["A", "B", "C"] {
      brand(&mut connection, name);
    }
    let row = |name: &str, order_index: i64| BrandUpdate {
      name: name.to_string(),
      color: None,
      order_index: Some(order_index),
    };
    let brands = update_brands(&mut connection, &[row("B", 5), row("C", 1), row("A", 5)]).unwrap();
    assert_eq!(names(&brands), vec!["C", "B", "A"]);
    assert_eq!(brands[2].order_index, 2);

    let error = update_brands(&mut connection, &[row("A", 0), row("a", 1)]).unwrap_err();
    assert!(matches!(error, CatalogError::Validation(_)));
  }

  #[test]
  fn brand_names_are_matched_case_insensitively() {
    let (_dir, mut connection) = fresh_store(false);
    for name in ["SAMSUNG", "ZTE"] {
      brand(&mut connection, name);
    }
    upsert_product(&connection, &product("SAMSUNG", "A15", "9000")).unwrap();

    let brands = reorder_brands(&mut connection, &[" zte ".to_string()]).unwrap();
    assert_eq!(names(&brands), vec!["ZTE", "SAMSUNG"]);

    assert_eq!(delete_brand(&mut connection, "samsung").unwrap(), 1);
    assert_eq!(names(&list_brands(&connection).unwrap()), vec!["ZTE"]);
  }

  #[test]
  fn deleting_brand_cascades_to_its_products_only() {
    let (_dir, mut connection) = fresh_store(false);
    brand(&mut connection, "ZTE");
    brand(&mut connection, "BLU");
    upsert_product(&connection, &product("ZTE", "A35", "4000")).unwrap();
    upsert_product(&connection, &product("ZTE", "A55", "6000")).unwrap();
    upsert_product(&connection, &product("BLU", "G91", "5000")).unwrap();

    let removed = delete_brand(&mut connection, "ZTE").unwrap();
    assert_eq!(removed, 2);
    assert_eq!(names(&list_brands(&connection).unwrap()), vec!["BLU"]);
    let remaining = list_inventory(&connection).unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].brand, "BLU");
  }

  #[test]
  fn upsert_replaces_every_field() {
    let (_dir, connection) = fresh_store(false);
    let original = product("TCL", "40S", "18000");
    upsert_product(&connection, &original).unwrap();

    let replacement = Product {
      model: "40S 2024".to_string(),
      price_float: 17500.0,
      price_str: "RD$17,500.00".to_string(),
      specs: "SMART".to_string(),
      ..original.clone()
    };
    upsert_product(&connection, &replacement).unwrap();

    let stored = list_inventory(&connection).unwrap();
    assert_eq!(stored, vec![replacement]);
  }

  #[test]
  fn delete_product_by_id() {
    let (_dir, connection) = fresh_store(false);
    let item = product("TCL", "40S", "18000");
    upsert_product(&connection, &item).unwrap();
    assert!(delete_product(&connection, &item.id).unwrap());
    assert!(!delete_product(&connection, &item.id).unwrap());
    assert!(matches!(
      delete_product(&connection, " ").unwrap_err(),
      CatalogError::Validation(_)
    ));
  }

  #[test]
  fn settings_round_trip() {
    let (_dir, connection) = fresh_store(false);
    assert_eq!(load_settings(&connection).unwrap(), SettingsSnapshot::default());

    let list = vec![product("ITEL", "A70", "5200")];
    save_setting(&connection, &Setting::ActiveList(list.clone())).unwrap();
    save_setting(&connection, &Setting::Logo(Some("data:image/png;base64,AAAA".to_string()))).unwrap();
    let snapshot = load_settings(&connection).unwrap();
    assert_eq!(snapshot.active_list, Some(list));
    assert_eq!(snapshot.logo.as_deref(), Some("data:image/png;base64,AAAA"));

    save_setting(&connection, &Setting::Logo(None)).unwrap();
    assert_eq!(load_settings(&connection).unwrap().logo, None);
  }

  #[test]
  fn adds_missing_order_index_column() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("legacy.db");
    {
      let connection = Connection::open(&db_path).unwrap();
      connection
        .execute_batch(
          "CREATE TABLE brands (name TEXT PRIMARY KEY, color TEXT NOT NULL);
           INSERT INTO brands (name, color) VALUES ('ZTE', '#00BFFF');",
        )
        .unwrap();
    }

    init_database(&db_path, true).unwrap();
    let connection = open_database(&db_path).unwrap();
    let brands = list_brands(&connection).unwrap();
    assert_eq!(names(&brands), vec!["ZTE"]);
  }
}
