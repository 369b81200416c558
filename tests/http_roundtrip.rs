use pricelist_lib::api::{serve_listener, AppState};
use pricelist_lib::models::{BrandUpdate, NewBrandInput, Setting};
use pricelist_lib::pricing::ProductDraft;
use pricelist_lib::{store, CatalogApi, ClientError, HttpCatalogClient};
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

struct TestServer {
  _dir: TempDir,
  client: HttpCatalogClient,
  shutdown: CancellationToken,
  handle: JoinHandle<()>,
}

impl TestServer {
  async fn start(seed: bool) -> Self {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("pricelist.db");
    store::init_database(&db_path, seed).unwrap();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());
    let shutdown = CancellationToken::new();
    let token = shutdown.clone();
    let handle = tokio::spawn(async move {
      serve_listener(listener, AppState::new(db_path), token)
        .await
        .unwrap();
    });

    Self {
      _dir: dir,
      client: HttpCatalogClient::new(&base_url).unwrap(),
      shutdown,
      handle,
    }
  }

  async fn stop(self) {
    self.shutdown.cancel();
    self.handle.await.unwrap();
  }
}

#[tokio::test]
async fn brand_and_product_lifecycle() {
  let server = TestServer::start(false).await;
  let api = &server.client;

  api
    .add_brand(&NewBrandInput {
      name: "BLU".to_string(),
      color: Some("#4169E1".to_string()),
    })
    .await
    .unwrap();
  api
    .add_brand(&NewBrandInput {
      name: "SAMSUNG".to_string(),
      color: Some("#0057B7".to_string()),
    })
    .await
    .unwrap();

  let brands = api.list_brands().await.unwrap();
  let samsung = brands.iter().find(|brand| brand.name == "SAMSUNG").unwrap();
  assert_eq!(samsung.order_index, 1);

  let duplicate = api
    .add_brand(&NewBrandInput {
      name: "SAMSUNG".to_string(),
      color: None,
    })
    .await
    .unwrap_err();
  assert!(duplicate.is_conflict());

  let product = ProductDraft::new("SAMSUNG", "GALAXY S24", "128GB", "45000")
    .into_product()
    .unwrap();
  assert_eq!(product.id, "SAMSUNG-GALAXY-S24-128GB");
  assert_eq!(product.price_str, "RD$45,000.00");
  api.upsert_product(&product).await.unwrap();
  assert_eq!(api.list_inventory().await.unwrap(), vec![product]);

  api.delete_brand("SAMSUNG").await.unwrap();
  assert!(api.list_inventory().await.unwrap().is_empty());
  assert_eq!(api.list_brands().await.unwrap().len(), 1);

  server.stop().await;
}

#[tokio::test]
async fn reorder_and_color_updates_persist() {
  let server = TestServer::start(true).await;
  let api = &server.client;

  let brands = api.list_brands().await.unwrap();
  assert_eq!(brands.len(), 20);
  assert_eq!(brands[0].name, "SAMSUNG");

  let mut names: Vec<String> = brands.iter().map(|brand| brand.name.clone()).collect();
  names.rotate_left(1);
  api.reorder_brands(&names).await.unwrap();

  let reordered = api.list_brands().await.unwrap();
  assert_eq!(reordered[0].name, "INFINIX");
  assert_eq!(reordered[19].name, "SAMSUNG");
  assert_eq!(reordered[19].order_index, 19);

  api
    .update_brands(&[BrandUpdate {
      name: "SAMSUNG".to_string(),
      color: Some("#123456".to_string()),
      order_index: Some(0),
    }])
    .await
    .unwrap();
  let updated = api.list_brands().await.unwrap();
  assert_eq!(updated[0].name, "SAMSUNG");
  assert_eq!(updated[0].color, "#123456");
  assert_eq!(updated[1].name, "INFINIX");
  let indexes: Vec<i64> = updated.iter().map(|brand| brand.order_index).collect();
  assert_eq!(indexes, (0..20).collect::<Vec<i64>>());

  server.stop().await;
}

#[tokio::test]
async fn settings_and_validation_errors() {
  let server = TestServer::start(false).await;
  let api = &server.client;

  let list = vec![ProductDraft::new("ZTE", "A35", "", "4000").into_product().unwrap()];
  api.save_setting(&Setting::ActiveList(list.clone())).await.unwrap();
  api
    .save_setting(&Setting::Logo(Some("data:image/png;base64,AA==".to_string())))
    .await
    .unwrap();

  let settings = api.load_settings().await.unwrap();
  assert_eq!(settings.active_list, Some(list));
  assert_eq!(settings.logo.as_deref(), Some("data:image/png;base64,AA=="));

  assert!(matches!(
    api.delete_product("  ").await.unwrap_err(),
    ClientError::Validation(_)
  ));

  server.stop().await;
}
