use chrono::Local;
use clap::{Parser, Subcommand};
use log::{error, info, warn};
use std::error::Error;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use pricelist_lib::active_list::InventoryListing;
use pricelist_lib::config::{default_data_dir, ServerConfig, SyncConfig, DEFAULT_BIND, DEFAULT_SERVER_URL};
use pricelist_lib::local_cache::LocalCache;
use pricelist_lib::{api, CatalogApi, HttpCatalogClient, NoticeLevel, PriceListController};

#[derive(Parser)]
#[command(name = "pricelist", version, about = "Branded product price list")]
struct Cli {
  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Serve the catalog API over HTTP.
  Serve {
    #[arg(long, env = "PRICELIST_BIND", default_value = DEFAULT_BIND)]
    bind: SocketAddr,
    /// SQLite file; defaults to the data directory.
    #[arg(long, env = "PRICELIST_DB")]
    db: Option<PathBuf>,
    /// Skip seeding default brands into an empty catalog.
    #[arg(long)]
    no_seed: bool,
  },
  /// List the inventory of a running server.
  Browse {
    #[arg(long, env = "PRICELIST_SERVER", default_value = DEFAULT_SERVER_URL)]
    server: String,
    #[arg(long, default_value = "")]
    search: String,
  },
  /// Print the active list grouped by brand.
  Sheet {
    #[arg(long, env = "PRICELIST_SERVER", default_value = DEFAULT_SERVER_URL)]
    server: String,
    #[arg(long, env = "PRICELIST_CACHE_DIR")]
    cache_dir: Option<PathBuf>,
  },
}

type CliResult = Result<(), Box<dyn Error>>;

#[tokio::main]
async fn main() -> ExitCode {
  pricelist_lib::init_logging();

  let result = match Cli::parse().command {
    Command::Serve { bind, db, no_seed } => serve(bind, db, !no_seed).await,
    Command::Browse { server, search } => browse(&server, &search).await,
    Command::Sheet { server, cache_dir } => sheet(&server, cache_dir).await,
  };

  match result {
    Ok(()) => ExitCode::SUCCESS,
    Err(error) => {
      error!("{}", error);
      ExitCode::FAILURE
    }
  }
}

async fn serve(bind: SocketAddr, db: Option<PathBuf>, seed: bool) -> CliResult {
  let config = ServerConfig::new(bind, db, seed);
  info!("Using catalog database {}", config.db_path.display());
  api::serve(config).await?;
  Ok(())
}

async fn browse(server: &str, search: &str) -> CliResult {
  let client = HttpCatalogClient::new(server)?;
  let inventory = client.list_inventory().await?;

  match pricelist_lib::active_list::browse_inventory(&inventory, search) {
    InventoryListing::Empty => println!("The catalog has no products yet."),
    InventoryListing::NoMatches { term } => println!("No products match \"{}\".", term),
    InventoryListing::Matches(products) => {
      for product in products {
        println!("{:<40} {:>16}", product.id, product.price_str);
      }
    }
  }
  Ok(())
}

async fn sheet(server: &str, cache_dir: Option<PathBuf>) -> CliResult {
  let client = HttpCatalogClient::new(server)?;
  let cache = LocalCache::open(&cache_dir.unwrap_or_else(default_data_dir))?;
  info!("Using local cache {}", cache.path().display());
  let (mut controller, mut notices) =
    PriceListController::new(Arc::new(client), cache, SyncConfig::default());

  controller.start().await?;
  let sheet = controller.price_sheet(Local::now().date_naive());
  print!("{}", sheet.render_text());
  println!();
  println!("Export file: {}", sheet.file_name());

  while let Ok(notice) = notices.try_recv() {
    match notice.level {
      NoticeLevel::Error | NoticeLevel::Warning => warn!("{}", notice.message),
      NoticeLevel::Success | NoticeLevel::Info => info!("{}", notice.message),
    }
  }
  Ok(())
}
