use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use inventory_import::cli::import_inventory::{
    self, render_report, PreviewCommandConfig, RunCommandConfig,
};
use inventory_import::util::env;

#[derive(Parser, Debug)]
#[command(
    name = "inventory-import",
    version,
    about = "Load the 2022-09-22 catalog and stock exports into the inventory tables"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
#[command(rename_all = "kebab-case")]
enum Commands {
    /// Insert InventoryItem, InventoryStock and InventoryStockHistory rows (not idempotent)
    Run {
        /// Catalog export (defaults to scripts/20220922stock.csv)
        #[arg(long)]
        catalog: Option<PathBuf>,
        /// Stock/price export (defaults to scripts/20220922prices.csv)
        #[arg(long)]
        stock: Option<PathBuf>,
        /// Optional override for the database URL (else DATABASE_URL)
        #[arg(long)]
        database_url: Option<String>,
        /// Exit non-zero when any table was rolled back
        #[arg(long, default_value_t = false)]
        fail_on_partial: bool,
    },
    /// Load, clean and join the exports without touching the database
    Preview {
        #[arg(long)]
        catalog: Option<PathBuf>,
        #[arg(long)]
        stock: Option<PathBuf>,
        /// Warehouse id to stamp on the previewed rows
        #[arg(long, default_value = "preview-warehouse")]
        warehouse_id: String,
        /// Sample rows printed per table
        #[arg(long, default_value_t = 5)]
        limit: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    env::init_env();
    inventory_import::tracing::init_tracing(inventory_import::tracing::DEFAULT_FILTER)?;
    env::bootstrap_cli("inventory-import");

    let cli = Cli::parse();
    match cli.command {
        Commands::Run {
            catalog,
            stock,
            database_url,
            fail_on_partial,
        } => {
            let report = import_inventory::run(RunCommandConfig {
                catalog,
                stock,
                database_url,
            })
            .await?;
            print!("{}", render_report(&report));
            if fail_on_partial && report.is_partial() {
                bail!("partial load: at least one table was rolled back");
            }
        }
        Commands::Preview {
            catalog,
            stock,
            warehouse_id,
            limit,
        } => {
            let out = import_inventory::preview(PreviewCommandConfig {
                catalog,
                stock,
                warehouse_id,
                limit,
            })?;
            print!("{out}");
        }
    }
    Ok(())
}
