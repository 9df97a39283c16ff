use clap::{Parser, Subcommand};
use showroom::images::cleaning::{HttpFetcher, ImageCleaner, LocalFetcher, SourceFetcher};
use showroom::images::{Upload, VehicleImageService, migrate_all};
use showroom::imaging::RustBackend;
use showroom::store::MemoryStore;
use showroom::{config, import, output};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "showroom")]
#[command(about = "Vehicle photo processing and inventory CSV import")]
#[command(long_about = "\
Vehicle photo processing and inventory CSV import

Operates on a JSON inventory file holding vehicle documents. Photos are
validated, oriented, resized and embedded into each vehicle as data URLs;
spreadsheets are validated row by row and upserted by VIN.

Inventory file:

  { \"version\": 1, \"documents\": [ { \"_id\": \"…\", \"vin\": \"…\", \"images\": [ … ] } ] }

CSV columns (header names are case-insensitive, spaces become underscores):

  Required:  vin, year, make, model, price
  Optional:  trim, mileage, stock_number, condition, exterior_color,
             interior_color, transmission, drivetrain, fuel_type, body_style,
             engine, carfax_url, window_sticker_url, primary_image_url,
             image_urls (JSON array or pipe-separated), is_featured_homepage,
             call_for_availability_enabled, is_active, featured_rank

Run 'showroom template' for a starter CSV and 'showroom gen-config' for a
documented showroom.toml. Set RUST_LOG to adjust log verbosity.")]
#[command(version)]
struct Cli {
    /// Inventory file
    #[arg(long, default_value = "inventory.json", global = true)]
    store: PathBuf,

    /// Directory containing showroom.toml
    #[arg(long, default_value = ".", global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Validate a CSV file and upsert its rows by VIN
    Import {
        file: PathBuf,
        /// Validate and preview without writing
        #[arg(long)]
        dry_run: bool,
        /// Print the full outcome as JSON
        #[arg(long)]
        json: bool,
    },
    /// Add photos to a vehicle
    Upload {
        vehicle_id: String,
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Skip thumbnail generation
        #[arg(long)]
        no_thumbnail: bool,
    },
    /// List a vehicle's photos
    Images { vehicle_id: String },
    /// Make the photo at INDEX (0-based) the primary one
    SetPrimary { vehicle_id: String, index: usize },
    /// Remove a photo by position or upload id
    DeleteImage {
        vehicle_id: String,
        #[arg(long, conflicts_with = "id", required_unless_present = "id")]
        index: Option<usize>,
        #[arg(long)]
        id: Option<String>,
    },
    /// Rewrite legacy photo lists into the record schema
    Migrate,
    /// Strip dealer branding from stored photos (local, inline or http(s) sources)
    Clean {
        /// Clean only this vehicle
        #[arg(long)]
        vehicle: Option<String>,
        /// Re-clean photos that were already cleaned
        #[arg(long)]
        force: bool,
        /// Maximum number of vehicles per run
        #[arg(long, default_value_t = 100)]
        limit: usize,
        /// Directory site-relative photo paths resolve against
        #[arg(long, default_value = "public")]
        public_root: PathBuf,
    },
    /// Print a starter CSV with every supported column
    Template,
    /// Print a stock showroom.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("showroom=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Template => {
            print!("{}", import::csv_template()?);
            return Ok(());
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
            return Ok(());
        }
        _ => {}
    }

    let app_config = config::load_config(&cli.config)?;
    let store = MemoryStore::load(&cli.store)?;
    let backend = RustBackend::new();
    let service = VehicleImageService::new(&store, &backend, app_config.upload_config());

    let mutated = match cli.command {
        Command::Import {
            file,
            dry_run,
            json,
        } => {
            let content = std::fs::read(&file)?;
            let outcome = import::run_import(&store, &content, dry_run, &app_config.import)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&outcome)?);
            } else {
                output::print_import_outcome(&outcome);
            }
            !dry_run
        }
        Command::Upload {
            vehicle_id,
            files,
            no_thumbnail,
        } => {
            let uploads = files
                .iter()
                .map(|p| Upload::from_path(p))
                .collect::<Result<Vec<_>, _>>()?;
            let response = service.upload(&vehicle_id, &uploads, !no_thumbnail)?;
            output::print_upload_response(&response);
            true
        }
        Command::Images { vehicle_id } => {
            output::print_image_list(&service.list(&vehicle_id)?);
            // Listing stores upload ids generated for older records
            true
        }
        Command::SetPrimary { vehicle_id, index } => {
            output::print_image_list(&service.set_primary(&vehicle_id, index)?);
            true
        }
        Command::DeleteImage {
            vehicle_id,
            index,
            id,
        } => {
            let records = match (index, id) {
                (Some(index), _) => service.delete_at(&vehicle_id, index)?,
                (None, Some(id)) => service.delete_by_id(&vehicle_id, &id)?,
                (None, None) => return Err("either --index or --id is required".into()),
            };
            output::print_image_list(&records);
            true
        }
        Command::Migrate => {
            output::print_migration_report(&migrate_all(&store)?);
            true
        }
        Command::Clean {
            vehicle,
            force,
            limit,
            public_root,
        } => {
            let fetcher = SourceFetcher::new(
                LocalFetcher::new(public_root),
                HttpFetcher::new(app_config.fetch_timeout())?,
            );
            let cleaner = ImageCleaner::new(&store, &backend, &fetcher, app_config.clean_params());
            match vehicle {
                Some(id) => output::print_vehicle_cleaning(&cleaner.clean_vehicle(&id, force)?),
                None => output::print_cleaning_report(&cleaner.run_batch(force, limit)?),
            }
            true
        }
        Command::Template | Command::GenConfig => false,
    };

    if mutated {
        store.save(&cli.store)?;
    }
    Ok(())
}
