//! gosend-quote: GoSend courier shipping rates from the command line.

mod input;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use gosend_core::cache::Cache;
use gosend_core::config::ConfigFile;
use gosend_core::error::exit_codes;
use gosend_core::validation::ValidationResult;
use gosend_distance::{BlockingClient, ClientConfig};
use gosend_rates::batch::calculate_rates;
use gosend_rates::config::{self, Settings};
use gosend_rates::distance::{DistanceRequest, DistanceResult, Location, StraightLineProvider};
use gosend_rates::{DistanceProvider, Rate, RateEngine, ShippingMethod};
use gosend_telemetry::{metrics, names, Event, TelemetryConfig, Timer};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "gosend-quote")]
#[command(about = "Distance-based GoSend courier shipping rates")]
#[command(version)]
struct Cli {
    /// Config file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Increase output verbosity
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Log as JSON lines on stderr
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Quote rates for one package or a JSON array of packages
    Quote {
        /// Package JSON file, `-` for stdin
        #[arg(default_value = "-")]
        packages: PathBuf,
        /// Skip the distance lookup and price this distance, in the
        /// configured unit (km, or mi when `api.units = "imperial"`)
        #[arg(long)]
        distance: Option<f64>,
        /// Estimate distance as the crow flies instead of calling the API
        #[arg(long, conflicts_with = "distance")]
        straight_line: bool,
        /// Bypass the distance cache
        #[arg(long)]
        no_cache: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Look up the distance from the store to an address
    Distance {
        /// Destination address or `lat,lng`
        to: String,
        /// Origin address or `lat,lng`, defaults to the store origin
        #[arg(long)]
        from: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate the configuration
    Validate {
        /// Also check the API key with a test request
        #[arg(long)]
        check_api: bool,
    },

    /// Manage the distance cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// Show cache statistics
    Stats,
    /// Drop expired entries
    Cleanup,
    /// Remove every entry
    Clear,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    gosend_telemetry::init_with_config(
        TelemetryConfig::default()
            .with_verbosity(cli.verbose)
            .with_json(cli.log_json),
    )?;

    let loaded = config::load(cli.config.as_deref()).context("failed to load configuration")?;
    if let Some(path) = &loaded.path {
        tracing::debug!(path = %path.display(), "Configuration loaded");
    }

    let exit_code = match cli.command {
        Commands::Quote {
            packages,
            distance,
            straight_line,
            no_cache,
            json,
        } => run_quote(&loaded, &packages, distance, straight_line, no_cache, json)?,
        Commands::Distance { to, from, json } => {
            run_distance(&loaded.schema, &to, from.as_deref(), json)?
        }
        Commands::Validate { check_api } => run_validate(&loaded, check_api)?,
        Commands::Cache { action } => run_cache(&action)?,
    };

    std::process::exit(exit_code);
}

fn run_quote(
    loaded: &ConfigFile<Settings>,
    packages: &Path,
    distance: Option<f64>,
    straight_line: bool,
    no_cache: bool,
    json: bool,
) -> Result<i32> {
    let settings = &loaded.schema;
    let online = distance.is_none() && !straight_line;

    let validation = if online {
        settings.validate()
    } else {
        settings.validate_offline()
    };
    if !report_validation(&validation) {
        return Ok(exit_codes::CONFIG_ERROR);
    }

    let packages = input::read_packages(packages)?;
    let timer = Timer::start(names::CALCULATE_MS);

    let results: Vec<Vec<Rate>> = if let Some(distance) = distance {
        let method = build_method(settings, Arc::new(StraightLineProvider::default()));
        let known = DistanceResult::from_distance(distance, &settings.api.route);
        packages
            .iter()
            .map(|package| method.rates_for_distance(&known, package))
            .collect()
    } else {
        let provider: Arc<dyn DistanceProvider> = if straight_line {
            Arc::new(StraightLineProvider::default())
        } else {
            Arc::new(distance_client(settings)?)
        };
        let mut method = build_method(settings, provider);
        if !no_cache {
            method = method.with_cache(Cache::default_cache()?);
        }
        metrics().increment_by(names::DISTANCE_LOOKUPS, packages.len() as u64);
        calculate_rates(&method, &packages)
    };

    timer.stop();

    for rates in &results {
        if rates.is_empty() {
            metrics().increment(names::RATES_EMPTY);
        } else {
            metrics().increment_by(names::RATES_RETURNED, rates.len() as u64);
        }
    }

    Event::new(
        "quote",
        serde_json::json!({
            "packages": packages.len(),
            "rates": results.iter().map(Vec::len).sum::<usize>(),
        }),
    )
    .log();

    if json {
        if results.len() == 1 {
            println!("{}", serde_json::to_string_pretty(&results[0])?);
        } else {
            println!("{}", serde_json::to_string_pretty(&results)?);
        }
    } else {
        for (index, rates) in results.iter().enumerate() {
            if results.len() > 1 {
                println!("Package {}:", index + 1);
            }
            print_rates(rates);
        }
    }

    tracing::debug!(metrics = %metrics().export_json(), "Quote finished");

    if results.iter().all(Vec::is_empty) {
        Ok(exit_codes::NO_RATES)
    } else {
        Ok(exit_codes::SUCCESS)
    }
}

fn run_distance(settings: &Settings, to: &str, from: Option<&str>, json: bool) -> Result<i32> {
    let origin = match from {
        Some(from) => Location::parse(from),
        None => match settings.origin.location() {
            Some(origin) => origin,
            None => {
                eprintln!("No origin configured; pass --from");
                return Ok(exit_codes::CONFIG_ERROR);
            }
        },
    };

    let client = distance_client(settings)?;
    let request = DistanceRequest {
        origin,
        destination: Location::parse(to),
        options: settings.api.route.clone(),
    };

    metrics().increment(names::DISTANCE_LOOKUPS);
    match client.distance(&request) {
        Ok(result) => {
            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                println!("Distance: {}", result.distance_text);
                println!("Duration: {}", result.duration_text);
            }
            Ok(exit_codes::SUCCESS)
        }
        Err(e) => {
            metrics().increment(names::DISTANCE_ERRORS);
            eprintln!("Error: {e}");
            Ok(exit_codes::SERVICE_ERROR)
        }
    }
}

fn run_validate(loaded: &ConfigFile<Settings>, check_api: bool) -> Result<i32> {
    match &loaded.path {
        Some(path) => println!("Config: {}", path.display()),
        None => println!("Config: defaults (no file found)"),
    }

    let settings = &loaded.schema;
    let validation = if check_api {
        settings.validate()
    } else {
        settings.validate_offline()
    };
    if !report_validation(&validation) {
        return Ok(exit_codes::VALIDATION_ERROR);
    }

    let engine = RateEngine::new(settings.engine_config());
    let targets = engine.targets();
    let offered: Vec<&str> = targets.iter().map(|t| t.slug()).collect();
    println!("Offered: {}", offered.join(", "));

    if check_api {
        let client = distance_client(settings)?;
        match client.check_key(&settings.api.route) {
            Ok(result) => println!("API key OK ({})", result.distance_text),
            Err(e) => {
                eprintln!("API key check failed: {e}");
                return Ok(exit_codes::SERVICE_ERROR);
            }
        }
    }

    println!("Configuration is valid");
    Ok(exit_codes::SUCCESS)
}

fn run_cache(action: &CacheAction) -> Result<i32> {
    let cache = Cache::default_cache()?;
    match action {
        CacheAction::Stats => {
            println!("{}", serde_json::to_string_pretty(&cache.stats()?)?);
        }
        CacheAction::Cleanup => {
            let removed = cache.cleanup()?;
            println!("Removed {removed} expired entries");
        }
        CacheAction::Clear => {
            cache.clear()?;
            println!("Cache cleared");
        }
    }
    Ok(exit_codes::SUCCESS)
}

fn build_method(settings: &Settings, provider: Arc<dyn DistanceProvider>) -> ShippingMethod {
    ShippingMethod::new(
        settings.method_settings(),
        RateEngine::new(settings.engine_config()),
        provider,
    )
}

fn distance_client(settings: &Settings) -> Result<BlockingClient> {
    let config = ClientConfig::from_settings(&settings.api, settings.general.debug);
    BlockingClient::new(config).context("failed to create distance client")
}

/// Print warnings and errors; false when there are errors.
fn report_validation(result: &ValidationResult) -> bool {
    for warning in result.warnings() {
        eprintln!("warning: {warning}");
    }
    for error in result.errors() {
        eprintln!("error: {error}");
    }
    result.is_valid()
}

fn print_rates(rates: &[Rate]) {
    if rates.is_empty() {
        println!("  No rates available");
        return;
    }
    for rate in rates {
        println!("  {:<40} {:>12.2}", rate.label, rate.cost);
    }
}
