use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};

use eve_market_sync::api::esi::EsiClient;
use eve_market_sync::cache::{FSFetchCacheStore, FetchCache};
use eve_market_sync::commands::history::history;
use eve_market_sync::commands::orders::orders;
use eve_market_sync::commands::volumes::volumes;
use eve_market_sync::configuration::cli::{Args, Commands, ItemSelection};
use eve_market_sync::configuration::{
    self, Configuration, ConfigurationDirectoryType, ConfigurationError,
};
use eve_market_sync::dates::{Clock, SystemClock};
use eve_market_sync::errors::{Advice, EnvironmentError, MarketSyncError};
use eve_market_sync::filesystem;
use eve_market_sync::logging::{self, Verbosity};
use eve_market_sync::store::{MarketStore, DATABASE_FILE};
use eve_market_sync::sync::{MarketSynchronizer, SyncOptions};

#[tokio::main]
async fn main() -> Result<(), MarketSyncError> {
    let args = Args::parse();
    let verbosity = Verbosity::new(args.verbose, args.quiet);
    logging::init(args.command.json(), verbosity);

    if let Err(e) = run(args, verbosity).await {
        let mut advice = None;
        if let Verbosity::Normal = verbosity {
            if let Some(adv) = e.advice() {
                advice = Some(adv)
            }
        }

        let any_err = anyhow::Error::from(e);
        logging::err(any_err);

        if let Verbosity::Normal = verbosity {
            if let Some(adv) = advice {
                logging::println_stderr("");
                logging::println_stderr(&adv)
            }
        }

        process::exit(1);
    }
    Ok(())
}

fn option<T>(
    option_name: &str,
    value: Result<T, ConfigurationError>,
) -> Result<T, EnvironmentError> {
    value.map_err(|source| EnvironmentError::ConfigurationOptionLoading {
        option_name: option_name.to_string(),
        source,
    })
}

async fn run(args: Args, verbosity: Verbosity) -> Result<(), MarketSyncError> {
    let cache_dir = configuration::get_directory(ConfigurationDirectoryType::Cache, &args)
        .await?
        .ok_or(EnvironmentError::CacheDirectoryUnknown)?;
    filesystem::create_directory(&cache_dir).await?;
    let data_dir = configuration::get_directory(ConfigurationDirectoryType::Data, &args)
        .await?
        .ok_or(EnvironmentError::DataDirectoryUnknown)?;
    filesystem::create_directory(&data_dir).await?;

    let cfg = configuration::get(&args).await?;

    if args.force_color {
        colored::control::set_override(true);
    } else if let Some(no_color) = option("no_color", cfg.no_color())? {
        if no_color {
            colored::control::set_override(false);
        }
    }

    let region_id = option("region_id", cfg.region_id())?;
    let selection = match &args.command {
        Commands::Orders(opts) | Commands::History(opts) => &opts.items,
        Commands::Volumes(opts) => &opts.items,
    };
    let items = item_universe(selection, option("items_file", cfg.items_file())?).await?;

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let synchronizer = synchronizer(&cfg, cache_dir, data_dir, clock.clone(), verbosity).await?;

    let cancellation = synchronizer.cancellation();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            logging::println_stderr("Interrupted, waiting for items in progress...");
            cancellation.cancel();
        }
    });

    match &args.command {
        Commands::Orders(_) => orders(&synchronizer, region_id, &items).await?,
        Commands::History(_) => history(&synchronizer, region_id, &items, clock.today()).await?,
        Commands::Volumes(opts) => {
            let as_of = opts.as_of.unwrap_or_else(|| clock.today());
            volumes(&synchronizer, region_id, &items, as_of).await?
        }
    }
    Ok(())
}

async fn item_universe(
    selection: &ItemSelection,
    items_file: Option<PathBuf>,
) -> Result<Vec<i32>, MarketSyncError> {
    let mut items = selection.items.clone();
    if let Some(items_file) = items_file {
        items.extend(filesystem::load_item_universe(&items_file).await?);
    }
    if items.is_empty() {
        return Err(EnvironmentError::NoItemSelected.into());
    }
    Ok(items)
}

async fn synchronizer(
    cfg: &impl Configuration,
    cache_dir: PathBuf,
    data_dir: PathBuf,
    clock: Arc<dyn Clock>,
    verbosity: Verbosity,
) -> Result<MarketSynchronizer, MarketSyncError> {
    let requester = EsiClient::new(
        &option("base_api_url", cfg.base_api_url())?,
        option("request_timeout", cfg.request_timeout())?,
    )?;
    let store = MarketStore::open(&data_dir.join(DATABASE_FILE))?;

    let cooldown = option("cooldown", cfg.cooldown())?;
    let cooldown = option(
        "cooldown",
        chrono::Duration::from_std(cooldown).map_err(|_| ConfigurationError::InvalidValueError {
            got: cooldown.as_secs().to_string(),
            expected: "reasonable number of seconds".to_string(),
            origin: "cooldown".to_string(),
        }),
    )?;
    let cache = FetchCache::load(Box::new(FSFetchCacheStore::new(cache_dir)), cooldown).await;

    let options = SyncOptions {
        concurrency: option("concurrency", cfg.concurrency())?,
        persistence_timeout: option("persistence_timeout", cfg.persistence_timeout())?,
    };
    let synchronizer =
        MarketSynchronizer::new(Arc::new(requester), store, Arc::new(cache), clock, options);
    if !verbosity.shows_progress() {
        return Ok(synchronizer);
    }

    let progress_bar = ProgressBar::new(0);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} items")
    {
        progress_bar.set_style(style.progress_chars("=>-"));
    }
    Ok(synchronizer.with_progress(progress_bar))
}
