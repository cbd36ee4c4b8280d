use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::warn;

use bonito_offline_core::{
    CacheConfig, CacheStore, DiskCacheStore, Event, HttpFetcher, Method, Outcome, Registration, Request,
    ServiceWorker, SyncOutcome,
};

use crate::WorkerCommand;

pub async fn run(command: WorkerCommand, config: CacheConfig, cache_dir: PathBuf) -> Result<()> {
    let store: Arc<dyn CacheStore> = Arc::new(DiskCacheStore::new(cache_dir)?);
    let fetcher = Arc::new(HttpFetcher::new(config.network_timeout())?);
    let worker = ServiceWorker::new(config, Arc::clone(&store), fetcher)?;

    match command {
        WorkerCommand::Install => install(worker).await,
        WorkerCommand::Activate => print_outcome(worker.handle(Event::Activate).await?),
        WorkerCommand::Fetch {
            path,
            method,
            destination,
        } => {
            let method = Method::from_bytes(method.to_ascii_uppercase().as_bytes())
                .with_context(|| format!("Invalid method: {}", method))?;
            let url = worker.config().resolve(&path)?;
            let request = Request::new(method, url).with_destination(destination);

            let outcome = worker.handle(Event::Fetch(request)).await;
            finish(&worker).await;
            print_outcome(outcome?)
        }
        WorkerCommand::Sync { tag } => print_outcome(worker.handle(Event::Sync { tag }).await?),
        WorkerCommand::Push { payload } => {
            let payload = payload.map(String::into_bytes);
            print_outcome(worker.handle(Event::Push(payload)).await?)
        }
        WorkerCommand::Click { action } => print_outcome(worker.handle(Event::NotificationClick { action }).await?),
        WorkerCommand::Status => status(&worker, store.as_ref()).await,
    }
}

pub fn show_config(config: &CacheConfig, save: bool, path: Option<&Path>) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(config)?);
    if save {
        match path {
            Some(path) => config.save_to(path)?,
            None => config.save()?,
        }
        eprintln!("Configuration saved");
    }
    Ok(())
}

async fn install(worker: ServiceWorker) -> Result<()> {
    let version = worker.version().to_string();
    let mut registration = Registration::new();
    let deleted = registration.update(worker).await?;

    eprintln!("Installed and activated version {}", version);
    for name in deleted {
        eprintln!("  deleted {}", name);
    }
    Ok(())
}

/// Detached writes must land before the process exits.
async fn finish(worker: &ServiceWorker) {
    for report in worker.settle().await {
        if let Some(error) = report.error {
            warn!(task = %report.task, %error, "Cache write failed");
        }
    }
}

fn print_outcome(outcome: Outcome) -> Result<()> {
    match outcome {
        Outcome::Installed { precached } => eprintln!("Precached {} core files", precached),
        Outcome::Activated { deleted } if deleted.is_empty() => eprintln!("No stale partitions"),
        Outcome::Activated { deleted } => {
            for name in deleted {
                eprintln!("Deleted {}", name);
            }
        }
        Outcome::Response(served) => {
            let response = &served.response;
            eprintln!("{} ({})", response.status, served.source.as_str());
            for (name, value) in &response.headers {
                eprintln!("{}: {}", name, value);
            }
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&response.body)?;
            stdout.flush()?;
        }
        Outcome::Synced(SyncOutcome::Refreshed) => eprintln!("Attractions refreshed"),
        Outcome::Synced(SyncOutcome::Skipped(reason)) => eprintln!("Sync skipped: {}", reason),
        Outcome::Synced(SyncOutcome::Failed(reason)) => eprintln!("Sync failed: {}", reason),
        Outcome::Notify(notification) => println!("{}", serde_json::to_string_pretty(&notification)?),
        Outcome::Click(click) => println!("{}", serde_json::to_string_pretty(&click)?),
        Outcome::Ignored => eprintln!("Ignored"),
    }
    Ok(())
}

async fn status(worker: &ServiceWorker, store: &dyn CacheStore) -> Result<()> {
    let valid = worker.partitions().valid_set();
    let names = store.partitions().await?;
    if names.is_empty() {
        println!("No partitions (version {} not installed)", worker.version());
        return Ok(());
    }

    for name in names {
        let entries = store.entries(&name).await?;
        let newest = entries
            .iter()
            .max_by_key(|entry| entry.cached_at)
            .map(|entry| entry.age_display())
            .unwrap_or_else(|| "never".to_string());
        let marker = if valid.contains(&name) { "" } else { " (stale)" };
        println!("{:<40} {:>5} entries  updated {}{}", name, entries.len(), newest, marker);
    }
    Ok(())
}
