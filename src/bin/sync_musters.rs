//! Scheduled entry point for the DLB synchronisation
//!
//! Run from cron, typically monthly. Exit code is 0 when the run fully succeeded,
//! 1 when anything failed, 2 when the process could not even start a run.

use std::error::Error;
use std::path::PathBuf;

use chrono::{Duration, Local};

use muster_sync::client::DlbClient;
use muster_sync::config::SyncSettings;
use muster_sync::store::LocalStore;
use muster_sync::SyncOrchestrator;

struct Options {
    settings: PathBuf,
    store: PathBuf,
    brigade: Option<String>,
    months: Option<u32>,
    attendance: bool,
    check: bool,
}

impl Options {
    fn parse<I: Iterator<Item = String>>(mut args: I) -> Result<Self, Box<dyn Error>> {
        let mut options = Self {
            settings: PathBuf::from("settings.json"),
            store: PathBuf::from("store.json"),
            brigade: None,
            months: None,
            attendance: false,
            check: false,
        };

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--settings" => options.settings = PathBuf::from(expect_value(&arg, args.next())?),
                "--store" => options.store = PathBuf::from(expect_value(&arg, args.next())?),
                "--brigade" => options.brigade = Some(expect_value(&arg, args.next())?),
                "--months" => options.months = Some(expect_value(&arg, args.next())?.parse()?),
                "--attendance" => options.attendance = true,
                "--check" => options.check = true,
                other => return Err(format!("Unknown argument {:?}", other).into()),
            }
        }
        Ok(options)
    }
}

fn expect_value(flag: &str, value: Option<String>) -> Result<String, Box<dyn Error>> {
    value.ok_or_else(|| format!("{} requires a value", flag).into())
}

#[tokio::main]
async fn main() {
    env_logger::init();

    match run().await {
        Ok(success) => std::process::exit(if success { 0 } else { 1 }),
        Err(err) => {
            log::error!("Sync could not start: {}", err);
            std::process::exit(2);
        },
    }
}

async fn run() -> Result<bool, Box<dyn Error>> {
    let options = Options::parse(std::env::args().skip(1))?;

    let settings = SyncSettings::from_file(&options.settings)?;
    let brigade = settings.brigade(options.brigade.as_deref())?.clone();

    let store = match options.store.exists() {
        true => LocalStore::from_file(&options.store)?,
        false => LocalStore::new(&options.store),
    };
    let client = DlbClient::new(&settings.dlb)?;
    let mut orchestrator = SyncOrchestrator::new(client, store, settings.dlb.clone());

    if options.check {
        let reachable = orchestrator.test_connection().await;
        println!("DLB connection: {}", if reachable { "OK" } else { "FAILED" });
        return Ok(reachable);
    }

    let run = match options.attendance {
        true => {
            // Pull the rolling last month of attendance
            let to = Local::now().date_naive();
            let from = to - Duration::days(31);
            orchestrator.sync_attendance(&brigade, from, to).await
        },
        false => orchestrator.create_future_musters(&brigade, options.months).await,
    };

    log::info!("Sync run for brigade {} finished: {}", brigade.name(), run);
    if run.is_success() {
        orchestrator.local_mut().update_last_sync(None);
    }
    orchestrator.local_mut().save_to_file();

    Ok(run.is_success())
}
