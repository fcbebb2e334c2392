use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use anyhow::{bail, Result};

use pensum::config::{self, Config};
use pensum::format;
use pensum::logging;
use pensum::subject::store::SharedSubjectStore;
use pensum::subject::JsonSubjectStore;
use pensum::timer::{JsonTimerStore, TimerKind, TimersManager};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Ensure config/data/logs directories exist
    config::ensure_directories()?;

    // Initialize file logging BEFORE any tracing calls
    let log_path = logging::init_file_logging(&config::logs_dir())?;

    let config = Config::load()?;

    // Clean up old logs
    if let Ok(count) =
        logging::cleanup_old_logs_with_retention(&config::logs_dir(), config.log_retention_days)
    {
        if count > 0 {
            tracing::info!("Cleaned up {} old log files", count);
        }
    }

    tracing::info!("Logging to: {}", log_path.display());

    let timer_store = Box::new(JsonTimerStore::open());
    let subjects: SharedSubjectStore = Rc::new(RefCell::new(JsonSubjectStore::open()));
    let tick_interval = Duration::from_secs(config.tick_interval_secs.max(1));
    let mut manager = TimersManager::new(config, timer_store, subjects);

    // An HH:MM:SS argument creates and starts a fresh timer; without
    // one, any persisted timers are listed and the first is resumed.
    if let Some(arg) = std::env::args().nth(1) {
        let Some(value) = format::parse_time(&arg) else {
            bail!("Invalid duration '{}', expected HH:MM:SS", arg);
        };
        let id = manager.create_timer(value, TimerKind::FreeSession, None);
        manager.start(id);
        println!("Started {} timer {}", format::format_full(value), id);
    } else {
        if manager.timers_count() == 0 {
            println!("No timers. Run with an HH:MM:SS duration to start one.");
            return Ok(());
        }
        for timer in manager.all_timers() {
            println!(
                "{}  {:<8}  {}",
                timer.id(),
                timer.run_state().display_name(),
                timer.display()
            );
        }
        let first = manager.active_timers().first().map(|t| t.id());
        if let Some(first) = first {
            manager.start(first);
            println!("Resumed timer {}", first);
        }
    }

    let mut interval = tokio::time::interval(tick_interval);
    // The first tick of a tokio interval fires immediately; consume it
    // so the countdown starts a full period from now.
    interval.tick().await;

    while manager.has_running_timers() {
        interval.tick().await;
        manager.tick();

        for timer in manager.active_timers() {
            if timer.is_running() {
                println!("{}  {}", timer.id(), timer.display());
            }
        }
    }

    for timer in manager.all_timers() {
        if timer.is_finished() {
            println!("{}  finished", timer.id());
        }
    }
    tracing::info!("All timers stopped, exiting");

    Ok(())
}
