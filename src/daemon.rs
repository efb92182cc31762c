//! Daemon runtime: pressure polling, the pass worker and signal handling.
//!
//! The tokio side only polls the pressure source and feeds the trigger; the
//! decision pass runs on a dedicated, higher-priority std thread so that a
//! slow pass never stalls polling or signal handling.

use anyhow::{bail, Context, Result};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tokio::signal::unix::{signal, SignalKind};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use prlmk::lmk::host::PressureSource;
use prlmk::lmk::trigger::{self, PassQueue};
use prlmk::lmk::{run_pass, LmkContext};
use prlmk::process::ProcTable;
use prlmk::system::{raise_thread_priority, ProcMemInfo, PsiLine, PsiSource};
use prlmk::{LmkStats, SharedTunables, Tunables};

use crate::config::{
    Config, DEFAULT_KILL_SETTLE_MS, DEFAULT_MEMINFO_PATH, DEFAULT_POLL_INTERVAL_MS,
    DEFAULT_PROC_ROOT, DEFAULT_PSI_PATH, DEFAULT_WORKER_NICE,
};

/// Set once the pressure listener is registered; a second start is refused.
static LISTENER_REGISTERED: AtomicBool = AtomicBool::new(false);

/// Effective daemon settings derived from the merged configuration.
#[derive(Debug, Clone)]
pub struct DaemonOptions {
    pub proc_root: PathBuf,
    pub meminfo_path: PathBuf,
    pub psi_path: PathBuf,
    pub psi_line: PsiLine,
    pub poll_interval: Duration,
    pub kill_settle: Duration,
    pub worker_nice: i32,
    pub dry_run: bool,
}

impl DaemonOptions {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            proc_root: cfg
                .proc_root
                .clone()
                .unwrap_or_else(|| PathBuf::from(DEFAULT_PROC_ROOT)),
            meminfo_path: cfg
                .meminfo_path
                .clone()
                .unwrap_or_else(|| PathBuf::from(DEFAULT_MEMINFO_PATH)),
            psi_path: cfg
                .psi_path
                .clone()
                .unwrap_or_else(|| PathBuf::from(DEFAULT_PSI_PATH)),
            psi_line: match cfg.psi_line.as_deref() {
                Some("full") => PsiLine::Full,
                _ => PsiLine::Some,
            },
            poll_interval: Duration::from_millis(
                cfg.poll_interval_ms.unwrap_or(DEFAULT_POLL_INTERVAL_MS),
            ),
            kill_settle: Duration::from_millis(
                cfg.kill_settle_ms.unwrap_or(DEFAULT_KILL_SETTLE_MS),
            ),
            worker_nice: cfg.worker_nice.unwrap_or(DEFAULT_WORKER_NICE),
            dry_run: cfg.dry_run.unwrap_or(false),
        }
    }
}

/// Claims the one-time listener registration.
fn register_listener() -> Result<()> {
    if LISTENER_REGISTERED
        .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
        .is_err()
    {
        bail!("pressure listener already registered");
    }
    Ok(())
}

/// Starts the worker that runs one decision pass per scheduled trigger.
fn spawn_worker(queue: PassQueue, ctx: LmkContext, opts: &DaemonOptions) -> Result<JoinHandle<()>> {
    let table = ProcTable::new(&opts.proc_root).dry_run(opts.dry_run);
    let counters = ProcMemInfo::new(&opts.meminfo_path);
    let nice = opts.worker_nice;

    thread::Builder::new()
        .name("prlmk-worker".into())
        .spawn(move || {
            if let Err(e) = raise_thread_priority(nice) {
                warn!("Failed to set worker nice value {}: {}", nice, e);
            }

            while let Some(_guard) = queue.wait() {
                run_pass(&table, &counters, &ctx);
            }
            debug!("pass queue closed, worker exiting");
        })
        .context("Failed to spawn worker thread")
}

/// Runs the daemon until SIGINT or SIGTERM.
///
/// `reload` re-reads the configuration on SIGHUP and returns the new tunables.
pub async fn run<R>(opts: DaemonOptions, tunables: Tunables, reload: R) -> Result<()>
where
    R: Fn() -> std::result::Result<Tunables, String>,
{
    register_listener()?;

    let tunables = Arc::new(SharedTunables::new(tunables));
    let stats = Arc::new(LmkStats::new());
    let ctx = LmkContext::with_shared(Arc::clone(&tunables), Arc::clone(&stats))
        .kill_settle(opts.kill_settle);

    let (trigger, queue) = trigger::channel();
    let worker = spawn_worker(queue, ctx, &opts)?;

    let psi = PsiSource::new(&opts.psi_path, opts.psi_line);
    let mut ticker = interval(opts.poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut hangup = signal(SignalKind::hangup()).context("Failed to install SIGHUP handler")?;
    let mut user1 =
        signal(SignalKind::user_defined1()).context("Failed to install SIGUSR1 handler")?;
    let mut terminate =
        signal(SignalKind::terminate()).context("Failed to install SIGTERM handler")?;

    info!(
        "prlmk running: psi={} poll={}ms dry_run={}",
        opts.psi_path.display(),
        opts.poll_interval.as_millis(),
        opts.dry_run
    );

    let mut psi_failing = false;
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match psi.read_pressure() {
                    Ok(magnitude) => {
                        psi_failing = false;
                        let pressure_max = tunables.get().pressure_max;
                        if magnitude >= pressure_max {
                            stats.record_trigger(trigger.on_pressure(magnitude, pressure_max));
                        }
                    }
                    Err(e) => {
                        // Log once per outage.
                        if !psi_failing {
                            error!("Failed to read pressure: {}", e);
                            psi_failing = true;
                        }
                    }
                }
            }
            _ = hangup.recv() => {
                match reload() {
                    Ok(new) => {
                        let old = tunables.set(new);
                        info!("Tunables reloaded: {:?} -> {:?}", old, new);
                    }
                    Err(e) => warn!("Reload failed, keeping current tunables: {}", e),
                }
            }
            _ = user1.recv() => {
                info!("Statistics:\n{}", stats.render_summary());
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Received SIGINT (Ctrl+C), shutting down gracefully...");
                break;
            }
            _ = terminate.recv() => {
                info!("Received SIGTERM, shutting down gracefully...");
                break;
            }
        }
    }

    // Closing the queue lets the worker finish its current pass and exit.
    drop(trigger);
    tokio::task::spawn_blocking(move || worker.join())
        .await
        .context("Failed to join worker")?
        .map_err(|_| anyhow::anyhow!("worker thread panicked"))?;

    info!("Statistics:\n{}", stats.render_summary());
    Ok(())
}
