//! Engine process supervisor.
//!
//! Owns the child process lifecycle: spawn, liveness, death detection, and
//! bounded-retry restart with a fixed cool-down. Death is observed through
//! the process's own pipes — stdout EOF or a read error, and write errors on
//! stdin — each routed through [`Shared::handle_death`]. A generation
//! counter tags every spawned process so that a handle replaced by a restart
//! cannot report a stale death.
//!
//! The supervisor never waits on the child in the host's own shutdown path;
//! a dropped handle is killed and reaped in the background.

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::process::Stdio;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::process::{Child, Command};
use tokio::sync::{mpsc, watch};

use scribe_types::EngineStatus;

use crate::binary;
use crate::codec::{LineReader, LineWriter};
use crate::error::{Error, Result};
use crate::status::StatusCell;

/// Client identifier passed to every engine invocation.
const CLIENT_ID: &str = "scribe";

/// Queue capacity for outbound request lines.
const WRITER_CHANNEL_CAPACITY: usize = 64;

/// Queue capacity for reply lines awaiting a listener; replies beyond this
/// with nobody listening are dropped.
const LINE_CHANNEL_CAPACITY: usize = 64;

/// Bounded-restart policy with a fixed cool-down between attempts.
///
/// The attempt counter is never reset, even after a subsequently healthy
/// long-running process: the budget is for the supervisor's whole lifetime.
/// A sliding-window policy would be a new option here, not a change to the
/// default.
#[derive(Debug, Clone, Copy)]
pub struct RestartPolicy {
    /// Restart attempts before the supervisor gives up permanently.
    pub max_restarts: u32,
    /// Fixed delay between a death event and the restart attempt.
    pub backoff: Duration,
}

impl Default for RestartPolicy {
    /// 10 attempts, 10 seconds apart.
    fn default() -> Self {
        Self {
            max_restarts: 10,
            backoff: Duration::from_secs(10),
        }
    }
}

/// Supervisor configuration.
#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    /// Versions root containing installed engine builds.
    pub binaries_root: PathBuf,
    pub restart: RestartPolicy,
    /// Extra flags appended after the client flag on every normal spawn.
    pub extra_args: Vec<String>,
}

impl SupervisorConfig {
    pub fn new(binaries_root: impl Into<PathBuf>) -> Self {
        Self {
            binaries_root: binaries_root.into(),
            restart: RestartPolicy::default(),
            extra_args: Vec::new(),
        }
    }
}

struct ProcState {
    /// Current process handle; exactly one is current at any time.
    child: Option<Child>,
    version: Option<String>,
    writer_tx: Option<mpsc::Sender<String>>,
    /// Incremented on every start. Death events carrying an older
    /// generation come from a replaced handle and are ignored.
    generation: u64,
    alive: bool,
    restart_count: u32,
}

pub(crate) struct Shared {
    config: SupervisorConfig,
    status: StatusCell,
    alive_tx: watch::Sender<bool>,
    line_tx: mpsc::Sender<String>,
    /// Reply lines from the current process. The channel borrows this for
    /// the duration of one exchange.
    pub(crate) lines: tokio::sync::Mutex<mpsc::Receiver<String>>,
    proc: Mutex<ProcState>,
}

/// Supervisor for the engine process. Cloning is cheap and refers to the
/// same supervised process.
#[derive(Clone)]
pub struct Supervisor {
    shared: Arc<Shared>,
}

impl Supervisor {
    #[must_use]
    pub fn new(config: SupervisorConfig, status: StatusCell) -> Self {
        let (line_tx, line_rx) = mpsc::channel(LINE_CHANNEL_CAPACITY);
        let (alive_tx, _) = watch::channel(false);
        Self {
            shared: Arc::new(Shared {
                config,
                status,
                alive_tx,
                line_tx,
                lines: tokio::sync::Mutex::new(line_rx),
                proc: Mutex::new(ProcState {
                    child: None,
                    version: None,
                    writer_tx: None,
                    generation: 0,
                    alive: false,
                    restart_count: 0,
                }),
            }),
        }
    }

    /// Spawn the engine and hook the death observers.
    ///
    /// Returns the negotiated engine version. Binary-resolution and spawn
    /// failures are fatal to this call and are not retried.
    pub async fn start(&self) -> Result<String> {
        Shared::start(&self.shared).await
    }

    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.shared.is_alive()
    }

    /// Version of the currently supervised engine, if one was started.
    #[must_use]
    pub fn version(&self) -> Option<String> {
        self.shared.version()
    }

    /// Restart attempts consumed so far.
    #[must_use]
    pub fn restart_count(&self) -> u32 {
        self.shared.lock().restart_count
    }

    #[must_use]
    pub fn status(&self) -> StatusCell {
        self.shared.status.clone()
    }

    pub(crate) fn shared(&self) -> &Arc<Shared> {
        &self.shared
    }
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, ProcState> {
        self.proc.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn is_alive(&self) -> bool {
        *self.alive_tx.borrow()
    }

    pub(crate) fn alive_rx(&self) -> watch::Receiver<bool> {
        self.alive_tx.subscribe()
    }

    pub(crate) fn version(&self) -> Option<String> {
        self.lock().version.clone()
    }

    pub(crate) fn writer(&self) -> Option<mpsc::Sender<String>> {
        self.lock().writer_tx.clone()
    }

    pub(crate) fn status(&self) -> &StatusCell {
        &self.status
    }

    async fn start(shared: &Arc<Self>) -> Result<String> {
        let (version, mut child) =
            match spawn_engine(&shared.config, false, &shared.config.extra_args).await {
                Ok(spawned) => spawned,
                Err(e) => {
                    match &e {
                        Error::BinaryNotFound { .. } => {
                            shared.status.set(EngineStatus::BinaryMissing, e.to_string());
                        }
                        _ => {
                            shared
                                .status
                                .set(EngineStatus::ProcessFailedToStart, e.to_string());
                        }
                    }
                    return Err(e);
                }
            };

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::Spawn(std::io::Error::other("no stdout from engine")))?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| Error::Spawn(std::io::Error::other("no stdin from engine")))?;

        let (writer_tx, mut writer_rx) = mpsc::channel::<String>(WRITER_CHANNEL_CAPACITY);
        let generation = {
            let mut st = shared.lock();
            st.generation += 1;
            st.child = Some(child);
            st.version = Some(version.clone());
            st.writer_tx = Some(writer_tx);
            st.alive = true;
            st.generation
        };
        shared.alive_tx.send_replace(true);

        let writer_shared = Arc::clone(shared);
        tokio::spawn(async move {
            let mut writer = LineWriter::new(stdin);
            while let Some(line) = writer_rx.recv().await {
                if let Err(e) = writer.write_line(&line).await {
                    Shared::handle_death(
                        &writer_shared,
                        generation,
                        Some(format!("engine stdin error: {e}")),
                    );
                    break;
                }
            }
        });

        let reader_shared = Arc::clone(shared);
        tokio::spawn(async move {
            let mut reader = LineReader::new(stdout);
            loop {
                match reader.read_line().await {
                    Ok(Some(line)) => {
                        // Only the current process feeds the reply queue.
                        if reader_shared.lock().generation != generation {
                            break;
                        }
                        // A reply nobody listens to is buffered up to the
                        // queue capacity, then dropped.
                        let _ = reader_shared.line_tx.try_send(line);
                    }
                    Ok(None) => {
                        Shared::handle_death(&reader_shared, generation, None);
                        break;
                    }
                    Err(e) => {
                        Shared::handle_death(
                            &reader_shared,
                            generation,
                            Some(format!("engine stdout error: {e}")),
                        );
                        break;
                    }
                }
            }
        });

        shared.status.set(
            EngineStatus::ProcessRunning,
            format!("engine {version} process is running"),
        );
        tracing::info!(version = %version, "engine process started");
        Ok(version)
    }

    /// Mark the current process dead and schedule one restart.
    ///
    /// Idempotent: a stale generation (replaced handle) or an already-dead
    /// process is a no-op, so the two pipe observers cannot double-schedule.
    fn handle_death(shared: &Arc<Self>, generation: u64, reason: Option<String>) {
        {
            let mut st = shared.lock();
            if st.generation != generation || !st.alive {
                return;
            }
            st.alive = false;
            st.writer_tx = None;
        }
        shared.alive_tx.send_replace(false);

        if let Some(reason) = reason {
            tracing::error!("{reason}");
        }
        shared
            .status
            .set(EngineStatus::ProcessExited, "engine process died");

        let backoff = shared.config.restart.backoff;
        tracing::warn!(delay = ?backoff, "engine process died, restart scheduled");
        let restart_shared = Arc::clone(shared);
        tokio::spawn(async move {
            tokio::time::sleep(backoff).await;
            Shared::restart(&restart_shared).await;
        });
    }

    /// Attempt one restart. No-op while alive; permanent stop once the
    /// budget is exhausted.
    ///
    /// Returns a boxed future so the type is concrete at the recursive
    /// spawn site below — a directly recursive `async fn` cannot have its
    /// `Send`-ness auto-inferred.
    fn restart<'a>(shared: &'a Arc<Self>) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>> {
        Box::pin(async move {
        let old_child = {
            let mut st = shared.lock();
            if st.alive {
                return;
            }
            if st.restart_count >= shared.config.restart.max_restarts {
                let err = Error::RestartBudgetExhausted;
                tracing::error!("{err}");
                shared.status.set(EngineStatus::ProcessDead, err.to_string());
                return;
            }
            st.restart_count += 1;
            st.child.take()
        };

        if let Some(mut child) = old_child {
            // Force-kill the replaced handle; reaping happens in the
            // background via kill_on_drop.
            let _ = child.start_kill();
        }

        if let Err(e) = Shared::start(shared).await {
            // start() already published the failure status. Keep burning
            // through the budget on the same cool-down.
            tracing::error!("engine restart failed: {e}");
            let backoff = shared.config.restart.backoff;
            let retry_shared = Arc::clone(shared);
            tokio::spawn(async move {
                tokio::time::sleep(backoff).await;
                Shared::restart(&retry_shared).await;
            });
        }
        })
    }
}

/// Spawn one engine process from the newest installed binary.
async fn spawn_engine(
    config: &SupervisorConfig,
    inherit_stdio: bool,
    extra_args: &[String],
) -> Result<(String, Child)> {
    let found = binary::locate(&config.binaries_root).await?;

    let mut cmd = Command::new(&found.path);
    cmd.arg(format!("--client={CLIENT_ID}"));
    cmd.args(extra_args);
    if inherit_stdio {
        cmd.stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());
    } else {
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true);
    }

    let child = cmd.spawn().map_err(Error::Spawn)?;
    Ok((found.version, child))
}

/// Run the engine once in inherited-stdio report mode and return its exit
/// code. Fails with [`Error::AbnormalTermination`] if the process was killed
/// by a signal and produced no code.
pub async fn report_and_exit(config: &SupervisorConfig, extra_args: &[String]) -> Result<i32> {
    let (_version, mut child) = spawn_engine(config, true, extra_args).await?;
    let exit = child.wait().await?;
    exit.code().ok_or(Error::AbnormalTermination)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_restart_policy_defaults() {
        let policy = RestartPolicy::default();
        assert_eq!(policy.max_restarts, 10);
        assert_eq!(policy.backoff, Duration::from_secs(10));
    }

    #[test]
    fn test_config_defaults() {
        let config = SupervisorConfig::new("/tmp/binaries");
        assert_eq!(config.binaries_root, PathBuf::from("/tmp/binaries"));
        assert!(config.extra_args.is_empty());
        assert_eq!(config.restart.max_restarts, 10);
    }

    #[tokio::test]
    async fn test_fresh_supervisor_is_not_alive() {
        let supervisor = Supervisor::new(SupervisorConfig::new("/nonexistent"), StatusCell::new());
        assert!(!supervisor.is_alive());
        assert_eq!(supervisor.version(), None);
        assert_eq!(supervisor.restart_count(), 0);
    }

    #[cfg(target_arch = "x86_64")]
    #[tokio::test]
    async fn test_start_without_binaries_fails_and_publishes_status() {
        let tmp = tempfile::tempdir().unwrap();
        let status = StatusCell::new();
        let supervisor = Supervisor::new(SupervisorConfig::new(tmp.path()), status.clone());

        let err = supervisor.start().await.unwrap_err();
        assert!(matches!(err, Error::BinaryNotFound { .. }));
        assert_eq!(status.get().state, EngineStatus::BinaryMissing);
        assert!(!supervisor.is_alive());
    }
}
