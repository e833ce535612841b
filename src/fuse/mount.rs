// FUSE mount management
//
// Owns the mount point and the fuser session for the life of the process.
// The session runs on its own thread; this side waits for either a shutdown
// signal (managed unmount, retried until it succeeds) or the session ending
// on its own (someone ran `umount`).

use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::signal::unix::{SignalKind, signal};
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use super::adapter::{CacheTimeouts, FuseAdapter};
use super::backend::DmfsBackend;
use super::interface::FilesystemInterface;
use crate::config::{Config, FuseConfig, UnmountConfig};
use crate::context::MountContext;
use crate::remote::{NamespaceNaming, RemoteError, RemoteStore};

/// Mount options for FUSE filesystem
#[derive(Debug, Clone)]
pub struct MountOptions {
    /// Filesystem name (for mtab)
    pub fsname: String,

    /// Filesystem subtype, shown as `fuse.<subtype>`
    pub subtype: String,

    /// Allow other users to access the filesystem
    pub allow_other: bool,

    pub timeouts: CacheTimeouts,
}

impl Default for MountOptions {
    fn default() -> Self {
        Self::from_config(&FuseConfig::default())
    }
}

impl MountOptions {
    pub fn from_config(config: &FuseConfig) -> Self {
        Self {
            fsname: config.fsname.clone(),
            subtype: "dmfs".to_string(),
            allow_other: config.allow_other,
            timeouts: CacheTimeouts {
                entry: Duration::from_millis(config.entry_timeout_ms),
                attr: Duration::from_millis(config.attr_timeout_ms),
            },
        }
    }

    /// Convert to fuser mount options
    pub fn to_fuser_options(&self) -> Vec<fuser::MountOption> {
        let mut options = vec![
            fuser::MountOption::FSName(self.fsname.clone()),
            fuser::MountOption::Subtype(self.subtype.clone()),
        ];

        if self.allow_other {
            options.push(fuser::MountOption::AllowOther);
        }

        options
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MountError {
    #[error("Cannot prepare mount point {}: {source}", path.display())]
    MountPoint {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Mount point is not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error("Remote is not reachable: {0}")]
    Unreachable(#[source] RemoteError),

    #[error("Filesystem server failed: {0}")]
    Server(#[source] io::Error),

    #[error("Filesystem session thread exited without reporting")]
    SessionLost,

    #[error("Cannot install signal handlers: {0}")]
    Signals(#[source] io::Error),

    #[error("Gave up unmounting after {attempts} attempts: {source}")]
    UnmountGaveUp {
        attempts: u32,
        #[source]
        source: io::Error,
    },
}

/// How a mount came to an end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MountOutcome {
    /// A shutdown signal arrived and the managed unmount succeeded.
    Interrupted { unmount_attempts: u32 },
    /// The session ended without being asked to, e.g. `umount` from a shell.
    ExternalUnmount,
}

/// Something that can ask the kernel to detach the mount.
pub trait Unmounter: Send {
    fn unmount(&mut self) -> io::Result<()>;
}

impl Unmounter for fuser::SessionUnmounter {
    fn unmount(&mut self) -> io::Result<()> {
        fuser::SessionUnmounter::unmount(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub interval: Duration,
    /// `None` retries until the unmount succeeds.
    pub max_attempts: Option<u32>,
}

impl RetryPolicy {
    pub const fn forever(interval: Duration) -> Self {
        Self { interval, max_attempts: None }
    }

    pub const fn bounded(interval: Duration, max_attempts: u32) -> Self {
        Self { interval, max_attempts: Some(max_attempts) }
    }

    pub fn from_config(config: &UnmountConfig) -> Self {
        Self {
            interval: Duration::from_secs(config.retry_interval_secs),
            max_attempts: config.max_attempts,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::forever(Duration::from_secs(3))
    }
}

/// Call `unmounter` until it succeeds, sleeping `policy.interval` between attempts.
///
/// Returns the number of attempts made, the last one being the successful one.
pub async fn unmount_with_retry<U>(unmounter: &mut U, policy: &RetryPolicy) -> Result<u32, MountError>
where
    U: Unmounter + ?Sized,
{
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        match unmounter.unmount() {
            Ok(()) => {
                info!(attempt, "filesystem unmounted");
                return Ok(attempt);
            }
            Err(source) if policy.max_attempts.is_some_and(|max| attempt >= max) => {
                error!(attempt, error = %source, "giving up on unmount");
                return Err(MountError::UnmountGaveUp { attempts: attempt, source });
            }
            Err(err) => {
                warn!(attempt, error = %err, retry_in = ?policy.interval, "unmount failed, retrying");
                tokio::time::sleep(policy.interval).await;
            }
        }
    }
}

/// Wait for the mount to end.
///
/// `session_ended` fires when the session thread returns. If `shutdown` completes
/// first, pending operations are cancelled through `cancel` and the mount is
/// detached with [`unmount_with_retry`]; this returns only after that succeeded
/// and the session has wound down.
pub async fn supervise<U, S>(
    mut session_ended: oneshot::Receiver<io::Result<()>>,
    mut unmounter: U,
    shutdown: S,
    policy: RetryPolicy,
    cancel: CancellationToken,
) -> Result<MountOutcome, MountError>
where
    U: Unmounter,
    S: Future<Output = ()>,
{
    tokio::pin!(shutdown);

    tokio::select! {
        biased;
        ended = &mut session_ended => {
            cancel.cancel();
            ended.map_err(|_| MountError::SessionLost)?.map_err(MountError::Server)?;
            info!("filesystem was unmounted externally");
            return Ok(MountOutcome::ExternalUnmount);
        }
        () = &mut shutdown => {}
    }

    info!("shutdown requested, unmounting");
    cancel.cancel();
    let unmount_attempts = unmount_with_retry(&mut unmounter, &policy).await?;

    match session_ended.await {
        Ok(Ok(())) => {}
        Ok(Err(err)) => warn!(error = %err, "filesystem session ended with an error"),
        Err(_) => warn!("filesystem session thread exited without reporting"),
    }

    Ok(MountOutcome::Interrupted { unmount_attempts })
}

/// Make sure `path` is a directory, creating it owner-only if it is missing.
pub fn create_mountpoint(path: &Path) -> Result<(), MountError> {
    match std::fs::metadata(path) {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(MountError::NotADirectory(path.to_path_buf())),
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            nix::unistd::mkdir(path, nix::sys::stat::Mode::S_IRWXU).map_err(|errno| {
                MountError::MountPoint { path: path.to_path_buf(), source: errno.into() }
            })?;
            info!(path = %path.display(), "created mount point");
            Ok(())
        }
        Err(source) => Err(MountError::MountPoint { path: path.to_path_buf(), source }),
    }
}

/// Resolves on the first SIGINT or SIGTERM.
pub fn shutdown_signal() -> io::Result<impl Future<Output = ()> + Send + 'static> {
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;

    Ok(async move {
        tokio::select! {
            _ = sigint.recv() => info!(signal = "SIGINT", "received signal"),
            _ = sigterm.recv() => info!(signal = "SIGTERM", "received signal"),
        }
    })
}

/// Start a fuser session on a dedicated thread.
///
/// The adapter owns a tokio runtime, so it is built and dropped on that thread
/// rather than inside the caller's runtime.
async fn spawn_session(
    backend: Arc<dyn FilesystemInterface>,
    mount_point: PathBuf,
    options: MountOptions,
    cancel: CancellationToken,
) -> Result<(fuser::SessionUnmounter, oneshot::Receiver<io::Result<()>>), MountError> {
    let (ready_tx, ready_rx) = oneshot::channel();
    let (ended_tx, ended_rx) = oneshot::channel();

    std::thread::Builder::new()
        .name("dmfs-session".to_string())
        .spawn(move || {
            let session = FuseAdapter::new(backend, cancel, options.timeouts).and_then(|adapter| {
                fuser::Session::new(adapter, &mount_point, &options.to_fuser_options())
            });
            let mut session = match session {
                Ok(session) => session,
                Err(err) => {
                    let _ = ready_tx.send(Err(err));
                    return;
                }
            };

            let _ = ready_tx.send(Ok(session.unmount_callable()));
            let _ = ended_tx.send(session.run());
        })
        .map_err(MountError::Server)?;

    let unmounter = ready_rx.await.map_err(|_| MountError::SessionLost)?.map_err(MountError::Server)?;
    Ok((unmounter, ended_rx))
}

pub struct MountSupervisor {
    config: Arc<Config>,
    remote: Arc<dyn RemoteStore>,
    naming: Arc<dyn NamespaceNaming>,
}

impl MountSupervisor {
    pub fn new(
        config: Arc<Config>,
        remote: Arc<dyn RemoteStore>,
        naming: Arc<dyn NamespaceNaming>,
    ) -> Self {
        Self { config, remote, naming }
    }

    /// Mount and block until SIGINT/SIGTERM or an external unmount.
    pub async fn mount(&self) -> Result<MountOutcome, MountError> {
        let shutdown = shutdown_signal().map_err(MountError::Signals)?;
        self.mount_until(shutdown).await
    }

    /// Mount and block until `shutdown` resolves or the mount is removed externally.
    ///
    /// Nothing is mounted if the mount point cannot be prepared or the remote
    /// does not answer the probe.
    pub async fn mount_until<S>(&self, shutdown: S) -> Result<MountOutcome, MountError>
    where
        S: Future<Output = ()>,
    {
        let mount_point = self.config.fuse.mount_point.clone();
        create_mountpoint(&mount_point)?;

        self.remote.probe_reachable().await.map_err(|err| {
            error!(url = %self.config.remote.url, error = %err, "remote probe failed, not mounting");
            MountError::Unreachable(err)
        })?;
        info!(url = %self.config.remote.url, "remote reachable");

        let ctx = Arc::new(MountContext::new(
            Arc::clone(&self.remote),
            Arc::clone(&self.naming),
            Arc::clone(&self.config),
        ));
        let backend: Arc<dyn FilesystemInterface> = Arc::new(DmfsBackend::new(ctx));

        let cancel = CancellationToken::new();
        let options = MountOptions::from_config(&self.config.fuse);
        tracing::debug!(?options, "mount options");

        let (unmounter, session_ended) =
            spawn_session(backend, mount_point.clone(), options, cancel.clone()).await?;
        info!(mount_point = %mount_point.display(), "filesystem mounted");

        supervise(
            session_ended,
            unmounter,
            shutdown,
            RetryPolicy::from_config(&self.config.unmount),
            cancel,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mount_options_default() {
        let options = MountOptions::default();
        assert_eq!(options.fsname, "dmanager");
        assert_eq!(options.subtype, "dmfs");
        assert!(!options.allow_other);
        assert_eq!(options.timeouts, CacheTimeouts::default());
    }

    #[test]
    fn test_mount_options_to_fuser() {
        let options = MountOptions { allow_other: true, ..Default::default() };
        let fuser_options = options.to_fuser_options();

        assert!(fuser_options.contains(&fuser::MountOption::AllowOther));
        assert!(fuser_options.contains(&fuser::MountOption::FSName("dmanager".to_string())));
        assert!(fuser_options.contains(&fuser::MountOption::Subtype("dmfs".to_string())));
    }

    #[test]
    fn test_mount_options_without_allow_other() {
        let fuser_options = MountOptions::default().to_fuser_options();
        assert!(!fuser_options.contains(&fuser::MountOption::AllowOther));
    }

    #[test]
    fn test_mount_options_from_config_timeouts() {
        let config = FuseConfig { entry_timeout_ms: 250, attr_timeout_ms: 5000, ..Default::default() };
        let options = MountOptions::from_config(&config);
        assert_eq!(options.timeouts.entry, Duration::from_millis(250));
        assert_eq!(options.timeouts.attr, Duration::from_secs(5));
    }

    #[test]
    fn test_retry_policy_from_config() {
        let policy = RetryPolicy::from_config(&UnmountConfig::default());
        assert_eq!(policy, RetryPolicy::forever(Duration::from_secs(3)));
        assert_eq!(policy, RetryPolicy::default());

        let bounded = RetryPolicy::from_config(&UnmountConfig {
            retry_interval_secs: 1,
            max_attempts: Some(4),
        });
        assert_eq!(bounded, RetryPolicy::bounded(Duration::from_secs(1), 4));
    }

    #[test]
    fn test_mount_error_display() {
        let err = MountError::NotADirectory(PathBuf::from("/tmp/file"));
        assert_eq!(err.to_string(), "Mount point is not a directory: /tmp/file");

        let err = MountError::UnmountGaveUp {
            attempts: 3,
            source: io::Error::from_raw_os_error(libc::EBUSY),
        };
        assert!(err.to_string().starts_with("Gave up unmounting after 3 attempts"));
    }
}
