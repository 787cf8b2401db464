//! The runtime which drives connection operations.
//!
//! Every public connection call is one synchronous unit of work: the calling thread blocks
//! inside [`Reactor::block_on`] until the operation's future has completed or failed.

use std::fmt;
use std::future::Future;
use std::io;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt as _;

use crate::client::{Error, ErrorKind};

/// A cloneable handle to a current-thread tokio runtime.
///
/// Clones share the same runtime. Connections on different threads should normally use
/// separate reactors, though sharing one is also sound.
///
/// The last clone may be dropped anywhere, including inside another runtime's task: in that
/// case the runtime is shut down in the background instead of waiting for its blocking pool.
#[derive(Clone)]
pub struct Reactor {
    inner: Arc<Inner>,
}

struct Inner {
    handle: tokio::runtime::Handle,
    runtime: Option<tokio::runtime::Runtime>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        let Some(runtime) = self.runtime.take() else {
            return;
        };

        if tokio::runtime::Handle::try_current().is_ok() {
            tracing::trace!("reactor dropped inside an asynchronous context");
            runtime.shutdown_background();
        } else {
            drop(runtime);
        }
    }
}

impl fmt::Debug for Reactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reactor").finish()
    }
}

impl Reactor {
    /// Build a new current-thread runtime with I/O and timers enabled.
    pub fn new() -> io::Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .thread_name("wsdriver-reactor")
            .build()?;
        Ok(Self::from_runtime(runtime))
    }

    /// Wrap an existing runtime.
    pub fn from_runtime(runtime: tokio::runtime::Runtime) -> Self {
        Self {
            inner: Arc::new(Inner {
                handle: runtime.handle().clone(),
                runtime: Some(runtime),
            }),
        }
    }

    /// A handle to the underlying runtime.
    pub fn handle(&self) -> &tokio::runtime::Handle {
        &self.inner.handle
    }

    /// Drive `future` to completion on the calling thread.
    ///
    /// Fails with [`ErrorKind::Scheduling`] instead of panicking when called from within an
    /// async context, or when the future itself panics.
    pub fn block_on<F>(&self, future: F) -> Result<F::Output, Error>
    where
        F: Future,
    {
        if tokio::runtime::Handle::try_current().is_ok() {
            return Err(Error::scheduling(
                "reactor cannot be driven from within an asynchronous context",
            ));
        }

        let Some(runtime) = self.inner.runtime.as_ref() else {
            return Err(Error::scheduling("reactor has shut down"));
        };

        runtime
            .block_on(AssertUnwindSafe(future).catch_unwind())
            .map_err(|panic| {
                let detail = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                tracing::error!(%detail, "operation panicked inside reactor");
                Error::new(
                    ErrorKind::Scheduling,
                    format!("reactor didn't run correctly: {detail}"),
                )
            })
    }
}
