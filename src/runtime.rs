//! Runtime-agnostic spawn/sleep, selectable between `async-std` and
//! `tokio` via the crate's `async-std-runtime`/`tokio-runtime` features.

use std::future::Future;
use std::time::Duration;

use futures_timer::Delay;

/// Spawns a future onto the selected async runtime, detached.
pub fn spawn<F>(fut: F)
where
    F: Future<Output = ()> + Send + 'static,
{
    cfg_if::cfg_if! {
        if #[cfg(feature = "async-std-runtime")] {
            async_std::task::spawn(fut);
        } else if #[cfg(feature = "tokio-runtime")] {
            tokio::spawn(fut);
        } else {
            compile_error!("either `async-std-runtime` or `tokio-runtime` must be enabled");
        }
    }
}

/// Sleeps for `dur`. Implemented on `futures-timer`, which is runtime
/// agnostic, so both feature sets share this path.
pub async fn sleep(dur: Duration) {
    Delay::new(dur).await;
}

/// Runs `fut` to completion, or returns `Err(Elapsed)` if `dur` elapses
/// first.
pub async fn timeout<F: Future>(dur: Duration, fut: F) -> Result<F::Output, Elapsed> {
    let fut = Box::pin(fut);
    let delay = Delay::new(dur);
    match futures::future::select(fut, delay).await {
        futures::future::Either::Left((out, _)) => Ok(out),
        futures::future::Either::Right(_) => Err(Elapsed),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Elapsed;

impl std::fmt::Display for Elapsed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("deadline elapsed")
    }
}

impl std::error::Error for Elapsed {}
