use core::time::Duration;

/// Abstracts how the result table and worker store wait between attempts.
///
/// Production code uses [`TokioSleep`]. Tests swap in [`TokioYield`] so
/// batching and backoff run without wall-clock delays.
pub trait SleepProvider: Send + Sync + 'static {
    fn sleep_for(dur: Duration) -> impl Future<Output = ()> + Send;
}

/// An implementation of [`SleepProvider`] using Tokio's timer.
pub struct TokioSleep;
impl SleepProvider for TokioSleep {
    async fn sleep_for(dur: Duration) {
        tokio::time::sleep(dur).await
    }
}

/// An implementation of [`SleepProvider`] that yields to the scheduler
/// instead of sleeping.
///
/// Anything already queued on the runtime gets a chance to run, which keeps
/// batching observable in tests while removing the delay itself.
pub struct TokioYield;
impl SleepProvider for TokioYield {
    async fn sleep_for(_dur: Duration) {
        tokio::task::yield_now().await
    }
}
