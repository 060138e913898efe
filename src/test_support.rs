use tokio::sync::Mutex as AsyncMutex;

/// Process-wide lock serializing tests that touch environment variables.
/// Sync tests take it with `.blocking_lock()`, async tests with `.lock().await`.
pub static ENV_LOCK: AsyncMutex<()> = AsyncMutex::const_new(());
