//! User-facing notifications.

/// Surface for short success/error notices shown to the user.
pub trait Notifier: Send + Sync {
    fn success(&self, message: &str);
    fn error(&self, message: &str);
}

/// Notifier that only writes to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn success(&self, message: &str) {
        tracing::info!("[Notify] {}", message);
    }

    fn error(&self, message: &str) {
        tracing::error!("[Notify] {}", message);
    }
}
