//! Operator-facing error notifications.
//!
//! The request wrapper reports failures here before handing them back to the
//! caller. Bursts (a bulk batch hitting a dead server, say) are collapsed so
//! at most one notification is shown per throttle window.

use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Minimum gap between two shown notifications.
pub const ERROR_THROTTLE: Duration = Duration::from_millis(2500);

pub trait Notifier: Send + Sync {
    fn error(&self, message: &str);
}

impl<N: Notifier + ?Sized> Notifier for std::sync::Arc<N> {
    fn error(&self, message: &str) {
        (**self).error(message);
    }
}

/// Emits notifications as `tracing` warnings.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn error(&self, message: &str) {
        tracing::warn!(target: "fieldops::notify", "{message}");
    }
}

/// Admission gate: one event per window.
#[derive(Debug)]
pub struct ErrorThrottle {
    window: Duration,
    last: Mutex<Option<Instant>>,
}

impl ErrorThrottle {
    #[must_use]
    pub const fn new(window: Duration) -> Self {
        Self {
            window,
            last: Mutex::new(None),
        }
    }

    /// Whether an event at `now` may be shown. Admitting it starts a new window.
    pub fn admit_at(&self, now: Instant) -> bool {
        let Ok(mut last) = self.last.lock() else {
            return true;
        };
        let open = last.is_none_or(|prev| now.saturating_duration_since(prev) >= self.window);
        if open {
            *last = Some(now);
        }
        open
    }

    pub fn admit(&self) -> bool {
        self.admit_at(Instant::now())
    }
}

impl Default for ErrorThrottle {
    fn default() -> Self {
        Self::new(ERROR_THROTTLE)
    }
}

/// Wraps another notifier with an [`ErrorThrottle`].
pub struct ThrottledNotifier<N> {
    inner: N,
    throttle: ErrorThrottle,
}

impl<N: Notifier> ThrottledNotifier<N> {
    pub fn new(inner: N) -> Self {
        Self {
            inner,
            throttle: ErrorThrottle::default(),
        }
    }

    pub const fn with_window(inner: N, window: Duration) -> Self {
        Self {
            inner,
            throttle: ErrorThrottle::new(window),
        }
    }
}

impl<N: Notifier> Notifier for ThrottledNotifier<N> {
    fn error(&self, message: &str) {
        if self.throttle.admit() {
            self.inner.error(message);
        } else {
            tracing::debug!(target: "fieldops::notify", "suppressed: {message}");
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testing::RecordingNotifier;
    use super::*;
    use std::sync::Arc;

    #[test]
    fn throttle_admits_one_event_per_window() {
        let throttle = ErrorThrottle::default();
        let t0 = Instant::now();

        assert!(throttle.admit_at(t0));
        assert!(!throttle.admit_at(t0 + Duration::from_millis(100)));
        assert!(!throttle.admit_at(t0 + Duration::from_millis(2499)));
        assert!(throttle.admit_at(t0 + Duration::from_millis(2500)));
        assert!(!throttle.admit_at(t0 + Duration::from_millis(3000)));
    }

    #[test]
    fn throttled_notifier_collapses_bursts() {
        let recorder = Arc::new(RecordingNotifier::default());
        let notifier = ThrottledNotifier::new(Arc::clone(&recorder));

        for i in 0..10 {
            notifier.error(&format!("boom {i}"));
        }

        assert_eq!(recorder.taken(), vec!["boom 0".to_string()]);
    }

    #[test]
    fn zero_window_passes_everything() {
        let recorder = Arc::new(RecordingNotifier::default());
        let notifier = ThrottledNotifier::with_window(Arc::clone(&recorder), Duration::ZERO);
        notifier.error("a");
        notifier.error("b");
        assert_eq!(recorder.taken().len(), 2);
    }
}
