use std::sync::Mutex;

use tokio::sync::oneshot;
use tracing::debug;

use crate::models::LatLng;

/// One-shot "next map tap is my location" selector.
///
/// `arm` hands out a receiver; the next `pointer` call resolves it and
/// disarms. Taps while disarmed are ignored.
#[derive(Debug, Default)]
pub struct ManualPicker {
    pending: Mutex<Option<oneshot::Sender<LatLng>>>,
}

impl ManualPicker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm for the next tap. A previously armed request is dropped, which
    /// its receiver observes as cancellation.
    pub fn arm(&self) -> oneshot::Receiver<LatLng> {
        let (tx, rx) = oneshot::channel();
        let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        if pending.replace(tx).is_some() {
            debug!("Manual selection re-armed, previous request superseded");
        }
        rx
    }

    /// Deliver a map tap. Returns true if it was consumed as a location.
    pub fn pointer(&self, at: LatLng) -> bool {
        let sender = self
            .pending
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        match sender {
            Some(tx) => {
                debug!(position = %at, "Map tap used as location");
                // Receiver may be gone if the waiting task was dropped
                tx.send(at).is_ok()
            }
            None => false,
        }
    }

    pub fn is_armed(&self) -> bool {
        self.pending
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .is_some_and(|tx| !tx.is_closed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_single_shot() {
        let picker = ManualPicker::new();
        let rx = picker.arm();
        assert!(picker.is_armed());

        let tap = LatLng::new(36.3412, 139.4488);
        assert!(picker.pointer(tap));
        assert_eq!(rx.await.unwrap(), tap);

        // Second tap has no effect until re-armed
        assert!(!picker.is_armed());
        assert!(!picker.pointer(LatLng::new(36.0, 139.0)));

        let rx = picker.arm();
        let again = LatLng::new(36.3390, 139.4510);
        assert!(picker.pointer(again));
        assert_eq!(rx.await.unwrap(), again);
    }

    #[tokio::test]
    async fn test_rearm_cancels_previous() {
        let picker = ManualPicker::new();
        let first = picker.arm();
        let second = picker.arm();

        assert!(first.await.is_err());
        picker.pointer(LatLng::new(36.34, 139.45));
        assert_eq!(second.await.unwrap(), LatLng::new(36.34, 139.45));
    }

    #[test]
    fn test_tap_without_arming_is_ignored() {
        let picker = ManualPicker::new();
        assert!(!picker.pointer(LatLng::new(36.34, 139.45)));
    }
}
