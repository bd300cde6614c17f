use std::fmt;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use assetpipe::notifier::{Notification, NotificationKind, Notifier};
use assetpipe::transform::images::{CompressError, CompressionService};

/// Keeps every notification for later assertions.
#[derive(Default)]
pub struct RecordingNotifier {
    seen: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn all(&self) -> Vec<Notification> {
        self.seen.lock().unwrap().clone()
    }

    pub fn successes(&self) -> Vec<String> {
        self.messages(NotificationKind::Success)
    }

    pub fn failures(&self) -> Vec<String> {
        self.messages(NotificationKind::Failure)
    }

    fn messages(&self, kind: NotificationKind) -> Vec<String> {
        self.all()
            .into_iter()
            .filter(|n| n.kind == kind)
            .map(|n| n.message)
            .collect()
    }
}

impl fmt::Debug for RecordingNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordingNotifier").finish_non_exhaustive()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: &Notification) {
        self.seen.lock().unwrap().push(notification.clone());
    }

    fn title(&self) -> &str {
        "assetpipe"
    }
}

/// Compression stand-in: strips trailing bytes and counts calls.
#[derive(Default)]
pub struct StubCompressor {
    calls: AtomicUsize,
    submitted: Mutex<Vec<String>>,
    fail_on: Mutex<Option<String>>,
}

impl StubCompressor {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn submitted(&self) -> Vec<String> {
        self.submitted.lock().unwrap().clone()
    }

    /// Make compression of `file` fail with a service rejection.
    pub fn fail_on(&self, file: &str) {
        *self.fail_on.lock().unwrap() = Some(file.to_string());
    }
}

impl CompressionService for StubCompressor {
    fn compress(&self, file: &str, data: &[u8]) -> Result<Vec<u8>, CompressError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.submitted.lock().unwrap().push(file.to_string());
        if self.fail_on.lock().unwrap().as_deref() == Some(file) {
            return Err(CompressError::Rejected {
                file: file.to_string(),
                status: 415,
                message: "unsupported media type".to_string(),
            });
        }
        Ok(data[..data.len() / 2].to_vec())
    }
}
