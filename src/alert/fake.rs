//! Recording [`Notifier`] for tests.

use async_trait::async_trait;
use std::sync::Mutex;

use super::{Alert, Notifier, NotifyError};

#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<Alert>>,
    /// Status returned for every call when set.
    pub fail_with: Option<u16>,
}

impl RecordingNotifier {
    pub fn failing(status: u16) -> Self {
        Self {
            sent: Mutex::default(),
            fail_with: Some(status),
        }
    }

    pub fn count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, alert: &Alert) -> Result<(), NotifyError> {
        self.sent.lock().unwrap().push(alert.clone());
        match self.fail_with {
            Some(status) => Err(NotifyError::Status(status)),
            None => Ok(()),
        }
    }
}
