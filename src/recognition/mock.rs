// Recording recognizer for tests

use super::source::{RecognizerConfig, RecognizerError, SpeechRecognizer};
use parking_lot::Mutex;
use std::sync::Arc;

#[derive(Debug, Default)]
pub struct MockCalls {
    pub starts: u32,
    pub stops: u32,
    /// Number of upcoming starts that fail
    pub failing_starts: u32,
    pub last_config: Option<RecognizerConfig>,
}

/// Mock recognizer whose call log is shared across clones
#[derive(Debug, Clone, Default)]
pub struct MockRecognizer {
    pub calls: Arc<Mutex<MockCalls>>,
}

impl MockRecognizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starts(&self) -> u32 {
        self.calls.lock().starts
    }

    pub fn stops(&self) -> u32 {
        self.calls.lock().stops
    }

    pub fn fail_next_starts(&self, count: u32) {
        self.calls.lock().failing_starts = count;
    }
}

impl SpeechRecognizer for MockRecognizer {
    fn start(&mut self, config: &RecognizerConfig) -> Result<(), RecognizerError> {
        let mut calls = self.calls.lock();
        calls.last_config = Some(config.clone());
        if calls.failing_starts > 0 {
            calls.failing_starts -= 1;
            return Err(RecognizerError::StartFailed("device busy".to_string()));
        }
        calls.starts += 1;
        Ok(())
    }

    fn stop(&mut self) {
        self.calls.lock().stops += 1;
    }
}
