//! Mock Machine Translator for testing
//!
//! This module provides a deterministic, API-free translator for testing
//! the translator session and running the server without an API key.
//!
//! # Example
//!
//! ```ignore
//! use tolk_mt::{MachineTranslator, MockTranslator, MockMode};
//!
//! #[tokio::test]
//! async fn test_translation() {
//!     let mock = MockTranslator::new(MockMode::Suffix);
//!     let result = mock.translate("hello", "English", "French").await.unwrap();
//!     assert_eq!(result, "hello_French");
//! }
//! ```

use crate::error::{MtError, MtResult};
use crate::translator::MachineTranslator;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// Mock translation modes for testing different scenarios
#[derive(Debug, Clone)]
pub enum MockMode {
    /// Append the target language: "hello" → "hello_French"
    Suffix,

    /// Use predefined mappings for realistic translations
    /// (text, target_language) → translation
    Mappings(HashMap<(String, String), String>),

    /// Simulate API errors
    Error(String),

    /// Simulate an exhausted quota
    RateLimited,

    /// No-op: return input unchanged
    NoOp,
}

/// A request the mock received
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockRequest {
    pub text: String,
    pub source_language: String,
    pub target_language: String,
}

/// Mock translator that simulates various translation scenarios
///
/// Clones share mode, delay and the request log, so a test can keep a clone
/// and inspect what the session sent.
#[derive(Debug, Clone)]
pub struct MockTranslator {
    mode: Arc<Mutex<MockMode>>,
    /// Simulated network delay (in milliseconds)
    delay_ms: Arc<AtomicU64>,
    requests: Arc<Mutex<Vec<MockRequest>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MockTranslator {
    /// Create a new MockTranslator with the given mode
    pub fn new(mode: MockMode) -> Self {
        Self::with_delay(mode, 0)
    }

    /// Create a MockTranslator with simulated network delay
    ///
    /// # Example
    ///
    /// ```ignore
    /// let mock = MockTranslator::with_delay(MockMode::Suffix, 50);
    /// // Each translation will have ~50ms delay
    /// ```
    pub fn with_delay(mode: MockMode, delay_ms: u64) -> Self {
        Self {
            mode: Arc::new(Mutex::new(mode)),
            delay_ms: Arc::new(AtomicU64::new(delay_ms)),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Change the mode for subsequent requests
    pub fn set_mode(&self, mode: MockMode) {
        *lock(&self.mode) = mode;
    }

    /// Change the delay for subsequent requests
    pub fn set_delay(&self, delay_ms: u64) {
        self.delay_ms.store(delay_ms, Ordering::SeqCst);
    }

    /// Requests received so far, oldest first
    pub fn requests(&self) -> Vec<MockRequest> {
        lock(&self.requests).clone()
    }

    pub fn call_count(&self) -> usize {
        lock(&self.requests).len()
    }

    /// Apply translation logic based on the mode
    fn apply_translation(&self, text: &str, target: &str) -> MtResult<String> {
        match &*lock(&self.mode) {
            MockMode::Suffix => Ok(format!("{}_{}", text, target)),
            MockMode::Mappings(map) => {
                let key = (text.to_string(), target.to_string());
                Ok(map
                    .get(&key)
                    .cloned()
                    .unwrap_or_else(|| format!("{}_{}", text, target)))
            }
            MockMode::Error(msg) => Err(MtError::TranslationError(msg.clone())),
            MockMode::RateLimited => Err(MtError::RateLimited(
                "You exceeded your current quota".to_string(),
            )),
            MockMode::NoOp => Ok(text.to_string()),
        }
    }
}

#[async_trait]
impl MachineTranslator for MockTranslator {
    async fn translate(
        &self,
        text: &str,
        source_language: &str,
        target_language: &str,
    ) -> MtResult<String> {
        lock(&self.requests).push(MockRequest {
            text: text.to_string(),
            source_language: source_language.to_string(),
            target_language: target_language.to_string(),
        });

        // The delay is read when the request starts
        let delay_ms = self.delay_ms.load(Ordering::SeqCst);
        if delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        }

        self.apply_translation(text, target_language)
    }

    fn provider_name(&self) -> &str {
        "Mock Translator"
    }
}
