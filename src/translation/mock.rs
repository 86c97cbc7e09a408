/*!
 * Mock translator for tests and offline runs.
 *
 * - `MockTranslator::working()` - prefixes the text with `[TARGET] `
 * - `MockTranslator::intermittent(n)` - fails every nth request
 * - `MockTranslator::failing()` - always fails
 * - `MockTranslator::failing_on(texts)` - fails only for the given inputs
 */

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::errors::TranslationError;

use super::{Register, Translator};

/// Behavior mode for the mock translator
#[derive(Debug, Clone, PartialEq)]
pub enum MockBehavior {
    /// Always succeeds
    Working,
    /// Fails every Nth request
    Intermittent { fail_every: usize },
    /// Always fails
    Failing,
    /// Fails for these exact inputs only
    FailOn(HashSet<String>),
    /// Returns whitespace
    Empty,
    /// Succeeds after a delay
    Slow { delay_ms: u64 },
}

/// A recorded call
#[derive(Debug, Clone, PartialEq)]
pub struct MockCall {
    pub text: String,
    pub register: Register,
}

/// Deterministic `Translator` stub
#[derive(Debug, Clone)]
pub struct MockTranslator {
    behavior: MockBehavior,
    request_count: Arc<AtomicUsize>,
    calls: Arc<Mutex<Vec<MockCall>>>,
}

impl MockTranslator {
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            request_count: Arc::new(AtomicUsize::new(0)),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn working() -> Self {
        Self::new(MockBehavior::Working)
    }

    pub fn intermittent(fail_every: usize) -> Self {
        Self::new(MockBehavior::Intermittent { fail_every })
    }

    pub fn failing() -> Self {
        Self::new(MockBehavior::Failing)
    }

    pub fn failing_on<I, S>(texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(MockBehavior::FailOn(texts.into_iter().map(Into::into).collect()))
    }

    pub fn empty() -> Self {
        Self::new(MockBehavior::Empty)
    }

    pub fn slow(delay_ms: u64) -> Self {
        Self::new(MockBehavior::Slow { delay_ms })
    }

    /// Requests received so far
    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Calls in arrival order
    pub fn calls(&self) -> Vec<MockCall> {
        self.calls.lock().clone()
    }

    /// Stub output for a text
    pub fn stub_translation(text: &str, target_language: &str) -> String {
        format!("[{}] {}", target_language.to_uppercase(), text)
    }
}

#[async_trait]
impl Translator for MockTranslator {
    async fn translate(
        &self,
        text: &str,
        _source_language: &str,
        target_language: &str,
        register: Register,
    ) -> Result<String, TranslationError> {
        let count = self.request_count.fetch_add(1, Ordering::SeqCst) + 1;
        self.calls.lock().push(MockCall {
            text: text.to_string(),
            register,
        });

        match &self.behavior {
            MockBehavior::Working => Ok(Self::stub_translation(text, target_language)),
            MockBehavior::Intermittent { fail_every } => {
                if *fail_every > 0 && count % fail_every == 0 {
                    Err(TranslationError::Rejected(format!("simulated failure on request {}", count)))
                } else {
                    Ok(Self::stub_translation(text, target_language))
                }
            }
            MockBehavior::Failing => Err(TranslationError::Rejected("simulated failure".to_string())),
            MockBehavior::FailOn(texts) => {
                if texts.contains(text) {
                    Err(TranslationError::Rejected(format!("simulated failure for '{}'", text)))
                } else {
                    Ok(Self::stub_translation(text, target_language))
                }
            }
            MockBehavior::Empty => Ok("   ".to_string()),
            MockBehavior::Slow { delay_ms } => {
                tokio::time::sleep(Duration::from_millis(*delay_ms)).await;
                Ok(Self::stub_translation(text, target_language))
            }
        }
    }

    fn name(&self) -> String {
        "mock".to_string()
    }
}
