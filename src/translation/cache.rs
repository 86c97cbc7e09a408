/*!
 * Translation caching functionality.
 *
 * Identical text translated with the same languages and register is only
 * sent to the collaborator once.
 */

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use log::debug;
use parking_lot::RwLock;

use crate::document::outline::truncate_for_display;
use crate::errors::TranslationError;

use super::{Register, Translator};

/// Cache key combining source text, languages and register
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    source_text: String,
    source_language: String,
    target_language: String,
    register: Register,
}

impl CacheKey {
    fn new(source_text: &str, source_language: &str, target_language: &str, register: Register) -> Self {
        Self {
            source_text: source_text.to_string(),
            source_language: source_language.to_string(),
            target_language: target_language.to_string(),
            register,
        }
    }
}

/// Hit and miss counters
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CacheStats {
    pub hits: usize,
    pub misses: usize,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total > 0 {
            self.hits as f64 / total as f64
        } else {
            0.0
        }
    }
}

/// Translation cache for storing and retrieving translations
#[derive(Debug, Clone)]
pub struct TranslationCache {
    cache: Arc<RwLock<HashMap<CacheKey, String>>>,
    stats: Arc<RwLock<CacheStats>>,
    enabled: bool,
}

impl TranslationCache {
    pub fn new(enabled: bool) -> Self {
        Self {
            cache: Arc::new(RwLock::new(HashMap::new())),
            stats: Arc::new(RwLock::new(CacheStats::default())),
            enabled,
        }
    }

    /// Get a translation from the cache
    pub fn get(
        &self,
        source_text: &str,
        source_language: &str,
        target_language: &str,
        register: Register,
    ) -> Option<String> {
        if !self.enabled {
            return None;
        }

        let key = CacheKey::new(source_text, source_language, target_language, register);
        let found = self.cache.read().get(&key).cloned();

        let mut stats = self.stats.write();
        if found.is_some() {
            stats.hits += 1;
            debug!("Cache hit for '{}' ({})", truncate_for_display(source_text, 30), register);
        } else {
            stats.misses += 1;
        }

        found
    }

    /// Store a translation in the cache
    pub fn store(
        &self,
        source_text: &str,
        source_language: &str,
        target_language: &str,
        register: Register,
        translation: &str,
    ) {
        if !self.enabled {
            return;
        }

        let key = CacheKey::new(source_text, source_language, target_language, register);
        self.cache.write().insert(key, translation.to_string());
    }

    pub fn stats(&self) -> CacheStats {
        *self.stats.read()
    }

    pub fn clear(&self) {
        self.cache.write().clear();
        *self.stats.write() = CacheStats::default();
        debug!("Translation cache cleared");
    }

    pub fn len(&self) -> usize {
        self.cache.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.read().is_empty()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

impl Default for TranslationCache {
    fn default() -> Self {
        Self::new(true)
    }
}

/// Memoizing wrapper around another translator
pub struct CachedTranslator {
    inner: Arc<dyn Translator>,
    cache: TranslationCache,
}

impl CachedTranslator {
    pub fn new(inner: Arc<dyn Translator>, cache: TranslationCache) -> Self {
        Self { inner, cache }
    }

    pub fn cache(&self) -> &TranslationCache {
        &self.cache
    }
}

#[async_trait]
impl Translator for CachedTranslator {
    async fn translate(
        &self,
        text: &str,
        source_language: &str,
        target_language: &str,
        register: Register,
    ) -> Result<String, TranslationError> {
        if let Some(hit) = self.cache.get(text, source_language, target_language, register) {
            return Ok(hit);
        }

        let translated = self
            .inner
            .translate(text, source_language, target_language, register)
            .await?;
        self.cache
            .store(text, source_language, target_language, register, &translated);
        Ok(translated)
    }

    fn name(&self) -> String {
        format!("cached {}", self.inner.name())
    }
}
