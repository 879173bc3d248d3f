//! Last successful decode, readable from any thread without locking

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwapOption;

use crate::decode::{CodeResult, Symbology};

/// Last-write-wins cell for decode results.
///
/// Written only by the decode worker. Failed decodes never clear it.
#[derive(Default)]
pub struct LatestResult {
    current: ArcSwapOption<CodeResult>,
    generation: AtomicU64,
}

impl LatestResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, result: CodeResult) {
        self.current.store(Some(Arc::new(result)));
        self.generation.fetch_add(1, Ordering::Release);
    }

    pub fn latest(&self) -> Option<Arc<CodeResult>> {
        self.current.load_full()
    }

    pub fn decoded_text(&self) -> Option<String> {
        self.current.load().as_deref().map(|r| r.text.clone())
    }

    pub fn decoded_format(&self) -> Option<Symbology> {
        self.current.load().as_deref().map(|r| r.format)
    }

    /// Bumped on every publish; lets pollers detect a fresh result even when
    /// the same code is decoded twice.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }
}
