// SPDX-License-Identifier: MIT OR Apache-2.0
//! Request-scoped context plumbing (§2, §5).
//!
//! A [`Context`] flows from the decoded wire envelope into the dispatched
//! method without ever crossing the generic [`crate::dispatcher::Dispatcher`]
//! seam as a distinguished parameter; it rides alongside the method name and
//! params, so a host can thread per-request metadata (a peer address, a
//! deadline, a cancellation flag) through without the core needing to know
//! what that metadata means.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Per-request metadata and cancellation signal.
///
/// Cloning a `Context` is cheap and shares the same cancellation flag; this
/// is how the batch dispatcher (§4.3) hands the *same* context to every
/// synthetic sub-invocation spawned for one batch.
#[derive(Debug, Clone)]
pub struct Context {
    cancelled: Arc<AtomicBool>,
    values: Arc<Vec<(&'static str, String)>>,
}

impl Context {
    /// A fresh, non-cancelled context with no attached values.
    pub fn new() -> Self {
        Context { cancelled: Arc::new(AtomicBool::new(false)), values: Arc::new(Vec::new()) }
    }

    /// Derive a child context carrying one additional key/value pair,
    /// sharing this context's cancellation flag.
    pub fn with_value(&self, key: &'static str, value: impl Into<String>) -> Self {
        let mut values = (*self.values).clone();
        values.push((key, value.into()));
        Context { cancelled: self.cancelled.clone(), values: Arc::new(values) }
    }

    /// Look up the most recently attached value for `key`, if any.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.iter().rev().find(|(k, _)| *k == key).map(|(_, v)| v.as_str())
    }

    /// Mark this context, and every clone sharing its flag, as cancelled.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Whether this context (or an ancestor it was derived from) was cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}
