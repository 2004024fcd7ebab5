//! Per-request context handed to the helper operations.
//!
//! Helpers can be called from a web handler (with the caller's address,
//! session flash queue and locale) or from scripts and the CLI, where no
//! request exists. [`RequestContext::resolve`] hides that difference: it
//! falls back to a detached context whose flash messages go nowhere.

use std::sync::{Arc, Mutex};

use crate::i18n::{IdentityLocalizer, Localizer, Translator};

/// Session flash queue of the hosting web framework.
pub trait FlashSink: Send + Sync {
    fn flash(&self, message: &str, queue: &str);
}

/// Discards every message.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullFlash;

impl FlashSink for NullFlash {
    fn flash(&self, _message: &str, _queue: &str) {}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlashMessage {
    pub queue: String,
    pub message: String,
}

/// Keeps messages in memory until they are taken.
#[derive(Debug, Default)]
pub struct MemoryFlash {
    messages: Mutex<Vec<FlashMessage>>,
}

impl MemoryFlash {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Drains and returns the queued messages.
    pub fn take(&self) -> Vec<FlashMessage> {
        self.messages
            .lock()
            .map(|mut messages| std::mem::take(&mut *messages))
            .unwrap_or_default()
    }
}

impl FlashSink for MemoryFlash {
    fn flash(&self, message: &str, queue: &str) {
        if let Ok(mut messages) = self.messages.lock() {
            messages.push(FlashMessage {
                queue: queue.to_string(),
                message: message.to_string(),
            });
        }
    }
}

#[derive(Clone)]
pub struct RequestContext {
    pub ip_addr: Option<String>,
    pub flash: Arc<dyn FlashSink>,
    pub localizer: Arc<dyn Localizer>,
}

impl RequestContext {
    #[must_use]
    pub fn new(ip_addr: Option<String>, flash: Arc<dyn FlashSink>) -> Self {
        Self {
            ip_addr,
            flash,
            localizer: Arc::new(IdentityLocalizer),
        }
    }

    /// Context used when no request is available.
    #[must_use]
    pub fn detached() -> Self {
        Self::new(None, Arc::new(NullFlash))
    }

    #[must_use]
    pub fn with_localizer(mut self, localizer: Arc<dyn Localizer>) -> Self {
        self.localizer = localizer;
        self
    }

    #[must_use]
    pub fn resolve(ctx: Option<&Self>) -> Self {
        ctx.cloned().unwrap_or_else(Self::detached)
    }

    #[must_use]
    pub fn translator(&self) -> Translator {
        Translator::new(self.localizer.clone())
    }

    pub fn flash(&self, message: &str, queue: &str) {
        self.flash.flash(message, queue);
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::detached()
    }
}

impl std::fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestContext")
            .field("ip_addr", &self.ip_addr)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_falls_back_to_detached() {
        let ctx = RequestContext::resolve(None);
        assert!(ctx.ip_addr.is_none());
        // Flashing on a detached context is a no-op, not a panic.
        ctx.flash("ignored", "error");
    }

    #[test]
    fn resolve_keeps_the_given_context() {
        let flash = Arc::new(MemoryFlash::new());
        let ctx = RequestContext::new(Some("10.0.0.1".to_string()), flash.clone());

        let resolved = RequestContext::resolve(Some(&ctx));
        resolved.flash("hello", "info");

        assert_eq!(resolved.ip_addr.as_deref(), Some("10.0.0.1"));
        assert_eq!(
            flash.take(),
            vec![FlashMessage {
                queue: "info".to_string(),
                message: "hello".to_string(),
            }]
        );
        assert!(flash.take().is_empty());
    }
}
