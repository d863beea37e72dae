//! Field observation hooks.
//!
//! An [`Observer`] is an injectable capability record passed into a call —
//! there is no global subscriber list. Hook failures are reported through
//! the `log` facade and never change the outcome of the call that fired
//! them.

use wirebind_core::Value;

/// Identity and value of the field currently being written or read.
#[derive(Debug)]
pub struct FieldEvent<'a> {
    /// Dotted/bracketed path from the root, e.g. `packet.items[2]`.
    pub path: &'a str,
    /// The computed or live value; `None` before a read completes.
    pub value: Option<&'a Value>,
}

pub type HookFn =
    dyn Fn(&FieldEvent<'_>) -> Result<(), Box<dyn std::error::Error + Send + Sync>> + Send + Sync;

/// Optional before/after callbacks fired around each field.
#[derive(Default)]
pub struct Observer {
    pub before: Option<Box<HookFn>>,
    pub after: Option<Box<HookFn>>,
}

impl Observer {
    pub fn on_before(
        hook: impl Fn(&FieldEvent<'_>) -> Result<(), Box<dyn std::error::Error + Send + Sync>>
        + Send
        + Sync
        + 'static,
    ) -> Self {
        Self {
            before: Some(Box::new(hook)),
            after: None,
        }
    }

    pub fn on_after(
        hook: impl Fn(&FieldEvent<'_>) -> Result<(), Box<dyn std::error::Error + Send + Sync>>
        + Send
        + Sync
        + 'static,
    ) -> Self {
        Self {
            before: None,
            after: Some(Box::new(hook)),
        }
    }

    pub(crate) fn fire_before(&self, path: &str, value: Option<&Value>) {
        if let Some(hook) = &self.before
            && let Err(e) = hook(&FieldEvent { path, value })
        {
            log::warn!("before-field hook failed at '{path}': {e}");
        }
    }

    pub(crate) fn fire_after(&self, path: &str, value: Option<&Value>) {
        if let Some(hook) = &self.after
            && let Err(e) = hook(&FieldEvent { path, value })
        {
            log::warn!("after-field hook failed at '{path}': {e}");
        }
    }
}
