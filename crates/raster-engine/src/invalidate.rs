//! Invalidation notifications for externally held caches.
//!
//! Rendering sits outside the engine, but tile caches keyed on cell data
//! must hear about mutations. Blocks carry a hook registry and ping it
//! after every bulk mutation; the engine itself never touches a renderer.

use std::fmt;

/// Callback registry notified when cell values or masking change.
#[derive(Default)]
pub struct InvalidationHooks {
    hooks: Vec<Box<dyn Fn()>>,
}

impl InvalidationHooks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a hook. Hooks run in registration order.
    pub fn register(&mut self, hook: impl Fn() + 'static) {
        self.hooks.push(Box::new(hook));
    }

    /// Invoke every registered hook.
    pub fn notify(&self) {
        for hook in &self.hooks {
            hook();
        }
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }
}

impl fmt::Debug for InvalidationHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InvalidationHooks")
            .field("hooks", &self.hooks.len())
            .finish()
    }
}
