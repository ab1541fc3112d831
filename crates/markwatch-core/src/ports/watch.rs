//! RAII subscription handle shared by the observable ports

/// RAII handle for an active subscription
///
/// When this handle is dropped, the associated watch or subscription is
/// stopped and its resources released.
///
/// ## Usage
///
/// ```ignore
/// let handle = provider.watch(observer).await?;
/// // ... events are delivered ...
/// drop(handle); // subscription is stopped
/// ```
pub struct WatchHandle {
    /// Callback to invoke when the handle is dropped to stop the watch
    stop_fn: Option<Box<dyn FnOnce() + Send>>,
}

impl WatchHandle {
    /// Creates a new WatchHandle with the given stop callback
    ///
    /// The callback will be invoked exactly once when the handle is dropped.
    pub fn new(stop_fn: impl FnOnce() + Send + 'static) -> Self {
        Self {
            stop_fn: Some(Box::new(stop_fn)),
        }
    }

    /// Creates a handle with nothing to stop
    pub fn noop() -> Self {
        Self { stop_fn: None }
    }

    /// Explicitly stops the watch, consuming the handle
    pub fn stop(mut self) {
        if let Some(stop_fn) = self.stop_fn.take() {
            stop_fn();
        }
    }
}

impl Drop for WatchHandle {
    fn drop(&mut self) {
        if let Some(stop_fn) = self.stop_fn.take() {
            stop_fn();
        }
    }
}

impl std::fmt::Debug for WatchHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchHandle")
            .field("active", &self.stop_fn.is_some())
            .finish()
    }
}
