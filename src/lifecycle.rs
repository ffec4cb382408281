use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::context::Context;
use crate::engine::Engine;
use crate::error::{self, Error, Result};

/// Owns the engine handle and its initialized flag.
///
/// `init`, `shutdown` and `is_initialized` all serialize through one lock, so no caller can
/// observe a half-initialized engine. Collection calls only take the lock for the flag check
/// and then call the engine without holding it.
pub struct Lifecycle {
    engine: Arc<dyn Engine>,
    initialized: Mutex<bool>,
}

impl std::fmt::Debug for Lifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lifecycle")
            .field("platform", &self.engine.platform())
            .field("initialized", &self.is_initialized())
            .finish()
    }
}

impl Lifecycle {
    pub fn new(engine: Arc<dyn Engine>) -> Self {
        Self {
            engine,
            initialized: Mutex::new(false),
        }
    }

    fn state(&self) -> MutexGuard<'_, bool> {
        self.initialized
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Initializes the engine. A second call while initialized is a no-op.
    ///
    /// # Errors
    ///
    /// Returns the translated engine status if the engine refuses to start; the manager then
    /// stays uninitialized.
    pub fn init(&self) -> Result<()> {
        let mut initialized = self.state();
        if *initialized {
            return Ok(());
        }

        error::translate(&self.engine.init())?;
        *initialized = true;
        log::debug!("probe engine initialized on {}", self.engine.platform());
        Ok(())
    }

    /// Releases the engine. Safe to call when not initialized.
    pub fn shutdown(&self) {
        let mut initialized = self.state();
        if !*initialized {
            return;
        }

        self.engine.shutdown();
        *initialized = false;
        log::debug!("probe engine shut down");
    }

    pub fn is_initialized(&self) -> bool {
        *self.state()
    }

    /// # Errors
    ///
    /// Returns [`Error::NotInitialized`] unless [`Lifecycle::init`] has succeeded and no
    /// shutdown followed.
    pub fn check_initialized(&self) -> Result<()> {
        if self.is_initialized() {
            Ok(())
        } else {
            Err(Error::NotInitialized)
        }
    }

    /// The guard every collection entry point runs before touching the engine: the context
    /// first, then the initialized flag.
    ///
    /// # Errors
    ///
    /// Returns the context error or [`Error::NotInitialized`].
    pub fn validate(&self, ctx: &Context) -> Result<&dyn Engine> {
        if let Some(err) = ctx.err() {
            return Err(err.into());
        }
        self.check_initialized()?;
        Ok(self.engine.as_ref())
    }

    /// Returns the engine after the initialization check, for calls that take no context.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotInitialized`].
    pub fn engine(&self) -> Result<&dyn Engine> {
        self.check_initialized()?;
        Ok(self.engine.as_ref())
    }

    pub fn platform(&self) -> &'static str {
        self.engine.platform()
    }

    pub fn quota_supported(&self) -> bool {
        self.engine.quota_supported()
    }
}

impl Drop for Lifecycle {
    fn drop(&mut self) {
        self.shutdown();
    }
}
