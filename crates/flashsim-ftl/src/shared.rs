//! Thread-safe handle to a translation engine
//!
//! The engine itself is single-threaded; [`SharedFtl`] serializes requests
//! from several submitters so each one observes the full effect of the
//! previous.

use crate::bast::BastFtl;
use flashsim_common::{Event, FlashController, Result, Status, StatsSnapshot};
use parking_lot::Mutex;
use std::sync::Arc;

/// Cloneable, mutex-guarded [`BastFtl`]
#[derive(Debug)]
pub struct SharedFtl<C> {
    inner: Arc<Mutex<BastFtl<C>>>,
}

impl<C> Clone for SharedFtl<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C: FlashController> SharedFtl<C> {
    pub fn new(engine: BastFtl<C>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(engine)),
        }
    }

    pub fn read(&self, event: &mut Event) -> Result<Status> {
        self.inner.lock().read(event)
    }

    pub fn write(&self, event: &mut Event) -> Result<Status> {
        self.inner.lock().write(event)
    }

    pub fn trim(&self, event: &mut Event) -> Result<Status> {
        self.inner.lock().trim(event)
    }

    /// Run `f` with the engine locked
    pub fn with_engine<R>(&self, f: impl FnOnce(&BastFtl<C>) -> R) -> R {
        f(&self.inner.lock())
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.with_engine(|engine| engine.controller().stats().snapshot())
    }

    /// Unwrap the engine if this is the last handle
    pub fn into_inner(self) -> Option<BastFtl<C>> {
        Arc::try_unwrap(self.inner).ok().map(Mutex::into_inner)
    }
}
