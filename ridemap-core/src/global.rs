//! The process-wide bootstrap instance shared by every map consumer.

use std::sync::{Arc, OnceLock};

use crate::coordinator::MapBootstrap;

static BOOTSTRAP: OnceLock<Arc<MapBootstrap>> = OnceLock::new();

/// Return the process-wide bootstrap, creating it with `init` on first use.
///
/// Later calls ignore `init`. The instance lives until the process exits.
pub fn get_or_init<F>(init: F) -> Arc<MapBootstrap>
where
    F: FnOnce() -> MapBootstrap,
{
    Arc::clone(BOOTSTRAP.get_or_init(|| Arc::new(init())))
}

/// The process-wide bootstrap, if it was created.
#[must_use]
pub fn get() -> Option<Arc<MapBootstrap>> {
    BOOTSTRAP.get().map(Arc::clone)
}
