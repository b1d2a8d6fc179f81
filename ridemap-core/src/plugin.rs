//! Registry for the provider SDK loaders.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::model::ProviderKind;
use crate::ports::SdkLoader;

/// A loader bundled for registration.
pub struct SdkPlugin {
    /// Provider the loader serves.
    pub provider: ProviderKind,
    /// Implementation acquiring the SDK.
    pub loader: Arc<dyn SdkLoader>,
}

impl SdkPlugin {
    /// Bundle a loader under the provider it reports.
    #[must_use]
    pub fn new(loader: Arc<dyn SdkLoader>) -> Self {
        Self {
            provider: loader.provider(),
            loader,
        }
    }
}

/// Registry that resolves loaders by provider.
pub struct LoaderRegistry {
    loaders: BTreeMap<ProviderKind, Arc<dyn SdkLoader>>,
}

impl LoaderRegistry {
    /// Build a registry from the provided plugins; a later plugin replaces an earlier one
    /// for the same provider.
    #[must_use]
    pub fn new(plugins: Vec<SdkPlugin>) -> Self {
        let loaders = plugins
            .into_iter()
            .map(|plugin| (plugin.provider, plugin.loader))
            .collect();
        Self { loaders }
    }

    /// Providers with a registered loader.
    pub fn providers(&self) -> impl Iterator<Item = ProviderKind> + '_ {
        self.loaders.keys().copied()
    }

    /// Look up the loader for the given provider.
    #[must_use]
    pub fn loader(&self, provider: ProviderKind) -> Option<&Arc<dyn SdkLoader>> {
        self.loaders.get(&provider)
    }
}
