//! Primary map provider loading the Google Maps JavaScript API.

use std::sync::Arc;

use async_trait::async_trait;
use ridemap_core::{
    loader::{ReadinessPolicy, acquire},
    model::{Credential, ProviderKind},
    plugin::SdkPlugin,
    ports::{LoadOutcome, Resource, ResourceHost, SdkLoader, SdkManifest},
};
use tracing::debug;

const SCRIPT_URL: &str = "https://maps.googleapis.com/maps/api/js";
const READY_GLOBAL: &str = "google.maps";
const LIBRARIES: &str = "places,geometry";
// The API insists on a callback; readiness is still detected by polling `google.maps`.
const CALLBACK: &str = "__ridemapPrimaryReady";

/// Loader for the Google Maps JavaScript API.
pub struct GoogleMapsLoader {
    host: Arc<dyn ResourceHost>,
    policy: ReadinessPolicy,
}

impl GoogleMapsLoader {
    /// Create a loader injecting into `host`.
    #[must_use]
    pub fn new(host: Arc<dyn ResourceHost>, policy: ReadinessPolicy) -> Self {
        Self { host, policy }
    }
}

#[async_trait]
impl SdkLoader for GoogleMapsLoader {
    fn provider(&self) -> ProviderKind {
        ProviderKind::Primary
    }

    fn manifest(&self, credential: &Credential) -> SdkManifest {
        // Google ships its CSS from inside the script bundle.
        SdkManifest {
            provider: ProviderKind::Primary,
            stylesheet: None,
            script: Resource::script(script_url(credential), READY_GLOBAL),
            global: READY_GLOBAL.to_owned(),
        }
    }

    async fn load(&self, credential: &Credential) -> LoadOutcome {
        let manifest = self.manifest(credential);
        let outcome = acquire(self.host.as_ref(), &manifest, self.policy).await;
        debug!(?outcome, "google maps load finished");
        outcome
    }
}

/// Build the plugin bundle for the Google Maps provider.
#[must_use]
pub fn plugin(host: Arc<dyn ResourceHost>, policy: ReadinessPolicy) -> SdkPlugin {
    SdkPlugin::new(Arc::new(GoogleMapsLoader::new(host, policy)))
}

fn script_url(credential: &Credential) -> String {
    format!(
        "{SCRIPT_URL}?key={}&libraries={LIBRARIES}&loading=async&callback={CALLBACK}",
        credential.expose()
    )
}
