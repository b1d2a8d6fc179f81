//! Backup map provider loading Mapbox GL JS.
//!
//! The script may already be on the page from an earlier mount, in which case no load event
//! fires again; readiness is always detected by polling the `mapboxgl` global.

use std::sync::Arc;

use async_trait::async_trait;
use ridemap_core::{
    loader::{ReadinessPolicy, acquire},
    model::{Credential, ProviderKind},
    plugin::SdkPlugin,
    ports::{LoadOutcome, Resource, ResourceHost, SdkLoader, SdkManifest},
};
use tracing::debug;

const CDN_URL: &str = "https://api.mapbox.com/mapbox-gl-js";
const DEFAULT_VERSION: &str = "v3.9.4";
const READY_GLOBAL: &str = "mapboxgl";
const TOKEN_PATH: &str = "mapboxgl.accessToken";

/// Loader for Mapbox GL JS.
pub struct MapboxLoader {
    host: Arc<dyn ResourceHost>,
    policy: ReadinessPolicy,
    version: String,
}

impl MapboxLoader {
    /// Create a loader injecting the default SDK version into `host`.
    #[must_use]
    pub fn new(host: Arc<dyn ResourceHost>, policy: ReadinessPolicy) -> Self {
        Self {
            host,
            policy,
            version: DEFAULT_VERSION.to_owned(),
        }
    }

    /// Pin a different SDK version, e.g. `v3.8.0`.
    #[must_use]
    pub fn with_version<S: Into<String>>(mut self, version: S) -> Self {
        self.version = version.into();
        self
    }
}

#[async_trait]
impl SdkLoader for MapboxLoader {
    fn provider(&self) -> ProviderKind {
        ProviderKind::Backup
    }

    fn manifest(&self, _credential: &Credential) -> SdkManifest {
        let base = format!("{CDN_URL}/{}", self.version);
        SdkManifest {
            provider: ProviderKind::Backup,
            stylesheet: Some(Resource::stylesheet(format!("{base}/mapbox-gl.css"))),
            script: Resource::script(format!("{base}/mapbox-gl.js"), READY_GLOBAL),
            global: READY_GLOBAL.to_owned(),
        }
    }

    async fn load(&self, credential: &Credential) -> LoadOutcome {
        let manifest = self.manifest(credential);
        let outcome = acquire(self.host.as_ref(), &manifest, self.policy).await;
        if outcome == LoadOutcome::Ready {
            // The token is a property on the SDK namespace, set once it exists.
            self.host.assign(TOKEN_PATH, credential.expose());
            debug!(version = %self.version, "mapbox gl ready");
        }
        outcome
    }
}

/// Build the plugin bundle for the Mapbox provider.
#[must_use]
pub fn plugin(host: Arc<dyn ResourceHost>, policy: ReadinessPolicy) -> SdkPlugin {
    SdkPlugin::new(Arc::new(MapboxLoader::new(host, policy)))
}

#[cfg(test)]
mod tests {
    use std::collections::{HashMap, HashSet};
    use std::sync::Mutex;
    use std::time::Duration;

    use ridemap_core::ports::{HostError, LoadFailure};

    use super::*;

    #[derive(Default)]
    struct StubHost {
        present: Mutex<HashSet<String>>,
        injected: Mutex<Vec<String>>,
        globals: Mutex<HashMap<String, String>>,
        never_ready: bool,
    }

    impl StubHost {
        fn define(&self, global: &str) {
            self.globals
                .lock()
                .unwrap()
                .insert(global.to_owned(), String::new());
        }
    }

    #[async_trait]
    impl ResourceHost for StubHost {
        fn contains(&self, resource: &Resource) -> bool {
            self.present.lock().unwrap().contains(&resource.url)
        }

        async fn inject(&self, resource: &Resource) -> Result<(), HostError> {
            self.present.lock().unwrap().insert(resource.url.clone());
            self.injected.lock().unwrap().push(resource.url.clone());
            tokio::time::sleep(Duration::from_millis(80)).await;
            if let Some(global) = &resource.provides
                && !self.never_ready
            {
                self.define(global);
            }
            Ok(())
        }

        fn is_defined(&self, global: &str) -> bool {
            self.globals.lock().unwrap().contains_key(global)
        }

        fn assign(&self, path: &str, value: &str) {
            self.globals
                .lock()
                .unwrap()
                .insert(path.to_owned(), value.to_owned());
        }
    }

    fn credential() -> Credential {
        Credential::new("pk.test-token").unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn injects_stylesheet_and_script_then_sets_token() {
        let host = Arc::new(StubHost::default());
        let loader = MapboxLoader::new(Arc::clone(&host) as Arc<dyn ResourceHost>, ReadinessPolicy::default());

        assert_eq!(loader.load(&credential()).await, LoadOutcome::Ready);

        assert_eq!(
            *host.injected.lock().unwrap(),
            vec![
                "https://api.mapbox.com/mapbox-gl-js/v3.9.4/mapbox-gl.css".to_owned(),
                "https://api.mapbox.com/mapbox-gl-js/v3.9.4/mapbox-gl.js".to_owned(),
            ]
        );
        assert_eq!(
            host.globals.lock().unwrap().get(TOKEN_PATH).map(String::as_str),
            Some("pk.test-token")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn script_left_by_an_earlier_mount_is_polled() {
        let host = Arc::new(StubHost {
            never_ready: true,
            ..StubHost::default()
        });
        let loader = MapboxLoader::new(Arc::clone(&host) as Arc<dyn ResourceHost>, ReadinessPolicy::default());
        let manifest = loader.manifest(&credential());
        host.present.lock().unwrap().insert(manifest.script.url.clone());

        let pending = tokio::spawn(async move { loader.load(&credential()).await });
        tokio::time::sleep(Duration::from_millis(700)).await;
        host.define(READY_GLOBAL);

        assert_eq!(pending.await.unwrap(), LoadOutcome::Ready);
        assert_eq!(
            *host.injected.lock().unwrap(),
            vec![manifest.stylesheet.map(|sheet| sheet.url).unwrap()]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn missing_global_times_out_without_token() {
        let host = Arc::new(StubHost {
            never_ready: true,
            ..StubHost::default()
        });
        let policy = ReadinessPolicy {
            interval: Duration::from_millis(100),
            timeout: Duration::from_secs(2),
        };
        let loader = MapboxLoader::new(Arc::clone(&host) as Arc<dyn ResourceHost>, policy)
            .with_version("v3.8.0");

        assert_eq!(
            loader.load(&credential()).await,
            LoadOutcome::Failed(LoadFailure::Timeout)
        );
        assert!(!host.is_defined(TOKEN_PATH));
        assert!(host.injected.lock().unwrap()[0].contains("/v3.8.0/"));
    }
}
