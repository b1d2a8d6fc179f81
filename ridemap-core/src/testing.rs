//! In-memory collaborators for unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::coordinator::MapBootstrap;
use crate::model::{ConfiguredServices, Credential, MapSettings, ProviderKind, ServiceStatus};
use crate::plugin::{LoaderRegistry, SdkPlugin};
use crate::ports::{
    HostError, LoadOutcome, Resource, ResourceHost, SdkLoader, SdkManifest, SettingsError,
    SettingsSource,
};

#[derive(Debug, Clone, Copy)]
pub(crate) enum HostBehavior {
    /// Scripts define their global this long after injection starts.
    DefineAfter(Duration),
    /// Injection succeeds but nothing gets defined.
    Never,
    /// Every injection is refused.
    Refuse,
}

pub(crate) struct RecordingHost {
    behavior: HostBehavior,
    present: Mutex<HashSet<String>>,
    injected: Mutex<Vec<String>>,
    globals: Mutex<HashMap<String, String>>,
}

impl RecordingHost {
    pub(crate) fn new(behavior: HostBehavior) -> Self {
        Self {
            behavior,
            present: Mutex::new(HashSet::new()),
            injected: Mutex::new(Vec::new()),
            globals: Mutex::new(HashMap::new()),
        }
    }

    pub(crate) fn injected(&self) -> Vec<String> {
        self.injected.lock().clone()
    }

    pub(crate) fn define(&self, global: &str) {
        self.globals.lock().insert(global.to_owned(), String::new());
    }

    pub(crate) fn preload(&self, resource: &Resource) {
        self.present.lock().insert(resource.url.clone());
    }
}

#[async_trait]
impl ResourceHost for RecordingHost {
    fn contains(&self, resource: &Resource) -> bool {
        self.present.lock().contains(&resource.url)
    }

    async fn inject(&self, resource: &Resource) -> Result<(), HostError> {
        self.present.lock().insert(resource.url.clone());
        self.injected.lock().push(resource.url.clone());
        tokio::task::yield_now().await;

        match self.behavior {
            HostBehavior::Refuse => {
                self.present.lock().remove(&resource.url);
                Err(HostError::Refused {
                    url: resource.url.clone(),
                    reason: "blocked".to_owned(),
                })
            }
            HostBehavior::Never => Ok(()),
            HostBehavior::DefineAfter(delay) => {
                if let Some(global) = &resource.provides {
                    tokio::time::sleep(delay).await;
                    self.define(global);
                }
                Ok(())
            }
        }
    }

    fn is_defined(&self, global: &str) -> bool {
        self.globals.lock().contains_key(global)
    }

    fn assign(&self, path: &str, value: &str) {
        self.globals.lock().insert(path.to_owned(), value.to_owned());
    }
}

/// Settings source answering from memory.
pub(crate) struct FakeSettings {
    settings: Mutex<MapSettings>,
    backup_confirmed: AtomicBool,
    fail: AtomicBool,
    reads: AtomicUsize,
}

impl FakeSettings {
    pub(crate) fn new(primary: Option<&str>, backup: Option<&str>, use_primary: bool) -> Self {
        Self {
            settings: Mutex::new(MapSettings {
                primary_provider_credential: primary.map(str::to_owned),
                backup_provider_credential: backup.map(str::to_owned),
                use_primary,
            }),
            backup_confirmed: AtomicBool::new(backup.is_some()),
            fail: AtomicBool::new(false),
            reads: AtomicUsize::new(0),
        }
    }

    pub(crate) fn set(&self, primary: Option<&str>, backup: Option<&str>) {
        let mut settings = self.settings.lock();
        settings.primary_provider_credential = primary.map(str::to_owned);
        settings.backup_provider_credential = backup.map(str::to_owned);
        self.backup_confirmed.store(backup.is_some(), Ordering::SeqCst);
    }

    pub(crate) fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SettingsSource for FakeSettings {
    async fn settings(&self) -> Result<MapSettings, SettingsError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        if self.fail.load(Ordering::SeqCst) {
            return Err(SettingsError::Unavailable("settings returned 503".to_owned()));
        }
        Ok(self.settings.lock().clone())
    }

    async fn status(&self) -> Result<ServiceStatus, SettingsError> {
        Ok(ServiceStatus {
            status: ConfiguredServices {
                backup_provider_configured: self.backup_confirmed.load(Ordering::SeqCst),
            },
        })
    }
}

/// Loader that answers with a fixed outcome after a delay and counts calls.
pub(crate) struct ScriptedLoader {
    provider: ProviderKind,
    outcome: LoadOutcome,
    delay: Duration,
    calls: AtomicUsize,
}

impl ScriptedLoader {
    pub(crate) fn new(provider: ProviderKind, outcome: LoadOutcome) -> Arc<Self> {
        Arc::new(Self {
            provider,
            outcome,
            delay: Duration::from_millis(200),
            calls: AtomicUsize::new(0),
        })
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SdkLoader for ScriptedLoader {
    fn provider(&self) -> ProviderKind {
        self.provider
    }

    fn manifest(&self, _credential: &Credential) -> SdkManifest {
        SdkManifest {
            provider: self.provider,
            stylesheet: None,
            script: Resource::script(format!("https://cdn.test/{}.js", self.provider), "sdk"),
            global: "sdk".to_owned(),
        }
    }

    async fn load(&self, _credential: &Credential) -> LoadOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.outcome.clone()
    }
}

pub(crate) fn coordinator(
    settings: &Arc<FakeSettings>,
    primary: &Arc<ScriptedLoader>,
    backup: &Arc<ScriptedLoader>,
) -> MapBootstrap {
    let registry = LoaderRegistry::new(vec![
        SdkPlugin::new(Arc::clone(primary) as Arc<dyn SdkLoader>),
        SdkPlugin::new(Arc::clone(backup) as Arc<dyn SdkLoader>),
    ]);
    MapBootstrap::new(Arc::clone(settings) as Arc<dyn SettingsSource>, registry)
}

pub(crate) fn bootstrap(
    settings: &Arc<FakeSettings>,
    primary: &Arc<ScriptedLoader>,
    backup: &Arc<ScriptedLoader>,
) -> Arc<MapBootstrap> {
    Arc::new(coordinator(settings, primary, backup))
}
