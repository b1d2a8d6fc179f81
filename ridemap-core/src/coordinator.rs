//! Bootstrap coordinator deciding which map SDK to load, deduplicating overlapping requests
//! and falling back to the alternate provider when a load fails.
//!
//! The coordinator is the only writer of the load state. Every mutation goes through
//! `MapBootstrap::transition`, which publishes a fresh [`Snapshot`] to subscribers once the
//! state lock is released. Deliveries are serialized, and each one carries the state current at
//! delivery time, so the last snapshot a listener sees is the latest state.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use parking_lot::{Mutex, ReentrantMutex};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::model::{
    BootstrapConfig, LoadState, MapStatus, ProviderKind, Snapshot, SwitchOutcome, SwitchRejection,
};
use crate::plugin::LoaderRegistry;
use crate::ports::{BootstrapError, LoadFailure, LoadOutcome, SettingsError, SettingsSource};
use crate::subscription::Listeners;

/// Process-wide owner of map SDK load state.
pub struct MapBootstrap {
    settings: Arc<dyn SettingsSource>,
    registry: LoaderRegistry,
    state: Mutex<BootstrapState>,
    pub(crate) listeners: Mutex<Listeners>,
    pub(crate) delivery: ReentrantMutex<()>,
    pub(crate) snapshots: watch::Sender<Snapshot>,
}

struct BootstrapState {
    config: Option<BootstrapConfig>,
    load_states: BTreeMap<ProviderKind, LoadState>,
    active: Option<ProviderKind>,
    in_flight: BTreeSet<ProviderKind>,
    configuring: bool,
    status: MapStatus,
}

enum Entry {
    Settled(MapStatus),
    Await,
    Configure,
}

enum Step {
    Load(ProviderKind),
    Done(MapStatus),
}

enum SwitchStep {
    Activated(ProviderKind),
    Load(ProviderKind),
}

impl BootstrapState {
    fn new() -> Self {
        Self {
            config: None,
            load_states: ProviderKind::ALL
                .into_iter()
                .map(|kind| (kind, LoadState::Uninitialized))
                .collect(),
            active: None,
            in_flight: BTreeSet::new(),
            configuring: false,
            status: MapStatus::NotConfigured,
        }
    }

    fn is_busy(&self) -> bool {
        self.configuring || !self.in_flight.is_empty()
    }

    fn load_state(&self, kind: ProviderKind) -> LoadState {
        self.load_states.get(&kind).copied().unwrap_or_default()
    }

    fn is_configured(&self, kind: ProviderKind) -> bool {
        self.config
            .as_ref()
            .is_some_and(|config| config.is_configured(kind))
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            status: self.status.clone(),
            active_provider: self.active,
            load_states: self.load_states.clone(),
            configured: self
                .config
                .as_ref()
                .map(BootstrapConfig::configured)
                .unwrap_or_default(),
        }
    }

    // Caller guarantees `provider` is neither in flight nor ready.
    fn claim(&mut self, provider: ProviderKind) -> Step {
        self.load_states.insert(provider, LoadState::Loading);
        self.in_flight.insert(provider);
        self.status = MapStatus::Loading(provider);
        Step::Load(provider)
    }

    fn activate(&mut self, provider: ProviderKind) -> MapStatus {
        self.active = Some(provider);
        self.status = MapStatus::Ready(provider);
        self.status.clone()
    }

    fn apply_config(&mut self, config: BootstrapConfig) -> Step {
        self.configuring = false;
        let first = config.first_choice();
        self.config = Some(config);

        if !matches!(
            self.status,
            MapStatus::NotConfigured | MapStatus::Error(BootstrapError::NoProviderConfigured)
        ) {
            // Loads already happened; new settings only affect later switches.
            return Step::Done(self.status.clone());
        }

        match first {
            Some(provider) => {
                info!(%provider, "map settings received");
                self.claim(provider)
            }
            None => {
                warn!("no map provider configured");
                self.status = MapStatus::Error(BootstrapError::NoProviderConfigured);
                Step::Done(self.status.clone())
            }
        }
    }

    fn settle(&mut self, provider: ProviderKind, outcome: LoadOutcome) -> Step {
        self.in_flight.remove(&provider);
        match outcome {
            LoadOutcome::Ready => {
                self.load_states.insert(provider, LoadState::Ready);
                info!(%provider, "map SDK ready");
                Step::Done(self.activate(provider))
            }
            LoadOutcome::Failed(failure) => {
                self.load_states.insert(provider, LoadState::Failed);
                warn!(%provider, %failure, "map SDK failed to load");
                self.fall_back(provider, &failure)
            }
        }
    }

    fn fall_back(&mut self, failed: ProviderKind, failure: &LoadFailure) -> Step {
        let alternate = failed.alternate();
        match self.load_state(alternate) {
            LoadState::Ready => Step::Done(self.activate(alternate)),
            LoadState::Uninitialized if self.is_configured(alternate) => {
                info!(from = %failed, to = %alternate, "falling back to alternate map SDK");
                self.claim(alternate)
            }
            _ => {
                let error = if self.is_configured(alternate) {
                    BootstrapError::BothProvidersFailed
                } else if *failure == LoadFailure::Timeout {
                    BootstrapError::LoadTimeout(failed)
                } else {
                    BootstrapError::LoadNetworkError(failed, failure.to_string())
                };
                self.status = MapStatus::Error(error);
                Step::Done(self.status.clone())
            }
        }
    }

    fn begin_switch(&mut self) -> Result<SwitchStep, SwitchRejection> {
        if !ProviderKind::ALL
            .into_iter()
            .all(|kind| self.is_configured(kind))
        {
            return Err(SwitchRejection::NotBothConfigured);
        }
        if self.is_busy() {
            return Err(SwitchRejection::LoadInFlight);
        }
        let active = self.active.ok_or(SwitchRejection::NoActiveProvider)?;
        let target = active.alternate();

        match self.load_state(target) {
            LoadState::Ready => {
                self.activate(target);
                Ok(SwitchStep::Activated(target))
            }
            LoadState::Uninitialized => {
                self.claim(target);
                Ok(SwitchStep::Load(target))
            }
            LoadState::Loading => Err(SwitchRejection::LoadInFlight),
            LoadState::Failed => Err(SwitchRejection::AlternateFailed),
        }
    }
}

impl MapBootstrap {
    /// Create a coordinator reading configuration from `settings` and loading SDKs
    /// through the loaders in `registry`.
    #[must_use]
    pub fn new(settings: Arc<dyn SettingsSource>, registry: LoaderRegistry) -> Self {
        let state = BootstrapState::new();
        let (snapshots, _initial) = watch::channel(state.snapshot());
        debug!(
            providers = ?registry.providers().collect::<Vec<_>>(),
            "map bootstrap created"
        );
        Self {
            settings,
            registry,
            state: Mutex::new(state),
            listeners: Mutex::new(Listeners::default()),
            delivery: ReentrantMutex::new(()),
            snapshots,
        }
    }

    /// Current composite status.
    #[must_use]
    pub fn status(&self) -> MapStatus {
        self.state.lock().status.clone()
    }

    pub(crate) fn snapshot(&self) -> Snapshot {
        self.state.lock().snapshot()
    }

    /// Make sure a map SDK is loaded or bootstrap has given up, returning the resulting status.
    ///
    /// The first caller reads configuration and drives loading and fallback. Callers
    /// arriving while that runs wait for it instead of starting another load.
    pub async fn ensure_loaded(&self) -> MapStatus {
        let entry = {
            let mut state = self.state.lock();
            if state.is_busy() {
                Entry::Await
            } else if state.status == MapStatus::NotConfigured {
                state.configuring = true;
                Entry::Configure
            } else {
                Entry::Settled(state.status.clone())
            }
        };

        match entry {
            Entry::Settled(status) => status,
            Entry::Await => {
                debug!("map bootstrap already running, waiting for it");
                self.wait_idle().await
            }
            Entry::Configure => self.configure().await,
        }
    }

    /// Re-read configuration.
    ///
    /// Out of `NotConfigured` or `Error(NoProviderConfigured)` this starts loading; in any
    /// other state the new settings are stored for later switches and nothing is reloaded.
    pub async fn refresh_config(&self) -> MapStatus {
        let busy = {
            let mut state = self.state.lock();
            let busy = state.is_busy();
            if !busy {
                state.configuring = true;
            }
            busy
        };

        if busy {
            self.wait_idle().await
        } else {
            self.configure().await
        }
    }

    /// Load the alternate of the active provider, or activate it if it is already loaded.
    ///
    /// Requests made while any load is running are ignored.
    pub async fn switch_provider(&self) -> SwitchOutcome {
        match self.transition(BootstrapState::begin_switch) {
            Err(rejection) => {
                debug!(?rejection, "provider switch ignored");
                SwitchOutcome::Ignored(rejection)
            }
            Ok(SwitchStep::Activated(provider)) => {
                info!(%provider, "switched to already loaded map SDK");
                SwitchOutcome::Switched(provider)
            }
            Ok(SwitchStep::Load(requested)) => {
                info!(provider = %requested, "switching map SDK");
                let status = self.drive(requested).await;
                SwitchOutcome::Loaded { requested, status }
            }
        }
    }

    /// Wait until no settings read or load is running, returning the status at that point.
    pub async fn wait_idle(&self) -> MapStatus {
        let mut changes = self.snapshots.subscribe();
        loop {
            {
                let state = self.state.lock();
                if !state.is_busy() {
                    return state.status.clone();
                }
            }
            if changes.changed().await.is_err() {
                return self.status();
            }
        }
    }

    async fn configure(&self) -> MapStatus {
        match self.read_config().await {
            Ok(config) => match self.transition(|state| state.apply_config(config)) {
                Step::Load(provider) => self.drive(provider).await,
                Step::Done(status) => status,
            },
            Err(err) => {
                warn!(error = %err, "could not read map settings");
                self.transition(|state| {
                    state.configuring = false;
                    state.status.clone()
                })
            }
        }
    }

    async fn read_config(&self) -> Result<BootstrapConfig, SettingsError> {
        let (settings, status) =
            tokio::try_join!(self.settings.settings(), self.settings.status())?;
        Ok(BootstrapConfig::resolve(&settings, &status))
    }

    async fn drive(&self, first: ProviderKind) -> MapStatus {
        let mut provider = first;
        loop {
            let outcome = self.run_loader(provider).await;
            match self.transition(|state| state.settle(provider, outcome)) {
                Step::Load(next) => provider = next,
                Step::Done(status) => return status,
            }
        }
    }

    async fn run_loader(&self, provider: ProviderKind) -> LoadOutcome {
        let credential = self
            .state
            .lock()
            .config
            .as_ref()
            .and_then(|config| config.provider(provider).credential.clone());
        let Some(credential) = credential else {
            return LoadOutcome::Failed(LoadFailure::MissingCredential);
        };
        let Some(loader) = self.registry.loader(provider) else {
            return LoadOutcome::Failed(LoadFailure::Unregistered);
        };

        info!(%provider, "loading map SDK");
        loader.load(&credential).await
    }

    fn transition<R>(&self, apply: impl FnOnce(&mut BootstrapState) -> R) -> R {
        let (result, changed, went_idle) = {
            let mut state = self.state.lock();
            let before = state.snapshot();
            let was_busy = state.is_busy();
            let result = apply(&mut state);
            let went_idle = was_busy && !state.is_busy();
            (result, state.snapshot() != before, went_idle)
        };
        if changed {
            self.publish();
        } else if went_idle {
            // Busy flags are not part of the snapshot; `wait_idle` re-checks on any send.
            self.snapshots.send_modify(|_| {});
        }
        result
    }
}
