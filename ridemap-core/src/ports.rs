//! Traits and error types describing the collaborators of the bootstrap coordinator.

use async_trait::async_trait;
use reqwest::Error as ReqwestError;

use crate::model::{Credential, MapSettings, ProviderKind, ServiceStatus};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
/// Terminal bootstrap failures surfaced to consumers.
pub enum BootstrapError {
    /// Neither provider is configured.
    #[error("No map provider configured")]
    NoProviderConfigured,
    /// The only configured provider never became ready.
    #[error("Timed out loading the {0} map SDK")]
    LoadTimeout(ProviderKind),
    /// The only configured provider could not be fetched.
    #[error("Failed to load the {0} map SDK: {1}")]
    LoadNetworkError(ProviderKind, String),
    /// Every configured provider failed.
    #[error("Both map providers failed to load")]
    BothProvidersFailed,
}

#[derive(thiserror::Error, Debug)]
/// Errors from reading map settings.
pub enum SettingsError {
    /// Network layer failed.
    #[error("Network error: {0}")]
    Network(#[from] ReqwestError),
    /// The settings endpoint answered but cannot be used.
    #[error("Settings unavailable: {0}")]
    Unavailable(String),
}

#[derive(thiserror::Error, Debug)]
/// Errors from injecting a resource into the execution environment.
pub enum HostError {
    /// Fetching the resource failed.
    #[error("Network error: {0}")]
    Network(#[from] ReqwestError),
    /// The host refused to add the resource.
    #[error("Refused {url}: {reason}")]
    Refused {
        /// Resource location.
        url: String,
        /// Why it was refused.
        reason: String,
    },
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
/// Why a single provider load attempt failed.
pub enum LoadFailure {
    /// A resource could not be injected.
    #[error("network: {0}")]
    Network(String),
    /// The readiness signal never appeared.
    #[error("timeout")]
    Timeout,
    /// No usable credential was supplied.
    #[error("missing credential")]
    MissingCredential,
    /// No loader is registered for the provider.
    #[error("no loader registered")]
    Unregistered,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Result of a provider load attempt.
pub enum LoadOutcome {
    /// The SDK signalled readiness.
    Ready,
    /// The SDK could not be loaded.
    Failed(LoadFailure),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Kind of resource an SDK needs in the execution environment.
pub enum ResourceKind {
    /// CSS stylesheet.
    Stylesheet,
    /// JavaScript bundle.
    Script,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// A stylesheet or script identified by its URL.
pub struct Resource {
    /// What kind of resource this is.
    pub kind: ResourceKind,
    /// Well-known location; two resources with the same URL are identical.
    pub url: String,
    /// Global the script defines once evaluated.
    pub provides: Option<String>,
}

impl Resource {
    /// Stylesheet resource.
    #[must_use]
    pub fn stylesheet<U: Into<String>>(url: U) -> Self {
        Self {
            kind: ResourceKind::Stylesheet,
            url: url.into(),
            provides: None,
        }
    }

    /// Script resource defining the given global.
    #[must_use]
    pub fn script<U: Into<String>, S: Into<String>>(url: U, provides: S) -> Self {
        Self {
            kind: ResourceKind::Script,
            url: url.into(),
            provides: Some(provides.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Everything needed to acquire one provider SDK.
pub struct SdkManifest {
    /// Provider the SDK serves.
    pub provider: ProviderKind,
    /// Stylesheet, for SDKs that ship one separately.
    pub stylesheet: Option<Resource>,
    /// SDK script.
    pub script: Resource,
    /// Global whose presence means the SDK is ready.
    pub global: String,
}

impl SdkManifest {
    /// Resources in injection order.
    pub fn resources(&self) -> impl Iterator<Item = &Resource> {
        self.stylesheet.iter().chain(Some(&self.script))
    }
}

#[async_trait]
/// Source of map settings, backed by the remote settings API.
pub trait SettingsSource: Send + Sync {
    /// Current settings: credentials and provider preference.
    ///
    /// # Errors
    ///
    /// Returns a [`SettingsError`] when the settings cannot be read.
    async fn settings(&self) -> Result<MapSettings, SettingsError>;

    /// Configuration-status summary of backend services.
    ///
    /// # Errors
    ///
    /// Returns a [`SettingsError`] when the status cannot be read.
    async fn status(&self) -> Result<ServiceStatus, SettingsError>;
}

#[async_trait]
/// Execution environment SDK resources are injected into.
pub trait ResourceHost: Send + Sync {
    /// Whether an identical resource was already added.
    fn contains(&self, resource: &Resource) -> bool;

    /// Add a resource and wait until it has been fetched.
    ///
    /// The resource must be visible to [`ResourceHost::contains`] before this suspends.
    ///
    /// # Errors
    ///
    /// Returns a [`HostError`] when the resource cannot be added.
    async fn inject(&self, resource: &Resource) -> Result<(), HostError>;

    /// Whether the given global is defined.
    fn is_defined(&self, global: &str) -> bool;

    /// Assign a value to a global property path such as `sdk.accessToken`.
    fn assign(&self, path: &str, value: &str);
}

#[async_trait]
/// Provider-specific SDK acquisition.
pub trait SdkLoader: Send + Sync {
    /// Provider this loader acquires.
    fn provider(&self) -> ProviderKind;

    /// Resources and readiness global of the SDK when loaded with the given credential.
    fn manifest(&self, credential: &Credential) -> SdkManifest;

    /// Acquire the SDK, reusing anything already present in the environment.
    async fn load(&self, credential: &Credential) -> LoadOutcome;
}
