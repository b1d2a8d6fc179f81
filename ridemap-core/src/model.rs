//! Domain data structures for map providers, their configuration, and bootstrap state.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ports::BootstrapError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
/// The two interchangeable map SDKs the application can run on.
pub enum ProviderKind {
    /// Preferred SDK, attempted first unless configuration says otherwise.
    Primary,
    /// Alternate SDK used when the primary is unavailable.
    Backup,
}

impl ProviderKind {
    /// Both providers, primary first.
    pub const ALL: [Self; 2] = [Self::Primary, Self::Backup];

    /// The other provider.
    #[must_use]
    pub const fn alternate(self) -> Self {
        match self {
            Self::Primary => Self::Backup,
            Self::Backup => Self::Primary,
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slug = match self {
            Self::Primary => "primary",
            Self::Backup => "backup",
        };
        write!(formatter, "{slug}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
/// Load progress of a single provider SDK.
pub enum LoadState {
    /// No load has been attempted yet.
    #[default]
    Uninitialized,
    /// A load is in flight.
    Loading,
    /// The SDK is loaded; this never regresses.
    Ready,
    /// The load failed; the provider is not attempted again.
    Failed,
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Opaque API key or access token for a provider SDK.
pub struct Credential(String);

impl Credential {
    /// Wrap a token, treating blank input as absent.
    #[must_use]
    pub fn new<S: Into<String>>(token: S) -> Option<Self> {
        let token = token.into();
        if token.trim().is_empty() {
            None
        } else {
            Some(Self(token))
        }
    }

    /// The raw token, for embedding into SDK URLs.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("Credential(***)")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Map settings as returned by the settings API.
pub struct MapSettings {
    /// Key for the primary SDK.
    #[serde(default)]
    pub primary_provider_credential: Option<String>,
    /// Token for the backup SDK.
    #[serde(default)]
    pub backup_provider_credential: Option<String>,
    /// Whether the primary SDK is preferred when both are configured.
    #[serde(default = "default_use_primary")]
    pub use_primary: bool,
}

impl Default for MapSettings {
    fn default() -> Self {
        Self {
            primary_provider_credential: None,
            backup_provider_credential: None,
            use_primary: true,
        }
    }
}

const fn default_use_primary() -> bool {
    true
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
/// Configuration-status summary as returned by the settings API.
pub struct ServiceStatus {
    /// Per-service configuration flags.
    #[serde(default)]
    pub status: ConfiguredServices,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
/// The service flags relevant to map loading; everything else is ignored.
pub struct ConfiguredServices {
    /// Whether the backend confirms the backup SDK is usable.
    #[serde(default)]
    pub backup_provider_configured: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
/// Resolved configuration for a single provider.
pub struct ProviderConfig {
    /// Credential used to load the SDK.
    pub credential: Option<Credential>,
    /// Whether the provider may be attempted at all.
    pub configured: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Provider configuration derived from both settings reads.
pub struct BootstrapConfig {
    /// Primary SDK configuration.
    pub primary: ProviderConfig,
    /// Backup SDK configuration.
    pub backup: ProviderConfig,
    /// Provider to attempt first when both are configured.
    pub preference: ProviderKind,
}

impl BootstrapConfig {
    /// Derive provider configuration from the settings and status reads.
    ///
    /// The backup provider additionally needs the backend to confirm it.
    #[must_use]
    pub fn resolve(settings: &MapSettings, status: &ServiceStatus) -> Self {
        let primary_credential = settings
            .primary_provider_credential
            .clone()
            .and_then(Credential::new);
        let backup_credential = settings
            .backup_provider_credential
            .clone()
            .and_then(Credential::new);

        Self {
            primary: ProviderConfig {
                configured: primary_credential.is_some(),
                credential: primary_credential,
            },
            backup: ProviderConfig {
                configured: backup_credential.is_some()
                    && status.status.backup_provider_configured,
                credential: backup_credential,
            },
            preference: if settings.use_primary {
                ProviderKind::Primary
            } else {
                ProviderKind::Backup
            },
        }
    }

    /// Configuration for the given provider.
    #[must_use]
    pub fn provider(&self, kind: ProviderKind) -> &ProviderConfig {
        match kind {
            ProviderKind::Primary => &self.primary,
            ProviderKind::Backup => &self.backup,
        }
    }

    /// Whether the given provider may be attempted.
    #[must_use]
    pub fn is_configured(&self, kind: ProviderKind) -> bool {
        self.provider(kind).configured
    }

    /// Set of configured providers.
    #[must_use]
    pub fn configured(&self) -> BTreeSet<ProviderKind> {
        ProviderKind::ALL
            .into_iter()
            .filter(|kind| self.is_configured(*kind))
            .collect()
    }

    /// Provider to attempt first, if any is configured.
    #[must_use]
    pub fn first_choice(&self) -> Option<ProviderKind> {
        if self.is_configured(self.preference) {
            Some(self.preference)
        } else if self.is_configured(self.preference.alternate()) {
            Some(self.preference.alternate())
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Composite bootstrap state exposed to consumers.
pub enum MapStatus {
    /// Configuration has not been read yet.
    NotConfigured,
    /// The given provider is loading.
    Loading(ProviderKind),
    /// The given provider is serving consumers.
    Ready(ProviderKind),
    /// Bootstrap gave up.
    Error(BootstrapError),
}

impl MapStatus {
    /// Whether no further transition will happen without an explicit request.
    #[must_use]
    pub const fn is_settled(&self) -> bool {
        matches!(self, Self::Ready(_) | Self::Error(_))
    }
}

impl fmt::Display for MapStatus {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotConfigured => write!(formatter, "not configured"),
            Self::Loading(provider) => write!(formatter, "loading {provider}"),
            Self::Ready(provider) => write!(formatter, "ready ({provider})"),
            Self::Error(err) => write!(formatter, "error: {err}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Consistent view of the bootstrap state at one point in time.
pub struct Snapshot {
    /// Composite state.
    pub status: MapStatus,
    /// Provider currently serving consumers.
    pub active_provider: Option<ProviderKind>,
    /// Load progress per provider.
    pub load_states: BTreeMap<ProviderKind, LoadState>,
    /// Providers that may be attempted.
    pub configured: BTreeSet<ProviderKind>,
}

impl Snapshot {
    /// Load progress of one provider.
    #[must_use]
    pub fn load_state(&self, kind: ProviderKind) -> LoadState {
        self.load_states.get(&kind).copied().unwrap_or_default()
    }

    /// Flatten into the shape UI components render from.
    #[must_use]
    pub fn view(&self) -> MapView {
        MapView {
            is_loaded: matches!(self.status, MapStatus::Ready(_)),
            provider: self.active_provider,
            error: match &self.status {
                MapStatus::Error(err) => Some(err.clone()),
                _ => None,
            },
            has_primary_configured: self.configured.contains(&ProviderKind::Primary),
            has_backup_configured: self.configured.contains(&ProviderKind::Backup),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Consumer-facing map state.
pub struct MapView {
    /// A provider is ready for rendering.
    pub is_loaded: bool,
    /// The active provider, if any.
    pub provider: Option<ProviderKind>,
    /// Terminal error, if bootstrap gave up.
    pub error: Option<BootstrapError>,
    /// Whether the primary SDK is configured.
    pub has_primary_configured: bool,
    /// Whether the backup SDK is configured.
    pub has_backup_configured: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Result of an explicit provider switch request.
pub enum SwitchOutcome {
    /// The alternate was already loaded and is now active.
    Switched(ProviderKind),
    /// A fresh load of the alternate ran; this is the status it settled in.
    Loaded {
        /// Provider the switch asked for.
        requested: ProviderKind,
        /// Status after the load and any fallback.
        status: MapStatus,
    },
    /// Nothing happened.
    Ignored(SwitchRejection),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Why a switch request was a no-op.
pub enum SwitchRejection {
    /// Switching needs both providers configured.
    NotBothConfigured,
    /// No provider is active to switch away from.
    NoActiveProvider,
    /// A load or configuration read is already running.
    LoadInFlight,
    /// The alternate already failed in this process.
    AlternateFailed,
}
