//! Shared acquisition steps used by every provider loader: idempotent resource injection
//! followed by bounded polling of the SDK readiness global.

use std::time::Duration;

use tokio::time::{interval, timeout};
use tracing::debug;

use crate::ports::{HostError, LoadFailure, LoadOutcome, Resource, ResourceHost, SdkManifest};

/// Default delay between readiness checks.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);
/// Default upper bound on waiting for readiness.
pub const DEFAULT_READY_TIMEOUT: Duration = Duration::from_secs(10);
/// Shortest delay between readiness checks; smaller intervals are raised to it.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// How readiness of an SDK global is detected.
pub struct ReadinessPolicy {
    /// Delay between checks, at least [`MIN_POLL_INTERVAL`].
    pub interval: Duration,
    /// Give up after this long.
    pub timeout: Duration,
}

impl Default for ReadinessPolicy {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            timeout: DEFAULT_READY_TIMEOUT,
        }
    }
}

/// Acquire the SDK described by `manifest`.
///
/// An SDK whose global is already defined is reported ready without touching the host.
/// Resources already present in the host are not injected again.
pub async fn acquire(
    host: &dyn ResourceHost,
    manifest: &SdkManifest,
    policy: ReadinessPolicy,
) -> LoadOutcome {
    if host.is_defined(&manifest.global) {
        debug!(provider = %manifest.provider, global = %manifest.global, "SDK already present");
        return LoadOutcome::Ready;
    }

    for resource in manifest.resources() {
        if let Err(err) = inject_once(host, resource).await {
            return LoadOutcome::Failed(LoadFailure::Network(err.to_string()));
        }
    }

    wait_until_defined(host, &manifest.global, policy).await
}

/// Inject `resource` unless an identical one is already present.
///
/// Returns whether an injection happened.
///
/// # Errors
///
/// Returns the [`HostError`] of a failed injection.
pub async fn inject_once(host: &dyn ResourceHost, resource: &Resource) -> Result<bool, HostError> {
    if host.contains(resource) {
        debug!(url = %resource.url, "resource already present, not injecting");
        return Ok(false);
    }
    debug!(url = %resource.url, kind = ?resource.kind, "injecting resource");
    host.inject(resource).await?;
    Ok(true)
}

/// Poll for `global` at the policy interval until it is defined or the timeout passes.
pub async fn wait_until_defined(
    host: &dyn ResourceHost,
    global: &str,
    policy: ReadinessPolicy,
) -> LoadOutcome {
    let poll = async {
        let mut ticker = interval(policy.interval.max(MIN_POLL_INTERVAL));
        loop {
            ticker.tick().await;
            if host.is_defined(global) {
                return;
            }
        }
    };

    match timeout(policy.timeout, poll).await {
        Ok(()) => LoadOutcome::Ready,
        Err(_elapsed) => {
            debug!(%global, timeout = ?policy.timeout, "readiness global never appeared");
            LoadOutcome::Failed(LoadFailure::Timeout)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::model::ProviderKind;
    use crate::testing::{HostBehavior, RecordingHost};

    fn manifest() -> SdkManifest {
        SdkManifest {
            provider: ProviderKind::Backup,
            stylesheet: Some(Resource::stylesheet("https://cdn.test/sdk.css")),
            script: Resource::script("https://cdn.test/sdk.js", "sdk"),
            global: "sdk".to_owned(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn injects_stylesheet_then_script() {
        let host = RecordingHost::new(HostBehavior::DefineAfter(Duration::from_millis(250)));

        let outcome = acquire(&host, &manifest(), ReadinessPolicy::default()).await;

        assert_eq!(outcome, LoadOutcome::Ready);
        assert_eq!(
            host.injected(),
            vec!["https://cdn.test/sdk.css", "https://cdn.test/sdk.js"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn predefined_global_skips_injection() {
        let host = RecordingHost::new(HostBehavior::Never);
        host.define("sdk");

        let outcome = acquire(&host, &manifest(), ReadinessPolicy::default()).await;

        assert_eq!(outcome, LoadOutcome::Ready);
        assert!(host.injected().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn present_script_is_polled_not_reinjected() {
        let host = RecordingHost::new(HostBehavior::Never);
        let manifest = manifest();
        host.preload(&manifest.script);
        let host = Arc::new(host);

        let waiter = {
            let host = Arc::clone(&host);
            let manifest = manifest.clone();
            tokio::spawn(async move { acquire(host.as_ref(), &manifest, ReadinessPolicy::default()).await })
        };
        tokio::time::sleep(Duration::from_millis(450)).await;
        host.define("sdk");

        assert_eq!(waiter.await.unwrap(), LoadOutcome::Ready);
        assert_eq!(host.injected(), vec!["https://cdn.test/sdk.css"]);
    }

    #[tokio::test(start_paused = true)]
    async fn missing_global_times_out() {
        let host = RecordingHost::new(HostBehavior::Never);
        let started = tokio::time::Instant::now();

        let outcome = acquire(&host, &manifest(), ReadinessPolicy::default()).await;

        assert_eq!(outcome, LoadOutcome::Failed(LoadFailure::Timeout));
        assert!(started.elapsed() >= DEFAULT_READY_TIMEOUT);
    }

    #[tokio::test(start_paused = true)]
    async fn injection_error_is_a_network_failure() {
        let host = RecordingHost::new(HostBehavior::Refuse);

        let outcome = acquire(&host, &manifest(), ReadinessPolicy::default()).await;

        assert!(matches!(outcome, LoadOutcome::Failed(LoadFailure::Network(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn overlapping_acquires_inject_once() {
        let host = RecordingHost::new(HostBehavior::DefineAfter(Duration::from_millis(300)));
        let manifest = manifest();

        let (first, second) = tokio::join!(
            acquire(&host, &manifest, ReadinessPolicy::default()),
            acquire(&host, &manifest, ReadinessPolicy::default()),
        );

        assert_eq!(first, LoadOutcome::Ready);
        assert_eq!(second, LoadOutcome::Ready);
        assert_eq!(host.injected().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_interval_still_polls_until_timeout() {
        let host = RecordingHost::new(HostBehavior::Never);
        let policy = ReadinessPolicy {
            interval: Duration::ZERO,
            timeout: Duration::from_millis(50),
        };

        let outcome = acquire(&host, &manifest(), policy).await;

        assert_eq!(outcome, LoadOutcome::Failed(LoadFailure::Timeout));
    }
}
