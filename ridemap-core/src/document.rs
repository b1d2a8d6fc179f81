//! Headless document that SDK resources are injected into.
//!
//! Injecting a resource fetches it over HTTP; a script that arrives defines the global it
//! declares, which is what readiness polling looks for.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::{Client, Url};
use tracing::debug;

use crate::ports::{HostError, Resource, ResourceHost};

/// In-process execution environment for map SDK resources.
pub struct Document {
    client: Client,
    resources: Mutex<Vec<Resource>>,
    globals: Mutex<HashMap<String, String>>,
}

impl Document {
    /// Create an empty document fetching resources with `client`.
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self {
            client,
            resources: Mutex::new(Vec::new()),
            globals: Mutex::new(HashMap::new()),
        }
    }

    /// Resources added so far, in injection order.
    #[must_use]
    pub fn resources(&self) -> Vec<Resource> {
        self.resources.lock().clone()
    }

    /// Mark a global as defined, e.g. by an SDK that was bundled with the page.
    pub fn define(&self, global: &str) {
        self.globals
            .lock()
            .entry(global.to_owned())
            .or_default();
    }
}

#[async_trait]
impl ResourceHost for Document {
    fn contains(&self, resource: &Resource) -> bool {
        self.resources
            .lock()
            .iter()
            .any(|present| present.url == resource.url)
    }

    async fn inject(&self, resource: &Resource) -> Result<(), HostError> {
        let url = Url::parse(&resource.url).map_err(|err| HostError::Refused {
            url: resource.url.clone(),
            reason: err.to_string(),
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(HostError::Refused {
                url: resource.url.clone(),
                reason: format!("unsupported scheme {}", url.scheme()),
            });
        }

        {
            let mut resources = self.resources.lock();
            if resources.iter().any(|present| present.url == resource.url) {
                return Ok(());
            }
            resources.push(resource.clone());
        }

        if let Err(err) = fetch(&self.client, url).await {
            self.resources
                .lock()
                .retain(|present| present.url != resource.url);
            return Err(err);
        }

        if let Some(global) = &resource.provides {
            self.define(global);
        }
        Ok(())
    }

    fn is_defined(&self, global: &str) -> bool {
        self.globals.lock().contains_key(global)
    }

    fn assign(&self, path: &str, value: &str) {
        self.globals
            .lock()
            .insert(path.to_owned(), value.to_owned());
    }
}

async fn fetch(client: &Client, url: Url) -> Result<(), HostError> {
    let body = client
        .get(url.clone())
        .send()
        .await?
        .error_for_status()?
        .bytes()
        .await?;
    debug!(%url, bytes = body.len(), "resource fetched");
    Ok(())
}
