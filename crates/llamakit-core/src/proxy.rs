//! Proxy configuration read from the application settings store
//!
//! The settings store persists the UI's proxy form verbatim (camelCase keys,
//! enabled flag, separate SSL verification toggles). This module converts
//! that into the structured [`ProxyConfig`] the download layer consumes, and
//! knows how to apply one to a `reqwest` client builder.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, warn};

/// Structured proxy descriptor attached to download items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyConfig {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub no_proxy: Option<Vec<String>>,
    pub ignore_ssl: bool,
    pub verify_proxy_ssl: bool,
    pub verify_proxy_host_ssl: bool,
    pub verify_peer_ssl: bool,
    pub verify_host_ssl: bool,
}

/// Raw persisted form, as written by the settings UI.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredProxySettings {
    #[serde(default)]
    proxy_enabled: bool,
    #[serde(default)]
    proxy_url: String,
    #[serde(default)]
    proxy_username: String,
    #[serde(default)]
    proxy_password: String,
    #[serde(default, rename = "proxyIgnoreSSL")]
    proxy_ignore_ssl: bool,
    #[serde(default, rename = "verifyProxySSL")]
    verify_proxy_ssl: bool,
    #[serde(default, rename = "verifyProxyHostSSL")]
    verify_proxy_host_ssl: bool,
    #[serde(default, rename = "verifyPeerSSL")]
    verify_peer_ssl: bool,
    #[serde(default, rename = "verifyHostSSL")]
    verify_host_ssl: bool,
    #[serde(default)]
    no_proxy: String,
}

/// Read the proxy configuration from `<data-dir>/settings/proxy.json`.
///
/// Returns `None` when nothing is stored, the proxy is disabled, the URL is
/// empty, or the stored JSON does not parse. A malformed file is logged and
/// treated the same as no configuration.
pub fn load_proxy_config(data_dir: &Path) -> Option<ProxyConfig> {
    let path = data_dir.join("settings").join("proxy.json");
    let raw = std::fs::read_to_string(&path).ok()?;

    let stored: StoredProxySettings = match serde_json::from_str(&raw) {
        Ok(stored) => stored,
        Err(err) => {
            warn!("Failed to parse proxy configuration at {}: {err}", path.display());
            return None;
        }
    };

    proxy_config_from_stored(stored)
}

fn proxy_config_from_stored(stored: StoredProxySettings) -> Option<ProxyConfig> {
    if !stored.proxy_enabled || stored.proxy_url.is_empty() {
        return None;
    }

    // Credentials only count when both halves are present
    let (username, password) = if !stored.proxy_username.is_empty() && !stored.proxy_password.is_empty()
    {
        (Some(stored.proxy_username), Some(stored.proxy_password))
    } else {
        (None, None)
    };

    let no_proxy: Vec<String> = stored
        .no_proxy
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::to_string)
        .collect();

    let config = ProxyConfig {
        url: stored.proxy_url,
        username,
        password,
        no_proxy: (!no_proxy.is_empty()).then_some(no_proxy),
        ignore_ssl: stored.proxy_ignore_ssl,
        verify_proxy_ssl: stored.verify_proxy_ssl,
        verify_proxy_host_ssl: stored.verify_proxy_host_ssl,
        verify_peer_ssl: stored.verify_peer_ssl,
        verify_host_ssl: stored.verify_host_ssl,
    };

    debug!(
        url = %config.url,
        has_auth = config.username.is_some(),
        no_proxy_count = config.no_proxy.as_ref().map(Vec::len).unwrap_or(0),
        "Using proxy configuration"
    );

    Some(config)
}

impl ProxyConfig {
    /// Apply this proxy to a `reqwest` client builder.
    pub fn apply(&self, builder: reqwest::ClientBuilder) -> reqwest::ClientBuilder {
        let mut proxy = match reqwest::Proxy::all(&self.url) {
            Ok(proxy) => proxy,
            Err(err) => {
                warn!("Invalid proxy URL '{}': {err}", self.url);
                return builder;
            }
        };

        if let (Some(username), Some(password)) = (&self.username, &self.password) {
            proxy = proxy.basic_auth(username, password);
        }
        if let Some(no_proxy) = &self.no_proxy {
            proxy = proxy.no_proxy(reqwest::NoProxy::from_string(&no_proxy.join(",")));
        }

        let mut builder = builder.proxy(proxy);
        if self.ignore_ssl || !self.verify_peer_ssl {
            builder = builder.danger_accept_invalid_certs(true);
        }
        builder
    }
}
