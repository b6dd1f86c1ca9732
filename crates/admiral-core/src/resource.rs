//! Resource documents returned by the control plane.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::link::short_id;

/// Result of an expanded list query: links in server order plus the
/// documents keyed by link.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentList<T> {
    #[serde(default)]
    pub document_links: Vec<String>,

    #[serde(default = "HashMap::new")]
    pub documents: HashMap<String, T>,
}

impl<T> Default for DocumentList<T> {
    fn default() -> Self {
        Self {
            document_links: Vec::new(),
            documents: HashMap::new(),
        }
    }
}

impl<T> DocumentList<T> {
    /// Number of links returned.
    pub fn len(&self) -> usize {
        self.document_links.len()
    }

    /// Returns true if the query matched nothing.
    pub fn is_empty(&self) -> bool {
        self.document_links.is_empty()
    }

    /// Documents in the order of `document_links`. Links without an
    /// expanded document are skipped.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.document_links
            .iter()
            .filter_map(move |link| self.documents.get(link))
    }
}

/// A `host:container` port binding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortBinding {
    #[serde(default)]
    pub host_port: String,
    #[serde(default)]
    pub container_port: String,
}

impl fmt::Display for PortBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host_port, self.container_port)
    }
}

/// Container state document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Container {
    #[serde(default)]
    pub document_self_link: String,

    /// Docker container ID.
    #[serde(default)]
    pub id: Option<String>,

    #[serde(default)]
    pub names: Vec<String>,

    #[serde(default)]
    pub address: Option<String>,

    #[serde(default)]
    pub power_state: Option<String>,

    #[serde(default)]
    pub ports: Vec<PortBinding>,

    #[serde(default)]
    pub description_link: Option<String>,

    /// Link of the host the container runs on.
    #[serde(default)]
    pub parent_link: Option<String>,

    #[serde(default)]
    pub system: Option<bool>,

    /// Creation time, epoch milliseconds.
    #[serde(default)]
    pub created: Option<i64>,

    /// Start time, epoch milliseconds.
    #[serde(default)]
    pub started: Option<i64>,

    #[serde(default)]
    pub command: Vec<String>,
}

impl Container {
    /// Short ID of the container document.
    pub fn id(&self) -> &str {
        short_id(&self.document_self_link)
    }

    /// First container name, if any.
    pub fn name(&self) -> &str {
        self.names.first().map(String::as_str).unwrap_or("")
    }

    /// Docker ID truncated the way `docker ps` shows it.
    pub fn external_id(&self) -> &str {
        let id = self.id.as_deref().unwrap_or("");
        match id.char_indices().nth(15) {
            Some((idx, _)) => &id[..idx],
            None => id,
        }
    }

    /// Returns true for containers managed by the platform itself.
    pub fn is_system(&self) -> bool {
        self.system.unwrap_or(false)
    }

    /// Power state, with the uptime appended for running containers.
    pub fn status(&self, now: DateTime<Utc>) -> String {
        let state = self.power_state.as_deref().unwrap_or("UNKNOWN");
        if state != "RUNNING" {
            return state.to_string();
        }
        format!("{} {}", state, format_elapsed(self.started, now))
    }

    /// Creation time relative to `now`, e.g. `3 hours ago`.
    pub fn created_ago(&self, now: DateTime<Utc>) -> String {
        match self.created {
            Some(ms) if ms > 0 => format!("{} ago", format_elapsed(Some(ms), now)),
            _ => "unknown".to_string(),
        }
    }

    /// Compact port summary: `[]`, `[80:8080]` or `[80:8080...]`.
    pub fn ports_summary(&self) -> String {
        match self.ports.as_slice() {
            [] => "[]".to_string(),
            [only] => format!("[{}]", only),
            [first, ..] => format!("[{}...]", first),
        }
    }
}

/// Format the time elapsed since `epoch_ms` in the largest sensible unit.
pub fn format_elapsed(epoch_ms: Option<i64>, now: DateTime<Utc>) -> String {
    let then = match epoch_ms
        .filter(|ms| *ms > 0)
        .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
    {
        Some(then) => then,
        None => return "unknown".to_string(),
    };

    let elapsed = now.signed_duration_since(then);
    if elapsed.num_hours() > 72 {
        format!("{} days", elapsed.num_days())
    } else if elapsed.num_hours() > 1 {
        format!("{} hours", elapsed.num_hours())
    } else if elapsed.num_minutes() > 1 {
        format!("{} minutes", elapsed.num_minutes())
    } else if elapsed.num_seconds() > 1 {
        format!("{} seconds", elapsed.num_seconds())
    } else {
        "0 seconds".to_string()
    }
}

/// Application (composite component) document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    #[serde(default)]
    pub document_self_link: String,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub composite_description_link: Option<String>,

    #[serde(default)]
    pub component_links: Vec<String>,
}

impl Application {
    /// Short ID of the application.
    pub fn id(&self) -> &str {
        short_id(&self.document_self_link)
    }

    /// Component links that point at containers.
    pub fn container_links(&self) -> impl Iterator<Item = &str> {
        self.component_links
            .iter()
            .map(String::as_str)
            .filter(|l| l.starts_with("/resources/containers/"))
    }

    /// Component links that point at networks.
    pub fn network_links(&self) -> impl Iterator<Item = &str> {
        self.component_links
            .iter()
            .map(String::as_str)
            .filter(|l| l.starts_with("/resources/container-networks/"))
    }
}

/// Container host (compute) document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Host {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub document_self_link: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub address: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub power_state: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_pool_link: Option<String>,

    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub custom_properties: HashMap<String, Option<String>>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tag_links: Vec<String>,
}

impl Host {
    /// Short ID of the host.
    pub fn id(&self) -> &str {
        short_id(&self.document_self_link)
    }

    fn property(&self, key: &str) -> Option<&str> {
        self.custom_properties
            .get(key)
            .and_then(|v| v.as_deref())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    }

    /// Name shown to users: explicit name, then alias, then address
    /// without its scheme.
    pub fn display_name(&self) -> &str {
        if let Some(name) = self.name.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
            return name;
        }
        if let Some(alias) = self.property("__hostAlias").or_else(|| self.property("__Name")) {
            return alias;
        }
        self.address
            .strip_prefix("https://")
            .or_else(|| self.address.strip_prefix("http://"))
            .unwrap_or(&self.address)
    }

    /// Number of user containers, excluding the agent container.
    pub fn containers_count(&self) -> u32 {
        self.property("__Containers")
            .and_then(|v| v.parse::<u32>().ok())
            .map(|n| n.saturating_sub(1))
            .unwrap_or(0)
    }

    /// Short ID of the placement zone.
    pub fn placement_zone_id(&self) -> &str {
        self.resource_pool_link.as_deref().map(short_id).unwrap_or("")
    }
}

/// Container network document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Network {
    #[serde(default)]
    pub document_self_link: String,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub driver: Option<String>,

    #[serde(default)]
    pub power_state: Option<String>,

    #[serde(default)]
    pub connected_containers_count: Option<u32>,

    #[serde(default)]
    pub external: Option<bool>,
}

impl Network {
    /// Short ID of the network.
    pub fn id(&self) -> &str {
        short_id(&self.document_self_link)
    }
}
