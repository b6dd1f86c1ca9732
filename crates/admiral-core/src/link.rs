//! Resource links and the short IDs derived from them.
//!
//! Every document on the control plane is addressed by a self link such as
//! `/resources/containers/abc123`. Users only ever see the trailing segment
//! (the short ID); commands accept a unique prefix of it.

use std::fmt;

use crate::error::CoreError;

/// Return the trailing `/`-delimited segment of a resource link.
///
/// Query strings and trailing slashes are kept as-is, so
/// `/resources/containers/abc?expand` yields `abc?expand` and a link ending
/// in `/` yields an empty string. A link without any `/` is returned
/// unchanged.
pub fn short_id(link: &str) -> &str {
    match link.rfind('/') {
        Some(idx) => &link[idx + 1..],
        None => link,
    }
}

/// Map a sequence of resource links to their short IDs, preserving order.
pub fn short_ids<I, S>(links: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    links
        .into_iter()
        .map(|link| short_id(link.as_ref()).to_string())
        .collect()
}

/// Kinds of documents the CLI addresses by link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Container,
    Application,
    Template,
    Host,
    Network,
    NetworkDescription,
    RequestStatus,
}

impl ResourceKind {
    /// Factory path under which documents of this kind live.
    pub fn base_path(&self) -> &'static str {
        match self {
            Self::Container => "/resources/containers",
            Self::Application => "/resources/composite-components",
            Self::Template => "/resources/composite-descriptions",
            Self::Host => "/resources/compute",
            Self::Network => "/resources/container-networks",
            Self::NetworkDescription => "/resources/container-network-descriptions",
            Self::RequestStatus => "/request-status",
        }
    }

    /// Build the self link for a document of this kind.
    ///
    /// Values that already look like a link of this kind are returned as-is.
    pub fn link(&self, id: &str) -> String {
        let base = self.base_path();
        if id.starts_with(base) && id[base.len()..].starts_with('/') {
            return id.to_string();
        }
        format!("{}/{}", base, id)
    }

    /// Build self links for several IDs.
    pub fn links<I, S>(&self, ids: I) -> Vec<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        ids.into_iter().map(|id| self.link(id.as_ref())).collect()
    }

    /// Human readable name used in messages.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Container => "container",
            Self::Application => "application",
            Self::Template => "template",
            Self::Host => "host",
            Self::Network => "network",
            Self::NetworkDescription => "network description",
            Self::RequestStatus => "task",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Expand a user supplied ID prefix into the full short ID of exactly one
/// of `links`.
///
/// An exact match always wins over prefix matches.
pub fn resolve_full_id<I, S>(
    kind: ResourceKind,
    prefix: &str,
    links: I,
) -> Result<String, CoreError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    if prefix.is_empty() {
        return Err(CoreError::InvalidInput(format!("empty {} ID", kind)));
    }

    let mut matches: Vec<String> = Vec::new();
    for link in links {
        let id = short_id(link.as_ref());
        if id == prefix {
            return Ok(id.to_string());
        }
        if id.starts_with(prefix) && !matches.iter().any(|m| m == id) {
            matches.push(id.to_string());
        }
    }

    match matches.len() {
        0 => Err(CoreError::NotFound {
            kind: kind.name().to_string(),
            id: prefix.to_string(),
        }),
        1 => Ok(matches.remove(0)),
        _ => Err(CoreError::Ambiguous {
            kind: kind.name().to_string(),
            id: prefix.to_string(),
            matches,
        }),
    }
}
