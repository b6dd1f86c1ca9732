//! Expansion of user supplied short ID prefixes into full IDs.

use admiral_core::{resolve_full_id, DocumentList, ResourceKind};
use serde_json::Value;
use tracing::debug;

use crate::error::ClientError;
use crate::http::HttpClient;

/// Fetch every link of `kind` and expand each of `prefixes` against it.
///
/// The result keeps the order of `prefixes`.
pub async fn full_ids(
    http: &HttpClient,
    kind: ResourceKind,
    prefixes: &[String],
) -> Result<Vec<String>, ClientError> {
    if prefixes.is_empty() {
        return Err(admiral_core::CoreError::InvalidInput(format!(
            "at least one {} ID is required",
            kind
        ))
        .into());
    }

    let list: DocumentList<Value> = http.get_json(kind.base_path()).await?;
    debug!(kind = %kind, candidates = list.len(), "Resolving short IDs");

    prefixes
        .iter()
        .map(|prefix| {
            resolve_full_id(kind, prefix, &list.document_links).map_err(ClientError::from)
        })
        .collect()
}

/// Expand a single prefix.
pub async fn full_id(
    http: &HttpClient,
    kind: ResourceKind,
    prefix: &str,
) -> Result<String, ClientError> {
    let mut ids = full_ids(http, kind, &[prefix.to_string()]).await?;
    Ok(ids.remove(0))
}
