//! Graph source backed by the Kubo (go-ipfs) RPC API.
//!
//! | Port call      | Endpoint                                        |
//! |----------------|-------------------------------------------------|
//! | `list_links`   | `POST /api/v0/ls?arg=<cid>&resolve-type=true&size=true` |
//! | `block_stat`   | `POST /api/v0/block/stat?arg=<cid>`             |
//! | `list_pinned`  | `POST /api/v0/pin/ls?type=recursive`            |
//!
//! Directory (1) and HAMT shard (5) entries are branches; every other entry
//! type is a leaf sized by the `Size` Kubo reports for it.

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use sg_admission::{BlockRef, Cid, GraphSource, SourceError};
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use tracing::{debug, trace};

use crate::domain::error::GatewayError;

/// Unixfs entry types that have children of their own
const TYPE_DIRECTORY: i32 = 1;
const TYPE_HAMT_SHARD: i32 = 5;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct LsResponse {
    #[serde(default)]
    objects: Vec<LsObject>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct LsObject {
    #[serde(default)]
    hash: String,
    #[serde(default)]
    links: Option<Vec<LsLink>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct LsLink {
    hash: String,
    #[serde(default)]
    size: u64,
    #[serde(rename = "Type", default)]
    kind: i32,
}

impl LsLink {
    fn into_block_ref(self) -> BlockRef {
        if matches!(self.kind, TYPE_DIRECTORY | TYPE_HAMT_SHARD) {
            BlockRef::branch(self.hash)
        } else {
            BlockRef::leaf(self.hash, self.size)
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct BlockStatResponse {
    size: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct PinLsResponse {
    #[serde(default)]
    keys: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct KuboErrorBody {
    message: String,
}

/// Kubo RPC client implementing [`GraphSource`].
pub struct KuboGraphSource {
    client: Client,
    base_url: String,
}

impl KuboGraphSource {
    /// Create a client for the RPC API at `base_url`.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout.min(Duration::from_secs(2)))
            .build()
            .map_err(|e| GatewayError::Client(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn call<R: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &[(&str, &str)],
    ) -> Result<R, SourceError> {
        let url = format!("{}/api/v0/{}", self.base_url, endpoint);
        trace!(url = %url, ?query, "Kubo RPC call");

        let response = self
            .client
            .post(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    SourceError::Unavailable(format!("cannot connect to {}", self.base_url))
                } else if e.is_timeout() {
                    SourceError::Unavailable(format!("{endpoint} timed out"))
                } else {
                    SourceError::Unavailable(e.to_string())
                }
            })?;

        let response = check_status(endpoint, response).await?;

        response
            .json()
            .await
            .map_err(|e| SourceError::Malformed(format!("{endpoint}: {e}")))
    }
}

async fn check_status(endpoint: &str, response: Response) -> Result<Response, SourceError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    // Kubo reports failures as {"Message": "...", "Code": 0, "Type": "error"}
    let message = match response.json::<KuboErrorBody>().await {
        Ok(body) => body.message,
        Err(_) => String::from("no error message"),
    };
    Err(SourceError::Unavailable(format!(
        "{endpoint} returned {status}: {message}"
    )))
}

#[async_trait]
impl GraphSource for KuboGraphSource {
    async fn list_links(&self, cid: &Cid) -> Result<Vec<BlockRef>, SourceError> {
        let response: LsResponse = self
            .call(
                "ls",
                &[
                    ("arg", cid.as_str()),
                    ("resolve-type", "true"),
                    ("size", "true"),
                ],
            )
            .await?;

        let object = response
            .objects
            .into_iter()
            .next()
            .ok_or_else(|| SourceError::Malformed(format!("ls {cid}: no objects")))?;

        let links: Vec<BlockRef> = object
            .links
            .unwrap_or_default()
            .into_iter()
            .map(LsLink::into_block_ref)
            .collect();

        debug!(cid = %cid, object = %object.hash, links = links.len(), "Listed links");
        Ok(links)
    }

    async fn block_stat(&self, cid: &Cid) -> Result<u64, SourceError> {
        let response: BlockStatResponse = self.call("block/stat", &[("arg", cid.as_str())]).await?;
        Ok(response.size)
    }

    async fn list_pinned(&self) -> Result<HashSet<Cid>, SourceError> {
        let response: PinLsResponse = self.call("pin/ls", &[("type", "recursive")]).await?;
        Ok(response.keys.into_keys().map(Cid::from).collect())
    }
}
