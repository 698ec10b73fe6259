//! HTTP object store client.
//!
//! Speaks a revision-aware JSON protocol: writes carry the current revision
//! identifier when replacing an existing object, plus a human-readable
//! change description. Reads return content bytes and the revision the store
//! reports for them.

use std::io::Read;
use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use log::debug;
use serde_json::json;

use super::{AssetStore, StoredObject};
use crate::error::StoreError;

/// Objects larger than this are rejected before upload rather than after a
/// long failed transfer.
const MAX_OBJECT_BYTES: usize = 50 * 1024 * 1024;

pub struct HttpStore {
    agent: ureq::Agent,
    base_url: String,
    token: Option<String>,
}

impl HttpStore {
    #[must_use]
    pub fn new(
        base_url: impl Into<String>,
        token: Option<String>,
        connect_timeout: Duration,
        read_timeout: Duration,
    ) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(connect_timeout)
            .timeout_read(read_timeout)
            .build();

        Self {
            agent,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
        }
    }

    fn object_url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn authorize(&self, req: ureq::Request) -> ureq::Request {
        match &self.token {
            Some(token) => req.set("Authorization", &format!("Bearer {token}")),
            None => req,
        }
    }

    /// Revision of the object at `path`, or `None` if it does not exist yet.
    ///
    /// Uses a HEAD request: the revision lives in the response headers, so
    /// downloading the object body just to replace it would be wasted
    /// transfer on every republish.
    fn current_revision(&self, path: &str) -> Result<Option<String>, StoreError> {
        let url = self.object_url(path);
        match self.authorize(self.agent.head(&url)).call() {
            Ok(resp) => Ok(Some(revision_of(&resp).unwrap_or_default())),
            Err(e) => match classify(path, e) {
                StoreError::NotFound { .. } => Ok(None),
                other => Err(other),
            },
        }
    }
}

/// Map a ureq failure onto the transient/permanent split.
fn classify(path: &str, err: ureq::Error) -> StoreError {
    match err {
        ureq::Error::Status(404, _) => StoreError::not_found(path),
        ureq::Error::Status(code, resp) if code >= 500 || code == 429 => {
            StoreError::transient(format!("{code} {}", resp.status_text()))
        }
        ureq::Error::Status(code, resp) => {
            StoreError::permanent(format!("{code} {}", resp.status_text()))
        }
        ureq::Error::Transport(t) => StoreError::transient(t.to_string()),
    }
}

fn revision_of(resp: &ureq::Response) -> Option<String> {
    resp.header("etag")
        .or_else(|| resp.header("x-revision"))
        .map(|v| v.trim_matches('"').to_string())
}

impl AssetStore for HttpStore {
    fn read(&self, path: &str) -> Result<StoredObject, StoreError> {
        let url = self.object_url(path);
        let resp = self
            .authorize(self.agent.get(&url))
            .call()
            .map_err(|e| classify(path, e))?;

        let revision = revision_of(&resp).unwrap_or_default();
        let mut bytes = Vec::new();
        resp.into_reader()
            .take(MAX_OBJECT_BYTES as u64)
            .read_to_end(&mut bytes)
            .map_err(|e| StoreError::transient(format!("reading {path}: {e}")))?;

        Ok(StoredObject { bytes, revision })
    }

    fn write(&self, path: &str, bytes: &[u8], message: &str) -> Result<String, StoreError> {
        if bytes.len() > MAX_OBJECT_BYTES {
            return Err(StoreError::permanent(format!(
                "object {path} exceeds {MAX_OBJECT_BYTES} bytes"
            )));
        }

        // Replacing an existing object requires its current revision.
        let revision = self.current_revision(path)?;

        let mut body = json!({
            "message": message,
            "content": BASE64.encode(bytes),
        });
        if let Some(rev) = &revision {
            body["revision"] = json!(rev);
        }

        let url = self.object_url(path);
        let resp = self
            .authorize(self.agent.put(&url))
            .send_json(body)
            .map_err(|e| classify(path, e))?;

        let new_revision = revision_of(&resp)
            .or_else(|| {
                resp.into_json::<serde_json::Value>()
                    .ok()
                    .and_then(|v| v.get("revision").and_then(|r| r.as_str()).map(String::from))
            })
            .unwrap_or_default();

        debug!("wrote {path} ({} bytes), revision {new_revision}", bytes.len());
        Ok(new_revision)
    }

    fn delete(&self, path: &str, message: &str) -> Result<(), StoreError> {
        let Some(revision) = self.current_revision(path)? else {
            // Already gone; deletion is idempotent.
            return Ok(());
        };

        let url = self.object_url(path);
        self.authorize(self.agent.delete(&url))
            .send_json(json!({ "message": message, "revision": revision }))
            .map_err(|e| classify(path, e))?;

        Ok(())
    }

    fn url_for(&self, path: &str) -> String {
        self.object_url(path)
    }
}
