//! Byte-range document fetching.
//!
//! Remote documents are pulled with partial-content HTTP semantics: a small
//! probe validates the header magic and learns the total length before any
//! real bandwidth is committed, then the body arrives in bounded range
//! chunks with cancellation and progress between chunks. A server that
//! ignores `Range` and answers 200 short-circuits the chunk loop, whether
//! that happens at the probe or mid-download.

use std::io::Read;
use std::time::Duration;

use log::debug;

use crate::error::FetchError;
use crate::resilience::{CancelFlag, RetryPolicy, with_retry};

const PDF_MAGIC: &[u8] = b"%PDF";
const PROBE_BYTES: u64 = 1024;

/// One ranged response: the body plus what the server said about the object.
#[derive(Clone, Debug)]
pub struct RangeResponse {
    pub bytes: Vec<u8>,
    /// Total object length, when the server reported one.
    pub total_len: Option<u64>,
    /// True when the server answered 200 and `bytes` is the whole object.
    pub complete: bool,
}

/// What the initial ranged probe learned about a remote document.
#[derive(Clone, Debug)]
pub struct Probe {
    /// Total object length, when the server reported one.
    pub total_len: Option<u64>,
    /// Bytes already fetched by the probe (a prefix of the object).
    pub prefix: Vec<u8>,
    /// True when the server answered 200 and `prefix` is the whole object.
    pub complete: bool,
}

/// Transport under the fetcher, behind a trait so the probe and chunk
/// reassembly logic can be exercised without a network.
pub trait RangeTransport {
    /// Fetch one inclusive byte range.
    fn get_range(&self, url: &str, start: u64, end: u64) -> Result<RangeResponse, FetchError>;

    /// Fetch the whole object in one unranged request.
    fn get_full(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

/// ureq-backed transport.
pub struct HttpTransport {
    agent: ureq::Agent,
}

impl HttpTransport {
    #[must_use]
    pub fn new(connect_timeout: Duration, read_timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(connect_timeout)
            .timeout_read(read_timeout)
            .build();
        Self { agent }
    }
}

impl RangeTransport for HttpTransport {
    fn get_range(&self, url: &str, start: u64, end: u64) -> Result<RangeResponse, FetchError> {
        let resp = self
            .agent
            .get(url)
            .set("Range", &format!("bytes={start}-{end}"))
            .call()
            .map_err(|e| match e {
                ureq::Error::Status(code, resp) => FetchError::io(format!(
                    "GET {url} bytes={start}-{end}: {code} {}",
                    resp.status_text()
                )),
                ureq::Error::Transport(t) => FetchError::io(t.to_string()),
            })?;

        let status = resp.status();
        let total_len = if status == 206 {
            // Content-Range: bytes 0-1023/12345
            resp.header("content-range")
                .and_then(|v| v.rsplit('/').next())
                .and_then(|total| total.parse::<u64>().ok())
        } else {
            resp.header("content-length")
                .and_then(|v| v.parse::<u64>().ok())
        };

        let mut bytes = Vec::new();
        resp.into_reader()
            .read_to_end(&mut bytes)
            .map_err(|e| FetchError::io(format!("reading range body: {e}")))?;

        Ok(RangeResponse {
            bytes,
            total_len,
            // A 200 answer means the server ignored the range and sent
            // everything.
            complete: status == 200,
        })
    }

    fn get_full(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let resp = self.agent.get(url).call().map_err(|e| match e {
            ureq::Error::Status(code, resp) => {
                FetchError::io(format!("GET {url}: {code} {}", resp.status_text()))
            }
            ureq::Error::Transport(t) => FetchError::io(t.to_string()),
        })?;

        let mut bytes = Vec::new();
        resp.into_reader()
            .read_to_end(&mut bytes)
            .map_err(|e| FetchError::io(format!("reading body: {e}")))?;
        Ok(bytes)
    }
}

pub struct RangeFetcher<T: RangeTransport = HttpTransport> {
    transport: T,
    chunk_size: usize,
    retry: RetryPolicy,
}

impl RangeFetcher<HttpTransport> {
    #[must_use]
    pub fn new(
        chunk_size: usize,
        retry: RetryPolicy,
        connect_timeout: Duration,
        read_timeout: Duration,
    ) -> Self {
        Self::with_transport(
            HttpTransport::new(connect_timeout, read_timeout),
            chunk_size,
            retry,
        )
    }
}

impl<T: RangeTransport> RangeFetcher<T> {
    #[must_use]
    pub fn with_transport(transport: T, chunk_size: usize, retry: RetryPolicy) -> Self {
        Self {
            transport,
            chunk_size: chunk_size.max(1024),
            retry,
        }
    }

    /// Probe the start of the document: enough bytes to validate the magic
    /// and learn the total length, nothing more.
    pub fn probe(&self, url: &str) -> Result<Probe, FetchError> {
        let resp = with_retry(
            &self.retry,
            "document probe",
            FetchError::is_transient,
            || self.transport.get_range(url, 0, PROBE_BYTES - 1),
        )?;

        if !resp.bytes.starts_with(PDF_MAGIC) {
            return Err(FetchError::unsupported(
                "missing %PDF header in first bytes",
            ));
        }

        debug!(
            "probed {url}: {} prefix bytes, total {:?}",
            resp.bytes.len(),
            resp.total_len
        );
        Ok(Probe {
            total_len: resp.total_len,
            prefix: resp.bytes,
            complete: resp.complete,
        })
    }

    /// Fetch the whole document via ranged chunks, reporting fraction
    /// complete after each chunk. Checks `cancel` between chunks.
    pub fn fetch_all(
        &self,
        url: &str,
        cancel: &CancelFlag,
        progress: &mut dyn FnMut(f32),
    ) -> Result<Vec<u8>, FetchError> {
        let probe = self.probe(url)?;
        let mut body = probe.prefix;

        if probe.complete {
            progress(1.0);
            return Ok(body);
        }

        let Some(total) = probe.total_len else {
            // No length reported; fall back to one unranged request.
            let bytes = with_retry(
                &self.retry,
                "full document fetch",
                FetchError::is_transient,
                || self.transport.get_full(url),
            )?;
            progress(1.0);
            return Ok(bytes);
        };

        while (body.len() as u64) < total {
            if cancel.is_cancelled() {
                return Err(FetchError::Cancelled);
            }

            let start = body.len() as u64;
            let end = (start + self.chunk_size as u64 - 1).min(total - 1);
            let resp = with_retry(
                &self.retry,
                "document chunk fetch",
                FetchError::is_transient,
                || self.transport.get_range(url, start, end),
            )?;

            if resp.complete {
                // The server stopped honoring ranges mid-download and sent
                // the whole object; it supersedes the reassembled prefix.
                body = resp.bytes;
                progress(1.0);
                break;
            }

            if resp.bytes.is_empty() {
                return Err(FetchError::io(format!(
                    "server returned empty range at byte {start} of {total}"
                )));
            }
            let requested = (end - start + 1) as usize;
            if resp.bytes.len() > requested {
                return Err(FetchError::io(format!(
                    "server returned {} bytes for a {requested}-byte range at byte {start}",
                    resp.bytes.len()
                )));
            }

            body.extend_from_slice(&resp.bytes);
            progress((body.len() as f64 / total as f64) as f32);
        }

        body.truncate(total as usize);
        Ok(body)
    }
}
