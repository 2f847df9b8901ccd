//! HTTP measurement task
//!
//! Issues exactly one HTTP request, measures wall-clock latency for the
//! transfer, captures a size-bounded prefix of the response body and headers,
//! and reports incremental progress while streaming. Success means status
//! 200 exactly; any other status is a reportable outcome carried in the
//! result's `code` field, while transport failures abort the run with a
//! classified error.
//!
//! Redirects are never followed; a 3xx is recorded like any other non-200
//! status. Retry and backoff belong to the caller.

use crate::context::RunContext;
use crate::error::{Error, Result};
use crate::report::MeasurementResult;
use crate::task::{MeasurementTask, TaskDescriptor, TaskSchedule};
use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use futures::StreamExt;
use std::collections::HashMap;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Task type tag for HTTP measurements
pub const TYPE: &str = "http";

/// Human-readable variant name
pub const DESCRIPTOR: &str = "HTTP";

/// Request method parsed from the descriptor
///
/// Parsing never fails: anything that matches none of the supported verbs is
/// preserved as [`HttpMethod::Unsupported`], which the executor detects and
/// refuses to run before any network I/O.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HttpMethod {
    /// HEAD request
    Head,
    /// GET request (the default)
    Get,
    /// POST request carrying the descriptor body verbatim
    Post,
    /// Anything else, kept verbatim for the error message
    Unsupported(String),
}

impl HttpMethod {
    /// Case-insensitive parse; a missing value defaults to GET
    fn parse(raw: Option<&str>) -> Self {
        match raw {
            None => HttpMethod::Get,
            Some(m) if m.eq_ignore_ascii_case("head") => HttpMethod::Head,
            Some(m) if m.eq_ignore_ascii_case("get") => HttpMethod::Get,
            Some(m) if m.eq_ignore_ascii_case("post") => HttpMethod::Post,
            Some(other) => HttpMethod::Unsupported(other.to_string()),
        }
    }

    /// Verb text for display
    pub fn as_str(&self) -> &str {
        match self {
            HttpMethod::Head => "head",
            HttpMethod::Get => "get",
            HttpMethod::Post => "post",
            HttpMethod::Unsupported(raw) => raw,
        }
    }
}

/// Validated, immutable description of one HTTP measurement
#[derive(Clone, Debug)]
pub struct HttpDesc {
    /// Target URL, always scheme-qualified after parsing
    pub url: String,
    /// Request method
    pub method: HttpMethod,
    /// Raw CRLF-separated `Name:Value` header block, parsed at execution time
    pub headers: Option<String>,
    /// Request body, attached verbatim for POST only
    pub body: Option<String>,
    /// Scheduling fields, passed through unchanged
    pub schedule: TaskSchedule,
}

impl HttpDesc {
    /// Parse and validate a raw parameter map
    ///
    /// An absent map yields all-empty fields; the empty-URL rejection below
    /// is the single validation gate and always runs. URL well-formedness is
    /// not checked here; malformed URLs surface as execution-time errors.
    pub fn parse(
        schedule: TaskSchedule,
        params: Option<&HashMap<String, String>>,
    ) -> Result<Self> {
        let mut url = String::new();
        let mut method = HttpMethod::Get;
        let mut headers = None;
        let mut body = None;

        if let Some(params) = params {
            if let Some(raw) = params.get("url") {
                url = normalize_url(raw);
            }
            method = HttpMethod::parse(params.get("method").map(String::as_str));
            headers = params.get("headers").cloned();
            body = params.get("body").cloned();
        }

        if url.is_empty() {
            return Err(Error::InvalidParameter {
                message: "URL for http task is empty".to_string(),
            });
        }

        Ok(Self {
            url,
            method,
            headers,
            body,
            schedule,
        })
    }
}

/// Prepend `http://` unless the raw value already carries an explicit scheme
///
/// A simple case-sensitive prefix check, applied exactly once. Empty input
/// stays empty so the construction gate rejects it.
fn normalize_url(raw: &str) -> String {
    if raw.is_empty() || raw.starts_with("http://") || raw.starts_with("https://") {
        raw.to_string()
    } else {
        format!("http://{raw}")
    }
}

/// The HTTP measurement task: a descriptor plus the probe that executes it
#[derive(Debug)]
pub struct HttpTask {
    desc: HttpDesc,
    client: reqwest::Client,
}

impl HttpTask {
    /// Create a task from a validated descriptor
    pub fn new(desc: HttpDesc) -> Result<Self> {
        // One attempt per run: redirects are classified, never followed
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| Error::measurement(TYPE, vec![e.to_string()]))?;
        Ok(Self { desc, client })
    }

    /// Parse an untyped descriptor and create the task
    pub fn from_descriptor(descriptor: &TaskDescriptor) -> Result<Self> {
        let desc = HttpDesc::parse(descriptor.schedule.clone(), descriptor.parameters.as_ref())?;
        Self::new(desc)
    }

    /// The descriptor this task runs
    pub fn desc(&self) -> &HttpDesc {
        &self.desc
    }

    /// Build the request for this run, headers attached, deadline applied
    ///
    /// Fails before any network I/O on an unsupported method or a malformed
    /// header line.
    fn build_request(&self, ctx: &RunContext) -> Result<reqwest::RequestBuilder> {
        let builder = match &self.desc.method {
            HttpMethod::Head => self.client.head(&self.desc.url),
            HttpMethod::Get => self.client.get(&self.desc.url),
            HttpMethod::Post => self
                .client
                .post(&self.desc.url)
                .body(self.desc.body.clone().unwrap_or_default()),
            HttpMethod::Unsupported(raw) => {
                return Err(Error::UnsupportedMethod {
                    method: raw.clone(),
                });
            }
        };
        let builder = builder.timeout(ctx.config.request_timeout);

        match &self.desc.headers {
            Some(block) if !block.trim().is_empty() => attach_headers(builder, block),
            _ => Ok(builder),
        }
    }
}

/// Strict all-or-nothing header parsing
///
/// Each CRLF-separated line must split on `:` into exactly two tokens; no
/// trimming is applied to either token. One bad line fails the whole run
/// before the request is sent.
fn attach_headers(
    mut builder: reqwest::RequestBuilder,
    block: &str,
) -> Result<reqwest::RequestBuilder> {
    for line in block.split("\r\n") {
        let tokens: Vec<&str> = line.split(':').collect();
        match tokens.as_slice() {
            [name, value] => builder = builder.header(*name, *value),
            _ => {
                return Err(Error::MalformedHeader {
                    line: line.to_string(),
                });
            }
        }
    }
    Ok(builder)
}

#[async_trait]
impl MeasurementTask for HttpTask {
    fn type_name(&self) -> &'static str {
        TYPE
    }

    fn schedule(&self) -> &TaskSchedule {
        &self.desc.schedule
    }

    fn describe(&self) -> String {
        let next_run = self
            .desc
            .schedule
            .start_time
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| "unscheduled".to_string());
        format!(
            "[{} {}]\n  Target: {}\n  Interval (sec): {}\n  Next run: {}",
            DESCRIPTOR,
            self.desc.method.as_str(),
            self.desc.url,
            self.desc.schedule.interval_secs,
            next_run
        )
    }

    async fn execute(&self, ctx: &RunContext) -> Result<MeasurementResult> {
        let cfg = &ctx.config;
        let task_key = self.desc.schedule.key.as_deref();
        let mut causes: Vec<String> = Vec::new();

        let request = self.build_request(ctx)?;

        let started = Instant::now();
        let response = tokio::select! {
            _ = ctx.cancel.cancelled() => return Err(Error::Cancelled),
            sent = request.send() => match sent {
                Ok(response) => response,
                Err(e) => {
                    warn!(url = %self.desc.url, error = %e, "http request failed");
                    causes.push(e.to_string());
                    return Err(Error::measurement(TYPE, causes));
                }
            },
        };

        // A status line is not guaranteed by every transport; absent one,
        // the configured sentinel is recorded.
        let status_code = match response.status().as_u16() {
            0 => cfg.default_status_code,
            code => code,
        };
        let success = status_code == 200;

        // Progress denominator: the declared content length when positive,
        // the hard response cap otherwise.
        let expected_len = match response.content_length() {
            Some(len) if len > 0 => len,
            _ => cfg.max_response_bytes,
        };

        // The stream is drained even on non-200 so the connection is never
        // left holding unread data. Dropping the stream on any exit path
        // closes it.
        let response_headers = response.headers().clone();
        let mut stream = response.bytes_stream();
        let mut capture: Vec<u8> = Vec::with_capacity(cfg.max_capture_bytes);
        let mut total_body_len: u64 = 0;

        loop {
            if total_body_len > cfg.max_response_bytes {
                debug!(
                    url = %self.desc.url,
                    total_body_len,
                    "response cap reached, stopping read"
                );
                break;
            }
            let chunk = tokio::select! {
                _ = ctx.cancel.cancelled() => return Err(Error::Cancelled),
                read = stream.next() => match read {
                    Some(Ok(bytes)) => bytes,
                    None => break,
                    Some(Err(e)) => {
                        warn!(url = %self.desc.url, error = %e, "body read failed");
                        causes.push(e.to_string());
                        return Err(Error::measurement(TYPE, causes));
                    }
                },
            };

            total_body_len += chunk.len() as u64;
            let room = cfg.max_capture_bytes.saturating_sub(capture.len());
            if room > 0 {
                let take = room.min(chunk.len());
                capture.extend_from_slice(&chunk[..take]);
            }

            let percent = (100 * total_body_len / expected_len) as u32;
            ctx.progress
                .report(task_key, percent.min(cfg.max_progress_percent));
        }
        let elapsed = started.elapsed();

        // Header text reconstruction. Serialized length assumes one byte per
        // character, an approximation of wire-format size rather than an
        // exact byte count.
        let mut headers_text = String::new();
        let mut headers_len: u64 = 0;
        for (name, value) in &response_headers {
            let line = format!("{}: {}", name, String::from_utf8_lossy(value.as_bytes()));
            headers_len += line.len() as u64;
            headers_text.push_str(&line);
            headers_text.push_str("\r\n");
        }

        let mut result = MeasurementResult::new(
            ctx.device.device_id(),
            TYPE,
            self.desc.schedule.key.clone(),
            ctx.clock.now(),
            success,
        );
        result.add_field("code", i64::from(status_code));
        if success {
            result.add_field("time_ms", elapsed.as_millis() as i64);
            result.add_field("headers_len", headers_len as i64);
            result.add_field("body_len", total_body_len as i64);
            result.add_field("headers", headers_text);
            result.add_field("body", BASE64.encode(&capture));
        }

        info!(
            url = %self.desc.url,
            code = status_code,
            success,
            body_len = total_body_len,
            elapsed_ms = elapsed.as_millis() as u64,
            "http measurement finished"
        );
        Ok(result)
    }

    fn clone_task(&self) -> Box<dyn MeasurementTask> {
        Box::new(Self {
            desc: self.desc.clone(),
            client: self.client.clone(),
        })
    }
}
