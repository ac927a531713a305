//! Blocking GitHub client: authentication, retry/backoff, pagination.
//!
//! Every request goes through one bounded retry loop. Classification of a
//! response into "done / not modified / wait and retry / fail" is a pure
//! function over the status, headers, and body, kept separate from the
//! network call so the policy is unit-testable without a server.

use crate::error::{GhistError, Result};
use crate::model::{IssueState, Milestone};
use crate::remote::wire::{WireComment, WireEvent, WireIssue, WireMilestone};
use crate::remote::{Fetched, IssuePatch, IssueService, Page, RateInfo, Transport};
use chrono::Utc;
use serde_json::Value;
use std::sync::Mutex;
use std::time::Duration;

const API_ROOT: &str = "https://api.github.com";
const USER_AGENT: &str = concat!("ghist/", env!("CARGO_PKG_VERSION"));

/// Maximum retries for transient (5xx) failures.
const MAX_TRANSIENT_RETRIES: u32 = 2;
/// Safety margin added to a declared rate-limit reset time.
const RATE_RESET_MARGIN: Duration = Duration::from_secs(60);
/// Pause after an embedded "rate limit exceeded" message.
const RATE_MESSAGE_PAUSE: Duration = Duration::from_secs(600);
/// Pause after an embedded "submitted too quickly" message.
const ABUSE_MESSAGE_PAUSE: Duration = Duration::from_secs(5);

/// A response reduced to the parts the retry policy inspects.
#[derive(Debug, Clone)]
pub(crate) struct RawResponse {
    pub status: u16,
    /// Lowercased header name/value pairs.
    pub headers: Vec<(String, String)>,
    pub body: String,
    pub url: String,
}

impl RawResponse {
    pub(crate) fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }
}

/// What to do with a response.
#[derive(Debug)]
pub(crate) enum Step {
    Done,
    NotModified,
    Wait(Duration),
    Fail(GhistError),
}

/// Pure retry policy: map one response to the next step.
///
/// `transient_failures` counts 5xx responses seen so far for this request;
/// rate-limit waits do not consume the transient budget.
pub(crate) fn classify(raw: &RawResponse, transient_failures: &mut u32, now: i64) -> Step {
    match raw.status {
        200..=299 => Step::Done,
        304 => Step::NotModified,
        403 if raw.header("x-ratelimit-remaining") == Some("0") => {
            let reset: i64 = raw
                .header("x-ratelimit-reset")
                .and_then(|v| v.parse().ok())
                .unwrap_or(0);
            if reset > 0 {
                let wait = u64::try_from((reset - now).max(0)).unwrap_or(0);
                return Step::Wait(Duration::from_secs(wait) + RATE_RESET_MARGIN);
            }
            Step::Fail(http_error(raw))
        }
        500..=599 => {
            *transient_failures += 1;
            if *transient_failures <= MAX_TRANSIENT_RETRIES {
                Step::Wait(Duration::from_secs(u64::from(*transient_failures) * 2))
            } else {
                Step::Fail(GhistError::RetriesExhausted {
                    url: raw.url.clone(),
                    status: raw.status,
                })
            }
        }
        _ => throttle_delay(&raw.body).map_or_else(|| Step::Fail(http_error(raw)), Step::Wait),
    }
}

fn http_error(raw: &RawResponse) -> GhistError {
    let mut body = raw.body.clone();
    let mut cut = 1000.min(body.len());
    while !body.is_char_boundary(cut) {
        cut -= 1;
    }
    body.truncate(cut);
    GhistError::Http {
        status: raw.status,
        url: raw.url.clone(),
        body,
    }
}

/// Recognize throttling messages embedded in an error reply.
///
/// Quota exhaustion can be a while; abuse throttling clears in seconds.
pub(crate) fn throttle_delay(message: &str) -> Option<Duration> {
    let lower = message.to_ascii_lowercase();
    if lower.contains("rate limit exceeded") || lower.contains("wait a few minutes") {
        return Some(RATE_MESSAGE_PAUSE);
    }
    if lower.contains("submitted too quickly") || lower.contains("too many requests") {
        return Some(ABUSE_MESSAGE_PAUSE);
    }
    None
}

/// An error message embedded in a structurally successful reply.
pub(crate) fn embedded_error(value: &Value) -> Option<String> {
    value
        .get("errors")?
        .get(0)?
        .get("message")?
        .as_str()
        .map(ToString::to_string)
}

/// Extract the `rel="next"` target from a Link header.
pub(crate) fn find_next(link: &str) -> Option<String> {
    for part in link.split(',') {
        let part = part.trim();
        let Some(rest) = part.strip_prefix('<') else {
            continue;
        };
        let Some((url, attrs)) = rest.split_once('>') else {
            continue;
        };
        if attrs.split(';').any(|a| a.trim() == r#"rel="next""#) {
            return Some(url.to_string());
        }
    }
    None
}

/// Drive `attempt` until the policy says stop.
///
/// Returns the final response for both Done and NotModified (callers
/// distinguish by status); network-level errors propagate immediately.
pub(crate) fn fetch_with_retry<F>(mut attempt: F, sleep: &dyn Fn(Duration)) -> Result<RawResponse>
where
    F: FnMut() -> Result<RawResponse>,
{
    let mut transient_failures = 0;
    loop {
        let raw = attempt()?;
        match classify(&raw, &mut transient_failures, Utc::now().timestamp()) {
            Step::Done | Step::NotModified => return Ok(raw),
            Step::Wait(d) => {
                tracing::warn!(url = %raw.url, status = raw.status, secs = d.as_secs(), "backing off");
                sleep(d);
            }
            Step::Fail(e) => return Err(e),
        }
    }
}

/// Percent-encode one URL path segment (labels may contain spaces).
fn encode_segment(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for b in s.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(b as char);
            }
            _ => {
                out.push('%');
                out.push_str(&format!("{b:02X}"));
            }
        }
    }
    out
}

/// An authenticated blocking client for the GitHub REST API.
pub struct Client {
    agent: ureq::Agent,
    token: Option<String>,
    rate: Mutex<RateInfo>,
    sleep: Box<dyn Fn(Duration) + Send + Sync>,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("authenticated", &self.token.is_some())
            .finish_non_exhaustive()
    }
}

impl Client {
    #[must_use]
    pub fn new(token: Option<String>) -> Self {
        Self {
            agent: ureq::AgentBuilder::new()
                .timeout(Duration::from_secs(60))
                .build(),
            token,
            rate: Mutex::new(RateInfo::default()),
            sleep: Box::new(std::thread::sleep),
        }
    }

    fn send(
        &self,
        method: &str,
        url: &str,
        etag: Option<&str>,
        body: Option<&Value>,
    ) -> Result<RawResponse> {
        let mut req = self
            .agent
            .request(method, url)
            .set("Accept", "application/vnd.github+json")
            .set("User-Agent", USER_AGENT);
        if let Some(token) = &self.token {
            req = req.set("Authorization", &format!("Bearer {token}"));
        }
        if let Some(etag) = etag {
            req = req.set("If-None-Match", etag);
        }
        let result = match body {
            Some(v) => req.send_string(&v.to_string()),
            None => req.call(),
        };
        let resp = match result {
            Ok(r) => r,
            Err(ureq::Error::Status(_, r)) => r,
            Err(e) => return Err(GhistError::Transport(e.to_string())),
        };
        let status = resp.status();
        let mut headers = Vec::new();
        for name in resp.headers_names() {
            if let Some(v) = resp.header(&name) {
                headers.push((name.to_ascii_lowercase(), v.to_string()));
            }
        }
        let body = resp
            .into_string()
            .map_err(|e| GhistError::Transport(e.to_string()))?;
        let raw = RawResponse {
            status,
            headers,
            body,
            url: url.to_string(),
        };
        self.note_rate(&raw);
        Ok(raw)
    }

    fn note_rate(&self, raw: &RawResponse) {
        let field = |name: &str| raw.header(name).and_then(|v| v.parse().ok());
        let (Some(limit), Some(remaining), Some(reset)) = (
            field("x-ratelimit-limit"),
            field("x-ratelimit-remaining"),
            field("x-ratelimit-reset"),
        ) else {
            return;
        };
        if let Ok(mut rate) = self.rate.lock() {
            *rate = RateInfo {
                limit,
                remaining,
                reset,
            };
        }
    }

    /// One API call with retry, returning the parsed reply body.
    ///
    /// Error messages embedded in a 200 reply are inspected: throttling
    /// messages re-enter the retry loop, anything else surfaces with the
    /// raw message preserved.
    fn call_api(&self, method: &str, url: &str, body: Option<&Value>) -> Result<Value> {
        loop {
            let raw = fetch_with_retry(|| self.send(method, url, None, body), &self.sleep)?;
            if raw.status == 304 {
                return Ok(Value::Null);
            }
            let value: Value = if raw.body.trim().is_empty() {
                Value::Null
            } else {
                serde_json::from_str(&raw.body)?
            };
            if let Some(message) = embedded_error(&value) {
                if let Some(d) = throttle_delay(&message) {
                    tracing::warn!(url, %message, "throttled; pausing");
                    (self.sleep)(d);
                    continue;
                }
                return Err(GhistError::Api { message });
            }
            return Ok(value);
        }
    }

    /// Collect every item of a paginated array endpoint.
    fn get_all(&self, start: &str) -> Result<Vec<Value>> {
        let mut items = Vec::new();
        let mut url = start.to_string();
        while !url.is_empty() {
            match self.fetch_page(&url, None)? {
                Fetched::NotModified => break,
                Fetched::Page(page) => {
                    items.extend(page.items);
                    url = page.next.unwrap_or_default();
                }
            }
        }
        Ok(items)
    }

    fn issue_url(project: &str, number: i64, rest: &str) -> String {
        format!("{API_ROOT}/repos/{project}/issues/{number}{rest}")
    }
}

impl Transport for Client {
    fn fetch_page(&self, url: &str, etag: Option<&str>) -> Result<Fetched> {
        let raw = fetch_with_retry(|| self.send("GET", url, etag, None), &self.sleep)?;
        if raw.status == 304 {
            return Ok(Fetched::NotModified);
        }
        let items: Vec<Value> = serde_json::from_str(&raw.body)?;
        tracing::debug!(url, items = items.len(), "fetched page");
        let next = raw.header("link").and_then(|l| find_next(l));
        let etag = raw.header("etag").map(ToString::to_string);
        Ok(Fetched::Page(Page { items, next, etag }))
    }
}

impl IssueService for Client {
    fn get_issue(&self, project: &str, number: i64) -> Result<IssueState> {
        let value = self.call_api("GET", &Self::issue_url(project, number, ""), None)?;
        let wire: WireIssue = serde_json::from_value(value)?;
        Ok(wire.into())
    }

    fn search_issues(&self, project: &str, query: &str) -> Result<Vec<IssueState>> {
        let q = format!("type:issue state:open repo:{project} {query}")
            .trim()
            .replace(' ', "+");
        let mut all = Vec::new();
        for page in 1.. {
            let url = format!("{API_ROOT}/search/issues?q={q}&per_page=100&page={page}");
            let value = self.call_api("GET", &url, None)?;
            let items = value
                .get("items")
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default();
            let n = items.len();
            for item in items {
                let wire: WireIssue = serde_json::from_value(item)?;
                if wire.pull_request.is_none() {
                    all.push(wire.into());
                }
            }
            if n < 100 {
                break;
            }
        }
        Ok(all)
    }

    fn list_comments(&self, project: &str, number: i64) -> Result<Vec<WireComment>> {
        let url = Self::issue_url(project, number, "/comments?page=1&per_page=100");
        self.get_all(&url)?
            .into_iter()
            .map(|v| serde_json::from_value(v).map_err(Into::into))
            .collect()
    }

    fn list_issue_events(&self, project: &str, number: i64) -> Result<Vec<WireEvent>> {
        let url = Self::issue_url(project, number, "/events?page=1&per_page=100");
        self.get_all(&url)?
            .into_iter()
            .map(|v| serde_json::from_value(v).map_err(Into::into))
            .collect()
    }

    fn list_milestones(&self, project: &str) -> Result<Vec<Milestone>> {
        let url = format!("{API_ROOT}/repos/{project}/milestones?state=open");
        let value = self.call_api("GET", &url, None)?;
        let wires: Vec<WireMilestone> = serde_json::from_value(value)?;
        Ok(wires.into_iter().map(Into::into).collect())
    }

    fn create_issue(&self, project: &str, patch: &IssuePatch) -> Result<IssueState> {
        let url = format!("{API_ROOT}/repos/{project}/issues");
        let value = self.call_api("POST", &url, Some(&patch.to_json()))?;
        let wire: WireIssue = serde_json::from_value(value)?;
        Ok(wire.into())
    }

    fn edit_issue(&self, project: &str, number: i64, patch: &IssuePatch) -> Result<()> {
        let url = Self::issue_url(project, number, "");
        self.call_api("PATCH", &url, Some(&patch.to_json()))?;
        Ok(())
    }

    fn add_labels(&self, project: &str, number: i64, labels: &[String]) -> Result<()> {
        let url = Self::issue_url(project, number, "/labels");
        self.call_api("POST", &url, Some(&Value::from(labels.to_vec())))?;
        Ok(())
    }

    fn remove_label(&self, project: &str, number: i64, label: &str) -> Result<()> {
        let url = Self::issue_url(project, number, &format!("/labels/{}", encode_segment(label)));
        self.call_api("DELETE", &url, None)?;
        Ok(())
    }

    fn create_comment(&self, project: &str, number: i64, body: &str) -> Result<()> {
        let url = Self::issue_url(project, number, "/comments");
        self.call_api("POST", &url, Some(&serde_json::json!({ "body": body })))?;
        Ok(())
    }

    fn rate(&self) -> RateInfo {
        self.rate.lock().map(|r| *r).unwrap_or_default()
    }
}
