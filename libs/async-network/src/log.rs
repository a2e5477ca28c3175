//! Curl-style transcripts of requests and responses.
//!
//! A transcript can be pasted into a shell to replay the call:
//!
//! ```text
//! >>>>>>>>>>Start:2024-02-03 10:15:42
//! curl -X POST 'https://api.example.com/orders' \
//!  -H 'content-type: application/json' \
//!  -d '{"sku":"A-1"}'
//! ------Response:87ms
//! StatusCode:200
//! {"code":0}
//! End<<<<<<<<<<
//! ```

use crate::request::Request;
use crate::response::Response;
use chrono::{DateTime, FixedOffset};
use http::Method;
use std::fmt::Display;

pub const START_MARKER: &str = ">>>>>>>>>>Start:";
pub const END_MARKER: &str = "End<<<<<<<<<<";

/// Bodies longer than this many characters are cut in response transcripts.
pub const BODY_TRUNCATE_THRESHOLD: usize = 10_240;
/// Number of characters kept from a cut body.
pub const BODY_TRUNCATED_LEN: usize = 512;

/// Epoch values above this are read as milliseconds, at or below as seconds.
///
/// In seconds this is the year 2486, so every current millisecond timestamp
/// is above it and every current seconds timestamp is below it.
pub const MILLIS_THRESHOLD: i64 = 16_312_039_620;

/// Transcripts are rendered in UTC+08:00 (Hong Kong, no DST).
const TRANSCRIPT_UTC_OFFSET_SECS: i32 = 8 * 3600;

/// Destination for rendered transcripts.
pub trait LogSink: Send + Sync {
    fn emit(&self, transcript: &str);
}

/// Emits each transcript as one INFO event on target `async_network::transcript`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogSink;

impl LogSink for TracingLogSink {
    fn emit(&self, transcript: &str) {
        tracing::info!(target: "async_network::transcript", "{transcript}");
    }
}

/// Render `epoch` (seconds or milliseconds, see [`MILLIS_THRESHOLD`]) as
/// `yyyy-MM-dd HH:mm:ss` in UTC+08:00. Out-of-range values render empty.
#[must_use]
pub fn format_timestamp(epoch: i64) -> String {
    let secs = if epoch > MILLIS_THRESHOLD {
        epoch.div_euclid(1000)
    } else {
        epoch
    };
    let Some(offset) = FixedOffset::east_opt(TRANSCRIPT_UTC_OFFSET_SECS) else {
        return String::new();
    };
    DateTime::from_timestamp(secs, 0)
        .map(|utc| {
            utc.with_timezone(&offset)
                .format("%Y-%m-%d %H:%M:%S")
                .to_string()
        })
        .unwrap_or_default()
}

/// Curl command for `request`.
///
/// Method, URL and headers come from the raw request the transport saw when
/// there is one, otherwise from the declarative request. Non-GET requests get
/// a `-d` line holding the raw body, or the parameter text when the raw body
/// is absent or not UTF-8.
#[must_use]
pub fn request_transcript(request: &Request) -> String {
    let raw = request.raw_request();
    let method = raw.map_or_else(|| request.method().clone(), |raw| raw.method.clone());
    let url = raw.map_or_else(|| request.url().to_owned(), |raw| raw.uri.to_string());
    let start = request.start().map(format_timestamp).unwrap_or_default();

    let mut lines = vec![
        format!("{START_MARKER}{start}"),
        format!("curl -X {method} '{url}' \\"),
    ];

    if let Some(raw) = raw {
        lines.extend(raw.headers.iter().map(|(name, value)| {
            format!(
                " -H '{name}: {}' \\",
                String::from_utf8_lossy(value.as_bytes())
            )
        }));
    } else {
        lines.extend(
            request
                .header_fields()
                .iter()
                .map(|(name, value)| format!(" -H '{name}: {value}' \\")),
        );
    }

    if method != Method::GET {
        let body = raw
            .and_then(|raw| raw.body_str())
            .map_or_else(|| request.params_text(), str::to_owned);
        lines.push(format!(" -d '{body}' \\"));
    }

    let mut message = lines.join("\n");
    if let Some(stripped) = message.strip_suffix(" \\") {
        message.truncate(stripped.len());
    }
    message
}

/// Request transcript followed by duration, status and body.
#[must_use]
pub fn response_transcript(request: &Request, response: &Response) -> String {
    let duration = response.duration().unwrap_or(-1);
    let body = response.body_string().map(truncate_body).unwrap_or_default();
    format!(
        "{request}\n------Response:{duration}ms\nStatusCode:{status}\n{body}\n{END_MARKER}",
        request = request_transcript(request),
        status = response.status().as_u16(),
    )
}

/// Request transcript followed by elapsed time and the error.
#[must_use]
pub fn error_transcript(request: &Request, elapsed_ms: i64, error: &dyn Display) -> String {
    format!(
        "{request}\n------Error:{elapsed_ms}ms\n{error}\n{END_MARKER}",
        request = request_transcript(request),
    )
}

fn truncate_body(body: &str) -> &str {
    if body.chars().count() <= BODY_TRUNCATE_THRESHOLD {
        return body;
    }
    body.char_indices()
        .nth(BODY_TRUNCATED_LEN)
        .map_or(body, |(end, _)| &body[..end])
}
