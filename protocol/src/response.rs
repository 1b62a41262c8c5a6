//! GNTP response frame parsing
//!
//! A response is an info line followed by a CRLF header block. `-OK`
//! and `-CALLBACK` frames become a [`Response`]; anything else is an
//! error frame and surfaces as [`GrowlError::Server`] with the code
//! mapped through the condition table. Header values are coerced to
//! types by header name, matching what servers actually send.

use std::collections::HashMap;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};

use crate::error::{GrowlError, ServerCondition};

/// A header value after name-driven type coercion.
#[derive(Debug, Clone, PartialEq)]
pub enum HeaderValue {
    Bool(bool),
    Int(i64),
    Timestamp(DateTime<FixedOffset>),
    Text(String),
    Url(String),
    Null,
}

/// Parsed response headers, keyed by header name.
pub type Headers = HashMap<String, HeaderValue>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseStatus {
    /// `-OK`: the request was accepted
    Ok,
    /// `-CALLBACK`: the user interacted with a notification
    Callback,
}

/// A successful (non-error) response frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: ResponseStatus,
    pub headers: Headers,
}

/// Decomposed first line of a GNTP frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InfoLine {
    pub version: String,
    pub status: String,
    pub encryption: String,
    pub key_info: Option<String>,
}

/// Splits an info line into its space-separated sections. Responses
/// never carry key info, but requests echoed by test servers do, so
/// a fourth section is tolerated.
pub fn parse_info_line(line: &str) -> Result<InfoLine, GrowlError> {
    let malformed = || GrowlError::MalformedResponse(line.to_string());

    let mut sections = line.split(' ');

    let proto = sections.next().ok_or_else(malformed)?;
    let version = proto.strip_prefix("GNTP/").ok_or_else(malformed)?;
    if version.is_empty() || !version.chars().all(|c| c.is_ascii_digit() || c == '.') {
        return Err(malformed());
    }

    let status = sections.next().ok_or_else(malformed)?;
    let encryption = sections.next().ok_or_else(malformed)?;
    let key_info = sections.next().map(str::to_string);

    if sections.next().is_some() {
        return Err(malformed());
    }

    Ok(InfoLine {
        version: version.to_string(),
        status: status.to_string(),
        encryption: encryption.to_string(),
        key_info,
    })
}

/// Parses a complete response frame.
pub fn parse_response(packet: &[u8]) -> Result<Response, GrowlError> {
    let text = String::from_utf8_lossy(packet);
    let text = text.trim_matches(|c| c == '\r' || c == '\n');

    let mut lines = text.split("\r\n");
    let info = parse_info_line(lines.next().unwrap_or_default())?;

    let mut headers = Headers::new();
    for line in lines {
        if line.is_empty() {
            continue;
        }
        let (name, value) = line.split_once(": ").unwrap_or((line, ""));
        headers.insert(name.to_string(), parse_header(name, value));
    }

    match info.status.as_str() {
        "-OK" => Ok(Response {
            status: ResponseStatus::Ok,
            headers,
        }),
        "-CALLBACK" => Ok(Response {
            status: ResponseStatus::Callback,
            headers,
        }),
        _ => Err(server_error(headers)),
    }
}

/// Builds the error for a non-OK frame from its parsed headers.
fn server_error(headers: Headers) -> GrowlError {
    let code = match headers.get("Error-Code") {
        Some(HeaderValue::Int(code)) => *code,
        _ => -1,
    };
    let description = match headers.get("Error-Description") {
        Some(HeaderValue::Text(text)) => text.clone(),
        _ => String::new(),
    };

    GrowlError::Server {
        code,
        condition: ServerCondition::from_code(code),
        description,
        headers,
    }
}

/// Coerces a header value based on the header's name. Values that fail
/// coercion are kept as text rather than dropped; `(null)` becomes
/// [`HeaderValue::Null`] regardless of name.
pub fn parse_header(name: &str, value: &str) -> HeaderValue {
    if value == "(null)" {
        return HeaderValue::Null;
    }

    match name {
        "Notification-Enabled" | "Notification-Sticky" => parse_bool(value),
        "Error-Code"
        | "Notifications-Count"
        | "Notifications-Priority"
        | "Subscriber-Port"
        | "Subscription-TTL" => match value.parse() {
            Ok(int) => HeaderValue::Int(int),
            Err(_) => HeaderValue::Text(value.to_string()),
        },
        "Notification-Callback-Timestamp" => match parse_timestamp(value) {
            Some(timestamp) => HeaderValue::Timestamp(timestamp),
            None => HeaderValue::Text(value.to_string()),
        },
        "Application-Icon" | "Notification-Icon" => HeaderValue::Url(value.to_string()),
        _ => HeaderValue::Text(value.to_string()),
    }
}

fn parse_bool(value: &str) -> HeaderValue {
    if value.eq_ignore_ascii_case("true") || value.eq_ignore_ascii_case("yes") {
        HeaderValue::Bool(true)
    } else if value.eq_ignore_ascii_case("false") || value.eq_ignore_ascii_case("no") {
        HeaderValue::Bool(false)
    } else {
        HeaderValue::Text(value.to_string())
    }
}

/// Servers disagree on timestamp formats; try the common ones from
/// most to least specific.
fn parse_timestamp(value: &str) -> Option<DateTime<FixedOffset>> {
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(value) {
        return Some(timestamp);
    }
    if let Ok(timestamp) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S") {
        return Some(timestamp.and_utc().fixed_offset());
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Some(date.and_hms_opt(0, 0, 0)?.and_utc().fixed_offset());
    }
    None
}
