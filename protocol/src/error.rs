//! Protocol error types

use thiserror::Error;

use crate::response::Headers;

#[derive(Error, Debug)]
pub enum GrowlError {
    #[error("invalid priority level {0}")]
    InvalidPriority(i8),

    #[error("unknown notification type: {0}")]
    UnknownNotification(String),

    #[error("provide either a url or a handler for callbacks, not both")]
    AmbiguousCallback,

    #[error("unknown GNTP encryption mode: {0}")]
    UnsupportedCipher(String),

    #[error("encryption requires a session password")]
    MissingPassword,

    #[error("key material too short for cipher (expected {expected}, got {got})")]
    InvalidKeyLength { expected: usize, got: usize },

    #[error("decryption failed (bad padding or corrupted data)")]
    DecryptionFailed,

    #[error("{field} too long for packet field ({len} bytes)")]
    FieldTooLong { field: &'static str, len: usize },

    #[error("malformed GNTP response: {0}")]
    MalformedResponse(String),

    /// Error frame reported by the server. Carries the numeric code, the
    /// mapped condition, the Error-Description text and the full parsed
    /// header mapping for caller inspection.
    #[error("GNTP error {code} ({condition}): {description}")]
    Server {
        code: i64,
        condition: ServerCondition,
        description: String,
        headers: Headers,
    },
}

/// Named server-reported error conditions, mapped from the GNTP
/// Error-Code header. Codes absent from the table are a protocol
/// violation rather than a crash.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerCondition {
    /// 200 - the server timed out waiting for the request to complete
    TimedOut,
    /// 201 - the server was unavailable or unreachable
    NetworkFailure,
    /// 300 - the request was malformed
    InvalidRequest,
    /// 301 - the request given was not a GNTP request
    UnknownProtocol,
    /// 302 - the request used an unknown GNTP protocol version
    UnknownProtocolVersion,
    /// 303 - the request is missing a required header
    RequiredHeaderMissing,
    /// 400 - missing or wrong password, or otherwise not authorized
    NotAuthorized,
    /// 401 - the application is not registered to send notifications
    UnknownApplication,
    /// 402 - the notification type was not registered
    UnknownNotification,
    /// 403 - the original request was already received by this server
    AlreadyProcessed,
    /// 404 - the notification type was registered but disabled
    NotificationDisabled,
    /// 500 - the server had an internal error
    InternalServerError,
    /// Any error code not in the table above
    ProtocolViolation,
}

impl ServerCondition {
    pub fn from_code(code: i64) -> Self {
        match code {
            200 => ServerCondition::TimedOut,
            201 => ServerCondition::NetworkFailure,
            300 => ServerCondition::InvalidRequest,
            301 => ServerCondition::UnknownProtocol,
            302 => ServerCondition::UnknownProtocolVersion,
            303 => ServerCondition::RequiredHeaderMissing,
            400 => ServerCondition::NotAuthorized,
            401 => ServerCondition::UnknownApplication,
            402 => ServerCondition::UnknownNotification,
            403 => ServerCondition::AlreadyProcessed,
            404 => ServerCondition::NotificationDisabled,
            500 => ServerCondition::InternalServerError,
            _ => ServerCondition::ProtocolViolation,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ServerCondition::TimedOut => "timed out",
            ServerCondition::NetworkFailure => "network failure",
            ServerCondition::InvalidRequest => "invalid request",
            ServerCondition::UnknownProtocol => "unknown protocol",
            ServerCondition::UnknownProtocolVersion => "unknown protocol version",
            ServerCondition::RequiredHeaderMissing => "required header missing",
            ServerCondition::NotAuthorized => "not authorized",
            ServerCondition::UnknownApplication => "unknown application",
            ServerCondition::UnknownNotification => "unknown notification",
            ServerCondition::AlreadyProcessed => "already processed",
            ServerCondition::NotificationDisabled => "notification disabled",
            ServerCondition::InternalServerError => "internal server error",
            ServerCondition::ProtocolViolation => "protocol violation",
        }
    }
}

impl std::fmt::Display for ServerCondition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
