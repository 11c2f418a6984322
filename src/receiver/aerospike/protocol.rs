//! Aerospike info and admin message framing.
//!
//! Every message starts with an 8-byte header: protocol version, message
//! type and a 48-bit big-endian body length. Info bodies are newline-separated
//! command names; info replies are `name\tvalue` lines. Admin bodies start
//! with a 16-byte header whose second byte carries the result code.

use std::collections::HashMap;

use thiserror::Error;

use crate::scraper::parse::sanitize_utf8;

/// Protocol version written in every header.
pub const PROTO_VERSION: u8 = 2;

/// Length of the message header.
pub const HEADER_LEN: usize = 8;

/// Length of the admin header that prefixes admin bodies.
pub const ADMIN_HEADER_LEN: usize = 16;

/// Upper bound on an accepted body; anything larger is a framing error.
pub const MAX_BODY_LEN: usize = 128 * 1024 * 1024;

const LENGTH_MASK: u64 = 0xFFFF_FFFF_FFFF;

/// Admin command: authenticate.
pub const LOGIN: u8 = 20;

/// Admin field: user name.
pub const FIELD_USER: u8 = 0;

/// Admin field: bcrypt-hashed password.
pub const FIELD_CREDENTIAL: u8 = 3;

/// Admin field: clear-text password, sent only for external authentication.
pub const FIELD_CLEAR_PASSWORD: u8 = 4;

/// Fixed bcrypt salt shared by all Aerospike clients (`$2a$10$7EqJtq98hPqEX7fNZaFWoO`).
const PASSWORD_SALT: [u8; 16] = [
    0xf4, 0x6b, 0x0b, 0xbe, 0xcf, 0xfe, 0x8d, 0x1b, 0x06, 0x67, 0xd8, 0x4f, 0x6d, 0xc1, 0xd8, 0xa9,
];

const PASSWORD_COST: u32 = 10;

/// Command name to raw value, for one info round trip.
pub type RawResponse = HashMap<String, String>;

/// Framing errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("unsupported protocol version {0}")]
    UnsupportedVersion(u8),

    #[error("unknown message type {0}")]
    UnknownType(u8),

    #[error("message body of {0} bytes exceeds limit")]
    TooLarge(usize),

    #[error("admin reply shorter than its header ({0} bytes)")]
    TruncatedAdmin(usize),

    #[error("unexpected {0:?} reply")]
    UnexpectedType(MessageType),
}

/// Message type carried in the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    Info = 1,
    Admin = 2,
}

impl TryFrom<u8> for MessageType {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Info),
            2 => Ok(Self::Admin),
            other => Err(ProtocolError::UnknownType(other)),
        }
    }
}

/// Decoded message header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub kind: MessageType,
    pub length: usize,
}

impl Header {
    pub fn new(kind: MessageType, length: usize) -> Self {
        Self { kind, length }
    }

    pub fn encode(&self) -> [u8; HEADER_LEN] {
        let word = ((PROTO_VERSION as u64) << 56)
            | ((self.kind as u64) << 48)
            | (self.length as u64 & LENGTH_MASK);
        word.to_be_bytes()
    }

    pub fn decode(bytes: &[u8; HEADER_LEN]) -> Result<Self, ProtocolError> {
        let word = u64::from_be_bytes(*bytes);
        let version = (word >> 56) as u8;
        if version != PROTO_VERSION {
            return Err(ProtocolError::UnsupportedVersion(version));
        }
        let kind = MessageType::try_from((word >> 48) as u8)?;
        let length = (word & LENGTH_MASK) as usize;
        if length > MAX_BODY_LEN {
            return Err(ProtocolError::TooLarge(length));
        }
        Ok(Self { kind, length })
    }
}

/// Server result code from an admin reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResultCode(pub u8);

impl ResultCode {
    pub const OK: Self = Self(0);
    pub const SECURITY_NOT_ENABLED: Self = Self(52);
    pub const INVALID_USER: Self = Self(60);
    pub const INVALID_CREDENTIAL: Self = Self(65);
    pub const EXPIRED_SESSION: Self = Self(66);
    pub const NOT_AUTHENTICATED: Self = Self(80);

    /// Whether a login with this result leaves the session usable.
    pub fn is_login_ok(self) -> bool {
        self == Self::OK || self == Self::SECURITY_NOT_ENABLED
    }

    /// Whether the server invalidated the session.
    pub fn is_session_expired(self) -> bool {
        self == Self::EXPIRED_SESSION || self == Self::NOT_AUTHENTICATED
    }
}

impl std::fmt::Display for ResultCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match *self {
            Self::OK => "OK",
            Self::SECURITY_NOT_ENABLED => "SECURITY_NOT_ENABLED",
            Self::INVALID_USER => "INVALID_USER",
            Self::INVALID_CREDENTIAL => "INVALID_CREDENTIAL",
            Self::EXPIRED_SESSION => "EXPIRED_SESSION",
            Self::NOT_AUTHENTICATED => "NOT_AUTHENTICATED",
            _ => "UNKNOWN",
        };
        write!(f, "{} ({})", name, self.0)
    }
}

/// Encode an info request for `commands`.
pub fn info_request(commands: &[&str]) -> Vec<u8> {
    let mut body = String::new();
    for command in commands {
        body.push_str(command);
        body.push('\n');
    }
    frame(MessageType::Info, body.as_bytes())
}

/// Decode an info reply body into a command-to-value map.
///
/// Lines without a tab map the command to an empty value.
pub fn parse_info_response(body: &[u8]) -> RawResponse {
    let text = sanitize_utf8(body);
    text.split('\n')
        .filter(|line| !line.is_empty())
        .map(|line| match line.split_once('\t') {
            Some((name, value)) => (name.to_owned(), value.to_owned()),
            None => (line.to_owned(), String::new()),
        })
        .collect()
}

/// Hash a password the way the server stores it.
///
/// The result is the full 60-character `$2a$` string the server compares
/// against. CPU-heavy; hash once per client.
pub fn hash_password(password: &str) -> Result<String, bcrypt::BcryptError> {
    let parts = bcrypt::hash_with_salt(password, PASSWORD_COST, PASSWORD_SALT)?;
    Ok(parts.format_for_version(bcrypt::Version::TwoA))
}

/// Encode a login request carrying the hashed `credential`.
///
/// `clear_password` is appended only for external (LDAP) authentication.
pub fn login_request(user: &str, credential: &str, clear_password: Option<&str>) -> Vec<u8> {
    let fields = 2 + u8::from(clear_password.is_some());
    let mut body = Vec::with_capacity(ADMIN_HEADER_LEN + 15 + user.len() + credential.len());
    body.extend_from_slice(&[0, 0, LOGIN, fields]);
    body.resize(ADMIN_HEADER_LEN, 0);
    write_field(&mut body, FIELD_USER, user.as_bytes());
    write_field(&mut body, FIELD_CREDENTIAL, credential.as_bytes());
    if let Some(password) = clear_password {
        write_field(&mut body, FIELD_CLEAR_PASSWORD, password.as_bytes());
    }
    frame(MessageType::Admin, &body)
}

/// Encode an admin reply carrying only a result code.
pub fn admin_reply(code: ResultCode) -> Vec<u8> {
    let mut body = vec![0u8; ADMIN_HEADER_LEN];
    body[1] = code.0;
    frame(MessageType::Admin, &body)
}

/// Result code of an admin reply body.
pub fn admin_result_code(body: &[u8]) -> Result<ResultCode, ProtocolError> {
    if body.len() < ADMIN_HEADER_LEN {
        return Err(ProtocolError::TruncatedAdmin(body.len()));
    }
    Ok(ResultCode(body[1]))
}

fn write_field(buf: &mut Vec<u8>, id: u8, data: &[u8]) {
    buf.extend_from_slice(&((data.len() + 1) as u32).to_be_bytes());
    buf.push(id);
    buf.extend_from_slice(data);
}

fn frame(kind: MessageType, body: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(HEADER_LEN + body.len());
    out.extend_from_slice(&Header::new(kind, body.len()).encode());
    out.extend_from_slice(body);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_layout() {
        let bytes = Header::new(MessageType::Info, 0x0102).encode();
        assert_eq!(bytes, [2, 1, 0, 0, 0, 0, 0x01, 0x02]);
        assert_eq!(
            Header::decode(&bytes).unwrap(),
            Header::new(MessageType::Info, 0x0102)
        );
    }

    #[test]
    fn test_header_rejects_bad_version_and_type() {
        assert_eq!(
            Header::decode(&[3, 1, 0, 0, 0, 0, 0, 0]),
            Err(ProtocolError::UnsupportedVersion(3))
        );
        assert_eq!(
            Header::decode(&[2, 9, 0, 0, 0, 0, 0, 0]),
            Err(ProtocolError::UnknownType(9))
        );
    }

    #[test]
    fn test_header_rejects_oversized_body() {
        let bytes = [2, 1, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF];
        assert!(matches!(
            Header::decode(&bytes),
            Err(ProtocolError::TooLarge(_))
        ));
    }

    #[test]
    fn test_info_request_body() {
        let msg = info_request(&["node", "statistics"]);
        assert_eq!(&msg[HEADER_LEN..], b"node\nstatistics\n");
        let header = Header::decode(msg[..HEADER_LEN].try_into().unwrap()).unwrap();
        assert_eq!(header.length, msg.len() - HEADER_LEN);
    }

    #[test]
    fn test_parse_info_response() {
        let body = b"node\tBB9020011AC4202\nstatistics\tclient_connections=10;uptime=5\nfeatures\n";
        let resp = parse_info_response(body);
        assert_eq!(resp["node"], "BB9020011AC4202");
        assert_eq!(resp["statistics"], "client_connections=10;uptime=5");
        assert_eq!(resp["features"], "");
    }

    #[test]
    fn test_parse_info_response_invalid_utf8() {
        let body = b"node\tA\xFFB\n";
        let resp = parse_info_response(body);
        assert_eq!(resp["node"], "A\u{FFFD}B");
    }

    #[test]
    fn test_login_request_fields() {
        let msg = login_request("admin", "hash", None);
        let body = &msg[HEADER_LEN..];
        assert_eq!(msg[1], MessageType::Admin as u8);
        assert_eq!(body[2], LOGIN);
        assert_eq!(body[3], 2);

        let fields = &body[ADMIN_HEADER_LEN..];
        assert_eq!(&fields[..4], &6u32.to_be_bytes());
        assert_eq!(fields[4], FIELD_USER);
        assert_eq!(&fields[5..10], b"admin");
        assert_eq!(&fields[10..14], &5u32.to_be_bytes());
        assert_eq!(fields[14], FIELD_CREDENTIAL);
        assert_eq!(&fields[15..], b"hash");
    }

    #[test]
    fn test_external_login_appends_clear_password() {
        let msg = login_request("ldap-user", "hash", Some("secret"));
        let body = &msg[HEADER_LEN..];
        assert_eq!(body[3], 3);

        let fields = &body[ADMIN_HEADER_LEN..];
        let tail = &fields[fields.len() - 11..];
        assert_eq!(&tail[..4], &7u32.to_be_bytes());
        assert_eq!(tail[4], FIELD_CLEAR_PASSWORD);
        assert_eq!(&tail[5..], b"secret");
    }

    #[test]
    fn test_hash_password_uses_fixed_salt() {
        let hashed = hash_password("admin").unwrap();
        assert_eq!(hashed.len(), 60);
        assert!(hashed.starts_with("$2a$10$7EqJtq98hPqEX7fNZaFWoO"));
        assert_eq!(hash_password("admin").unwrap(), hashed);
        assert_ne!(hash_password("other").unwrap(), hashed);
    }

    #[test]
    fn test_admin_result_code() {
        let reply = admin_reply(ResultCode::EXPIRED_SESSION);
        let code = admin_result_code(&reply[HEADER_LEN..]).unwrap();
        assert!(code.is_session_expired());
        assert!(!code.is_login_ok());
        assert_eq!(code.to_string(), "EXPIRED_SESSION (66)");

        assert!(ResultCode::SECURITY_NOT_ENABLED.is_login_ok());
        assert_eq!(
            admin_result_code(&[0, 0]),
            Err(ProtocolError::TruncatedAdmin(2))
        );
    }
}
