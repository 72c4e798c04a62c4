use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256, Sha512};

pub mod api;
pub mod config;
pub mod upstream;

type HmacSha256 = Hmac<Sha256>;

pub const AUTH_SCHEME: &str = "DynamiCore";

pub const DEFAULT_AMOUNT: f64 = 18.0;
pub const DEFAULT_NAME: &str = "Dante";
pub const DEFAULT_PHONE: &str = "5512345678";
pub const DEFAULT_EMAIL: &str = "correo.ejemplo@test.com";
pub const DEFAULT_CONCEPT: &str = "Deposito";
pub const DEFAULT_ACCOUNT: &str = "95476";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
        }
    }
}

/// The four components that feed the signature. `query` and `body` are
/// empty strings when not applicable, never omitted: the canonical
/// concatenation is positional and presence-sensitive.
#[derive(Debug, Clone)]
pub struct RequestParts {
    pub method: HttpMethod,
    pub path: String,
    pub query: String,
    pub body: String,
}

impl RequestParts {
    pub fn get(path: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Get,
            path: path.into(),
            query: query.into(),
            body: String::new(),
        }
    }

    pub fn post(path: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Post,
            path: path.into(),
            query: String::new(),
            body: body.into(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub client_key: String,
    pub secret_hash: String,
}

/// Order fields forwarded to the upstream API. Every field substitutes
/// its literal default when the caller omits it.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct OrderPayload {
    pub amount: f64,
    pub name: String,
    pub phone: String,
    pub email: String,
    pub concept: String,
    pub account: String,
}

impl Default for OrderPayload {
    fn default() -> Self {
        Self {
            amount: DEFAULT_AMOUNT,
            name: DEFAULT_NAME.to_string(),
            phone: DEFAULT_PHONE.to_string(),
            email: DEFAULT_EMAIL.to_string(),
            concept: DEFAULT_CONCEPT.to_string(),
            account: DEFAULT_ACCOUNT.to_string(),
        }
    }
}

/// Mirrors the upstream coercion `x || default`: empty strings fall back
/// to the default, not only missing values.
pub fn string_or_default(value: Option<String>, default: &str) -> String {
    match value {
        Some(s) if !s.is_empty() => s,
        _ => default.to_string(),
    }
}

/// Mirrors `parseFloat(x) || 18`: unparsable, non-finite and zero amounts
/// all fall back to the default.
pub fn amount_or_default(value: Option<f64>) -> f64 {
    match value {
        Some(a) if a.is_finite() && a != 0.0 => a,
        _ => DEFAULT_AMOUNT,
    }
}

/// SECRET_KEY = hex(SHA512(secretHash)). The hex string itself (not the
/// raw digest) is the HMAC key.
pub fn derive_secret_key(secret_hash: &str) -> String {
    hex::encode(Sha512::digest(secret_hash.as_bytes()))
}

/// canonical = trim(timestamp + method + path + queryString + body).
/// The upstream protocol has no field delimiters; the server reproduces
/// this exact concatenation independently.
fn canonical_string(timestamp_ms: u64, parts: &RequestParts) -> String {
    format!(
        "{}{}{}{}{}",
        timestamp_ms,
        parts.method.as_str(),
        parts.path,
        parts.query,
        parts.body
    )
    .trim()
    .to_string()
}

fn hmac_sha256_hex(key: &str, message: &str) -> String {
    let mut mac =
        HmacSha256::new_from_slice(key.as_bytes()).expect("HMAC can take key of any size");
    mac.update(message.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Builds the `Authorization` header value for a fixed timestamp. The
/// timestamp in the header and the one inside the signed digest must be
/// the same instant, so it is taken as a parameter and used for both.
pub fn auth_header_at(parts: &RequestParts, creds: &Credentials, timestamp_ms: u64) -> String {
    let secret_key = derive_secret_key(&creds.secret_hash);
    let digest = hmac_sha256_hex(&secret_key, &canonical_string(timestamp_ms, parts));
    format!(
        "{} {}:{}:{}",
        AUTH_SCHEME, creds.client_key, timestamp_ms, digest
    )
}

/// Captures the wall clock exactly once and signs with it.
pub fn auth_header(parts: &RequestParts, creds: &Credentials) -> String {
    auth_header_at(parts, creds, now_utc_ms())
}

pub fn now_utc_ms() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system time before unix epoch")
        .as_millis() as u64
}
