//! Redaction of secrets from text before it reaches the log.

use regex::Regex;

/// Replacement for every redacted value.
pub const REDACTED: &str = "REDACTED";

// Keeps the captured name (and separator) in front of the mask.
const MASK: &str = "${1}REDACTED";

/// Query parameters whose values are always masked.
pub const DEFAULT_PARAMS: &[&str] = &[
    "key",
    "api_key",
    "apikey",
    "token",
    "access_token",
    "password",
    "secret",
    "signature",
];

/// Header lines whose values are always masked.
pub const DEFAULT_HEADERS: &[&str] = &[
    "authorization",
    "proxy-authorization",
    "cookie",
    "set-cookie",
    "x-api-key",
];

/// Maps arbitrary text to text that is safe to log.
///
/// Implementations must be idempotent: sanitizing already sanitized text
/// leaves it unchanged.
pub trait Sanitizer: Send + Sync {
    fn sanitize(&self, text: &str) -> String;
}

impl<F> Sanitizer for F
where
    F: Fn(&str) -> String + Send + Sync,
{
    fn sanitize(&self, text: &str) -> String {
        self(text)
    }
}

/// Regex based [`Sanitizer`].
///
/// Masks sensitive query parameter values, sensitive header line values, and
/// any literal secret registered with [`Redactor::with_secret`].
#[derive(Debug, Clone)]
pub struct Redactor {
    params: Regex,
    headers: Regex,
    secrets: Vec<String>,
}

impl Redactor {
    /// Build a redactor for the default lists plus `extra_params` and
    /// `extra_headers` (matched case-insensitively).
    pub fn new(extra_params: &[String], extra_headers: &[String]) -> Self {
        let params = alternation(DEFAULT_PARAMS, extra_params);
        let headers = alternation(DEFAULT_HEADERS, extra_headers);

        // Both patterns are built from escaped literals and cannot fail to
        // compile.
        let params = Regex::new(&format!(r"(?i)((?:^|[?&\s])(?:{params})=)[^&\s#]*"))
            .expect("escaped parameter pattern");
        let headers = Regex::new(&format!(r"(?im)^((?:{headers}):[ \t]*)[^\r\n]*"))
            .expect("escaped header pattern");

        Self {
            params,
            headers,
            secrets: Vec::new(),
        }
    }

    /// Also mask every literal occurrence of `secret`.
    pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
        let secret = secret.into();
        // A secret inside the mask itself would make redaction non-idempotent.
        if !secret.is_empty() && !REDACTED.contains(secret.as_str()) {
            self.secrets.push(secret);
        }
        self
    }
}

impl Default for Redactor {
    fn default() -> Self {
        Self::new(&[], &[])
    }
}

impl Sanitizer for Redactor {
    fn sanitize(&self, text: &str) -> String {
        let mut out = text.to_string();
        for secret in &self.secrets {
            out = out.replace(secret.as_str(), REDACTED);
        }
        let out = self.params.replace_all(&out, MASK);
        self.headers.replace_all(&out, MASK).into_owned()
    }
}

fn alternation(defaults: &[&str], extra: &[String]) -> String {
    defaults
        .iter()
        .copied()
        .chain(extra.iter().map(String::as_str))
        .filter(|name| !name.is_empty())
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join("|")
}
