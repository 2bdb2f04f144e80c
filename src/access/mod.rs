//! Password gate for protected posts
//!
//! A protected post releases its body only to a caller presenting the
//! per-post credential cookie. The cookie value is the SHA-256 of the
//! configured password, issued after a successful [`AccessGate::unlock`].

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use std::time::Duration;

use crate::content::{Access, PostEntry};
use crate::helpers::sha256_hex;

/// Prefix of the credential cookie name
pub const COOKIE_PREFIX: &str = "protected-post-";

/// Characters not allowed in a cookie name token
const COOKIE_NAME: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'%')
    .add(b'(')
    .add(b')')
    .add(b',')
    .add(b'/')
    .add(b':')
    .add(b';')
    .add(b'<')
    .add(b'=')
    .add(b'>')
    .add(b'?')
    .add(b'@')
    .add(b'[')
    .add(b'\\')
    .add(b']')
    .add(b'{')
    .add(b'}');

/// Reasons a protected post is withheld
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AccessError {
    #[error("Incorrect password")]
    WrongPassword,

    /// The author marked the post protected without setting a password
    #[error("post {slug:?} is protected but has no password configured")]
    MissingPassword { slug: String },
}

/// What a reader gets back for a post
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessOutcome {
    Granted { content: String },
    /// Protected and no valid credential was presented
    Locked,
}

/// Proof of a verified password for one post
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub name: String,
    pub value: String,
    pub max_age: Duration,
}

impl Credential {
    /// Value of the `Set-Cookie` header issuing this credential
    pub fn set_cookie_header(&self) -> String {
        format!(
            "{}={}; Max-Age={}; Path=/; HttpOnly; SameSite=Strict",
            self.name,
            self.value,
            self.max_age.as_secs()
        )
    }
}

/// Successful unlock
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unlocked {
    /// `None` when the post was never protected
    pub credential: Option<Credential>,
    pub content: String,
}

/// Name of the credential cookie for `slug`
pub fn cookie_name(slug: &str) -> String {
    format!(
        "{}{}",
        COOKIE_PREFIX,
        utf8_percent_encode(slug, COOKIE_NAME)
    )
}

/// Hash a password the way credentials store it
pub fn hash_password(password: &str) -> String {
    sha256_hex(password)
}

/// Find `name` in a `Cookie` request header
pub fn cookie_value<'a>(header: &'a str, name: &str) -> Option<&'a str> {
    header.split(';').find_map(|pair| {
        let (key, value) = pair.trim().split_once('=')?;
        (key.trim() == name).then(|| value.trim().trim_matches('"'))
    })
}

/// Decides whether a post's body may be released
#[derive(Debug, Clone)]
pub struct AccessGate {
    max_age: Duration,
}

impl Default for AccessGate {
    fn default() -> Self {
        Self::new(Duration::from_secs(12 * 60 * 60))
    }
}

impl AccessGate {
    pub fn new(max_age: Duration) -> Self {
        Self { max_age }
    }

    fn expected_hash(entry: &PostEntry) -> Result<String, AccessError> {
        entry
            .frontmatter
            .password
            .as_deref()
            .filter(|p| !p.is_empty())
            .map(hash_password)
            .ok_or_else(|| AccessError::MissingPassword {
                slug: entry.slug.clone(),
            })
    }

    /// Release the body if the post is open or `presented` is a valid credential
    pub fn read(
        &self,
        entry: &PostEntry,
        presented: Option<&str>,
    ) -> Result<AccessOutcome, AccessError> {
        if entry.access() != Access::Protected {
            return Ok(AccessOutcome::Granted {
                content: entry.content.clone(),
            });
        }

        let expected = Self::expected_hash(entry)?;
        match presented {
            Some(value) if value == expected => Ok(AccessOutcome::Granted {
                content: entry.content.clone(),
            }),
            _ => Ok(AccessOutcome::Locked),
        }
    }

    /// Verify a submitted password and issue a credential on success
    pub fn unlock(&self, entry: &PostEntry, password: &str) -> Result<Unlocked, AccessError> {
        if entry.access() != Access::Protected {
            return Ok(Unlocked {
                credential: None,
                content: entry.content.clone(),
            });
        }

        let expected = Self::expected_hash(entry)?;
        let submitted = hash_password(password);
        if submitted != expected {
            tracing::info!(slug = %entry.slug, "Rejected password for protected post");
            return Err(AccessError::WrongPassword);
        }

        Ok(Unlocked {
            credential: Some(Credential {
                name: cookie_name(&entry.slug),
                value: expected,
                max_age: self.max_age,
            }),
            content: entry.content.clone(),
        })
    }
}
