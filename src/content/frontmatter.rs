//! Front-matter schema validation

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use std::fmt;
use std::str::FromStr;

use crate::helpers::parse_iso8601;

/// Visibility tier of a post
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Access {
    /// Listed and readable by anyone
    Public,
    /// Readable by direct link, never listed
    Unlisted,
    /// Neither listed nor served
    #[default]
    Private,
    /// Readable after password verification
    Protected,
}

impl Access {
    pub const ALL: [Access; 4] = [
        Access::Public,
        Access::Unlisted,
        Access::Private,
        Access::Protected,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Access::Public => "public",
            Access::Unlisted => "unlisted",
            Access::Private => "private",
            Access::Protected => "protected",
        }
    }
}

impl fmt::Display for Access {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Access {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Access::ALL
            .into_iter()
            .find(|access| access.as_str() == s)
            .ok_or(())
    }
}

/// Validated front-matter of a post
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostFrontmatter {
    pub title: String,
    #[serde(default)]
    pub access: Access,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topics: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<DateTime<FixedOffset>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl PostFrontmatter {
    /// Copy with the password removed, for anything leaving the process
    pub fn redacted(&self) -> Self {
        Self {
            password: None,
            ..self.clone()
        }
    }

    pub fn is_protected(&self) -> bool {
        self.access == Access::Protected
    }
}

/// One violated rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    pub field: String,
    pub message: String,
}

impl ValidationIssue {
    pub fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Front-matter failed validation; carries every issue found
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("invalid frontmatter: {}", join_issues(.issues))]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationError {
    pub fn single(field: &str, message: impl Into<String>) -> Self {
        Self {
            issues: vec![ValidationIssue::new(field, message)],
        }
    }

    pub fn has_issue_for(&self, field: &str) -> bool {
        self.issues.iter().any(|issue| issue.field == field)
    }
}

fn join_issues(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Validate a decoded front-matter mapping.
///
/// Every field is checked before returning so the error lists all problems.
pub fn validate_frontmatter(raw: &Mapping) -> Result<PostFrontmatter, ValidationError> {
    let mut issues = Vec::new();

    let title = match raw.get("title") {
        None | Some(Value::Null) => {
            issues.push(ValidationIssue::new("title", "is required"));
            None
        }
        Some(Value::String(s)) if s.trim().is_empty() => {
            issues.push(ValidationIssue::new("title", "must not be empty"));
            None
        }
        Some(Value::String(s)) => Some(s.clone()),
        Some(other) => {
            issues.push(wrong_type("title", "a string", other));
            None
        }
    };

    let access = match raw.get("access") {
        None | Some(Value::Null) => Access::default(),
        Some(Value::String(s)) => s.parse::<Access>().unwrap_or_else(|_| {
            issues.push(ValidationIssue::new(
                "access",
                format!(
                    "must be one of public, unlisted, private, protected (got \"{}\")",
                    s
                ),
            ));
            Access::default()
        }),
        Some(other) => {
            issues.push(wrong_type("access", "a string", other));
            Access::default()
        }
    };

    let description = optional_string(raw, "description", &mut issues);
    let thumbnail = optional_string(raw, "thumbnail", &mut issues);

    let date = match raw.get("date") {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => {
            let parsed = parse_iso8601(s);
            if parsed.is_none() {
                issues.push(ValidationIssue::new(
                    "date",
                    format!("\"{}\" is not a valid ISO-8601 date", s),
                ));
            }
            parsed
        }
        Some(other) => {
            issues.push(wrong_type("date", "an ISO-8601 date string", other));
            None
        }
    };

    let topics = match raw.get("topics") {
        None | Some(Value::Null) => None,
        Some(Value::Sequence(items)) => {
            let mut topics = Vec::with_capacity(items.len());
            for (i, item) in items.iter().enumerate() {
                match item {
                    Value::String(s) => topics.push(s.clone()),
                    other => issues.push(ValidationIssue::new(
                        "topics",
                        format!("item {} must be a string, got {}", i, type_name(other)),
                    )),
                }
            }
            Some(topics)
        }
        Some(other) => {
            issues.push(ValidationIssue::new(
                "topics",
                format!("must be an array of strings, got {}", type_name(other)),
            ));
            None
        }
    };

    let password = match raw.get("password") {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) if s.is_empty() => {
            issues.push(ValidationIssue::new("password", "must not be empty"));
            None
        }
        Some(Value::String(s)) => Some(s.clone()),
        Some(other) => {
            issues.push(wrong_type("password", "a string", other));
            None
        }
    };

    // Cross-field rules run after every field has been looked at
    if access == Access::Protected && password.is_none() && !has_issue(&issues, "password") {
        issues.push(ValidationIssue::new(
            "password",
            "is required when access is \"protected\"",
        ));
    }

    match title {
        Some(title) if issues.is_empty() => Ok(PostFrontmatter {
            title,
            access,
            description,
            thumbnail,
            topics,
            date,
            password,
        }),
        _ => Err(ValidationError { issues }),
    }
}

fn optional_string(raw: &Mapping, field: &str, issues: &mut Vec<ValidationIssue>) -> Option<String> {
    match raw.get(field) {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(other) => {
            issues.push(wrong_type(field, "a string", other));
            None
        }
    }
}

fn has_issue(issues: &[ValidationIssue], field: &str) -> bool {
    issues.iter().any(|issue| issue.field == field)
}

fn wrong_type(field: &str, expected: &str, got: &Value) -> ValidationIssue {
    ValidationIssue::new(
        field,
        format!("must be {}, got {}", expected, type_name(got)),
    )
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "an array",
        Value::Mapping(_) => "an object",
        Value::Tagged(_) => "a tagged value",
    }
}
