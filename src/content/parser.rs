//! Splits a post source into its front-matter block and Markdown body

use lazy_static::lazy_static;
use regex::Regex;
use serde_yaml::{Mapping, Value};

use super::frontmatter::{validate_frontmatter, PostFrontmatter, ValidationError};

lazy_static! {
    /// `---` on the first line, the YAML block, then a line that is exactly `---`
    static ref FRONTMATTER_RE: Regex =
        Regex::new(r"(?s)\A\x{feff}?---[ \t]*\r?\n(?:(.*?)\r?\n)?---[ \t]*(?:\r?\n|\z)")
            .expect("front-matter pattern is valid");
}

/// A post split into validated front-matter and its untouched body
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedPost {
    pub frontmatter: PostFrontmatter,
    pub content: String,
}

/// Parse a raw post source.
///
/// The body is returned verbatim; rendering it is left to the caller.
pub fn parse_post(raw: &str) -> Result<ParsedPost, ValidationError> {
    let (block, body) = split_frontmatter(raw).ok_or_else(|| {
        ValidationError::single(
            "frontmatter",
            "missing front-matter block (expected the file to start with a `---` line)",
        )
    })?;

    let mapping = decode_block(block)?;
    let frontmatter = validate_frontmatter(&mapping)?;

    Ok(ParsedPost {
        frontmatter,
        content: body.to_string(),
    })
}

/// Returns `(yaml_block, body)` when the source opens with a delimited block
pub fn split_frontmatter(raw: &str) -> Option<(&str, &str)> {
    let captures = FRONTMATTER_RE.captures(raw)?;
    let whole = captures.get(0)?;
    let block = captures.get(1).map(|m| m.as_str()).unwrap_or("");
    Some((block, &raw[whole.end()..]))
}

fn decode_block(block: &str) -> Result<Mapping, ValidationError> {
    if block.trim().is_empty() {
        return Ok(Mapping::new());
    }

    match serde_yaml::from_str::<Value>(block) {
        Ok(Value::Mapping(mapping)) => Ok(mapping),
        Ok(Value::Null) => Ok(Mapping::new()),
        Ok(_) => Err(ValidationError::single(
            "frontmatter",
            "front-matter must be a set of `key: value` pairs",
        )),
        Err(e) => Err(ValidationError::single(
            "frontmatter",
            format!("malformed YAML: {}", e),
        )),
    }
}
