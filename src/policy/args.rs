//! Argument path extraction
//!
//! Policies locate their target inside the operation's arguments with a dot
//! path such as `input.characterId` or `items.0.mediaId`. A missing segment is
//! simply absent; extraction never fails.

use crate::domain::StringUuid;
use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

lazy_static::lazy_static! {
    /// One path segment: an identifier-like key or an array index
    static ref SEGMENT_REGEX: regex::Regex =
        regex::Regex::new(r"^(?:[A-Za-z_][A-Za-z0-9_]*|[0-9]+)$").unwrap();
}

/// Dot-notation path into a nested argument structure.
///
/// The empty path addresses the arguments themselves.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArgPath(String);

impl ArgPath {
    pub fn new(path: impl Into<String>) -> Self {
        ArgPath(path.into())
    }

    pub fn root() -> Self {
        ArgPath(String::new())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('.').filter(|s| !s.is_empty())
    }

    /// Reject malformed paths such as `a..b` or `input.character-id`.
    pub fn validate(&self) -> Result<()> {
        if self.is_root() {
            return Ok(());
        }
        match self.0.split('.').find(|segment| !SEGMENT_REGEX.is_match(segment)) {
            Some(bad) => Err(AppError::Misconfigured(format!(
                "Invalid argument path '{}': bad segment '{}'",
                self.0, bad
            ))),
            None => Ok(()),
        }
    }
}

impl std::fmt::Display for ArgPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_root() {
            f.write_str("<root>")
        } else {
            f.write_str(&self.0)
        }
    }
}

impl From<&str> for ArgPath {
    fn from(path: &str) -> Self {
        ArgPath::new(path)
    }
}

/// Follow `path` through `args`. `null` counts as absent.
pub fn extract<'a>(args: &'a Value, path: &ArgPath) -> Option<&'a Value> {
    let mut current = args;
    for segment in path.segments() {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    (!current.is_null()).then_some(current)
}

/// Extract an entity id. Non-string or malformed values are absent.
pub fn extract_id(args: &Value, path: &ArgPath) -> Option<StringUuid> {
    extract(args, path).and_then(StringUuid::from_json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    fn args() -> Value {
        json!({
            "characterId": "8f2b2d4e-3c1a-4b8e-9d7f-2a6c5e1b0f93",
            "input": {
                "speciesId": "0b6b4c52-9a61-4f0e-8d7c-5e2f3a1b9c84",
                "note": null,
                "items": [
                    { "mediaId": "5d1e9c7a-2b3f-4a6d-8e0c-1f7b9a3c5d2e" },
                    { "mediaId": 42 }
                ]
            }
        })
    }

    #[rstest]
    #[case("characterId", Some("8f2b2d4e-3c1a-4b8e-9d7f-2a6c5e1b0f93"))]
    #[case("input.speciesId", Some("0b6b4c52-9a61-4f0e-8d7c-5e2f3a1b9c84"))]
    #[case("input.items.0.mediaId", Some("5d1e9c7a-2b3f-4a6d-8e0c-1f7b9a3c5d2e"))]
    #[case("input.items.1.mediaId", None)]
    #[case("input.items.7.mediaId", None)]
    #[case("input.note", None)]
    #[case("input.missing.deeper", None)]
    #[case("characterId.nested", None)]
    fn test_extract_id(#[case] path: &str, #[case] expected: Option<&str>) {
        let expected = expected.map(|s| s.parse::<StringUuid>().unwrap());
        assert_eq!(extract_id(&args(), &ArgPath::new(path)), expected);
    }

    #[test]
    fn test_extract_non_id_values() {
        let args = args();
        assert_eq!(
            extract(&args, &ArgPath::new("input.items.1.mediaId")),
            Some(&json!(42))
        );
        assert_eq!(extract(&args, &ArgPath::root()), Some(&args));
        assert_eq!(extract(&Value::Null, &ArgPath::root()), None);
    }

    #[rstest]
    #[case("", true)]
    #[case("characterId", true)]
    #[case("input.items.0.mediaId", true)]
    #[case("input..mediaId", false)]
    #[case("input.media-id", false)]
    #[case(".characterId", false)]
    fn test_validate(#[case] path: &str, #[case] valid: bool) {
        assert_eq!(ArgPath::new(path).validate().is_ok(), valid);
    }

    #[test]
    fn test_display() {
        assert_eq!(ArgPath::root().to_string(), "<root>");
        assert_eq!(ArgPath::from("input.id").to_string(), "input.id");
    }
}
