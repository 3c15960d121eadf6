//! Check that a transaction defines a process.

use cu_gateway::Tag;
use thiserror::Error;

/// A tag that was missing or held an unexpected value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error(
    "Tag '{name}' of value '{}' was not valid on transaction",
    .value.as_deref().unwrap_or("undefined")
)]
pub struct Error {
    pub name: &'static str,

    /// The value found (`None` if the tag was absent)
    pub value: Option<String>,
}

/// A tag every process must carry and the value it must hold (`None` for any value).
const RULES: [(&str, Option<&str>); 3] = [
    ("Contract-Src", None),
    ("Data-Protocol", Some("ao")),
    ("ao-type", Some("process")),
];

/// Returns `tags` if they identify a process, or the first rule they violate.
///
/// When a name appears more than once, the first occurrence is checked.
pub fn validate(tags: &[Tag]) -> Result<&[Tag], Error> {
    for (name, expected) in RULES {
        let value = tags
            .iter()
            .find(|tag| tag.name == name)
            .map(|tag| tag.value.as_str());
        let valid = match (value, expected) {
            (None, _) => false,
            (Some(_), None) => true,
            (Some(value), Some(expected)) => value == expected,
        };
        if !valid {
            return Err(Error {
                name,
                value: value.map(str::to_string),
            });
        }
    }
    Ok(tags)
}
