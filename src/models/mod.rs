//! Wire model module declarations.

use serde::{Deserialize, Deserializer};

pub mod code;
pub mod commands;
pub mod greeting;
pub mod init;
pub mod response;

/// Deserialize a JSON string or number as a plain string.
///
/// Server greetings have carried both `"version": 12` and `"version": "12"`
/// across releases; the client keeps the textual form either way.
pub(crate) fn deserialize_string_or_number<'de, D>(
    deserializer: D,
) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrNumber {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match StringOrNumber::deserialize(deserializer)? {
        StringOrNumber::Text(text) => text,
        StringOrNumber::Number(number) => number.to_string(),
    })
}
