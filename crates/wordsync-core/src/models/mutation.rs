//! Incoming client mutations
//!
//! Clients replay their local log as loosely typed JSON objects. Flags may
//! arrive as booleans, numbers or strings and ids as numbers or numeric
//! strings, so decoding is lenient per field and strict per item: an item
//! that cannot be decoded at all is rejected on its own.

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};

use super::word::{WordId, WordPayload, DEFAULT_CATEGORY};
use crate::error::Result;
use crate::util::normalize_text_option;

/// One create / edit / delete operation sent by a device
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordMutation {
    #[serde(default, deserialize_with = "lenient_text")]
    pub word: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub meaning_bangla: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub meaning_english: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub synonyms: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub example_sentence: String,
    #[serde(default, deserialize_with = "lenient_optional_text")]
    pub category: Option<String>,
    #[serde(default, deserialize_with = "lenient_id")]
    pub server_id: Option<WordId>,
    #[serde(default, deserialize_with = "lenient_id")]
    pub original_id: Option<WordId>,
    #[serde(default, deserialize_with = "lenient_flag")]
    pub is_deleted: bool,
    #[serde(default, deserialize_with = "lenient_flag")]
    pub is_edited: bool,
    /// Client-side creation time, used as `date_added` for inserted rows
    #[serde(default, deserialize_with = "lenient_optional_text")]
    pub timestamp: Option<String>,
}

impl WordMutation {
    /// Decode one raw batch item
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        Ok(serde_json::from_value(value)?)
    }

    /// Payload fields with defaults applied
    #[must_use]
    pub fn payload(&self) -> WordPayload {
        WordPayload {
            meaning_bangla: self.meaning_bangla.clone(),
            meaning_english: self.meaning_english.clone(),
            synonyms: self.synonyms.clone(),
            example_sentence: self.example_sentence.clone(),
            category: self
                .category
                .clone()
                .unwrap_or_else(|| DEFAULT_CATEGORY.to_string()),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Loose {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

fn lenient_text<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_optional_text(deserializer)?.unwrap_or_default())
}

fn lenient_optional_text<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Loose>::deserialize(deserializer)?;
    let text = match value {
        None => None,
        Some(Loose::Text(text)) => Some(text),
        Some(Loose::Int(number)) => Some(number.to_string()),
        Some(Loose::Float(number)) => Some(number.to_string()),
        Some(Loose::Bool(flag)) => Some(flag.to_string()),
    };
    Ok(normalize_text_option(text))
}

/// Ids are AUTOINCREMENT rowids starting at 1; zero and negatives mean absent.
#[allow(clippy::cast_possible_truncation)]
fn lenient_id<'de, D>(deserializer: D) -> std::result::Result<Option<WordId>, D::Error>
where
    D: Deserializer<'de>,
{
    let id = match Option::<Loose>::deserialize(deserializer)? {
        None | Some(Loose::Bool(false)) => return Ok(None),
        Some(Loose::Int(id)) => id,
        Some(Loose::Text(text)) if text.trim().is_empty() => return Ok(None),
        Some(Loose::Text(text)) => text
            .trim()
            .parse::<i64>()
            .map_err(|_| de::Error::custom(format!("invalid id: {text}")))?,
        Some(Loose::Float(number)) if number.fract() == 0.0 => number as i64,
        Some(other) => {
            return Err(de::Error::custom(format!(
                "invalid id: {}",
                describe(&other)
            )))
        }
    };
    Ok((id > 0).then(|| WordId::new(id)))
}

fn lenient_flag<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Loose>::deserialize(deserializer)? {
        None => Ok(false),
        Some(Loose::Bool(flag)) => Ok(flag),
        Some(Loose::Int(number)) => Ok(number != 0),
        Some(Loose::Float(number)) => Ok(number != 0.0),
        Some(Loose::Text(text)) => match text.trim().to_ascii_lowercase().as_str() {
            "" | "0" | "false" => Ok(false),
            "1" | "true" => Ok(true),
            other => Err(de::Error::custom(format!("invalid flag: {other}"))),
        },
    }
}

fn describe(value: &Loose) -> String {
    match value {
        Loose::Bool(flag) => flag.to_string(),
        Loose::Int(number) => number.to_string(),
        Loose::Float(number) => number.to_string(),
        Loose::Text(text) => text.clone(),
    }
}
