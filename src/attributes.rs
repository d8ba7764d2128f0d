//! Defines [`Attributes`], the typed record of post attributes which can be
//! supplied by front-matter, by the caller constructing a post, or by the
//! `default_*` keys of the configuration. Known fields are parsed into typed
//! slots; any other key lands in [`Attributes::extra`].

use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use serde_yaml::{Mapping, Value};
use std::collections::BTreeMap;

/// Post attributes before they are applied to a [`crate::post::Post`].
/// `None` means "not supplied" so that layers can be merged with
/// [`Attributes::merge`].
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct Attributes {
    pub year: Option<i32>,
    pub month: Option<u32>,
    pub day: Option<u32>,

    #[serde(deserialize_with = "deserialize_scalar")]
    pub idx: Option<String>,

    #[serde(deserialize_with = "deserialize_scalar")]
    pub stub: Option<String>,

    #[serde(deserialize_with = "deserialize_scalar")]
    pub title: Option<String>,

    #[serde(deserialize_with = "deserialize_scalar")]
    pub author: Option<String>,

    #[serde(deserialize_with = "deserialize_scalar")]
    pub layout: Option<String>,

    /// Tags are always a list once parsed. See [`normalize_tags`].
    #[serde(deserialize_with = "deserialize_tags")]
    pub tags: Option<Vec<String>>,

    /// The last-modified date as `YYYY-MM-DD` or `YYYY-MM-DD HH:MM:SS`.
    #[serde(deserialize_with = "deserialize_scalar")]
    pub updated: Option<String>,

    /// Every key that isn't one of the fields above.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Attributes {
    /// Parses attributes from a YAML mapping.
    pub fn from_mapping(mapping: Mapping) -> Result<Attributes, serde_yaml::Error> {
        serde_yaml::from_value(Value::Mapping(mapping))
    }

    /// Parses attributes from YAML text. Blank text yields empty attributes.
    pub fn from_yaml(text: &str) -> Result<Attributes, serde_yaml::Error> {
        if text.trim().is_empty() {
            return Ok(Attributes::default());
        }
        match serde_yaml::from_str::<Value>(text)? {
            Value::Null => Ok(Attributes::default()),
            Value::Mapping(mapping) => Attributes::from_mapping(mapping),
            _ => Err(serde_yaml::Error::custom(
                "front-matter must be a mapping",
            )),
        }
    }

    /// Returns `self` with every field that `over` supplies replaced by
    /// `over`'s value.
    pub fn merge(mut self, over: Attributes) -> Attributes {
        fn pick<T>(base: &mut Option<T>, over: Option<T>) {
            if over.is_some() {
                *base = over;
            }
        }

        pick(&mut self.year, over.year);
        pick(&mut self.month, over.month);
        pick(&mut self.day, over.day);
        pick(&mut self.idx, over.idx);
        pick(&mut self.stub, over.stub);
        pick(&mut self.title, over.title);
        pick(&mut self.author, over.author);
        pick(&mut self.layout, over.layout);
        pick(&mut self.tags, over.tags);
        pick(&mut self.updated, over.updated);
        self.extra.extend(over.extra);
        self
    }

    /// Drops the identity fields. Front-matter can't change which post it
    /// belongs to.
    pub fn without_identity(mut self) -> Attributes {
        if self.year.is_some()
            || self.month.is_some()
            || self.day.is_some()
            || self.idx.is_some()
            || self.stub.is_some()
        {
            log::debug!("ignoring identity fields in front-matter");
        }
        self.year = None;
        self.month = None;
        self.day = None;
        self.idx = None;
        self.stub = None;
        self
    }
}

/// Converts a scalar YAML value to text. Sequences and mappings have no
/// textual form here.
pub fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Normalizes a front-matter `tags` value: null becomes an empty list, a
/// scalar becomes a single-element list, and a list is kept as is.
pub fn normalize_tags(value: &Value) -> Option<Vec<String>> {
    match value {
        Value::Null => Some(Vec::new()),
        Value::Sequence(items) => items.iter().map(scalar_to_string).collect(),
        scalar => scalar_to_string(scalar).map(|tag| vec![tag]),
    }
}

fn deserialize_scalar<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        value => scalar_to_string(&value)
            .map(Some)
            .ok_or_else(|| D::Error::custom(format!("expected a scalar, got {:?}", value))),
    }
}

fn deserialize_tags<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    normalize_tags(&value)
        .map(Some)
        .ok_or_else(|| D::Error::custom("tags must be scalars"))
}
