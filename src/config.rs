//! Defines the [`Config`] type, the resolved site configuration. A
//! configuration file is a YAML mapping whose top-level keys name
//! environments:
//!
//! ```yaml
//! default:
//!   url: //localhost
//!   blog_url: "{url}/blog"
//!   default_layout: post
//! production:
//!   url: https://example.org
//! ```
//!
//! The `default` environment is always applied first and the selected
//! environment is merged over it. String values are then interpolated against
//! the merged mapping (see [`interpolate`]).

use serde_yaml::{Mapping, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::ops::Index;
use std::path::{Path, PathBuf};

/// The name of the environment which is always applied first.
pub const DEFAULT_ENVIRONMENT: &str = "default";

/// The prefix marking keys which seed post attributes.
pub const DEFAULT_PREFIX: &str = "default_";

/// The file name searched for by [`Config::from_directory`].
pub const CONFIG_FILE_NAME: &str = "blogit.yaml";

static NULL: Value = Value::Null;

/// The resolved, flat key/value configuration shared by every post of a run.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Config {
    values: BTreeMap<String, Value>,
}

impl Config {
    /// Resolves configuration text for `environment` using a single
    /// interpolation pass.
    pub fn resolve(text: &str, environment: &str) -> Result<Config> {
        Config::resolve_with_passes(text, environment, 1)
    }

    /// Resolves configuration text for `environment`, interpolating string
    /// values `passes` times so that chained references can be followed.
    pub fn resolve_with_passes(
        text: &str,
        environment: &str,
        passes: usize,
    ) -> Result<Config> {
        let parsed: Value = serde_yaml::from_str(text)?;
        let environments = match parsed {
            Value::Mapping(m) => m,
            _ => {
                return Err(Error::Format(String::from(
                    "configuration must be a mapping of environments",
                )))
            }
        };

        let mut values = environment_block(&environments, DEFAULT_ENVIRONMENT)?
            .unwrap_or_default();
        if environment != DEFAULT_ENVIRONMENT {
            if let Some(overrides) =
                environment_block(&environments, environment)?
            {
                values.extend(overrides);
            }
        }

        interpolate(&mut values, passes)?;
        Ok(Config { values })
    }

    /// Reads and resolves the configuration file at `path`.
    pub fn from_file(path: &Path, environment: &str, passes: usize) -> Result<Config> {
        let text = std::fs::read_to_string(path).map_err(|err| Error::Io {
            path: path.to_owned(),
            err,
        })?;
        Config::resolve_with_passes(&text, environment, passes)
            .map_err(|e| Error::Annotated(format!("loading `{}`", path.display()), Box::new(e)))
    }

    /// Looks for [`CONFIG_FILE_NAME`] in `dir` and then in each of its
    /// ancestors, resolving the first one found.
    pub fn from_directory(dir: &Path, environment: &str, passes: usize) -> Result<Config> {
        let path = dir.join(CONFIG_FILE_NAME);
        if path.is_file() {
            Config::from_file(&path, environment, passes)
        } else {
            match dir.parent() {
                Some(parent) => Config::from_directory(parent, environment, passes),
                None => Err(Error::NotFound(CONFIG_FILE_NAME.to_owned())),
            }
        }
    }

    /// Returns the value for `key`, if any.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Returns the value for `key` if it is a string.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    /// Returns the value for `key` as a path if it is a string.
    pub fn get_path(&self, key: &str) -> Option<PathBuf> {
        self.get_str(key).map(PathBuf::from)
    }

    /// Returns the value for `key` if it is a boolean.
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(Value::as_bool)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns the `default_*` entries with their prefix stripped. These seed
    /// the attributes of every post.
    pub fn post_defaults(&self) -> Mapping {
        self.values
            .iter()
            .filter_map(|(key, value)| {
                key.strip_prefix(DEFAULT_PREFIX)
                    .filter(|attr| !attr.is_empty())
                    .map(|attr| (Value::String(attr.to_owned()), value.clone()))
            })
            .collect()
    }
}

impl Index<&str> for Config {
    type Output = Value;

    /// Unknown keys yield [`Value::Null`] rather than panicking.
    fn index(&self, key: &str) -> &Value {
        self.values.get(key).unwrap_or(&NULL)
    }
}

/// Extracts the environment block named `name`. Missing and null blocks are
/// `None`; anything other than a string-keyed mapping is a format error.
fn environment_block(
    environments: &Mapping,
    name: &str,
) -> Result<Option<BTreeMap<String, Value>>> {
    match environments.get(&Value::String(name.to_owned())) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Mapping(block)) => {
            let mut values = BTreeMap::new();
            for (key, value) in block {
                match key {
                    Value::String(key) => {
                        values.insert(key.clone(), value.clone());
                    }
                    _ => {
                        return Err(Error::Format(format!(
                            "environment `{}` has a non-string key: {:?}",
                            name, key
                        )))
                    }
                }
            }
            Ok(Some(values))
        }
        Some(_) => Err(Error::Format(format!(
            "environment `{}` must be a mapping",
            name
        ))),
    }
}

/// Interpolates every string value of `values` against the mapping itself,
/// `passes` times. Within a pass, placeholders are resolved against the
/// values as they were at the start of the pass. `{{` and `}}` stay escaped
/// until the last pass, so they come out as literal braces whatever the
/// number of passes.
///
/// ```
/// use std::collections::BTreeMap;
/// use serde_yaml::Value;
///
/// let mut values = BTreeMap::new();
/// values.insert("a".to_owned(), Value::from("this"));
/// values.insert("b".to_owned(), Value::from("{a} works"));
/// blogit::config::interpolate(&mut values, 1).unwrap();
/// assert_eq!(values["b"], Value::from("this works"));
/// ```
pub fn interpolate(values: &mut BTreeMap<String, Value>, passes: usize) -> Result<()> {
    for pass in 0..passes {
        let last = pass + 1 == passes;
        let snapshot = values.clone();
        for (key, value) in values.iter_mut() {
            if let Value::String(s) = value {
                *s = format_placeholders(key, s, &snapshot, last)?;
            }
        }
    }
    Ok(())
}

/// Replaces each `{name}` in `template` with the scalar value of `name`.
/// `{{` and `}}` are literal braces on the `last` pass and are kept escaped
/// before it.
fn format_placeholders(
    key: &str,
    template: &str,
    values: &BTreeMap<String, Value>,
    last: bool,
) -> Result<String> {
    let escaped = |brace: char| -> &'static str {
        match (brace, last) {
            ('{', true) => "{",
            ('{', false) => "{{",
            (_, true) => "}",
            (_, false) => "}}",
        }
    };
    let substitute = |text: &str| -> String {
        if last {
            text.replace("{{", "{").replace("}}", "}")
        } else {
            text.to_owned()
        }
    };

    let interpolation_error = |message: String| Error::Interpolation {
        key: key.to_owned(),
        message,
    };

    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                out.push_str(escaped('{'));
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                out.push_str(escaped('}'));
            }
            '{' => {
                let mut name = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some(c) => name.push(c),
                        None => {
                            return Err(interpolation_error(format!(
                                "unterminated placeholder `{{{}`",
                                name
                            )))
                        }
                    }
                }
                match values.get(&name) {
                    Some(Value::String(s)) => out.push_str(&substitute(s)),
                    Some(Value::Number(n)) => out.push_str(&n.to_string()),
                    Some(Value::Bool(b)) => out.push_str(&b.to_string()),
                    Some(_) => {
                        return Err(interpolation_error(format!(
                            "`{}` is not a scalar value",
                            name
                        )))
                    }
                    None => {
                        return Err(interpolation_error(format!(
                            "`{}` is not defined",
                            name
                        )))
                    }
                }
            }
            '}' => {
                return Err(interpolation_error(String::from(
                    "single `}` encountered",
                )))
            }
            _ => out.push(c),
        }
    }
    Ok(out)
}

/// The result of a fallible configuration operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error loading or resolving a [`Config`].
#[derive(Debug)]
pub enum Error {
    /// Returned when the configuration text is not valid YAML.
    Yaml(serde_yaml::Error),

    /// Returned when the configuration is not a mapping of mappings.
    Format(String),

    /// Returned when a placeholder in the value of `key` can't be resolved.
    Interpolation { key: String, message: String },

    /// Returned when the configuration file can't be read.
    Io { path: PathBuf, err: std::io::Error },

    /// Returned when no configuration file was found.
    NotFound(String),

    /// An error with an annotation.
    Annotated(String, Box<Error>),
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Yaml(err) => fmt::Display::fmt(err, f),
            Error::Format(message) => {
                write!(f, "invalid configuration: {}", message)
            }
            Error::Interpolation { key, message } => {
                write!(f, "interpolating `{}`: {}", key, message)
            }
            Error::Io { path, err } => {
                write!(f, "reading configuration `{}`: {}", path.display(), err)
            }
            Error::NotFound(name) => write!(
                f,
                "could not find `{}` in any parent directory",
                name
            ),
            Error::Annotated(annotation, err) => {
                write!(f, "{}: {}", annotation, err)
            }
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Yaml(err) => Some(err),
            Error::Format(_) => None,
            Error::Interpolation { .. } => None,
            Error::Io { path: _, err } => Some(err),
            Error::NotFound(_) => None,
            Error::Annotated(_, err) => Some(err),
        }
    }
}

impl From<serde_yaml::Error> for Error {
    /// Converts a [`serde_yaml::Error`] into an [`Error`]. It allows us to use
    /// the `?` operator when parsing configuration text.
    fn from(err: serde_yaml::Error) -> Error {
        Error::Yaml(err)
    }
}
