//! Key / value configuration with component specific defaults.
//!
//! A [Configuration] is a flat mapping from string keys to string values, usually read from a JSON object.
//! Components merge the configuration given by the caller over their default profile (see
//! [VerbSenseConfigurator]) and read typed settings from the result (see [VerbSenseOptions]).

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::convert::TryFrom;
use std::io::{self, Read};
use std::iter::FromIterator;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Keys understood by the verb sense annotator.
pub mod keys {
    pub const LAZILY_INITIALIZE: &str = "lazilyInitialize";
    pub const MODEL_PATH: &str = "modelPath";
    pub const DEFAULT_SENSE: &str = "defaultSense";
    pub const SKIP_AUXILIARIES: &str = "skipAuxiliaries";
    pub const CONTEXT_WINDOW: &str = "contextWindow";
    pub const MIN_SCORE: &str = "minScore";
}

#[derive(Error, Debug)]
#[allow(missing_docs)]
pub enum Error {
    #[error("missing configuration key {0:?}.")]
    Missing(String),
    #[error("invalid value {value:?} for key {key:?}: expected {expected}.")]
    Invalid {
        key: String,
        value: String,
        expected: &'static str,
    },
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Configuration(IndexMap<String, String>);

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Configuration {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Configuration(
            iter.into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }
}

impl Configuration {
    /// Reads a configuration from a JSON file containing one object with string values.
    pub fn new<P: AsRef<Path>>(p: P) -> Result<Self, Error> {
        let reader = io::BufReader::new(fs_err::File::open(p.as_ref())?);
        Self::from_reader(reader)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, Error> {
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn with<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.set(key, value);
        self
    }

    pub fn set<K: Into<String>, V: Into<String>>(&mut self, key: K, value: V) {
        self.0.insert(key.into(), value.into());
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(|x| x.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(key, value)| (key.as_str(), value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns a new configuration where values from `overrides` take precedence over the ones in `self`.
    pub fn merge(&self, overrides: &Configuration) -> Configuration {
        let mut merged = self.clone();
        for (key, value) in overrides.iter() {
            merged.set(key, value);
        }
        merged
    }

    fn require(&self, key: &str) -> Result<&str, Error> {
        self.get(key).ok_or_else(|| Error::Missing(key.to_string()))
    }

    fn invalid(key: &str, value: &str, expected: &'static str) -> Error {
        Error::Invalid {
            key: key.to_string(),
            value: value.to_string(),
            expected,
        }
    }

    pub fn get_string(&self, key: &str) -> Result<String, Error> {
        self.require(key).map(ToOwned::to_owned)
    }

    pub fn get_bool(&self, key: &str) -> Result<bool, Error> {
        let value = self.require(key)?;

        match value.trim().to_lowercase().as_str() {
            "true" | "1" | "yes" => Ok(true),
            "false" | "0" | "no" => Ok(false),
            _ => Err(Self::invalid(key, value, "a boolean")),
        }
    }

    pub fn get_usize(&self, key: &str) -> Result<usize, Error> {
        let value = self.require(key)?;
        value
            .trim()
            .parse()
            .map_err(|_| Self::invalid(key, value, "a non-negative integer"))
    }

    pub fn get_f32(&self, key: &str) -> Result<f32, Error> {
        let value = self.require(key)?;
        value
            .trim()
            .parse()
            .map_err(|_| Self::invalid(key, value, "a number"))
    }

    pub fn get_path(&self, key: &str) -> Result<PathBuf, Error> {
        self.require(key).map(PathBuf::from)
    }
}

/// Provides the default profile of the verb sense annotator.
#[derive(Debug, Clone, Copy, Default)]
pub struct VerbSenseConfigurator;

impl VerbSenseConfigurator {
    pub fn default_config(&self) -> Configuration {
        vec![
            (keys::LAZILY_INITIALIZE, "false"),
            (keys::MODEL_PATH, "models/verbsense.bin"),
            (keys::DEFAULT_SENSE, "01"),
            (keys::SKIP_AUXILIARIES, "true"),
            (keys::CONTEXT_WINDOW, "2"),
            (keys::MIN_SCORE, "0.0"),
        ]
        .into_iter()
        .collect()
    }

    /// Merges the given settings over the default profile.
    pub fn get_config(&self, overrides: &Configuration) -> Configuration {
        self.default_config().merge(overrides)
    }
}

/// Typed settings of the verb sense annotator.
#[derive(Debug, Clone, PartialEq)]
pub struct VerbSenseOptions {
    /// Whether the labeler is built on first use instead of at construction.
    pub lazily_initialize: bool,
    /// Path to the binary sense model. Paths ending in `.gz` are decompressed.
    pub model_path: PathBuf,
    /// Sense assigned to predicates the model knows nothing about.
    pub default_sense: String,
    /// Whether auxiliaries followed by another verb in the same verb phrase are ignored.
    pub skip_auxiliaries: bool,
    /// Number of tokens on each side of a predicate used as context features.
    pub context_window: usize,
    /// Predictions with a lower probability fall back to the default sense.
    pub min_score: f32,
}

/// Largest accepted `contextWindow`. Each context token adds a handful of features per predicate.
pub const MAX_CONTEXT_WINDOW: usize = 10;

impl Default for VerbSenseOptions {
    fn default() -> Self {
        VerbSenseOptions {
            lazily_initialize: false,
            model_path: PathBuf::from("models/verbsense.bin"),
            default_sense: "01".into(),
            skip_auxiliaries: true,
            context_window: 2,
            min_score: 0.,
        }
    }
}

impl TryFrom<&Configuration> for VerbSenseOptions {
    type Error = Error;

    fn try_from(config: &Configuration) -> Result<Self, Self::Error> {
        let default_sense = config.get_string(keys::DEFAULT_SENSE)?;
        if default_sense.trim().is_empty() {
            return Err(Configuration::invalid(
                keys::DEFAULT_SENSE,
                &default_sense,
                "a non-empty sense label",
            ));
        }

        let min_score = config.get_f32(keys::MIN_SCORE)?;
        if !(0. ..=1.).contains(&min_score) {
            return Err(Configuration::invalid(
                keys::MIN_SCORE,
                config.get(keys::MIN_SCORE).unwrap_or_default(),
                "a probability between 0 and 1",
            ));
        }

        let context_window = config.get_usize(keys::CONTEXT_WINDOW)?;
        if context_window > MAX_CONTEXT_WINDOW {
            return Err(Configuration::invalid(
                keys::CONTEXT_WINDOW,
                config.get(keys::CONTEXT_WINDOW).unwrap_or_default(),
                "a context window of at most 10 tokens",
            ));
        }

        Ok(VerbSenseOptions {
            lazily_initialize: config.get_bool(keys::LAZILY_INITIALIZE)?,
            model_path: config.get_path(keys::MODEL_PATH)?,
            default_sense,
            skip_auxiliaries: config.get_bool(keys::SKIP_AUXILIARIES)?,
            context_window,
            min_score,
        })
    }
}
