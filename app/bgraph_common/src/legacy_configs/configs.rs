/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

use std::fmt;
use std::fmt::Display;
use std::str::FromStr;
use std::sync::Arc;

use allocative::Allocative;
use anyhow::Context;
use dupe::Dupe;
use starlark_map::sorted_map::SortedMap;

#[derive(thiserror::Error, Debug)]
pub enum ConfigArgumentParseError {
    #[error("Expected a config override of the form `section.key=value`, got `{0}`")]
    NoEqualsSeparator(String),
    #[error("Config override `{0}` is missing a section, expected `section.key`")]
    NoSection(String),
    #[error("Config override `{0}` has an empty key")]
    EmptyKey(String),
}

/// Where a value came from: a file and 1-based line, or the command line.
#[derive(Debug, Clone, PartialEq, Eq, Allocative)]
pub enum ConfigFileLocation {
    File { path: Arc<str>, line: usize },
    CommandLineArgument,
}

impl Display for ConfigFileLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigFileLocation::File { path, line } => write!(f, "{}:{}", path, line),
            ConfigFileLocation::CommandLineArgument => write!(f, "--config"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Allocative)]
pub struct ConfigValue {
    raw_value: String,
    location: ConfigFileLocation,
}

impl ConfigValue {
    pub(crate) fn new_raw(location: ConfigFileLocation, raw_value: String) -> Self {
        Self {
            raw_value,
            location,
        }
    }

    pub(crate) fn new_raw_arg(raw_value: String) -> Self {
        Self::new_raw(ConfigFileLocation::CommandLineArgument, raw_value)
    }

    pub fn as_str(&self) -> &str {
        &self.raw_value
    }

    pub fn location(&self) -> &ConfigFileLocation {
        &self.location
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Allocative)]
pub struct LegacyBuildConfigSection {
    pub(crate) values: SortedMap<String, ConfigValue>,
}

impl LegacyBuildConfigSection {
    pub fn get(&self, key: &str) -> Option<&ConfigValue> {
        self.values.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[derive(Debug, PartialEq, Eq, Allocative)]
pub(crate) struct ConfigData {
    pub(crate) values: SortedMap<String, LegacyBuildConfigSection>,
}

/// A fully parsed config. Cheap to clone.
#[derive(Debug, Clone, Dupe, PartialEq, Eq, Allocative)]
pub struct LegacyBuildConfig(pub(crate) Arc<ConfigData>);

impl LegacyBuildConfig {
    pub fn empty() -> Self {
        Self(Arc::new(ConfigData {
            values: SortedMap::new(),
        }))
    }

    pub fn get_section(&self, section: &str) -> Option<&LegacyBuildConfigSection> {
        self.0.values.get(section)
    }

    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.get_value(section, key).map(ConfigValue::as_str)
    }

    pub fn get_value(&self, section: &str, key: &str) -> Option<&ConfigValue> {
        self.get_section(section)?.get(key)
    }

    /// Parses a value with `FromStr`, naming the key and its location on failure.
    pub fn parse<T>(&self, section: &str, key: &str) -> anyhow::Result<Option<T>>
    where
        T: FromStr,
        anyhow::Error: From<<T as FromStr>::Err>,
    {
        match self.get_value(section, key) {
            None => Ok(None),
            Some(v) => Ok(Some(
                T::from_str(v.as_str())
                    .map_err(anyhow::Error::from)
                    .with_context(|| {
                        format!(
                            "Parsing config `{}.{}` (set at {})",
                            section,
                            key,
                            v.location()
                        )
                    })?,
            )),
        }
    }

    pub fn sections(&self) -> impl Iterator<Item = &str> {
        self.0.values.keys().map(String::as_str)
    }
}
