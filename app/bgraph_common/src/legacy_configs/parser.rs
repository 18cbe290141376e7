/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use itertools::Itertools;
use starlark_map::sorted_map::SortedMap;

use crate::legacy_configs::configs::ConfigArgumentParseError;
use crate::legacy_configs::configs::ConfigData;
use crate::legacy_configs::configs::ConfigFileLocation;
use crate::legacy_configs::configs::ConfigValue;
use crate::legacy_configs::configs::LegacyBuildConfig;
use crate::legacy_configs::configs::LegacyBuildConfigSection;

#[derive(thiserror::Error, Debug)]
enum ConfigError {
    #[error("Expected line of the form `key = value` but key was empty. Line was `{0}`")]
    EmptyKey(String),
    #[error("Improperly formatted section. Expected something of the form `[section]`, got {0}")]
    SectionMissingTrailingBracket(String),
    #[error(
        "Couldn't parse line. Expected section (`[some_section]`) or key assignment (`some_key = some_value`). Got `{0}`"
    )]
    InvalidLine(String),
}

/// Values assigned before any `[section]` marker land here.
const UNSPECIFIED_SECTION: &str = "__unspecified__";

/// Accumulates config files and `--config` overrides. Later sources override earlier
/// ones key by key.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LegacyConfigParser {
    values: BTreeMap<String, BTreeMap<String, ConfigValue>>,
}

impl LegacyConfigParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parse_file(&mut self, path: &Path) -> anyhow::Result<()> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Reading config file `{}`", path.display()))?;
        self.parse_str(&path.display().to_string(), &contents)
    }

    /// `path` is only used to record where values came from.
    pub fn parse_str(&mut self, path: &str, contents: &str) -> anyhow::Result<()> {
        self.parse_lines(Arc::from(path), contents)
            .with_context(|| format!("Error parsing config `{}`", path))
    }

    /// Applies a `section.key=value` override. An empty value removes the key.
    pub fn apply_config_arg(&mut self, arg: &str) -> anyhow::Result<()> {
        let (name, value) = arg
            .split_once('=')
            .ok_or_else(|| ConfigArgumentParseError::NoEqualsSeparator(arg.to_owned()))?;
        let (section, key) = name
            .trim()
            .split_once('.')
            .ok_or_else(|| ConfigArgumentParseError::NoSection(arg.to_owned()))?;
        if key.is_empty() {
            return Err(ConfigArgumentParseError::EmptyKey(arg.to_owned()).into());
        }
        let section = self.values.entry(section.to_owned()).or_default();
        let value = value.trim();
        if value.is_empty() {
            section.remove(key);
        } else {
            section.insert(key.to_owned(), ConfigValue::new_raw_arg(value.to_owned()));
        }
        Ok(())
    }

    pub fn finish(self) -> LegacyBuildConfig {
        let values = self
            .values
            .into_iter()
            .map(|(section, values)| {
                (
                    section,
                    LegacyBuildConfigSection {
                        values: SortedMap::from_iter(values),
                    },
                )
            })
            .collect();
        LegacyBuildConfig(Arc::new(ConfigData { values }))
    }

    fn strip_line_comment(line: &str) -> &str {
        match line.split_once(" #") {
            Some((before, _)) => before,
            None => line,
        }
    }

    fn parse_section_marker(line: &str) -> anyhow::Result<Option<&str>> {
        match line.strip_prefix('[') {
            Some(remaining) => {
                match Self::strip_line_comment(remaining)
                    .trim_end()
                    .strip_suffix(']')
                {
                    None => Err(ConfigError::SectionMissingTrailingBracket(line.to_owned()).into()),
                    Some(section) => Ok(Some(section.trim())),
                }
            }
            None => Ok(None),
        }
    }

    fn parse_lines(&mut self, path: Arc<str>, contents: &str) -> anyhow::Result<()> {
        let lines = contents
            .lines()
            .map(|line| line.trim().to_owned())
            .enumerate()
            // A trailing `\` continues the value on the next line.
            .coalesce(|(i, mut prev), (j, next)| {
                if prev.ends_with('\\') {
                    prev.truncate(prev.len() - 1);
                    prev.push_str(&next);
                    Ok((i, prev))
                } else {
                    Err(((i, prev), (j, next)))
                }
            })
            .filter(|(_, l)| !l.is_empty() && !l.starts_with('#') && !l.starts_with(';'));

        let mut section = UNSPECIFIED_SECTION.to_owned();
        for (i, line) in lines {
            if let Some(new_section) = Self::parse_section_marker(&line)? {
                section = new_section.to_owned();
                self.values.entry(section.clone()).or_default();
            } else if let Some((key, val)) = line.split_once('=') {
                let key = key.trim();
                if key.is_empty() {
                    return Err(ConfigError::EmptyKey(line.clone()).into());
                }
                let location = ConfigFileLocation::File {
                    path: path.clone(),
                    line: i + 1,
                };
                self.values.entry(section.clone()).or_default().insert(
                    key.to_owned(),
                    ConfigValue::new_raw(location, val.trim().to_owned()),
                );
            } else {
                return Err(ConfigError::InvalidLine(line).into());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use indoc::indoc;

    use crate::legacy_configs::testing::parse;
    use crate::legacy_configs::testing::parse_with_config_args;
    use crate::legacy_configs::ConfigArgumentParseError;
    use crate::legacy_configs::ConfigFileLocation;

    #[test]
    fn test_simple() -> anyhow::Result<()> {
        let config = parse(&[(
            "/repo/.bgconfig",
            indoc!(
                r#"
                ; comment
                [thrift]
                  default_compiler = scrooge
                  # another comment
                  default_language=scala
                [thrift_linter] # trailing comment
                  strict = true
                "#
            ),
        )])?;

        assert_eq!(Some("scrooge"), config.get("thrift", "default_compiler"));
        assert_eq!(Some("scala"), config.get("thrift", "default_language"));
        assert_eq!(None, config.get("thrift", "default_rpc_style"));
        assert_eq!(Some(true), config.parse::<bool>("thrift_linter", "strict")?);
        assert_eq!(
            &ConfigFileLocation::File {
                path: "/repo/.bgconfig".into(),
                line: 3,
            },
            config.get_value("thrift", "default_compiler").unwrap().location()
        );
        assert_eq!(vec!["thrift", "thrift_linter"], config.sections().collect::<Vec<_>>());
        Ok(())
    }

    #[test]
    fn test_continuation_and_override() -> anyhow::Result<()> {
        let config = parse_with_config_args(
            &[
                (
                    "/base",
                    indoc!(
                        r#"
                        [thrift]
                          default_compiler = thrift
                          default_rpc_style = fin\
                        agle
                        "#
                    ),
                ),
                ("/override", "[thrift]\ndefault_compiler = scrooge\n"),
            ],
            &["thrift.default_language=scala", "thrift.default_rpc_style="],
        )?;
        assert_eq!(Some("scrooge"), config.get("thrift", "default_compiler"));
        assert_eq!(Some("scala"), config.get("thrift", "default_language"));
        assert_eq!(
            &ConfigFileLocation::CommandLineArgument,
            config.get_value("thrift", "default_language").unwrap().location()
        );
        assert_eq!(None, config.get("thrift", "default_rpc_style"));
        Ok(())
    }

    #[test]
    fn test_continuation() -> anyhow::Result<()> {
        let config = parse(&[("/base", "[thrift]\ndefault_rpc_style = fin\\\nagle\n")])?;
        assert_eq!(Some("finagle"), config.get("thrift", "default_rpc_style"));
        Ok(())
    }

    #[test]
    fn test_errors() {
        for bad in ["[thrift\n", "[thrift]\n= scrooge\n", "[thrift]\njust words\n"] {
            let err = parse(&[("/bad", bad)]).unwrap_err();
            assert!(
                format!("{:#}", err).contains("Error parsing config `/bad`"),
                "{:#}",
                err
            );
        }

        assert_matches!(
            parse_with_config_args(&[], &["thrift.compiler"])
                .unwrap_err()
                .downcast_ref::<ConfigArgumentParseError>(),
            Some(ConfigArgumentParseError::NoEqualsSeparator(_))
        );
        assert_matches!(
            parse_with_config_args(&[], &["compiler=thrift"])
                .unwrap_err()
                .downcast_ref::<ConfigArgumentParseError>(),
            Some(ConfigArgumentParseError::NoSection(_))
        );
    }

    #[test]
    fn test_unspecified_section() -> anyhow::Result<()> {
        let config = parse(&[("/base", "key = value\n")])?;
        assert_eq!(Some("value"), config.get("__unspecified__", "key"));
        Ok(())
    }
}
