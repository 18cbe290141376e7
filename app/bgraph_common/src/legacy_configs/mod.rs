/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

//! Buckconfig-style `.bgconfig` files: `[section]` headers followed by
//! `key = value` lines.

mod configs;
mod parser;

pub use configs::ConfigArgumentParseError;
pub use configs::ConfigFileLocation;
pub use configs::ConfigValue;
pub use configs::LegacyBuildConfig;
pub use configs::LegacyBuildConfigSection;
pub use parser::LegacyConfigParser;

pub mod testing {
    use crate::legacy_configs::LegacyBuildConfig;
    use crate::legacy_configs::LegacyConfigParser;

    /// Parses `(path, contents)` pairs in order, later files overriding earlier ones.
    pub fn parse(data: &[(&str, &str)]) -> anyhow::Result<LegacyBuildConfig> {
        parse_with_config_args(data, &[])
    }

    pub fn parse_with_config_args(
        data: &[(&str, &str)],
        config_args: &[&str],
    ) -> anyhow::Result<LegacyBuildConfig> {
        let mut parser = LegacyConfigParser::new();
        for (path, contents) in data {
            parser.parse_str(path, contents)?;
        }
        for arg in config_args {
            parser.apply_config_arg(arg)?;
        }
        Ok(parser.finish())
    }
}
