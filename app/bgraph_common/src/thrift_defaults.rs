/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

use allocative::Allocative;
use bgraph_core::env_helper::EnvHelper;

use crate::legacy_configs::LegacyBuildConfig;

pub const THRIFT_SECTION: &str = "thrift";

static DEFAULT_COMPILER_OVERRIDE: EnvHelper<String> =
    EnvHelper::new("BGRAPH_THRIFT_DEFAULT_COMPILER");
static DEFAULT_LANGUAGE_OVERRIDE: EnvHelper<String> =
    EnvHelper::new("BGRAPH_THRIFT_DEFAULT_LANGUAGE");
static DEFAULT_RPC_STYLE_OVERRIDE: EnvHelper<String> =
    EnvHelper::new("BGRAPH_THRIFT_DEFAULT_RPC_STYLE");

/// Values substituted when a `java_thrift_library` leaves `compiler`, `language` or
/// `rpc_style` unset.
///
/// These are raw strings: they are checked against the valid values of each option
/// when a target is constructed, exactly like values written in a build file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Allocative)]
pub struct ThriftDefaults {
    pub compiler: String,
    pub language: String,
    pub rpc_style: String,
}

impl Default for ThriftDefaults {
    fn default() -> Self {
        Self {
            compiler: "thrift".to_owned(),
            language: "java".to_owned(),
            rpc_style: "sync".to_owned(),
        }
    }
}

impl ThriftDefaults {
    /// Reads `default_compiler`, `default_language` and `default_rpc_style` from the
    /// `[thrift]` section. Missing keys keep the built-in defaults.
    pub fn from_config(config: &LegacyBuildConfig) -> Self {
        let mut defaults = Self::default();
        let keys = [
            ("default_compiler", &mut defaults.compiler),
            ("default_language", &mut defaults.language),
            ("default_rpc_style", &mut defaults.rpc_style),
        ];
        for (key, slot) in keys {
            if let Some(v) = config.get(THRIFT_SECTION, key) {
                *slot = v.to_owned();
            }
        }
        defaults
    }

    /// Like `from_config`, with `$BGRAPH_THRIFT_DEFAULT_*` taking precedence.
    pub fn from_config_and_env(config: &LegacyBuildConfig) -> anyhow::Result<Self> {
        let mut defaults = Self::from_config(config);
        let overrides = [
            (&DEFAULT_COMPILER_OVERRIDE, &mut defaults.compiler),
            (&DEFAULT_LANGUAGE_OVERRIDE, &mut defaults.language),
            (&DEFAULT_RPC_STYLE_OVERRIDE, &mut defaults.rpc_style),
        ];
        for (env, slot) in overrides {
            if let Some(v) = env.get()? {
                *slot = v.clone();
            }
        }
        tracing::debug!(
            "thrift defaults: compiler={} language={} rpc_style={}",
            defaults.compiler,
            defaults.language,
            defaults.rpc_style
        );
        Ok(defaults)
    }
}

#[cfg(test)]
mod tests {
    use indoc::indoc;

    use crate::legacy_configs::testing::parse;
    use crate::legacy_configs::LegacyBuildConfig;
    use crate::thrift_defaults::ThriftDefaults;

    #[test]
    fn test_builtin_defaults() {
        let defaults = ThriftDefaults::from_config(&LegacyBuildConfig::empty());
        assert_eq!(ThriftDefaults::default(), defaults);
        assert_eq!("thrift", defaults.compiler);
        assert_eq!("java", defaults.language);
        assert_eq!("sync", defaults.rpc_style);
    }

    #[test]
    fn test_from_config() -> anyhow::Result<()> {
        let config = parse(&[(
            "/repo/.bgconfig",
            indoc!(
                r#"
                [thrift]
                  default_compiler = scrooge
                  default_rpc_style = finagle
                "#
            ),
        )])?;
        let defaults = ThriftDefaults::from_config(&config);
        assert_eq!(
            ThriftDefaults {
                compiler: "scrooge".to_owned(),
                language: "java".to_owned(),
                rpc_style: "finagle".to_owned(),
            },
            defaults
        );
        Ok(())
    }

    #[test]
    fn test_from_config_and_env_without_overrides() -> anyhow::Result<()> {
        // The override variables are never set by the tests in this crate.
        let config = parse(&[("/repo/.bgconfig", "[thrift]\ndefault_language = scala\n")])?;
        assert_eq!(
            ThriftDefaults::from_config(&config),
            ThriftDefaults::from_config_and_env(&config)?
        );
        Ok(())
    }
}
