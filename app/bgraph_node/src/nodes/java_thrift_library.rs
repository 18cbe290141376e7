/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

//! `java_thrift_library`: thrift IDL files compiled into a Java or Scala stub library.
//!
//! The target itself only validates and records how the stubs should be generated;
//! the codegen tasks read `compiler`, `language`, `rpc_style`, `namespace_map` and
//! `thrift_linter_strict` back when they run the compiler.

use std::fmt;
use std::fmt::Display;

use allocative::Allocative;
use bgraph_common::thrift_defaults::ThriftDefaults;
use bgraph_core::target::TargetLabel;
use dupe::Dupe;
use indexmap::IndexMap;
use itertools::Itertools;

use crate::nodes::build_target::BuildTarget;
use crate::nodes::build_target::BuildTargetArgs;
use crate::nodes::Target;
use crate::payload::Payload;
use crate::payload::PrimitiveField;

pub const JAVA_THRIFT_LIBRARY: &str = "java_thrift_library";

pub const CODEGEN_LABEL: &str = "codegen";

pub const COMPILER: &str = "compiler";
pub const LANGUAGE: &str = "language";
pub const RPC_STYLE: &str = "rpc_style";

#[derive(thiserror::Error, Debug)]
pub enum TargetDefinitionError {
    #[error(
        "Invalid target {target}: {arg} may only be set to {} ('{value}' not valid)",
        .valid_values.iter().map(|v| format!("'{}'", v)).join(", or ")
    )]
    InvalidConfigurationValue {
        target: TargetLabel,
        arg: &'static str,
        valid_values: Vec<&'static str>,
        value: String,
    },
}

/// An option of a thrift library which only admits a fixed set of values.
pub trait ConfigOption: Copy + Display + 'static {
    /// The argument name in build files.
    const ARG: &'static str;
    /// Valid values, in the order they are listed in error messages.
    const VALID_VALUES: &'static [Self];

    fn as_str(self) -> &'static str;

    fn from_str_opt(value: &str) -> Option<Self> {
        Self::VALID_VALUES
            .iter()
            .copied()
            .find(|v| v.as_str() == value)
    }
}

macro_rules! config_option {
    (
        $(#[$attr:meta])*
        $name:ident, $arg:expr, { $($variant:ident => $value:literal),+ $(,)? }
    ) => {
        $(#[$attr])*
        #[derive(Debug, Clone, Copy, Dupe, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        // Written out instead of derived: the `Allocative` derive of the pinned
        // allocative_derive emits `match self` with the variants' spans, which does not
        // resolve when the variants come from a `macro_rules!` invocation.
        impl Allocative for $name {
            fn visit<'a, 'b: 'a>(&self, visitor: &'a mut allocative::Visitor<'b>) {
                let visitor = visitor.enter_self::<Self>(self);
                visitor.exit();
            }
        }

        impl ConfigOption for $name {
            const ARG: &'static str = $arg;
            const VALID_VALUES: &'static [Self] = &[$($name::$variant),+];

            fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $value),+
                }
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

config_option!(
    /// The IDL compiler which generates the stubs.
    ThriftCompiler, COMPILER, {
        Thrift => "thrift",
        Scrooge => "scrooge",
    }
);

config_option!(
    /// The language of the generated stubs.
    ThriftLanguage, LANGUAGE, {
        Java => "java",
        Scala => "scala",
    }
);

config_option!(
    /// The flavour of service stubs: synchronous, or one of the async frameworks.
    RpcStyle, RPC_STYLE, {
        Sync => "sync",
        Finagle => "finagle",
        Ostrich => "ostrich",
    }
);

/// Arguments of `java_thrift_library` on top of the ones every target takes. Unset or
/// empty options fall back to the `ThriftDefaults` given at construction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JavaThriftLibraryArgs {
    pub compiler: Option<String>,
    pub language: Option<String>,
    pub rpc_style: Option<String>,
    /// Namespaces to remap, `{old: new}`.
    pub namespace_map: Option<IndexMap<String, String>>,
    /// Whether to fail when the thrift linter produces warnings. `None` inherits the
    /// linter's own default.
    pub thrift_linter_strict: Option<bool>,
}

fn check_value_for_arg<T: ConfigOption>(
    target: &TargetLabel,
    value: Option<&str>,
    default: &str,
) -> Result<T, TargetDefinitionError> {
    let value = match value {
        Some(v) if !v.is_empty() => v,
        _ => {
            tracing::debug!("{}: `{}` not set, using default `{}`", target, T::ARG, default);
            default
        }
    };
    T::from_str_opt(value).ok_or_else(|| TargetDefinitionError::InvalidConfigurationValue {
        target: target.dupe(),
        arg: T::ARG,
        valid_values: T::VALID_VALUES.iter().map(|v| v.as_str()).collect(),
        value: value.to_owned(),
    })
}

#[derive(Debug)]
pub struct JavaThriftLibrary {
    base: BuildTarget,
    compiler: ThriftCompiler,
    language: ThriftLanguage,
    rpc_style: RpcStyle,
    namespace_map: Option<IndexMap<String, String>>,
    thrift_linter_strict: Option<bool>,
}

impl JavaThriftLibrary {
    pub fn new(
        label: TargetLabel,
        base_args: BuildTargetArgs,
        args: JavaThriftLibraryArgs,
        defaults: &ThriftDefaults,
    ) -> anyhow::Result<Self> {
        let JavaThriftLibraryArgs {
            compiler,
            language,
            rpc_style,
            namespace_map,
            thrift_linter_strict,
        } = args;

        let compiler: ThriftCompiler =
            check_value_for_arg(&label, compiler.as_deref(), &defaults.compiler)?;
        let language: ThriftLanguage =
            check_value_for_arg(&label, language.as_deref(), &defaults.language)?;
        let rpc_style: RpcStyle =
            check_value_for_arg(&label, rpc_style.as_deref(), &defaults.rpc_style)?;

        let mut payload = Payload::new();
        payload.add_fields([
            (COMPILER, PrimitiveField::new(compiler.as_str())),
            (LANGUAGE, PrimitiveField::new(language.as_str())),
            (RPC_STYLE, PrimitiveField::new(rpc_style.as_str())),
        ])?;

        let mut base = BuildTarget::new(label, base_args, payload)?;
        base.add_labels([CODEGEN_LABEL]);

        tracing::debug!(
            "{}: {} compiler={} language={} rpc_style={}",
            base.label(),
            JAVA_THRIFT_LIBRARY,
            compiler,
            language,
            rpc_style
        );

        Ok(Self {
            base,
            compiler,
            language,
            rpc_style,
            namespace_map,
            thrift_linter_strict,
        })
    }

    pub fn compiler(&self) -> ThriftCompiler {
        self.compiler
    }

    pub fn language(&self) -> ThriftLanguage {
        self.language
    }

    pub fn rpc_style(&self) -> RpcStyle {
        self.rpc_style
    }

    pub fn namespace_map(&self) -> Option<&IndexMap<String, String>> {
        self.namespace_map.as_ref()
    }

    pub fn set_namespace_map(&mut self, namespace_map: Option<IndexMap<String, String>>) {
        self.namespace_map = namespace_map;
    }

    pub fn thrift_linter_strict(&self) -> Option<bool> {
        self.thrift_linter_strict
    }

    pub fn set_thrift_linter_strict(&mut self, strict: Option<bool>) {
        self.thrift_linter_strict = strict;
    }
}

impl Target for JavaThriftLibrary {
    fn build_target(&self) -> &BuildTarget {
        &self.base
    }

    fn type_alias(&self) -> &'static str {
        JAVA_THRIFT_LIBRARY
    }

    fn is_codegen(&self) -> bool {
        true
    }

    fn is_thrift(&self) -> bool {
        true
    }

    fn as_java_thrift_library(&self) -> Option<&JavaThriftLibrary> {
        Some(self)
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use bgraph_common::thrift_defaults::ThriftDefaults;
    use bgraph_core::target::testing::TargetLabelExt;
    use bgraph_core::target::TargetLabel;
    use maplit::hashmap;
    use serde_json::json;

    use crate::nodes::build_target::BuildTargetArgs;
    use crate::nodes::java_thrift_library::ConfigOption;
    use crate::nodes::java_thrift_library::JavaThriftLibrary;
    use crate::nodes::java_thrift_library::JavaThriftLibraryArgs;
    use crate::nodes::java_thrift_library::RpcStyle;
    use crate::nodes::java_thrift_library::TargetDefinitionError;
    use crate::nodes::java_thrift_library::ThriftCompiler;
    use crate::nodes::java_thrift_library::ThriftLanguage;
    use crate::nodes::Target;

    fn new_library(args: JavaThriftLibraryArgs) -> anyhow::Result<JavaThriftLibrary> {
        JavaThriftLibrary::new(
            TargetLabel::testing_parse("//src/thrift/com/example:api"),
            BuildTargetArgs {
                sources: vec!["api.thrift".to_owned()],
                ..BuildTargetArgs::default()
            },
            args,
            &ThriftDefaults::default(),
        )
    }

    fn invalid_arg(args: JavaThriftLibraryArgs) -> (&'static str, String) {
        let err = new_library(args).unwrap_err();
        match err.downcast_ref::<TargetDefinitionError>() {
            Some(TargetDefinitionError::InvalidConfigurationValue { arg, value, .. }) => {
                (*arg, value.clone())
            }
            None => panic!("unexpected error: {:#}", err),
        }
    }

    #[test]
    fn test_defaults() -> anyhow::Result<()> {
        let library = new_library(JavaThriftLibraryArgs::default())?;
        assert_eq!(ThriftCompiler::Thrift, library.compiler());
        assert_eq!(ThriftLanguage::Java, library.language());
        assert_eq!(RpcStyle::Sync, library.rpc_style());
        assert_eq!(None, library.namespace_map());
        assert_eq!(None, library.thrift_linter_strict());
        Ok(())
    }

    #[test]
    fn test_empty_strings_use_defaults() -> anyhow::Result<()> {
        let library = new_library(JavaThriftLibraryArgs {
            compiler: Some(String::new()),
            language: Some(String::new()),
            rpc_style: Some(String::new()),
            ..JavaThriftLibraryArgs::default()
        })?;
        assert_eq!("thrift", library.compiler().as_str());
        assert_eq!("java", library.language().as_str());
        assert_eq!("sync", library.rpc_style().as_str());
        Ok(())
    }

    #[test]
    fn test_every_valid_value() -> anyhow::Result<()> {
        for compiler in ThriftCompiler::VALID_VALUES {
            let library = new_library(JavaThriftLibraryArgs {
                compiler: Some(compiler.as_str().to_owned()),
                ..JavaThriftLibraryArgs::default()
            })?;
            assert_eq!(*compiler, library.compiler());
        }
        for language in ThriftLanguage::VALID_VALUES {
            let library = new_library(JavaThriftLibraryArgs {
                language: Some(language.as_str().to_owned()),
                ..JavaThriftLibraryArgs::default()
            })?;
            assert_eq!(*language, library.language());
        }
        for rpc_style in RpcStyle::VALID_VALUES {
            let library = new_library(JavaThriftLibraryArgs {
                rpc_style: Some(rpc_style.as_str().to_owned()),
                ..JavaThriftLibraryArgs::default()
            })?;
            assert_eq!(*rpc_style, library.rpc_style());
        }
        Ok(())
    }

    #[test]
    fn test_invalid_values() {
        assert_eq!(
            ("compiler", "invalid-compiler".to_owned()),
            invalid_arg(JavaThriftLibraryArgs {
                compiler: Some("invalid-compiler".to_owned()),
                ..JavaThriftLibraryArgs::default()
            })
        );
        assert_eq!(
            ("language", "python".to_owned()),
            invalid_arg(JavaThriftLibraryArgs {
                language: Some("python".to_owned()),
                ..JavaThriftLibraryArgs::default()
            })
        );
        // Matching is exact.
        assert_eq!(
            ("rpc_style", "Finagle".to_owned()),
            invalid_arg(JavaThriftLibraryArgs {
                rpc_style: Some("Finagle".to_owned()),
                ..JavaThriftLibraryArgs::default()
            })
        );
    }

    #[test]
    fn test_invalid_value_message() {
        let err = new_library(JavaThriftLibraryArgs {
            compiler: Some("invalid-compiler".to_owned()),
            ..JavaThriftLibraryArgs::default()
        })
        .unwrap_err();
        // The rejected value is reported, not the set of valid values.
        assert_eq!(
            "Invalid target //src/thrift/com/example:api: compiler may only be set to 'thrift', or 'scrooge' ('invalid-compiler' not valid)",
            err.to_string()
        );
    }

    #[test]
    fn test_invalid_default() {
        let err = JavaThriftLibrary::new(
            TargetLabel::testing_parse("//src/thrift:api"),
            BuildTargetArgs::default(),
            JavaThriftLibraryArgs::default(),
            &ThriftDefaults {
                language: "cobol".to_owned(),
                ..ThriftDefaults::default()
            },
        )
        .unwrap_err();
        assert_matches!(
            err.downcast_ref::<TargetDefinitionError>(),
            Some(TargetDefinitionError::InvalidConfigurationValue {
                arg: "language",
                value,
                ..
            }) if value == "cobol"
        );
    }

    #[test]
    fn test_empty_default() {
        let err = JavaThriftLibrary::new(
            TargetLabel::testing_parse("//src/thrift:api"),
            BuildTargetArgs::default(),
            JavaThriftLibraryArgs::default(),
            &ThriftDefaults {
                compiler: String::new(),
                ..ThriftDefaults::default()
            },
        )
        .unwrap_err();
        assert_matches!(
            err.downcast_ref::<TargetDefinitionError>(),
            Some(TargetDefinitionError::InvalidConfigurationValue {
                arg: "compiler",
                value,
                ..
            }) if value.is_empty()
        );
        assert_eq!(
            "Invalid target //src/thrift:api: compiler may only be set to 'thrift', or 'scrooge' ('' not valid)",
            err.to_string()
        );
    }

    #[test]
    fn test_payload_fields() -> anyhow::Result<()> {
        let library = new_library(JavaThriftLibraryArgs {
            compiler: Some("scrooge".to_owned()),
            language: Some("scala".to_owned()),
            rpc_style: Some("finagle".to_owned()),
            ..JavaThriftLibraryArgs::default()
        })?;
        let payload = library.payload();
        assert_eq!(Some(&json!("scrooge")), payload.get_field_value("compiler"));
        assert_eq!(Some(&json!("scala")), payload.get_field_value("language"));
        assert_eq!(Some(&json!("finagle")), payload.get_field_value("rpc_style"));
        Ok(())
    }

    #[test]
    fn test_capabilities() -> anyhow::Result<()> {
        let library = new_library(JavaThriftLibraryArgs::default())?;
        assert_eq!("java_thrift_library", library.type_alias());
        assert!(library.is_thrift());
        assert!(library.is_codegen());
        assert!(library.build_target().has_label("codegen"));
        assert!(library.as_java_thrift_library().is_some());
        Ok(())
    }

    #[test]
    fn test_unvalidated_fields() -> anyhow::Result<()> {
        let namespace_map: indexmap::IndexMap<String, String> = hashmap! {
            "com.old".to_owned() => "com.new".to_owned(),
        }
        .into_iter()
        .collect();
        let mut library = new_library(JavaThriftLibraryArgs {
            namespace_map: Some(namespace_map.clone()),
            thrift_linter_strict: Some(false),
            ..JavaThriftLibraryArgs::default()
        })?;
        assert_eq!(Some(&namespace_map), library.namespace_map());
        assert_eq!(Some(false), library.thrift_linter_strict());

        library.set_thrift_linter_strict(Some(true));
        library.set_namespace_map(None);
        assert_eq!(Some(true), library.thrift_linter_strict());
        assert_eq!(None, library.namespace_map());
        Ok(())
    }
}
