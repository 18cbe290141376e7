/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

use assert_matches::assert_matches;
use bgraph_common::legacy_configs::testing::parse;
use bgraph_common::thrift_defaults::ThriftDefaults;
use bgraph_core::logging::subscriber_for_writer;
use bgraph_core::logging::testing::CapturedLogs;
use bgraph_core::target::testing::TargetLabelExt;
use bgraph_core::target::TargetLabel;
use bgraph_node::fingerprint::FingerprintStrategy;
use bgraph_node::fingerprint::JavaThriftLibraryFingerprintStrategy;
use bgraph_node::nodes::build_target::BuildTargetArgs;
use bgraph_node::nodes::java_thrift_library::ConfigOption;
use bgraph_node::nodes::java_thrift_library::JavaThriftLibrary;
use bgraph_node::nodes::java_thrift_library::JavaThriftLibraryArgs;
use bgraph_node::nodes::java_thrift_library::TargetDefinitionError;
use bgraph_node::nodes::Target;
use indexmap::IndexMap;
use indoc::indoc;
use maplit::hashmap;

fn base_args() -> BuildTargetArgs {
    BuildTargetArgs {
        sources: vec!["service.thrift".to_owned(), "types.thrift".to_owned()],
        dependencies: vec![TargetLabel::testing_parse("//src/thrift/common:common")],
        labels: Vec::new(),
    }
}

fn library(args: JavaThriftLibraryArgs) -> anyhow::Result<JavaThriftLibrary> {
    JavaThriftLibrary::new(
        TargetLabel::testing_parse("//src/thrift/com/example/service:service"),
        base_args(),
        args,
        &ThriftDefaults::default(),
    )
}

fn options(compiler: &str, language: &str, rpc_style: &str) -> JavaThriftLibraryArgs {
    JavaThriftLibraryArgs {
        compiler: Some(compiler.to_owned()),
        language: Some(language.to_owned()),
        rpc_style: Some(rpc_style.to_owned()),
        ..JavaThriftLibraryArgs::default()
    }
}

#[test]
fn test_scrooge_scala_finagle() -> anyhow::Result<()> {
    let library = library(options("scrooge", "scala", "finagle"))?;
    assert_eq!("scrooge", library.compiler().as_str());
    assert_eq!("scala", library.language().as_str());
    assert_eq!("finagle", library.rpc_style().as_str());

    let payload = library.payload();
    assert_eq!(Some("scrooge"), payload.get_field_value("compiler").and_then(|v| v.as_str()));
    assert_eq!(Some("scala"), payload.get_field_value("language").and_then(|v| v.as_str()));
    assert_eq!(Some("finagle"), payload.get_field_value("rpc_style").and_then(|v| v.as_str()));
    Ok(())
}

#[test]
fn test_all_options_omitted() -> anyhow::Result<()> {
    let library = library(JavaThriftLibraryArgs::default())?;
    assert_eq!("thrift", library.compiler().to_string());
    assert_eq!("java", library.language().to_string());
    assert_eq!("sync", library.rpc_style().to_string());
    Ok(())
}

#[test]
fn test_invalid_compiler() {
    let err = library(JavaThriftLibraryArgs {
        compiler: Some("invalid-compiler".to_owned()),
        ..JavaThriftLibraryArgs::default()
    })
    .unwrap_err();

    assert_matches!(
        err.downcast_ref::<TargetDefinitionError>(),
        Some(TargetDefinitionError::InvalidConfigurationValue {
            arg: "compiler",
            valid_values,
            value,
            ..
        }) => {
            assert_eq!(&vec!["thrift", "scrooge"], valid_values);
            assert_eq!("invalid-compiler", value);
        }
    );
    let message = err.to_string();
    for expected in ["compiler", "'thrift'", "'scrooge'", "'invalid-compiler' not valid"] {
        assert!(message.contains(expected), "`{}` not in `{}`", expected, message);
    }
}

#[test]
fn test_namespace_map_round_trips() -> anyhow::Result<()> {
    let namespace_map: IndexMap<String, String> =
        hashmap! { "com.old".to_owned() => "com.new".to_owned() }
            .into_iter()
            .collect();
    let library = library(JavaThriftLibraryArgs {
        namespace_map: Some(namespace_map),
        ..JavaThriftLibraryArgs::default()
    })?;
    assert_eq!(
        Some("com.new"),
        library
            .namespace_map()
            .and_then(|m| m.get("com.old"))
            .map(String::as_str)
    );
    assert_eq!(Some(1), library.namespace_map().map(|m| m.len()));
    Ok(())
}

#[test]
fn test_thrift_linter_strict_round_trips() -> anyhow::Result<()> {
    let library = library(JavaThriftLibraryArgs {
        thrift_linter_strict: Some(true),
        ..JavaThriftLibraryArgs::default()
    })?;
    assert_eq!(Some(true), library.thrift_linter_strict());
    Ok(())
}

#[test]
fn test_fingerprints_follow_options() -> anyhow::Result<()> {
    let strategy = JavaThriftLibraryFingerprintStrategy::new(ThriftDefaults::default());

    let a = library(options("scrooge", "scala", "finagle"))?;
    let b = library(options("scrooge", "scala", "finagle"))?;
    assert_eq!(a.payload().fingerprint(), b.payload().fingerprint());
    assert_eq!(strategy.fingerprint_target(&a), strategy.fingerprint_target(&b));

    for (changed, field) in [
        (options("thrift", "scala", "finagle"), "compiler"),
        (options("scrooge", "java", "finagle"), "language"),
        (options("scrooge", "scala", "ostrich"), "rpc_style"),
    ] {
        let c = library(changed)?;
        assert_ne!(
            a.payload().fingerprint_keys([field]),
            c.payload().fingerprint_keys([field]),
            "{}",
            field
        );
        assert_ne!(a.payload().fingerprint(), c.payload().fingerprint(), "{}", field);
        assert_ne!(
            strategy.fingerprint_target(&a),
            strategy.fingerprint_target(&c),
            "{}",
            field
        );
    }

    // Unvalidated fields are not part of the cache key.
    let d = library(JavaThriftLibraryArgs {
        thrift_linter_strict: Some(true),
        ..options("scrooge", "scala", "finagle")
    })?;
    assert_eq!(a.payload().fingerprint(), d.payload().fingerprint());
    Ok(())
}

#[test]
fn test_defaults_from_config() -> anyhow::Result<()> {
    let config = parse(&[(
        "/repo/.bgconfig",
        indoc!(
            r#"
            [thrift]
              default_compiler = scrooge
              default_language = scala
              default_rpc_style = finagle
            "#
        ),
    )])?;
    let defaults = ThriftDefaults::from_config(&config);
    let library = JavaThriftLibrary::new(
        TargetLabel::testing_parse("//src/thrift:api"),
        base_args(),
        JavaThriftLibraryArgs {
            rpc_style: Some("ostrich".to_owned()),
            ..JavaThriftLibraryArgs::default()
        },
        &defaults,
    )?;
    assert_eq!("scrooge", library.compiler().as_str());
    assert_eq!("scala", library.language().as_str());
    assert_eq!("ostrich", library.rpc_style().as_str());
    Ok(())
}

#[test]
fn test_invalid_configured_default() -> anyhow::Result<()> {
    let config = parse(&[("/repo/.bgconfig", "[thrift]\ndefault_rpc_style = grpc\n")])?;
    let err = JavaThriftLibrary::new(
        TargetLabel::testing_parse("//src/thrift:api"),
        base_args(),
        JavaThriftLibraryArgs::default(),
        &ThriftDefaults::from_config(&config),
    )
    .unwrap_err();
    assert_eq!(
        "Invalid target //src/thrift:api: rpc_style may only be set to 'sync', or 'finagle', or 'ostrich' ('grpc' not valid)",
        err.to_string()
    );
    Ok(())
}

#[test]
fn test_blank_configured_default() -> anyhow::Result<()> {
    let config = parse(&[("/repo/.bgconfig", "[thrift]\ndefault_compiler =\n")])?;
    let defaults = ThriftDefaults::from_config(&config);
    assert_eq!("", defaults.compiler);

    let err = JavaThriftLibrary::new(
        TargetLabel::testing_parse("//src/thrift:api"),
        base_args(),
        JavaThriftLibraryArgs::default(),
        &defaults,
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
    assert!(err.to_string().ends_with("('' not valid)"), "{}", err);
    Ok(())
}

#[test]
fn test_construction_is_logged() -> anyhow::Result<()> {
    let logs = CapturedLogs::default();
    let subscriber = subscriber_for_writer(logs.clone(), Some("debug"))?;
    tracing::subscriber::with_default(subscriber, || library(JavaThriftLibraryArgs::default()))?;

    let contents = logs.contents();
    assert!(
        contents.contains("`compiler` not set, using default `thrift`"),
        "{}",
        contents
    );
    assert!(
        contents.contains("java_thrift_library compiler=thrift language=java rpc_style=sync"),
        "{}",
        contents
    );
    Ok(())
}
