/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

//! Ties the pieces together the way graph construction does: find the build files,
//! resolve defaults from config once, then create one node per declared target.

use std::fs;
use std::sync::Arc;

use bgraph_common::legacy_configs::LegacyConfigParser;
use bgraph_common::thrift_defaults::ThriftDefaults;
use bgraph_core::build_file::scan_build_files;
use bgraph_core::build_file::BuildIgnorePatterns;
use bgraph_core::build_file::FileSystemProjectTree;
use bgraph_core::build_file::ProjectTree;
use bgraph_core::package::PackageLabel;
use bgraph_core::target::TargetLabel;
use bgraph_core::target::TargetName;
use bgraph_node::fingerprint::DefaultFingerprintStrategy;
use bgraph_node::fingerprint::FingerprintStrategy;
use bgraph_node::fingerprint::JavaThriftLibraryFingerprintStrategy;
use bgraph_node::nodes::build_target::BuildTarget;
use bgraph_node::nodes::build_target::BuildTargetArgs;
use bgraph_node::nodes::java_thrift_library::ConfigOption;
use bgraph_node::nodes::java_thrift_library::JavaThriftLibrary;
use bgraph_node::nodes::java_thrift_library::JavaThriftLibraryArgs;
use bgraph_node::nodes::Target;
use bgraph_node::payload::Payload;

fn write(root: &std::path::Path, rel: &str, contents: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

#[test]
fn test_targets_for_scanned_packages() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let root = dir.path();
    write(root, ".bgconfig", "[thrift]\ndefault_compiler = scrooge\n");
    write(root, "src/thrift/service/BUILD", "");
    write(root, "src/thrift/service/service.thrift", "");
    write(root, "src/java/app/BUILD", "");
    write(root, "src/java/app/App.java", "");
    write(root, "build-support/BUILD", "");

    let mut parser = LegacyConfigParser::new();
    parser.parse_file(&root.join(".bgconfig"))?;
    let config = parser.finish();
    let defaults = ThriftDefaults::from_config(&config);

    let tree = FileSystemProjectTree::new(root);
    let ignore = BuildIgnorePatterns::new(tree.build_root(), ["build-support/"])?;
    let build_files = scan_build_files(&tree, "", Some(&ignore))?;
    assert_eq!(
        vec!["src/java/app", "src/thrift/service"],
        build_files.iter().map(|f| f.spec_path()).collect::<Vec<_>>()
    );

    let service_label = TargetLabel::new(
        PackageLabel::new(build_files[1].spec_path())?,
        TargetName::new("service")?,
    );
    let mut targets: Vec<Arc<dyn Target>> = Vec::new();
    targets.push(Arc::new(BuildTarget::new(
        TargetLabel::new(
            PackageLabel::new(build_files[0].spec_path())?,
            TargetName::new("app")?,
        ),
        BuildTargetArgs {
            sources: vec!["App.java".to_owned()],
            dependencies: vec![service_label.clone()],
            labels: Vec::new(),
        },
        Payload::new(),
    )?));
    targets.push(Arc::new(JavaThriftLibrary::new(
        service_label,
        BuildTargetArgs {
            sources: vec!["service.thrift".to_owned()],
            ..BuildTargetArgs::default()
        },
        JavaThriftLibraryArgs::default(),
        &defaults,
    )?));

    for target in &targets {
        for source in target.build_target().sources_relative_to_build_root() {
            assert!(tree.is_file(&source), "missing source `{}`", source);
        }
    }

    let thrift: Vec<_> = targets
        .iter()
        .filter_map(|t| t.as_java_thrift_library())
        .collect();
    assert_eq!(1, thrift.len());
    assert_eq!("scrooge", thrift[0].compiler().as_str());
    assert_eq!(
        vec!["//src/thrift/service:service"],
        targets
            .iter()
            .filter(|t| t.is_thrift())
            .map(|t| t.label().to_string())
            .collect::<Vec<_>>()
    );

    let strategy = JavaThriftLibraryFingerprintStrategy::new(defaults);
    for target in &targets {
        let fp = strategy.fingerprint_target(target.as_ref());
        assert!(fp.is_some(), "{}", target.label());
        assert_eq!(
            target.is_thrift(),
            fp != DefaultFingerprintStrategy.fingerprint_target(target.as_ref()),
            "{}",
            target.label()
        );
    }
    Ok(())
}
