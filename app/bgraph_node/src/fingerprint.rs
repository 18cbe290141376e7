/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

//! Strategies turning a target into the fingerprint used as its build cache key.

use std::fmt::Debug;

use bgraph_common::thrift_defaults::ThriftDefaults;
use dupe::Dupe;

use crate::nodes::java_thrift_library::ConfigOption;
use crate::nodes::Target;
use crate::payload::Fingerprint;
use crate::payload::FingerprintHasher;

pub trait FingerprintStrategy: Debug + Send + Sync {
    fn compute_fingerprint(&self, target: &dyn Target) -> Option<Fingerprint>;

    /// The fingerprint as hex, `None` for targets with nothing to fingerprint.
    fn fingerprint_target(&self, target: &dyn Target) -> Option<String> {
        self.compute_fingerprint(target).map(|fp| fp.to_string())
    }
}

/// Fingerprints a target by its payload alone.
#[derive(Debug, Default, Clone, Copy, Dupe, PartialEq, Eq, Hash)]
pub struct DefaultFingerprintStrategy;

impl FingerprintStrategy for DefaultFingerprintStrategy {
    fn compute_fingerprint(&self, target: &dyn Target) -> Option<Fingerprint> {
        target.payload().fingerprint()
    }
}

/// Mixes the compiler, language and rpc style into the fingerprint of
/// `java_thrift_library` targets. Other targets get their payload fingerprint.
///
/// The defaults only key the strategy's identity: strategies compare equal when they
/// were created from the same defaults, so a change of defaults is seen as a change of
/// strategy. They are not hashed, since targets have already resolved their defaults
/// when they were constructed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JavaThriftLibraryFingerprintStrategy {
    defaults: ThriftDefaults,
}

impl JavaThriftLibraryFingerprintStrategy {
    pub fn new(defaults: ThriftDefaults) -> Self {
        Self { defaults }
    }

    pub fn defaults(&self) -> &ThriftDefaults {
        &self.defaults
    }
}

impl FingerprintStrategy for JavaThriftLibraryFingerprintStrategy {
    fn compute_fingerprint(&self, target: &dyn Target) -> Option<Fingerprint> {
        let fp = target.payload().fingerprint();
        let Some(library) = target.as_java_thrift_library() else {
            return fp;
        };

        let mut hasher = FingerprintHasher::new();
        if let Some(fp) = fp {
            hasher.update(fp.to_string());
        }
        hasher.update(library.compiler().as_str());
        hasher.update(library.language().as_str());
        hasher.update(library.rpc_style().as_str());
        Some(hasher.finish())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::Hash;
    use std::hash::Hasher;

    use bgraph_common::thrift_defaults::ThriftDefaults;
    use bgraph_core::target::testing::TargetLabelExt;
    use bgraph_core::target::TargetLabel;

    use crate::fingerprint::DefaultFingerprintStrategy;
    use crate::fingerprint::FingerprintStrategy;
    use crate::fingerprint::JavaThriftLibraryFingerprintStrategy;
    use crate::nodes::build_target::BuildTarget;
    use crate::nodes::build_target::BuildTargetArgs;
    use crate::nodes::java_thrift_library::JavaThriftLibrary;
    use crate::nodes::java_thrift_library::JavaThriftLibraryArgs;
    use crate::nodes::Target;
    use crate::payload::Payload;

    fn library(compiler: &str) -> JavaThriftLibrary {
        JavaThriftLibrary::new(
            TargetLabel::testing_parse("//src/thrift:api"),
            BuildTargetArgs {
                sources: vec!["api.thrift".to_owned()],
                ..BuildTargetArgs::default()
            },
            JavaThriftLibraryArgs {
                compiler: Some(compiler.to_owned()),
                ..JavaThriftLibraryArgs::default()
            },
            &ThriftDefaults::default(),
        )
        .unwrap()
    }

    fn hash_of<T: Hash>(t: &T) -> u64 {
        let mut hasher = DefaultHasher::new();
        t.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn test_default_strategy_is_payload_fingerprint() {
        let library = library("thrift");
        assert_eq!(
            library.payload().fingerprint(),
            DefaultFingerprintStrategy.compute_fingerprint(&library)
        );
    }

    #[test]
    fn test_thrift_strategy() {
        let strategy = JavaThriftLibraryFingerprintStrategy::new(ThriftDefaults::default());

        let thrift = library("thrift");
        let fp = strategy.fingerprint_target(&thrift).unwrap();
        assert_eq!(40, fp.len());
        assert_eq!(Some(fp.clone()), strategy.fingerprint_target(&library("thrift")));
        assert_ne!(Some(fp.clone()), strategy.fingerprint_target(&library("scrooge")));
        assert_ne!(
            Some(fp),
            DefaultFingerprintStrategy.fingerprint_target(&thrift)
        );
    }

    #[test]
    fn test_thrift_strategy_other_targets() -> anyhow::Result<()> {
        let strategy = JavaThriftLibraryFingerprintStrategy::new(ThriftDefaults::default());
        let target = BuildTarget::new(
            TargetLabel::testing_parse("//src/java:lib"),
            BuildTargetArgs {
                sources: vec!["Lib.java".to_owned()],
                ..BuildTargetArgs::default()
            },
            Payload::new(),
        )?;
        assert_eq!(
            DefaultFingerprintStrategy.compute_fingerprint(&target),
            strategy.compute_fingerprint(&target)
        );
        Ok(())
    }

    #[test]
    fn test_strategy_equality() {
        let a = JavaThriftLibraryFingerprintStrategy::new(ThriftDefaults::default());
        let b = JavaThriftLibraryFingerprintStrategy::new(ThriftDefaults::default());
        let c = JavaThriftLibraryFingerprintStrategy::new(ThriftDefaults {
            compiler: "scrooge".to_owned(),
            ..ThriftDefaults::default()
        });
        assert_eq!(a, b);
        assert_eq!(hash_of(&a), hash_of(&b));
        assert_ne!(a, c);
        assert_eq!("scrooge", c.defaults().compiler);
    }

    #[test]
    fn test_defaults_do_not_change_fingerprints() {
        let target = library("thrift");
        let a = JavaThriftLibraryFingerprintStrategy::new(ThriftDefaults::default());
        let b = JavaThriftLibraryFingerprintStrategy::new(ThriftDefaults {
            compiler: "scrooge".to_owned(),
            rpc_style: "finagle".to_owned(),
            ..ThriftDefaults::default()
        });
        assert_ne!(a, b);
        assert_eq!(a.fingerprint_target(&target), b.fingerprint_target(&target));
    }
}
