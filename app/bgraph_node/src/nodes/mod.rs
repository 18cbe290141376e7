/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

use std::fmt::Debug;

use bgraph_core::target::TargetLabel;

use crate::nodes::build_target::BuildTarget;
use crate::nodes::java_thrift_library::JavaThriftLibrary;
use crate::payload::Payload;

pub mod build_target;
pub mod java_thrift_library;

/// A node in the build graph. Every kind of target is built around a `BuildTarget`
/// holding its identity, sources, dependencies and payload; the remaining methods are
/// capability queries which default to "no".
pub trait Target: Debug + Send + Sync {
    fn build_target(&self) -> &BuildTarget;

    /// The name the target is declared with in build files, e.g. `java_thrift_library`.
    fn type_alias(&self) -> &'static str;

    /// Targets whose sources are inputs to code generation.
    fn is_codegen(&self) -> bool {
        false
    }

    /// Kept for callers which predate `as_java_thrift_library`.
    fn is_thrift(&self) -> bool {
        false
    }

    fn as_java_thrift_library(&self) -> Option<&JavaThriftLibrary> {
        None
    }

    fn label(&self) -> &TargetLabel {
        self.build_target().label()
    }

    fn payload(&self) -> &Payload {
        self.build_target().payload()
    }
}
