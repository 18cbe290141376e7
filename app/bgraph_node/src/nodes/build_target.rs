/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

use bgraph_core::target::TargetLabel;
use dupe::Dupe;
use indexmap::IndexSet;

use crate::nodes::Target;
use crate::payload::Payload;
use crate::payload::PrimitiveField;
use crate::payload::SourcesField;

pub const SOURCES: &str = "sources";
pub const DEPENDENCIES: &str = "dependencies";

/// The arguments every target accepts, whatever its kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildTargetArgs {
    /// Paths relative to the target's package.
    pub sources: Vec<String>,
    pub dependencies: Vec<TargetLabel>,
    pub labels: Vec<String>,
}

/// Identity, inputs and payload shared by every kind of target.
///
/// The payload handed to `new` gets the `sources` and `dependencies` fields added and
/// is then frozen, so the fingerprint of a constructed target never changes. Labels
/// are classification tags and are not part of the payload.
#[derive(Debug)]
pub struct BuildTarget {
    label: TargetLabel,
    sources: SourcesField,
    dependencies: Vec<TargetLabel>,
    labels: IndexSet<String>,
    payload: Payload,
}

impl BuildTarget {
    pub fn new(
        label: TargetLabel,
        args: BuildTargetArgs,
        mut payload: Payload,
    ) -> anyhow::Result<Self> {
        let BuildTargetArgs {
            sources,
            dependencies,
            labels,
        } = args;

        let sources = SourcesField::new(label.pkg().dupe(), sources);
        payload.add_field(SOURCES, sources.clone())?;
        payload.add_field(
            DEPENDENCIES,
            PrimitiveField::new(
                dependencies
                    .iter()
                    .map(|d| d.to_string())
                    .collect::<Vec<_>>(),
            ),
        )?;
        payload.freeze();

        Ok(Self {
            label,
            sources,
            dependencies,
            labels: labels.into_iter().collect(),
            payload,
        })
    }

    pub fn label(&self) -> &TargetLabel {
        &self.label
    }

    pub fn sources(&self) -> &[String] {
        self.sources.sources()
    }

    pub fn sources_relative_to_build_root(&self) -> impl Iterator<Item = String> + '_ {
        self.sources.relative_to_build_root()
    }

    pub fn dependencies(&self) -> &[TargetLabel] {
        &self.dependencies
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(String::as_str)
    }

    pub fn has_label(&self, label: &str) -> bool {
        self.labels.contains(label)
    }

    pub fn add_labels<'a>(&mut self, labels: impl IntoIterator<Item = &'a str>) {
        for label in labels {
            self.labels.insert(label.to_owned());
        }
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }
}

impl Target for BuildTarget {
    fn build_target(&self) -> &BuildTarget {
        self
    }

    fn type_alias(&self) -> &'static str {
        "target"
    }
}
