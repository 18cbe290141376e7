/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

//! Target identity: a name within a package, and the fully qualified label.

use std::fmt;
use std::fmt::Display;
use std::str::FromStr;
use std::sync::Arc;

use allocative::Allocative;
use derive_more::Display;
use dupe::Dupe;

use crate::package::PackageLabel;

#[derive(thiserror::Error, Debug)]
pub enum TargetLabelParseError {
    #[error("Target name is empty")]
    EmptyName,
    #[error("Invalid target name `{0}`, target names may not contain `:`, `/` or whitespace")]
    InvalidName(String),
    #[error("Expected a label of the form `//package:name`, got `{0}`")]
    MissingColon(String),
}

#[derive(Clone, Dupe, Debug, Display, Eq, PartialEq, Hash, Ord, PartialOrd, Allocative)]
#[display(fmt = "{}", _0)]
pub struct TargetName(Arc<str>);

impl TargetName {
    pub fn new(name: &str) -> anyhow::Result<Self> {
        if name.is_empty() {
            return Err(TargetLabelParseError::EmptyName.into());
        }
        if name
            .chars()
            .any(|c| c == ':' || c == '/' || c.is_whitespace())
        {
            return Err(TargetLabelParseError::InvalidName(name.to_owned()).into());
        }
        Ok(Self(Arc::from(name)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A fully qualified target, `//package:name`.
#[derive(Clone, Dupe, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Allocative)]
pub struct TargetLabel {
    pkg: PackageLabel,
    name: TargetName,
}

impl TargetLabel {
    pub fn new(pkg: PackageLabel, name: TargetName) -> Self {
        Self { pkg, name }
    }

    /// Parses `//pkg:name` or `pkg:name`.
    pub fn parse(s: &str) -> anyhow::Result<Self> {
        let rest = s.strip_prefix("//").unwrap_or(s);
        let (pkg, name) = rest
            .rsplit_once(':')
            .ok_or_else(|| TargetLabelParseError::MissingColon(s.to_owned()))?;
        Ok(Self::new(PackageLabel::new(pkg)?, TargetName::new(name)?))
    }

    pub fn pkg(&self) -> &PackageLabel {
        &self.pkg
    }

    pub fn name(&self) -> &TargetName {
        &self.name
    }
}

impl Display for TargetLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "//{}:{}", self.pkg, self.name)
    }
}

impl FromStr for TargetLabel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        Self::parse(s)
    }
}

pub mod testing {
    use crate::target::TargetLabel;

    pub trait TargetLabelExt {
        fn testing_parse(s: &str) -> Self;
    }

    impl TargetLabelExt for TargetLabel {
        fn testing_parse(s: &str) -> TargetLabel {
            TargetLabel::parse(s).unwrap()
        }
    }
}
