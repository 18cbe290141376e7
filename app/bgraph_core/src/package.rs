/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

use std::sync::Arc;

use allocative::Allocative;
use derive_more::Display;
use dupe::Dupe;

#[derive(thiserror::Error, Debug)]
enum PackageLabelError {
    #[error("Package `{0}` must be relative to the build root")]
    Absolute(String),
    #[error("Package `{0}` may not end with a trailing `/`")]
    TrailingSlash(String),
    #[error("Package `{0}` may not contain `.` or `..` components")]
    NotNormalized(String),
    #[error("Package `{0}` contains an empty path component")]
    EmptyComponent(String),
}

/// The directory, relative to the build root, which declares a set of targets. The
/// root package is the empty string.
#[derive(Clone, Dupe, Debug, Display, Eq, PartialEq, Hash, Ord, PartialOrd, Allocative)]
#[display(fmt = "{}", _0)]
pub struct PackageLabel(Arc<str>);

impl PackageLabel {
    pub fn new(path: &str) -> anyhow::Result<Self> {
        if path.starts_with('/') {
            return Err(PackageLabelError::Absolute(path.to_owned()).into());
        }
        if path.is_empty() {
            return Ok(Self::root());
        }
        if path.ends_with('/') {
            return Err(PackageLabelError::TrailingSlash(path.to_owned()).into());
        }
        for component in path.split('/') {
            match component {
                "" => return Err(PackageLabelError::EmptyComponent(path.to_owned()).into()),
                "." | ".." => {
                    return Err(PackageLabelError::NotNormalized(path.to_owned()).into());
                }
                _ => {}
            }
        }
        Ok(Self(Arc::from(path)))
    }

    pub fn root() -> Self {
        Self(Arc::from(""))
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Joins a package-relative path onto this package.
    pub fn join(&self, rel: &str) -> String {
        if self.is_root() {
            rel.to_owned()
        } else {
            format!("{}/{}", self.0, rel)
        }
    }
}
