/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

//! Discovery of the `BUILD` files which declare targets.
//!
//! A directory may hold a family of build files: `BUILD` plus any number of
//! `BUILD.<suffix>` siblings. All paths handled here are `/`-separated and relative to
//! the build root; the root itself is the empty string.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use std::fmt::Debug;
use std::fs;
use std::hash::Hash;
use std::hash::Hasher;
use std::path::Path;
use std::path::PathBuf;

use anyhow::Context;
use ignore::gitignore::Gitignore;
use ignore::gitignore::GitignoreBuilder;
use once_cell::sync::Lazy;
use regex::Regex;
use walkdir::WalkDir;

const BUILD_FILE_PREFIX: &str = "BUILD";

static BUILD_FILE_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new("^BUILD(\\.[a-zA-Z0-9_-]+)?$").unwrap());

#[derive(thiserror::Error, Debug)]
pub enum BuildFileError {
    #[error("{0}")]
    MissingBuildFile(String),
    #[error("{0}")]
    BadPath(String),
}

pub fn is_build_file_name(name: &str) -> bool {
    BUILD_FILE_NAME.is_match(name)
}

fn join_rel(dir: &str, name: &str) -> String {
    if dir.is_empty() {
        name.to_owned()
    } else {
        format!("{}/{}", dir.trim_end_matches('/'), name)
    }
}

fn dirname(rel: &str) -> &str {
    rel.rsplit_once('/').map_or("", |(dir, _)| dir)
}

fn basename(rel: &str) -> &str {
    rel.rsplit_once('/').map_or(rel, |(_, name)| name)
}

/// Read access to the files under a build root.
pub trait ProjectTree: Debug + Send + Sync {
    fn build_root(&self) -> &Path;

    fn is_dir(&self, relpath: &str) -> bool;

    fn is_file(&self, relpath: &str) -> bool;

    fn exists(&self, relpath: &str) -> bool;

    /// Sorted names of the entries directly inside `dir_relpath` which start with
    /// `prefix`. A missing directory has no entries.
    fn glob1(&self, dir_relpath: &str, prefix: &str) -> anyhow::Result<Vec<String>>;

    /// Every file below `base_relpath`, sorted. Directories for which `prune` returns
    /// true are not descended into.
    fn walk(&self, base_relpath: &str, prune: &dyn Fn(&str) -> bool)
    -> anyhow::Result<Vec<String>>;

    fn content(&self, relpath: &str) -> anyhow::Result<String>;
}

#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct FileSystemProjectTree {
    build_root: PathBuf,
}

impl FileSystemProjectTree {
    pub fn new(build_root: impl Into<PathBuf>) -> Self {
        Self {
            build_root: build_root.into(),
        }
    }

    fn abs(&self, relpath: &str) -> PathBuf {
        if relpath.is_empty() {
            self.build_root.clone()
        } else {
            self.build_root.join(relpath)
        }
    }

    /// `None` if a component of the relative path is not valid UTF-8.
    fn rel(&self, path: &Path) -> anyhow::Result<Option<String>> {
        let rel = path.strip_prefix(&self.build_root).with_context(|| {
            format!(
                "`{}` is not under the build root `{}`",
                path.display(),
                self.build_root.display()
            )
        })?;
        Ok(rel
            .components()
            .map(|c| c.as_os_str().to_str())
            .collect::<Option<Vec<_>>>()
            .map(|parts| parts.join("/")))
    }
}

impl ProjectTree for FileSystemProjectTree {
    fn build_root(&self) -> &Path {
        &self.build_root
    }

    fn is_dir(&self, relpath: &str) -> bool {
        self.abs(relpath).is_dir()
    }

    fn is_file(&self, relpath: &str) -> bool {
        self.abs(relpath).is_file()
    }

    fn exists(&self, relpath: &str) -> bool {
        self.abs(relpath).exists()
    }

    fn glob1(&self, dir_relpath: &str, prefix: &str) -> anyhow::Result<Vec<String>> {
        let dir = self.abs(dir_relpath);
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut names = Vec::new();
        for entry in
            fs::read_dir(&dir).with_context(|| format!("Listing `{}`", dir.display()))?
        {
            let name = entry?.file_name();
            // Build file names are ASCII, anything else can't match.
            if let Some(name) = name.to_str() {
                if name.starts_with(prefix) {
                    names.push(name.to_owned());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    fn walk(
        &self,
        base_relpath: &str,
        prune: &dyn Fn(&str) -> bool,
    ) -> anyhow::Result<Vec<String>> {
        let mut files = Vec::new();
        let walker = WalkDir::new(self.abs(base_relpath))
            .into_iter()
            .filter_entry(|e| {
                if e.depth() == 0 || !e.file_type().is_dir() {
                    return true;
                }
                match self.rel(e.path()) {
                    Ok(Some(rel)) => !prune(&rel),
                    Ok(None) => {
                        tracing::warn!(
                            "Skipping `{}`: path is not valid UTF-8",
                            e.path().display()
                        );
                        false
                    }
                    Err(_) => true,
                }
            });
        for entry in walker {
            let entry = entry.with_context(|| format!("Walking `{}`", base_relpath))?;
            if !entry.file_type().is_file() {
                continue;
            }
            match self.rel(entry.path())? {
                Some(rel) => files.push(rel),
                None => tracing::warn!(
                    "Skipping `{}`: path is not valid UTF-8",
                    entry.path().display()
                ),
            }
        }
        files.sort();
        Ok(files)
    }

    fn content(&self, relpath: &str) -> anyhow::Result<String> {
        let path = self.abs(relpath);
        fs::read_to_string(&path).with_context(|| format!("Reading `{}`", path.display()))
    }
}

/// Gitignore-style patterns naming paths that are never scanned for build files.
#[derive(Debug, Clone)]
pub struct BuildIgnorePatterns {
    matcher: Gitignore,
}

impl BuildIgnorePatterns {
    pub fn new<'a>(
        build_root: &Path,
        patterns: impl IntoIterator<Item = &'a str>,
    ) -> anyhow::Result<Self> {
        let mut builder = GitignoreBuilder::new(build_root);
        for pattern in patterns {
            builder
                .add_line(None, pattern)
                .with_context(|| format!("Invalid build ignore pattern `{}`", pattern))?;
        }
        Ok(Self {
            matcher: builder.build()?,
        })
    }

    /// Whether `relpath` or any directory above it is ignored.
    pub fn is_ignored(&self, relpath: &str, is_dir: bool) -> bool {
        self.matcher
            .matched_path_or_any_parents(relpath, is_dir)
            .is_ignore()
    }
}

/// A single build file within a family.
#[derive(Clone)]
pub struct BuildFile {
    build_root: PathBuf,
    full_path: PathBuf,
    relpath: String,
}

impl BuildFile {
    /// `relpath` may point at a build file or at a directory holding one. When the
    /// plain `BUILD` file is absent, the first sibling with a build file name is used.
    pub fn new(tree: &dyn ProjectTree, relpath: &str) -> anyhow::Result<Self> {
        let mut buildfile = if tree.is_dir(relpath) {
            tracing::warn!(
                "Creating a BuildFile from the directory `{}` is deprecated, pass the path of the file",
                relpath
            );
            join_rel(relpath, BUILD_FILE_PREFIX)
        } else {
            relpath.to_owned()
        };

        if !tree.exists(&buildfile) || tree.is_dir(&buildfile) {
            let dir = dirname(&buildfile).to_owned();
            for candidate in tree.glob1(&dir, BUILD_FILE_PREFIX)? {
                let candidate = join_rel(&dir, &candidate);
                if is_build_file_name(basename(&candidate)) && tree.is_file(&candidate) {
                    buildfile = candidate;
                    break;
                }
            }
        }

        let full_path = tree.build_root().join(&buildfile);
        if !tree.exists(&buildfile) {
            return Err(BuildFileError::MissingBuildFile(format!(
                "BUILD file does not exist at: {}",
                full_path.display()
            ))
            .into());
        }
        if tree.is_dir(&buildfile) {
            return Err(BuildFileError::MissingBuildFile(format!(
                "Path to buildfile ({}) is a directory, but it must be a file.",
                full_path.display()
            ))
            .into());
        }
        if !is_build_file_name(basename(&buildfile)) {
            return Err(BuildFileError::MissingBuildFile(format!(
                "{} is not a BUILD file",
                full_path.display()
            ))
            .into());
        }

        Ok(Self {
            build_root: tree.build_root().to_owned(),
            full_path,
            relpath: buildfile,
        })
    }

    pub fn full_path(&self) -> &Path {
        &self.full_path
    }

    pub fn name(&self) -> &str {
        basename(&self.relpath)
    }

    pub fn parent_path(&self) -> &Path {
        self.full_path.parent().unwrap_or(&self.build_root)
    }

    /// Path of the file relative to the build root.
    pub fn relpath(&self) -> &str {
        &self.relpath
    }

    /// The package directory which the file declares targets for.
    pub fn spec_path(&self) -> &str {
        dirname(&self.relpath)
    }

    pub fn source(&self, tree: &dyn ProjectTree) -> anyhow::Result<String> {
        tree.content(&self.relpath)
    }
}

impl Debug for BuildFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BuildFile({}, {})", self.relpath, self.build_root.display())
    }
}

impl PartialEq for BuildFile {
    fn eq(&self, other: &Self) -> bool {
        self.full_path == other.full_path && self.build_root == other.build_root
    }
}

impl Eq for BuildFile {}

impl Hash for BuildFile {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.build_root.hash(state);
        self.full_path.hash(state);
    }
}

impl PartialOrd for BuildFile {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for BuildFile {
    fn cmp(&self, other: &Self) -> Ordering {
        (&self.full_path, &self.build_root).cmp(&(&other.full_path, &other.build_root))
    }
}

fn build_files_from_paths(
    tree: &dyn ProjectTree,
    relpaths: BTreeSet<String>,
    ignore: Option<&BuildIgnorePatterns>,
) -> anyhow::Result<Vec<BuildFile>> {
    let mut build_files = BTreeSet::new();
    for relpath in relpaths {
        if ignore.is_some_and(|i| i.is_ignored(&relpath, false)) {
            continue;
        }
        build_files.insert(BuildFile::new(tree, &relpath)?);
    }
    Ok(build_files.into_iter().collect())
}

/// Finds every build file below `base_relpath`, sorted by full path.
pub fn scan_build_files(
    tree: &dyn ProjectTree,
    base_relpath: &str,
    ignore: Option<&BuildIgnorePatterns>,
) -> anyhow::Result<Vec<BuildFile>> {
    if Path::new(base_relpath).is_absolute() {
        return Err(BuildFileError::BadPath(format!(
            "base_relpath parameter ({}) should be a relative path.",
            base_relpath
        ))
        .into());
    }
    if !base_relpath.is_empty() && !tree.is_dir(base_relpath) {
        return Err(BuildFileError::BadPath(format!(
            "Can only scan directories and {} is not a valid dir.",
            base_relpath
        ))
        .into());
    }

    let prune = |dir: &str| ignore.is_some_and(|i| i.is_ignored(dir, true));
    let build_files = tree
        .walk(base_relpath, &prune)?
        .into_iter()
        .filter(|f| is_build_file_name(basename(f)))
        .collect();
    let res = build_files_from_paths(tree, build_files, ignore)?;
    tracing::debug!(
        "Found {} build files under `{}`",
        res.len(),
        base_relpath
    );
    Ok(res)
}

/// All build files which live directly in `dir_relpath`.
pub fn get_build_files_family(
    tree: &dyn ProjectTree,
    dir_relpath: &str,
    ignore: Option<&BuildIgnorePatterns>,
) -> anyhow::Result<Vec<BuildFile>> {
    let mut build_files = BTreeSet::new();
    for name in tree.glob1(dir_relpath, BUILD_FILE_PREFIX)? {
        let relpath = join_rel(dir_relpath, &name);
        if is_build_file_name(&name) && tree.is_file(&relpath) {
            build_files.insert(relpath);
        }
    }
    build_files_from_paths(tree, build_files, ignore)
}
