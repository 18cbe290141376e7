/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

//! The payload is the set of values a target contributes to its build cache key.
//!
//! Each field knows how to fingerprint itself; the payload combines the field
//! fingerprints, in key order, into one. Two targets with equal payloads have equal
//! fingerprints regardless of the order in which fields were added.

use std::fmt;
use std::fmt::Debug;

use bgraph_core::package::PackageLabel;
use derive_more::Display;
use indexmap::IndexMap;
use once_cell::sync::OnceCell;
use sha1::Digest;
use sha1::Sha1;

pub const SHA1_SIZE: usize = 20;

#[derive(thiserror::Error, Debug)]
pub enum PayloadError {
    #[error("Payload field `{0}` is already defined")]
    DuplicateField(String),
    #[error("Payload is frozen, field `{0}` cannot be added")]
    Frozen(String),
}

/// A sha1 digest, displayed as lowercase hex.
#[derive(Clone, Copy, Eq, PartialEq, Hash, Ord, PartialOrd, Display)]
#[display(fmt = "{}", "hex::encode(_0)")]
pub struct Fingerprint([u8; SHA1_SIZE]);

impl Fingerprint {
    pub fn of(data: &[u8]) -> Self {
        let mut hasher = FingerprintHasher::new();
        hasher.update(data);
        hasher.finish()
    }

    pub fn as_bytes(&self) -> &[u8; SHA1_SIZE] {
        &self.0
    }
}

impl Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", self)
    }
}

/// Incremental sha1, producing a `Fingerprint`.
#[derive(Clone, Default)]
pub struct FingerprintHasher(Sha1);

impl FingerprintHasher {
    pub fn new() -> Self {
        Self(Sha1::new())
    }

    pub fn update(&mut self, data: impl AsRef<[u8]>) {
        self.0.update(data.as_ref());
    }

    pub fn finish(self) -> Fingerprint {
        let mut out = [0; SHA1_SIZE];
        out.copy_from_slice(&self.0.finalize());
        Fingerprint(out)
    }
}

pub trait PayloadField: Debug + Send + Sync {
    /// `None` means the field has nothing to contribute and is skipped.
    fn fingerprint(&self) -> Option<Fingerprint>;

    /// The plain value of the field, for fields that have one.
    fn value(&self) -> Option<&serde_json::Value> {
        None
    }
}

/// A field holding a plain JSON-like value. It is fingerprinted through its compact
/// JSON rendering, in which object keys are sorted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrimitiveField(serde_json::Value);

impl PrimitiveField {
    pub fn new(value: impl Into<serde_json::Value>) -> Self {
        Self(value.into())
    }
}

impl PayloadField for PrimitiveField {
    fn fingerprint(&self) -> Option<Fingerprint> {
        Some(Fingerprint::of(self.0.to_string().as_bytes()))
    }

    fn value(&self) -> Option<&serde_json::Value> {
        Some(&self.0)
    }
}

/// The source files of a target, relative to its package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourcesField {
    rel_path: PackageLabel,
    sources: Vec<String>,
}

impl SourcesField {
    pub fn new(rel_path: PackageLabel, sources: Vec<String>) -> Self {
        Self { rel_path, sources }
    }

    pub fn sources(&self) -> &[String] {
        &self.sources
    }

    /// Sources joined onto the package path.
    pub fn relative_to_build_root(&self) -> impl Iterator<Item = String> + '_ {
        self.sources.iter().map(|s| self.rel_path.join(s))
    }
}

impl PayloadField for SourcesField {
    fn fingerprint(&self) -> Option<Fingerprint> {
        if self.sources.is_empty() {
            return None;
        }
        let mut sorted: Vec<&str> = self.sources.iter().map(String::as_str).collect();
        sorted.sort_unstable();

        let mut hasher = FingerprintHasher::new();
        hasher.update(self.rel_path.as_str());
        for source in sorted {
            hasher.update(b"\0");
            hasher.update(source);
        }
        Some(hasher.finish())
    }
}

/// Fields keyed by name. Once frozen, no more fields may be added and the fingerprint
/// is computed at most once.
#[derive(Debug, Default)]
pub struct Payload {
    fields: IndexMap<String, Box<dyn PayloadField>>,
    frozen: bool,
    fingerprint: OnceCell<Option<Fingerprint>>,
}

impl Payload {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_field(
        &mut self,
        key: impl Into<String>,
        field: impl PayloadField + 'static,
    ) -> anyhow::Result<()> {
        let key = key.into();
        if self.frozen {
            return Err(PayloadError::Frozen(key).into());
        }
        if self.fields.contains_key(&key) {
            return Err(PayloadError::DuplicateField(key).into());
        }
        self.fields.insert(key, Box::new(field));
        Ok(())
    }

    pub fn add_fields<K, F>(
        &mut self,
        fields: impl IntoIterator<Item = (K, F)>,
    ) -> anyhow::Result<()>
    where
        K: Into<String>,
        F: PayloadField + 'static,
    {
        for (key, field) in fields {
            self.add_field(key, field)?;
        }
        Ok(())
    }

    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    pub fn get_field(&self, key: &str) -> Option<&dyn PayloadField> {
        self.fields.get(key).map(|f| &**f)
    }

    pub fn get_field_value(&self, key: &str) -> Option<&serde_json::Value> {
        self.get_field(key)?.value()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Fingerprint of every field. `None` if no field contributed.
    pub fn fingerprint(&self) -> Option<Fingerprint> {
        if self.frozen {
            *self
                .fingerprint
                .get_or_init(|| self.compute_fingerprint(self.fields.keys()))
        } else {
            self.compute_fingerprint(self.fields.keys())
        }
    }

    /// Fingerprint of the named fields only. Unknown keys are ignored.
    pub fn fingerprint_keys<'a>(
        &'a self,
        keys: impl IntoIterator<Item = &'a str>,
    ) -> Option<Fingerprint> {
        self.compute_fingerprint(keys.into_iter().filter(|k| self.fields.contains_key(*k)))
    }

    fn compute_fingerprint<'a, K>(
        &'a self,
        keys: impl IntoIterator<Item = K>,
    ) -> Option<Fingerprint>
    where
        K: AsRef<str> + 'a,
    {
        let mut keys: Vec<K> = keys.into_iter().collect();
        keys.sort_by(|a, b| a.as_ref().cmp(b.as_ref()));
        keys.dedup_by(|a, b| a.as_ref() == b.as_ref());

        let mut hasher = FingerprintHasher::new();
        let mut empty = true;
        for key in keys {
            let key = key.as_ref();
            let Some(fp) = self.fields.get(key).and_then(|f| f.fingerprint()) else {
                continue;
            };
            empty = false;
            hasher.update(Fingerprint::of(key.as_bytes()).to_string());
            hasher.update(fp.to_string());
        }
        if empty { None } else { Some(hasher.finish()) }
    }
}
