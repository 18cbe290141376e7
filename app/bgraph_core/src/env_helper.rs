/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

use std::env;
use std::env::VarError;
use std::str::FromStr;

use anyhow::Context;
use once_cell::sync::OnceCell;

/// A typed, lazily-read environment override.
///
/// The variable is read at most once per process; the parsed result is cached, so an
/// `EnvHelper` is meant to live in a `static`.
///
/// ```ignore
/// static LOG_FILTER: EnvHelper<String> = EnvHelper::new("BGRAPH_LOG");
/// ```
pub struct EnvHelper<T> {
    var: &'static str,
    convert: fn(&str) -> anyhow::Result<T>,
    cell: OnceCell<Option<T>>,
}

impl<T> EnvHelper<T> {
    pub const fn with_converter(var: &'static str, convert: fn(&str) -> anyhow::Result<T>) -> Self {
        Self {
            var,
            convert,
            cell: OnceCell::new(),
        }
    }

    pub const fn new(var: &'static str) -> Self
    where
        T: FromStr,
        anyhow::Error: From<<T as FromStr>::Err>,
    {
        fn parse<T>(v: &str) -> anyhow::Result<T>
        where
            T: FromStr,
            anyhow::Error: From<<T as FromStr>::Err>,
        {
            Ok(T::from_str(v.trim())?)
        }

        Self::with_converter(var, parse::<T>)
    }

    pub fn var(&self) -> &'static str {
        self.var
    }

    /// The override, if the variable is set. Requires `'static` so the cache is not
    /// thrown away after a single lookup.
    pub fn get(&'static self) -> anyhow::Result<Option<&'static T>> {
        let var = self.var;
        let convert = self.convert;
        self.cell
            .get_or_try_init(|| read_var(var, convert))
            .map(Option::as_ref)
            .with_context(|| format!("Invalid value for ${}", var))
    }

    /// Reads the variable without consulting or populating the cache.
    pub fn get_uncached(&self) -> anyhow::Result<Option<T>> {
        read_var(self.var, self.convert).with_context(|| format!("Invalid value for ${}", self.var))
    }
}

fn read_var<T>(var: &str, convert: fn(&str) -> anyhow::Result<T>) -> anyhow::Result<Option<T>> {
    match env::var(var) {
        Ok(v) if v.is_empty() => Ok(None),
        Ok(v) => {
            tracing::info!("Env override found: ${} = {}", var, v);
            Ok(Some(convert(&v)?))
        }
        Err(VarError::NotPresent) => Ok(None),
        Err(VarError::NotUnicode(..)) => Err(anyhow::anyhow!("Variable is not unicode")),
    }
}
