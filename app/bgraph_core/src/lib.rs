/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

//! Core types shared by the bgraph crates: target identity, build file discovery,
//! environment overrides and logging setup.

pub mod build_file;
pub mod env_helper;
pub mod logging;
pub mod package;
pub mod target;
