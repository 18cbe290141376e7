/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

use anyhow::Context;
use tracing::Subscriber;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use crate::env_helper::EnvHelper;

static BGRAPH_LOG: EnvHelper<String> = EnvHelper::new("BGRAPH_LOG");

/// Shown when `$BGRAPH_LOG` is not set.
const DEFAULT_FILTER: &str = "warn";

fn log_filter(raw: Option<&str>) -> anyhow::Result<EnvFilter> {
    match raw {
        Some(v) => EnvFilter::try_new(v)
            .with_context(|| format!("Failed to parse ${} as a filter", BGRAPH_LOG.var())),
        None => Ok(EnvFilter::new(DEFAULT_FILTER)),
    }
}

/// Builds the subscriber used by bgraph tools without installing it. The filter comes
/// from `filter` if given, otherwise `$BGRAPH_LOG`, otherwise warnings only.
pub fn subscriber_for_writer<W>(
    writer: W,
    filter: Option<&str>,
) -> anyhow::Result<impl Subscriber + Send + Sync + 'static>
where
    W: for<'writer> MakeWriter<'writer> + Send + Sync + 'static,
{
    let filter = match filter {
        Some(f) => log_filter(Some(f))?,
        None => log_filter(BGRAPH_LOG.get()?.map(String::as_str))?,
    };

    let layer = tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_target(false)
        .with_filter(filter);

    Ok(tracing_subscriber::registry().with(layer))
}

/// Installs the bgraph subscriber as the global default.
pub fn init_tracing_for_writer<W>(writer: W) -> anyhow::Result<()>
where
    W: for<'writer> MakeWriter<'writer> + Send + Sync + 'static,
{
    let subscriber = subscriber_for_writer(writer, None)?;
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to install the global tracing subscriber")?;
    Ok(())
}

pub mod testing {
    use std::io;
    use std::sync::Arc;
    use std::sync::Mutex;

    use tracing_subscriber::fmt::MakeWriter;

    /// Collects everything written by a subscriber so tests can inspect log output.
    #[derive(Clone, Default)]
    pub struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl CapturedLogs {
        pub fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for CapturedLogs {
        type Writer = CapturedLogs;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }
}
