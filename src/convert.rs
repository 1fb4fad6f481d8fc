//! Caller-facing entry points.
//!
//! [`load_bytes`], [`load_path`] and [`extract`](crate::extract::extract) are
//! the synchronous building blocks. [`Converter`] composes them with the
//! configured defaults and the optional [`ConversionCache`], running the
//! CPU-bound pipeline on tokio's blocking pool.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use crate::archive::Archive;
use crate::cache::{ConversionCache, Fingerprint};
use crate::config::ConverterConfig;
use crate::content;
use crate::error::{Error, Result};
use crate::extract::{Extraction, Extractor};
use crate::io::ReadAt;
use crate::model::{self, Workbook};

/// Everything produced from one container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversion {
    pub fingerprint: Fingerprint,
    pub workbook: Workbook,
    pub extraction: Extraction,
}

/// Parse an in-memory container into a [`Workbook`].
pub fn load_bytes(bytes: impl Into<Arc<[u8]>>) -> Result<Workbook> {
    load_archive(&Archive::from_bytes(bytes)?)
}

/// Parse a container on disk into a [`Workbook`], reading only the members it
/// needs.
pub fn load_path(path: impl AsRef<Path>) -> Result<Workbook> {
    load_archive(&Archive::open_path(path.as_ref())?)
}

fn load_archive<R: ReadAt>(archive: &Archive<R>) -> Result<Workbook> {
    let tree = content::decode(archive)?;
    Ok(model::build(tree))
}

fn run_pipeline(
    fingerprint: Fingerprint,
    bytes: Arc<[u8]>,
    extractor: Extractor,
) -> Result<Conversion> {
    let started = Instant::now();
    let workbook = load_bytes(bytes)?;
    let extraction = extractor.extract(&workbook);

    tracing::debug!(
        %fingerprint,
        format = %workbook.format,
        sheets = workbook.sheets.len(),
        cases = extraction.cases.len(),
        elapsed_ms = started.elapsed().as_secs_f64() * 1000.0,
        "converted workbook"
    );
    Ok(Conversion {
        fingerprint,
        workbook,
        extraction,
    })
}

/// Long-lived conversion service owning its configuration and cache.
pub struct Converter {
    config: ConverterConfig,
    extractor: Extractor,
    cache: Option<ConversionCache<Arc<Conversion>>>,
}

impl Converter {
    pub fn new(config: ConverterConfig) -> Self {
        let cache = config
            .enable_cache
            .then(|| ConversionCache::new(config.cache_size));
        Self {
            extractor: Extractor::new(config.default_priority, config.default_execution_type),
            config,
            cache,
        }
    }

    pub fn config(&self) -> &ConverterConfig {
        &self.config
    }

    /// The cache, when enabled.
    pub fn cache(&self) -> Option<&ConversionCache<Arc<Conversion>>> {
        self.cache.as_ref()
    }

    pub async fn convert_path(&self, path: impl AsRef<Path>) -> Result<Arc<Conversion>> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        tracing::debug!(path = %path.display(), size = bytes.len(), "read container");
        self.convert_bytes(bytes).await
    }

    /// Convert a container held in memory. Identical bytes are only converted
    /// once while their entry stays cached.
    pub async fn convert_bytes(&self, bytes: impl Into<Arc<[u8]>>) -> Result<Arc<Conversion>> {
        let bytes: Arc<[u8]> = bytes.into();
        let fingerprint = Fingerprint::of(&bytes);

        match &self.cache {
            Some(cache) => {
                cache
                    .get_or_compute(fingerprint, || self.run(fingerprint, bytes))
                    .await
            }
            None => self.run(fingerprint, bytes).await,
        }
    }

    async fn run(&self, fingerprint: Fingerprint, bytes: Arc<[u8]>) -> Result<Arc<Conversion>> {
        let extractor = self.extractor;
        let conversion =
            tokio::task::spawn_blocking(move || run_pipeline(fingerprint, bytes, extractor))
                .await
                .map_err(|e| Error::Io(std::io::Error::other(e)))??;
        Ok(Arc::new(conversion))
    }
}

impl Default for Converter {
    fn default() -> Self {
        Self::new(ConverterConfig::default())
    }
}
