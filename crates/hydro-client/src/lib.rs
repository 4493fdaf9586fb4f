//! Top-level facade: `Request → Source Adapter → Fetch Orchestrator →
//! HTTP Transport → Chunk Cache → Decompression → Format Decoder → Grid
//! Engine → Result`.
//!
//! Grounded on `services/ingester`'s composition style: one long-lived
//! struct owns the cache and HTTP client, and every call takes an
//! explicit request rather than reaching for a global handle (per the
//! "explicit request context" redesign).

pub mod pipeline;

use std::collections::HashMap;
use std::path::PathBuf;

use chrono::{DateTime, Datelike, Duration as ChronoDuration, Utc};
use chunk_cache::{CacheConfig, ChunkCache};
use fetch_orchestrator::{FetchContext, FetchOptions};
use futures::stream::{self, StreamExt};
use http_transport::HttpTransport;
use hydro_common::{
    FormatKind, Geometry, HydroError, RequestDescriptor, SourceDescriptor, TimeRange, TimeSelector, ValidTime,
    VariableDescriptor,
};
use source_registry::{fanout::LocationResult, DecompressPolicy, SourceAdapter, UrlContext};
use tracing::instrument;

/// Tunables that live for the process, not for a single request.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub cache_path: PathBuf,
    pub cache_config: CacheConfig,
    /// Proxy URL templates in fallthrough order, as consumed by
    /// `fetch_orchestrator::FetchContext`.
    pub proxies: Vec<String>,
}

/// One resolved timestamp/value pair from a time-series fan-out.
#[derive(Debug, Clone)]
pub struct TimePoint {
    pub timestamp: DateTime<Utc>,
    pub value: Result<f64, String>,
}

/// One resolved timestamp/grid pair from a [`HydroClient::grid_timeseries`] fan-out.
#[derive(Debug, Clone)]
pub struct GridTimePoint {
    pub timestamp: DateTime<Utc>,
    pub value: Result<pipeline::GridResult, String>,
}

/// The composed client: cache, HTTP transport, and a registry of
/// per-source adapters/descriptors, built once and reused across calls.
pub struct HydroClient {
    cache: ChunkCache,
    transport: HttpTransport,
    proxies: Vec<String>,
    sources: HashMap<String, SourceDescriptor>,
    adapters: HashMap<String, Box<dyn SourceAdapter + Send + Sync>>,
}

impl HydroClient {
    pub fn new(config: ClientConfig) -> Result<Self, HydroError> {
        let cache = ChunkCache::open(&config.cache_path, config.cache_config)?;
        let transport = HttpTransport::new()?;
        Ok(Self {
            cache,
            transport,
            proxies: config.proxies,
            sources: HashMap::new(),
            adapters: HashMap::new(),
        })
    }

    /// Register a source's static descriptor alongside the adapter that
    /// knows how to fetch it.
    pub fn register_source(&mut self, source: SourceDescriptor, adapter: Box<dyn SourceAdapter + Send + Sync>) {
        self.adapters.insert(source.id.clone(), adapter);
        self.sources.insert(source.id.clone(), source);
    }

    fn source(&self, source_id: &str) -> Result<&SourceDescriptor, HydroError> {
        self.sources
            .get(source_id)
            .ok_or_else(|| HydroError::UnknownSource {
                source_id: source_id.to_string(),
            })
    }

    fn adapter(&self, source_id: &str) -> Result<&(dyn SourceAdapter + Send + Sync), HydroError> {
        self.adapters
            .get(source_id)
            .map(|a| a.as_ref())
            .ok_or_else(|| HydroError::UnknownSource {
                source_id: source_id.to_string(),
            })
    }

    fn variable<'a>(&self, source: &'a SourceDescriptor, variable_id: &str) -> Result<&'a VariableDescriptor, HydroError> {
        source.variable(variable_id).ok_or_else(|| HydroError::UnknownVariable {
            source_id: source.id.clone(),
            variable_id: variable_id.to_string(),
        })
    }

    fn fetch_context(&self) -> FetchContext<'_> {
        FetchContext::new(&self.cache, &self.transport).with_proxies(self.proxies.clone())
    }

    /// `Latest` has no real-time catalog to consult in this library, so it
    /// resolves to the current instant; callers needing an exact run
    /// should pass `TimeSelector::Instant` explicitly. Documented in
    /// `DESIGN.md` as an Open Question resolution.
    fn resolve_instant(time: &TimeSelector) -> DateTime<Utc> {
        match time {
            TimeSelector::Latest => Utc::now(),
            TimeSelector::Instant(dt) => *dt,
            TimeSelector::Range(range) => range.start,
        }
    }

    async fn fetch_bytes(&self, source: &SourceDescriptor, adapter: &(dyn SourceAdapter + Send + Sync), url: &str) -> Result<Vec<u8>, HydroError> {
        let ctx = self.fetch_context();
        let options = FetchOptions {
            source_id: source.id.clone(),
            dataset_id: source.id.clone(),
            format_kind: format!("{:?}", source.format),
            needs_proxy: source.requires_proxy,
            ..Default::default()
        };
        let fetched = fetch_orchestrator::fetch(&ctx, url, &options).await?;
        match adapter.decompress_policy() {
            DecompressPolicy::None => Ok(fetched),
            DecompressPolicy::Gzip => decompress::decode_with_hint(&fetched, decompress::Codec::Gzip),
        }
    }

    /// Fetch and decode a single point value.
    #[instrument(skip(self, request), fields(source = %request.source_id))]
    pub async fn point(&self, request: &RequestDescriptor) -> Result<f64, HydroError> {
        let (x, y) = match request.geometry {
            Geometry::Point { x, y } => (x, y),
            _ => {
                return Err(HydroError::InvalidBbox {
                    reason: "point() requires a Geometry::Point request".into(),
                })
            }
        };
        let variable_id = request.variable_ids.first().ok_or_else(|| HydroError::UnknownVariable {
            source_id: request.source_id.clone(),
            variable_id: String::new(),
        })?;
        self.point_at(&request.source_id, variable_id, &request.time, x, y).await
    }

    async fn point_at(&self, source_id: &str, variable_id: &str, time: &TimeSelector, x: f64, y: f64) -> Result<f64, HydroError> {
        let source = self.source(source_id)?;
        let adapter = self.adapter(source_id)?;
        let variable = self.variable(source, variable_id)?;
        grid_engine::validate_coords(y, x)?;

        let selector = adapter.message_selector(variable_id)?;
        let raw = if source.format == FormatKind::Zarr {
            self.zarr_point(source, adapter, variable_id, time, x, y).await?
        } else {
            let instant = Self::resolve_instant(time);
            let valid_time = ValidTime::analysis(instant);
            let product = adapter.resolve_product(None);
            let url = adapter.url_for(&UrlContext::Grib2Timed { valid_time, product })?;
            let bytes = self.fetch_bytes(source, adapter, &url).await?;
            pipeline::extract_point(source.format, &bytes, &selector, &source.domain, x, y)?
        };

        Ok(adapter.finalize(raw, variable))
    }

    /// Zarr's chunked layout needs three small fetches — `.zarray`,
    /// `.zattrs`, and the one chunk containing the point — rather than a
    /// single file, so it is orchestrated here instead of in
    /// [`pipeline::extract_point`].
    async fn zarr_point(
        &self,
        source: &SourceDescriptor,
        adapter: &(dyn SourceAdapter + Send + Sync),
        variable_id: &str,
        time: &TimeSelector,
        x: f64,
        y: f64,
    ) -> Result<f64, HydroError> {
        let instant = Self::resolve_instant(time);
        let valid_time = ValidTime::analysis(instant);
        let store_root = adapter.url_for(&UrlContext::Grib2Timed {
            valid_time,
            product: adapter.resolve_product(None),
        })?;
        let time_index = adapter.zarr_time_index(instant.year(), instant);

        let zarray_bytes = self.fetch_bytes(source, adapter, &format!("{store_root}/{variable_id}/.zarray")).await?;
        let zarray_text = std::str::from_utf8(&zarray_bytes).map_err(|e| HydroError::FormatParseError {
            source_id: source.id.clone(),
            message: e.to_string(),
        })?;
        let meta = zarr_reader::ZarrArrayMeta::parse(zarray_text)?;

        let attrs = match self.fetch_bytes(source, adapter, &format!("{store_root}/{variable_id}/.zattrs")).await {
            Ok(bytes) => {
                let text = std::str::from_utf8(&bytes).map_err(|e| HydroError::FormatParseError {
                    source_id: source.id.clone(),
                    message: e.to_string(),
                })?;
                zarr_reader::ZarrAttrs::parse(text)?
            }
            Err(_) => zarr_reader::ZarrAttrs::default(),
        };

        if meta.shape.len() < 2 {
            return Err(HydroError::DataIntegrityError {
                message: format!("zarr array '{variable_id}' has fewer than 2 dimensions"),
            });
        }
        let ny = meta.shape[meta.shape.len() - 2];
        let nx = meta.shape[meta.shape.len() - 1];
        let grid = pipeline::implicit_grid(&source.domain, nx, ny);
        let (i, j) = grid_engine::nearest_index(&grid, y, x).ok_or(HydroError::OutOfDomainPoint {
            source_id: source.id.clone(),
            lat: y,
            lon: x,
        })?;

        let mut coord = vec![0usize; meta.shape.len() - 2];
        if let Some(leading) = coord.last_mut() {
            *leading = time_index;
        }
        coord.push(j);
        coord.push(i);
        let (chunk_indices, within_chunk) = zarr_reader::nd_index_to_chunk(&coord, &meta.chunks);

        let t_chunk = if chunk_indices.len() >= 3 {
            chunk_indices[chunk_indices.len() - 3]
        } else {
            0
        };
        let lat_chunk = chunk_indices[chunk_indices.len() - 2];
        let lon_chunk = chunk_indices[chunk_indices.len() - 1];
        let chunk_path = adapter.url_for(&UrlContext::ZarrChunk {
            variable_id: variable_id.to_string(),
            t_chunk,
            lat_chunk,
            lon_chunk,
        })?;
        let chunk_bytes = self.fetch_bytes(source, adapter, &format!("{store_root}/{chunk_path}")).await?;
        let decoded = meta.decode_chunk(&chunk_bytes)?;
        let flat = zarr_reader::flat_index_in_chunk(&within_chunk, &meta.chunks).ok_or(HydroError::DataIntegrityError {
            message: "within-chunk index out of range".into(),
        })?;
        let raw = decoded.get(flat).copied().ok_or(HydroError::DataIntegrityError {
            message: format!("flat index {flat} out of range for decoded chunk"),
        })?;
        Ok(meta.apply_attrs(raw, &attrs))
    }

    async fn grid_at(&self, source_id: &str, variable_id: &str, time: &TimeSelector, window: &hydro_common::BoundingBox) -> Result<pipeline::GridResult, HydroError> {
        let source = self.source(source_id)?;
        let adapter = self.adapter(source_id)?;
        let variable = self.variable(source, variable_id)?;
        grid_engine::validate_bbox(window)?;

        if source.format == FormatKind::Zarr {
            return Err(HydroError::DataIntegrityError {
                message: "zarr grid extraction requires chunk-level orchestration".into(),
            });
        }

        let selector = adapter.message_selector(variable_id)?;
        let instant = Self::resolve_instant(time);
        let valid_time = ValidTime::analysis(instant);
        let product = adapter.resolve_product(None);
        let url = adapter.url_for(&UrlContext::Grib2Timed { valid_time, product })?;
        let bytes = self.fetch_bytes(source, adapter, &url).await?;
        let mut raw = pipeline::extract_grid(source.format, &bytes, &selector, &source.domain, window)?;
        for value in raw.values.iter_mut() {
            *value = adapter.finalize(*value, variable);
        }
        Ok(raw)
    }

    /// Fetch and decode a rectangular window of values.
    #[instrument(skip(self, request), fields(source = %request.source_id))]
    pub async fn grid(&self, request: &RequestDescriptor) -> Result<pipeline::GridResult, HydroError> {
        let window = match &request.geometry {
            Geometry::Bbox(bbox) => bbox,
            _ => {
                return Err(HydroError::InvalidBbox {
                    reason: "grid() requires a Geometry::Bbox request".into(),
                })
            }
        };
        let variable_id = request.variable_ids.first().ok_or_else(|| HydroError::UnknownVariable {
            source_id: request.source_id.clone(),
            variable_id: String::new(),
        })?;
        self.grid_at(&request.source_id, variable_id, &request.time, window).await
    }

    /// Fan out `grid()` across a request's `Range`, stepping hourly like
    /// [`HydroClient::time_series`].
    #[instrument(skip(self, request), fields(source = %request.source_id))]
    pub async fn grid_timeseries(&self, request: &RequestDescriptor) -> Result<Vec<GridTimePoint>, HydroError> {
        let window = match &request.geometry {
            Geometry::Bbox(bbox) => *bbox,
            _ => {
                return Err(HydroError::InvalidBbox {
                    reason: "grid_timeseries() requires a Geometry::Bbox request".into(),
                })
            }
        };
        let range = match &request.time {
            TimeSelector::Range(range) => range,
            _ => {
                return Err(HydroError::InvalidBbox {
                    reason: "grid_timeseries() requires a TimeSelector::Range request".into(),
                })
            }
        };
        let variable_id = request.variable_ids.first().ok_or_else(|| HydroError::UnknownVariable {
            source_id: request.source_id.clone(),
            variable_id: String::new(),
        })?;
        let timestamps = hourly_steps(range);
        let concurrency = request.options.max_concurrency.max(1);

        let mut results = stream::iter(timestamps)
            .map(|timestamp| {
                let source_id = request.source_id.clone();
                let variable_id = variable_id.clone();
                async move {
                    let value = self
                        .grid_at(&source_id, &variable_id, &TimeSelector::Instant(timestamp), &window)
                        .await
                        .map_err(|e| e.to_string());
                    GridTimePoint { timestamp, value }
                }
            })
            .buffer_unordered(concurrency)
            .collect::<Vec<GridTimePoint>>()
            .await;

        results.sort_by_key(|p| p.timestamp);
        Ok(results)
    }

    /// Fan out `point()` across a fixed, named list of locations. A
    /// failure at one location is captured alongside its name rather than
    /// aborting the rest, bounded to `max_concurrency` in-flight fetches.
    #[instrument(skip(self, request), fields(source = %request.source_id))]
    pub async fn multi_point(&self, request: &RequestDescriptor) -> Result<Vec<LocationResult>, HydroError> {
        let locations = match &request.geometry {
            Geometry::LocationList(locations) => locations,
            _ => {
                return Err(HydroError::InvalidBbox {
                    reason: "multi_point() requires a Geometry::LocationList request".into(),
                })
            }
        };
        let variable_id = request.variable_ids.first().ok_or_else(|| HydroError::UnknownVariable {
            source_id: request.source_id.clone(),
            variable_id: String::new(),
        })?;
        let concurrency = request.options.max_concurrency.max(1);

        let results = stream::iter(locations.iter().cloned())
            .map(|(name, x, y)| {
                let source_id = request.source_id.clone();
                let variable_id = variable_id.clone();
                let time = request.time.clone();
                async move {
                    let value = self
                        .point_at(&source_id, &variable_id, &time, x, y)
                        .await
                        .map_err(|e| e.to_string());
                    LocationResult { name, value }
                }
            })
            .buffer_unordered(concurrency)
            .collect::<Vec<_>>()
            .await;

        Ok(results)
    }

    /// Generate a time series across a request's `Range`, stepping hourly
    /// (the finest cadence any built-in adapter publishes at). Per-step
    /// failures are captured rather than aborting the series, matching
    /// `grid_engine::time_series`'s contract.
    #[instrument(skip(self, request), fields(source = %request.source_id))]
    pub async fn time_series(&self, request: &RequestDescriptor) -> Result<Vec<TimePoint>, HydroError> {
        let (x, y) = match request.geometry {
            Geometry::Point { x, y } => (x, y),
            _ => {
                return Err(HydroError::InvalidBbox {
                    reason: "time_series() requires a Geometry::Point request".into(),
                })
            }
        };
        let range = match &request.time {
            TimeSelector::Range(range) => range,
            _ => {
                return Err(HydroError::InvalidBbox {
                    reason: "time_series() requires a TimeSelector::Range request".into(),
                })
            }
        };
        let variable_id = request.variable_ids.first().ok_or_else(|| HydroError::UnknownVariable {
            source_id: request.source_id.clone(),
            variable_id: String::new(),
        })?;
        let timestamps = hourly_steps(range);
        let concurrency = request.options.max_concurrency.max(1);

        let results = stream::iter(timestamps)
            .map(|timestamp| {
                let source_id = request.source_id.clone();
                let variable_id = variable_id.clone();
                async move {
                    let value = self
                        .point_at(&source_id, &variable_id, &TimeSelector::Instant(timestamp), x, y)
                        .await
                        .map_err(|e| e.to_string());
                    TimePoint { timestamp, value }
                }
            })
            .buffer_unordered(concurrency)
            .collect::<Vec<TimePoint>>()
            .await;

        let mut results = results;
        results.sort_by_key(|p| p.timestamp);
        Ok(results)
    }
}

fn hourly_steps(range: &TimeRange) -> Vec<DateTime<Utc>> {
    let mut steps = Vec::new();
    let mut cursor = range.start;
    while cursor <= range.end {
        steps.push(cursor);
        cursor += ChronoDuration::hours(1);
    }
    steps
}
