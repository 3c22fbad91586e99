//! Grid ingestion library.
//!
//! Turns gridded datasets into point documents in a geospatial store.
//!
//! # Architecture
//!
//! - [`codec`] converts masked floating-point values to scaled integers
//! - [`partition`] splits the cell space into contiguous worker slices
//! - [`worker`] encodes one slice and writes it in fixed-size batches
//! - [`coordinator`] fans workers out, joins them, then writes metadata and
//!   the spatial index
//! - [`tiles`] defers index creation until the last tile of a dataset

pub mod codec;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod metadata;
pub mod partition;
pub mod source;
pub mod tiles;
pub mod worker;

// Re-exports
pub use codec::{decode, decode_number, encode, encode_number, scale_factor, CodecError, DecodedValue};
pub use config::{IngestConfig, DEFAULT_BATCH_SIZE, DEFAULT_SCALE, MAX_SCALE};
pub use coordinator::{
    Coordinator, ExecutionMode, IndexOutcome, IngestOutcome, IngestReport, IngestRequest,
};
pub use error::{IngestionError, Result};
pub use metadata::{build_metadata, merge_axis, parse_name_parameters};
pub use partition::partition;
pub use source::{load_variables, GridDataset, GridSource, VariableMap};
pub use tiles::{IndexState, TileProgress};
pub use worker::{IngestionWorker, WorkerResult};
