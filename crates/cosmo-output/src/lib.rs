//! Output recording for sampler runs.
//!
//! Every evaluated sample is appended to an [`OutputSink`] as a
//! [`SampleRow`]. The column schema is frozen on the first write and every
//! later row must carry exactly the same columns. Backends expose identical
//! column-addressed reads so postprocessors never care where rows live.

pub mod config;
pub mod memory;
pub mod row;
pub mod schema;
pub mod sink;
pub mod text;

pub use config::{open_sink, OutputConfig, OutputFormat};
pub use memory::InMemoryOutput;
pub use row::{RowLayout, SampleRow};
pub use schema::{Column, ColumnKind, ColumnSchema};
pub use sink::OutputSink;
pub use text::TextOutput;
