//! FM 301 metadata compliance checking.
//!
//! Pipeline: [schema] loads the rule set, [dataset] extracts the fields a file
//! actually carries, [evaluate] produces one verdict per rule and [report]
//! assembles and renders the compliance document.

pub mod cli;
pub mod config;
pub mod dataset;
pub mod datatype;
pub mod error;
pub mod evaluate;
pub mod pipeline;
pub mod report;
pub mod schema;

pub use error::{CheckError, DatasetError, RenderError, SchemaError};
