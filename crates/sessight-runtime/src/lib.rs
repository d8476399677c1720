// Runtime layer - wires discovery, parsing, the store and the engines into
// the exported analytics operations.

pub mod analytics;
pub mod config;
pub mod error;
pub mod ops;

pub use analytics::{Analytics, open_default};
pub use config::{AnalysisConfig, Config, GitConfig, resolve_data_dir};
pub use error::{Error, Result};
pub use ops::*;

// Types callers need to pass to the operations
pub use sessight_engine::CompareMode;
pub use sessight_index::{EventFilter, RelatedBy, TokenGrouping};
pub use sessight_types::EntryType;
