pub mod error;
pub mod config;
pub mod extensions;
pub mod pattern;
pub mod template;
pub mod calendar;
pub mod kinds;
pub mod metadata;
pub mod filters;
pub mod transport;
pub mod listing;
pub mod download;
pub mod reshape;

pub use calendar::YearMonth;
pub use config::{AsicConfig, ConfigSources, ValidationRules};
pub use error::{AsicError, AsicResult};
pub use kinds::{FileKindDescriptor, KindId, KindRegistry, Visibility};
pub use listing::{ListRequest, RemoteCatalog};
pub use metadata::{AsicFile, FileMetadata};
