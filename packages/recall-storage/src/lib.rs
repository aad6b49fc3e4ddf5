pub mod analytics;
pub mod archive;
pub mod memory;
pub mod models;
pub mod time_serde;

mod error;

pub use analytics::{AnalyticsSink, Interaction, InteractionKind, TracingAnalyticsSink};
pub use archive::{Archive, BoxFuture};
pub use error::Error;
pub use memory::MemoryArchive;

pub type Result<T, E = Error> = std::result::Result<T, E>;
