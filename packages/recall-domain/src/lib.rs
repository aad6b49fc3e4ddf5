pub mod clock;
pub mod highlight;
pub mod query;
pub mod scoring;
pub mod similarity;
pub mod text;

mod error;

pub use error::{Error, Result};
