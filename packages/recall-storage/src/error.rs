#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Archive call was cancelled.")]
	Cancelled,
	#[error("Not found: {0}")]
	NotFound(String),
	#[error("Archive backend error: {0}")]
	Backend(String),
}
