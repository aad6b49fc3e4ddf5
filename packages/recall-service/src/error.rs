pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid request: {message}")]
	InvalidRequest { message: String },
	#[error("Not found: {message}")]
	NotFound { message: String },
	#[error("Operation was cancelled.")]
	Cancelled,
	#[error("Archive error: {message}")]
	Archive { message: String },
	#[error("Configuration error: {message}")]
	Config { message: String },
}
impl From<recall_storage::Error> for Error {
	fn from(err: recall_storage::Error) -> Self {
		match err {
			recall_storage::Error::Cancelled => Self::Cancelled,
			recall_storage::Error::NotFound(message) => Self::NotFound { message },
			recall_storage::Error::Backend(message) => Self::Archive { message },
		}
	}
}

impl From<recall_config::Error> for Error {
	fn from(err: recall_config::Error) -> Self {
		Self::Config { message: err.to_string() }
	}
}

impl From<recall_domain::Error> for Error {
	fn from(err: recall_domain::Error) -> Self {
		Self::Config { message: err.to_string() }
	}
}
