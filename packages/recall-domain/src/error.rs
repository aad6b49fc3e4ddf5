pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid intent rule pattern {pattern:?}.")]
	InvalidPattern { pattern: String, source: regex::Error },
	#[error("Unknown intent label {label:?}.")]
	UnknownIntent { label: String },
}
