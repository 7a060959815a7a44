//! Error taxonomy for the graph pipeline.

use thiserror::Error;

/// Failures raised while querying, normalizing or loading images.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
	/// Query Service unreachable or answered with a non-success status.
	#[error("query service transport failure: {0}")]
	TransportFailure(String),

	/// Response payload was not the shape the endpoint promises.
	#[error("malformed response from {endpoint}: {reason}")]
	MalformedResponse {
		/// Endpoint path that produced the payload.
		endpoint: &'static str,
		/// What was wrong with it.
		reason: String,
	},

	/// A per-node thumbnail could not be loaded.
	#[error("image load failed for {id}: {reason}")]
	ImageLoadFailure {
		/// Node id the image belongs to.
		id: String,
		/// Loader-provided reason.
		reason: String,
	},

	/// Configuration document could not be parsed.
	#[error("configuration error: {0}")]
	Config(String),
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
	pub(crate) fn malformed(endpoint: &'static str, reason: impl ToString) -> Self {
		Error::MalformedResponse {
			endpoint,
			reason: reason.to_string(),
		}
	}
}
