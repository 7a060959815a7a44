//! Query Service endpoints and the seam the controller talks through.

use std::future::Future;

use serde_json::Value;
use url::Url;

use super::error::{Error, Result};

/// `GET /get_distinct_classes/`
pub const DISTINCT_CLASSES: &str = "/get_distinct_classes/";
/// `GET /get_images_by_class/?class_label=`
pub const IMAGES_BY_CLASS: &str = "/get_images_by_class/";
/// `GET /get_all_images/`
pub const ALL_IMAGES: &str = "/get_all_images/";
/// `GET /get_all_edges_by_weight/?weight=`
pub const EDGES_BY_WEIGHT: &str = "/get_all_edges_by_weight/";
/// `GET /analyze_images/?folder_path=`
pub const ANALYZE_IMAGES: &str = "/analyze_images/";

/// A graph-producing query. Each variant maps to one endpoint and one
/// builder shape.
#[derive(Clone, Debug, PartialEq)]
pub enum GraphQuery {
	/// Images of one class linked in a cycle.
	ClassRing { class_label: String },
	/// Images of one class linked to a single class node.
	ClassStar { class_label: String },
	/// Every image linked to its class.
	FullCorpus,
	/// Similarity edges at or above `min_weight`.
	WeightedEdges { min_weight: f64 },
	/// Graph computed server-side for a folder.
	Prebuilt { folder_path: String },
}

impl GraphQuery {
	/// Endpoint path this query is served by.
	pub fn endpoint(&self) -> &'static str {
		match self {
			GraphQuery::ClassRing { .. } | GraphQuery::ClassStar { .. } => IMAGES_BY_CLASS,
			GraphQuery::FullCorpus => ALL_IMAGES,
			GraphQuery::WeightedEdges { .. } => EDGES_BY_WEIGHT,
			GraphQuery::Prebuilt { .. } => ANALYZE_IMAGES,
		}
	}

	/// HTTP request for this query.
	pub fn request(&self) -> QueryRequest {
		let request = QueryRequest::new(self.endpoint());
		match self {
			GraphQuery::ClassRing { class_label } | GraphQuery::ClassStar { class_label } => {
				request.param("class_label", class_label)
			}
			GraphQuery::FullCorpus => request,
			GraphQuery::WeightedEdges { min_weight } => {
				request.param("weight", min_weight.to_string())
			}
			GraphQuery::Prebuilt { folder_path } => request.param("folder_path", folder_path),
		}
	}
}

/// Path plus query parameters for one GET.
#[derive(Clone, Debug, PartialEq)]
pub struct QueryRequest {
	pub path: &'static str,
	pub params: Vec<(&'static str, String)>,
}

impl QueryRequest {
	/// Request for `path` without parameters.
	pub fn new(path: &'static str) -> Self {
		Self {
			path,
			params: Vec::new(),
		}
	}

	/// The class-list request.
	pub fn distinct_classes() -> Self {
		Self::new(DISTINCT_CLASSES)
	}

	/// Appends a query parameter.
	pub fn param(mut self, key: &'static str, value: impl Into<String>) -> Self {
		self.params.push((key, value.into()));
		self
	}

	/// Absolute URL against `base`, parameters percent-encoded.
	pub fn url(&self, base: &Url) -> Result<Url> {
		let mut url = base
			.join(self.path)
			.map_err(|e| Error::TransportFailure(format!("invalid url {}: {e}", self.path)))?;
		if !self.params.is_empty() {
			url.query_pairs_mut().extend_pairs(self.params.iter().map(|(k, v)| (*k, v.as_str())));
		}
		Ok(url)
	}
}

/// Read-only backend returning raw JSON payloads.
pub trait QueryService {
	/// Performs the GET. Unreachable hosts and non-success statuses are
	/// [`Error::TransportFailure`].
	fn get(&self, request: &QueryRequest) -> impl Future<Output = Result<Value>>;
}

#[cfg(test)]
mod tests {
	use super::*;

	fn base() -> Url {
		Url::parse("http://127.0.0.1:8000").unwrap()
	}

	#[test]
	fn class_queries_share_endpoint_and_encode_label() {
		let url = GraphQuery::ClassStar {
			class_label: "sea lion & co".into(),
		}
		.request()
		.url(&base())
		.unwrap();
		assert_eq!(
			url.as_str(),
			"http://127.0.0.1:8000/get_images_by_class/?class_label=sea+lion+%26+co"
		);
		assert_eq!(
			GraphQuery::ClassRing {
				class_label: "x".into()
			}
			.endpoint(),
			IMAGES_BY_CLASS
		);
	}

	#[test]
	fn weight_threshold_is_passed_as_weight() {
		let url = GraphQuery::WeightedEdges { min_weight: 0.75 }
			.request()
			.url(&base())
			.unwrap();
		assert_eq!(url.query(), Some("weight=0.75"));
	}

	#[test]
	fn parameterless_request_has_no_query() {
		let url = QueryRequest::distinct_classes().url(&base()).unwrap();
		assert_eq!(url.as_str(), "http://127.0.0.1:8000/get_distinct_classes/");
		assert_eq!(url.query(), None);
	}
}
