//! Browser `fetch` client for the Query Service.

use serde_json::Value;
use url::Url;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::{Request, RequestInit, RequestMode, Response};

use crate::graph::{Error, QueryRequest, QueryService, Result};

#[derive(Clone, Debug)]
pub struct HttpQueryService {
	base_url: Url,
}

impl HttpQueryService {
	pub fn new(base_url: &str) -> Result<Self> {
		let base_url = Url::parse(base_url)
			.map_err(|e| Error::TransportFailure(format!("invalid base url {base_url}: {e}")))?;
		Ok(Self { base_url })
	}
}

fn transport(context: &str, err: impl std::fmt::Debug) -> Error {
	Error::TransportFailure(format!("{context}: {err:?}"))
}

impl QueryService for HttpQueryService {
	async fn get(&self, request: &QueryRequest) -> Result<Value> {
		let url = request.url(&self.base_url)?;

		let opts = RequestInit::new();
		opts.set_method("GET");
		opts.set_mode(RequestMode::Cors);

		let req = Request::new_with_str_and_init(url.as_str(), &opts)
			.map_err(|e| transport("request error", e))?;

		let window = web_sys::window().ok_or_else(|| Error::TransportFailure("no window".into()))?;
		let resp_value = JsFuture::from(window.fetch_with_request(&req))
			.await
			.map_err(|e| transport("fetch error", e))?;

		let resp: Response = resp_value
			.dyn_into()
			.map_err(|_| Error::TransportFailure("response is not a Response".into()))?;

		if !resp.ok() {
			return Err(Error::TransportFailure(format!("HTTP {} from {}", resp.status(), request.path)));
		}

		let json = JsFuture::from(resp.json().map_err(|e| transport("json promise error", e))?)
			.await
			.map_err(|e| Error::malformed(request.path, format!("{e:?}")))?;

		serde_wasm_bindgen::from_value(json).map_err(|e| Error::malformed(request.path, e))
	}
}
