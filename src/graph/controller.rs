//! View state and the query → normalize → commit cycle.
//!
//! A cycle is split into [`ViewController::begin`] and
//! [`ViewController::finish`] so callers that keep the controller behind a
//! `RefCell` never hold a borrow across the Query Service await.

use serde_json::Value;

use super::builder::GraphModelBuilder;
use super::cache::{Completion, ImageCache, ImageLoader, LoadRequest};
use super::error::{Error, Result};
use super::model::Graph;
use super::query::{DISTINCT_CLASSES, GraphQuery, QueryRequest, QueryService};
use super::sizing::{LayoutParams, LayoutSizer, ViewportMetrics};
use crate::config::ViewConfig;

/// Identifies one `begin`/`finish` pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RequestTicket(u64);

/// Where the current loading cycle stands.
#[derive(Clone, Debug, PartialEq)]
pub enum LoadPhase {
	Idle,
	Requesting { ticket: RequestTicket },
	Normalized { generation: u64 },
	Rejected { reason: String },
}

/// What `finish` did with a response.
#[derive(Clone, Debug, PartialEq)]
pub enum Transition {
	/// New graph committed.
	Normalized {
		generation: u64,
		nodes: usize,
		links: usize,
		/// Image loads started for it.
		loads: usize,
	},
	/// Query failed; previous graph retained.
	Rejected(Error),
	/// A newer request was started before this one returned.
	Superseded,
}

/// Everything the renderer reads. Mutated only through [`ViewController`].
pub struct ViewState<H> {
	pub classes: Vec<String>,
	pub graph: Graph,
	pub generation: u64,
	pub phase: LoadPhase,
	pub viewport: ViewportMetrics,
	pub layout: LayoutParams,
	pub weight_threshold: f64,
	pub last_error: Option<Error>,
	pub images: ImageCache<H>,
}

pub struct ViewController<H> {
	state: ViewState<H>,
	builder: GraphModelBuilder,
	sizer: LayoutSizer,
	next_ticket: u64,
}

impl<H> ViewController<H> {
	pub fn new(config: &ViewConfig) -> Self {
		let sizer = LayoutSizer::new(config.base_link_distance);
		let graph = Graph::new();
		let viewport = ViewportMetrics::default();
		Self {
			state: ViewState {
				classes: Vec::new(),
				layout: sizer.layout(&graph, viewport),
				graph,
				generation: 0,
				phase: LoadPhase::Idle,
				viewport,
				weight_threshold: config.default_weight_threshold,
				last_error: None,
				images: ImageCache::new(config.image_cache_capacity),
			},
			builder: GraphModelBuilder::new(config.prebuilt_node_size),
			sizer,
			next_ticket: 0,
		}
	}

	pub fn state(&self) -> &ViewState<H> {
		&self.state
	}

	pub fn graph(&self) -> &Graph {
		&self.state.graph
	}

	pub fn sizer(&self) -> &LayoutSizer {
		&self.sizer
	}

	/// Enters `Requesting` for `query`. Only the latest ticket can commit.
	pub fn begin(&mut self, query: &GraphQuery) -> RequestTicket {
		self.next_ticket += 1;
		let ticket = RequestTicket(self.next_ticket);
		log::debug!("requesting {} ({:?})", query.endpoint(), ticket);
		self.state.phase = LoadPhase::Requesting { ticket };
		ticket
	}

	/// Normalizes `response` and commits it, or keeps the previous graph.
	pub fn finish(
		&mut self,
		ticket: RequestTicket,
		query: &GraphQuery,
		response: Result<Value>,
		loader: &dyn ImageLoader,
	) -> Transition {
		if self.state.phase != (LoadPhase::Requesting { ticket }) {
			log::debug!("dropping response for superseded {:?}", ticket);
			return Transition::Superseded;
		}
		match response.and_then(|payload| self.builder.normalize(query, payload)) {
			Ok(graph) => self.commit(graph, loader),
			Err(err) => {
				log::warn!("keeping previous graph: {err}");
				self.state.phase = LoadPhase::Rejected {
					reason: err.to_string(),
				};
				self.state.last_error = Some(err.clone());
				Transition::Rejected(err)
			}
		}
	}

	/// `begin`, fetch and `finish` in one call.
	pub async fn run<Q: QueryService>(
		&mut self,
		service: &Q,
		query: GraphQuery,
		loader: &dyn ImageLoader,
	) -> Transition {
		let ticket = self.begin(&query);
		let response = service.get(&query.request()).await;
		self.finish(ticket, &query, response, loader)
	}

	fn commit(&mut self, graph: Graph, loader: &dyn ImageLoader) -> Transition {
		let state = &mut self.state;
		state.generation += 1;
		state.graph = graph;
		state.layout = self.sizer.layout(&state.graph, state.viewport);
		state.phase = LoadPhase::Normalized {
			generation: state.generation,
		};
		state.last_error = None;

		state
			.images
			.begin_generation(state.generation, state.graph.nodes().iter().map(|n| n.id.as_str()));
		let requests: Vec<LoadRequest> = state
			.graph
			.nodes()
			.iter()
			.filter_map(|node| state.images.ensure(node))
			.collect();
		let loads = requests.len();
		for request in requests {
			loader.load(request);
		}

		log::info!(
			"graph generation {}: {} nodes, {} links, {} image loads",
			state.generation,
			state.graph.node_count(),
			state.graph.links().len(),
			loads
		);
		Transition::Normalized {
			generation: state.generation,
			nodes: state.graph.node_count(),
			links: state.graph.links().len(),
			loads,
		}
	}

	/// Reports a finished image load. Returns `true` when a repaint is due.
	pub fn image_loaded(&mut self, request: &LoadRequest, result: Result<H>) -> bool {
		self.state.images.complete(request, result) == Completion::Inserted
	}

	/// Stores the class list, keeping the old one if the response is bad.
	pub fn accept_classes(&mut self, response: Result<Value>) -> Result<&[String]> {
		let decoded = response.and_then(|payload| {
			if !payload.is_array() {
				return Err(Error::malformed(DISTINCT_CLASSES, "expected a JSON array"));
			}
			serde_json::from_value::<Vec<String>>(payload).map_err(|e| Error::malformed(DISTINCT_CLASSES, e))
		});
		match decoded {
			Ok(classes) => {
				log::info!("{} classes available", classes.len());
				self.state.classes = classes;
				Ok(self.state.classes.as_slice())
			}
			Err(err) => {
				log::warn!("keeping previous class list: {err}");
				self.state.last_error = Some(err.clone());
				Err(err)
			}
		}
	}

	/// Fetches and stores the class list.
	pub async fn refresh_classes<Q: QueryService>(&mut self, service: &Q) -> Result<&[String]> {
		let response = service.get(&QueryRequest::distinct_classes()).await;
		self.accept_classes(response)
	}

	/// Records a new surface size and recomputes the layout.
	pub fn set_viewport(&mut self, viewport: ViewportMetrics) {
		self.state.viewport = viewport;
		self.state.layout = self.sizer.layout(&self.state.graph, viewport);
	}

	/// Minimum weight used by the next similarity query. Negative or
	/// non-finite values are ignored.
	pub fn set_weight_threshold(&mut self, threshold: f64) -> bool {
		if !(threshold.is_finite() && threshold >= 0.0) {
			log::warn!("ignoring weight threshold {threshold}");
			return false;
		}
		self.state.weight_threshold = threshold;
		true
	}

	/// Similarity query at the current threshold.
	pub fn weighted_query(&self) -> GraphQuery {
		GraphQuery::WeightedEdges {
			min_weight: self.state.weight_threshold,
		}
	}
}

#[cfg(test)]
mod tests {
	use std::cell::RefCell;

	use serde_json::json;

	use super::*;

	#[derive(Default)]
	struct Recorder(RefCell<Vec<LoadRequest>>);

	impl ImageLoader for Recorder {
		fn load(&self, request: LoadRequest) {
			self.0.borrow_mut().push(request);
		}
	}

	fn controller() -> ViewController<u32> {
		ViewController::new(&ViewConfig::default())
	}

	fn ring(label: &str) -> GraphQuery {
		GraphQuery::ClassRing {
			class_label: label.into(),
		}
	}

	#[test]
	fn commit_replaces_graph_and_schedules_loads() {
		let mut view = controller();
		let loader = Recorder::default();
		let query = ring("cats");
		let ticket = view.begin(&query);
		assert!(matches!(view.state().phase, LoadPhase::Requesting { .. }));
		let transition = view.finish(ticket, &query, Ok(json!([{"id": "a"}, {"id": "b"}])), &loader);
		assert_eq!(
			transition,
			Transition::Normalized {
				generation: 1,
				nodes: 2,
				links: 2,
				loads: 2
			}
		);
		assert_eq!(view.state().phase, LoadPhase::Normalized { generation: 1 });
		assert_eq!(loader.0.borrow().len(), 2);
		assert_eq!(view.state().layout.node_diameter, 300.0 / 2f64.sqrt());
	}

	#[test]
	fn malformed_response_keeps_previous_graph() {
		let mut view = controller();
		let loader = Recorder::default();
		let query = ring("cats");
		let ticket = view.begin(&query);
		view.finish(ticket, &query, Ok(json!([{"id": "a"}, {"id": "b"}])), &loader);
		let before = view.graph().clone();

		let ticket = view.begin(&GraphQuery::FullCorpus);
		let transition = view.finish(ticket, &GraphQuery::FullCorpus, Ok(json!({"error": 1})), &loader);
		assert!(matches!(transition, Transition::Rejected(Error::MalformedResponse { .. })));
		assert_eq!(view.graph(), &before);
		assert_eq!(view.state().generation, 1);
		assert!(matches!(view.state().phase, LoadPhase::Rejected { .. }));
	}

	#[test]
	fn older_ticket_cannot_commit() {
		let mut view = controller();
		let loader = Recorder::default();
		let first = view.begin(&ring("cats"));
		let second = view.begin(&ring("dogs"));
		assert_eq!(
			view.finish(first, &ring("cats"), Ok(json!([{"id": "c"}])), &loader),
			Transition::Superseded
		);
		assert!(view.graph().is_empty());
		let transition = view.finish(second, &ring("dogs"), Ok(json!([{"id": "d"}])), &loader);
		assert!(matches!(transition, Transition::Normalized { generation: 1, .. }));
		assert!(view.graph().contains("d"));
	}

	#[test]
	fn recurring_nodes_are_not_reloaded() {
		let mut view = controller();
		let loader = Recorder::default();
		let query = ring("cats");
		let ticket = view.begin(&query);
		view.finish(ticket, &query, Ok(json!([{"id": "a"}, {"id": "b"}])), &loader);
		let first_a = loader.0.borrow()[0].clone();
		assert!(view.image_loaded(&first_a, Ok(7)));

		let ticket = view.begin(&query);
		let transition = view.finish(ticket, &query, Ok(json!([{"id": "a"}, {"id": "c"}])), &loader);
		// "a" is cached and "b" is still in flight, so only "c" loads.
		assert!(matches!(transition, Transition::Normalized { loads: 1, .. }));
		assert_eq!(view.state().images.lookup("a"), Some(&7));
	}

	#[test]
	fn viewport_change_recomputes_layout() {
		let mut view = controller();
		view.set_viewport(ViewportMetrics {
			width: 1000.0,
			height: 400.0,
		});
		assert_eq!(view.state().layout.node_diameter, 200.0);
	}

	#[test]
	fn threshold_must_be_non_negative() {
		let mut view = controller();
		assert!(!view.set_weight_threshold(-1.0));
		assert!(!view.set_weight_threshold(f64::NAN));
		assert!(view.set_weight_threshold(0.8));
		assert_eq!(view.weighted_query(), GraphQuery::WeightedEdges { min_weight: 0.8 });
	}

	#[test]
	fn bad_class_list_is_ignored() {
		let mut view = controller();
		assert_eq!(view.accept_classes(Ok(json!(["a", "b"]))).unwrap().len(), 2);
		assert!(view.accept_classes(Ok(json!([1, 2]))).is_err());
		assert!(view.accept_classes(Err(Error::TransportFailure("down".into()))).is_err());
		assert_eq!(view.state().classes, vec!["a".to_string(), "b".to_string()]);
	}
}
