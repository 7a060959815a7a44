use std::cell::RefCell;
use std::collections::{HashMap, HashSet};

use image_graph_explorer::config::ViewConfig;
use image_graph_explorer::graph::{
	Error, GraphQuery, ImageLoader, LoadPhase, LoadRequest, NodeKind, QueryRequest, QueryService,
	Result, Transition, ViewController,
};
use pollster::block_on;
use serde_json::{Value, json};

/// Canned responses keyed by endpoint path; unknown paths fail transport.
#[derive(Default)]
struct FakeService {
	responses: RefCell<HashMap<&'static str, Result<Value>>>,
	requests: RefCell<Vec<QueryRequest>>,
}

impl FakeService {
	fn respond(&self, path: &'static str, response: Result<Value>) {
		self.responses.borrow_mut().insert(path, response);
	}
}

impl QueryService for FakeService {
	async fn get(&self, request: &QueryRequest) -> Result<Value> {
		self.requests.borrow_mut().push(request.clone());
		self.responses
			.borrow()
			.get(request.path)
			.cloned()
			.unwrap_or_else(|| Err(Error::TransportFailure(format!("no route {}", request.path))))
	}
}

#[derive(Default)]
struct QueuedLoader(RefCell<Vec<LoadRequest>>);

impl ImageLoader for QueuedLoader {
	fn load(&self, request: LoadRequest) {
		self.0.borrow_mut().push(request);
	}
}

impl QueuedLoader {
	fn drain(&self) -> Vec<LoadRequest> {
		std::mem::take(&mut *self.0.borrow_mut())
	}
}

fn view() -> ViewController<String> {
	ViewController::new(&ViewConfig::default())
}

#[test]
fn transport_failure_keeps_first_graph_intact() {
	let service = FakeService::default();
	let loader = QueuedLoader::default();
	let mut view = view();
	service.respond(
		"/get_all_images/",
		Ok(json!([
			{"class_label": "cat", "img_path": "cat/1.png"},
			{"class_label": "dog", "img_path": "dog/1.png"},
		])),
	);
	let first = block_on(view.run(&service, GraphQuery::FullCorpus, &loader));
	assert!(matches!(first, Transition::Normalized { nodes: 4, links: 2, .. }));
	let before = view.graph().clone();

	service.respond(
		"/get_all_edges_by_weight/",
		Err(Error::TransportFailure("HTTP 502".into())),
	);
	let second = block_on(view.run(&service, GraphQuery::WeightedEdges { min_weight: 0.9 }, &loader));
	assert_eq!(second, Transition::Rejected(Error::TransportFailure("HTTP 502".into())));
	assert_eq!(view.graph(), &before);
	assert_eq!(view.graph().nodes(), before.nodes());
	assert_eq!(view.graph().links(), before.links());
	assert!(matches!(view.state().phase, LoadPhase::Rejected { .. }));
	assert!(view.state().last_error.is_some());
}

#[test]
fn every_node_gets_one_load_and_thumbnails_arrive_out_of_order() {
	let service = FakeService::default();
	let loader = QueuedLoader::default();
	let mut view = view();
	service.respond(
		"/get_images_by_class/",
		Ok(json!([{"id": "a", "img_path": "x/a"}, {"id": "b", "img_path": "x/b"}])),
	);
	let query = GraphQuery::ClassStar {
		class_label: "x".into(),
	};
	block_on(view.run(&service, query, &loader));

	let mut loads = loader.drain();
	let urls: HashSet<String> = loads.iter().map(|r| r.url.clone()).collect();
	assert_eq!(
		urls,
		HashSet::from([
			"classes/x".to_string(),
			"images/a".to_string(),
			"images/b".to_string()
		])
	);

	loads.reverse();
	for request in &loads {
		assert!(view.image_loaded(request, Ok(format!("bitmap:{}", request.id))));
	}
	assert_eq!(view.state().images.lookup("a").map(String::as_str), Some("bitmap:a"));
	assert_eq!(view.state().images.revision(), 3);
	assert_eq!(view.graph().node("x").map(|n| n.kind), Some(NodeKind::Class));
}

#[test]
fn stale_loads_from_replaced_graph_are_dropped() {
	let service = FakeService::default();
	let loader = QueuedLoader::default();
	let mut view = view();
	service.respond("/get_images_by_class/", Ok(json!([{"id": "old"}, {"id": "shared"}])));
	block_on(view.run(
		&service,
		GraphQuery::ClassRing {
			class_label: "first".into(),
		},
		&loader,
	));
	let first_loads = loader.drain();

	service.respond(
		"/get_all_edges_by_weight/",
		Ok(json!([{"source": "shared", "target": "new", "weight": 2.0}])),
	);
	let query = view.weighted_query();
	let transition = block_on(view.run(&service, query, &loader));
	assert!(matches!(transition, Transition::Normalized { generation: 2, loads: 1, .. }));
	assert_eq!(loader.drain()[0].id, "new");

	for request in &first_loads {
		view.image_loaded(request, Ok(request.id.clone()));
	}
	assert!(view.state().images.lookup("old").is_none());
	assert!(view.state().images.lookup("shared").is_some());
}

#[test]
fn image_failure_leaves_marker_and_is_not_retried() {
	let service = FakeService::default();
	let loader = QueuedLoader::default();
	let mut view = view();
	service.respond("/get_images_by_class/", Ok(json!([{"id": "broken"}])));
	let query = GraphQuery::ClassRing {
		class_label: "c".into(),
	};
	block_on(view.run(&service, query.clone(), &loader));
	let request = loader.drain().remove(0);
	let err = Error::ImageLoadFailure {
		id: "broken".into(),
		reason: "404".into(),
	};
	assert!(!view.image_loaded(&request, Err(err)));

	block_on(view.run(&service, query, &loader));
	assert!(loader.drain().is_empty());
	assert!(view.state().images.lookup("broken").is_none());
}

#[test]
fn weighted_layout_uses_weight() {
	let service = FakeService::default();
	let loader = QueuedLoader::default();
	let mut view = view();
	service.respond(
		"/get_all_edges_by_weight/",
		Ok(json!([
			{"source": "a", "target": "b", "weight": 2.0},
			{"source": "b", "target": "c", "weight": 4.0},
		])),
	);
	assert!(view.set_weight_threshold(1.5));
	let query = view.weighted_query();
	block_on(view.run(&service, query, &loader));

	let request = service.requests.borrow().last().cloned().unwrap();
	assert_eq!(request.params, vec![("weight", "1.5".to_string())]);
	let ids: Vec<&str> = view.graph().nodes().iter().map(|n| n.id.as_str()).collect();
	assert_eq!(ids, vec!["a", "b", "c"]);
	let sizer = view.sizer();
	assert_eq!(sizer.link_distance(&view.graph().links()[0]), sizer.base_distance() / 2.0);
	assert_eq!(sizer.link_distance(&view.graph().links()[1]), sizer.base_distance() / 4.0);
}

#[test]
fn prebuilt_graph_round_trip_through_controller() {
	let service = FakeService::default();
	let loader = QueuedLoader::default();
	let mut view = view();
	service.respond(
		"/analyze_images/",
		Ok(json!({
			"nodes": [{"id": "p1"}, {"id": "p2"}],
			"edges": [{"source": "p1", "target": "p2"}],
		})),
	);
	let transition = block_on(view.run(
		&service,
		GraphQuery::Prebuilt {
			folder_path: "/srv/images".into(),
		},
		&loader,
	));
	assert!(matches!(transition, Transition::Normalized { nodes: 2, links: 1, .. }));
	assert!(view.graph().nodes().iter().all(|n| n.fixed_size.is_some()));
	let request = service.requests.borrow().last().cloned().unwrap();
	assert_eq!(request.params, vec![("folder_path", "/srv/images".to_string())]);
}

#[test]
fn class_list_refresh() {
	let service = FakeService::default();
	let mut view = view();
	service.respond("/get_distinct_classes/", Ok(json!(["cat", "dog"])));
	let classes = block_on(view.refresh_classes(&service)).unwrap().to_vec();
	assert_eq!(classes, vec!["cat".to_string(), "dog".to_string()]);

	service.respond("/get_distinct_classes/", Ok(json!({"classes": []})));
	assert!(matches!(
		block_on(view.refresh_classes(&service)),
		Err(Error::MalformedResponse { .. })
	));
	assert_eq!(view.state().classes.len(), 2);
}


#[test]
fn zero_threshold_commits_graph_without_unusable_edges() {
	let service = FakeService::default();
	let loader = QueuedLoader::default();
	let mut view = view();
	assert!(view.set_weight_threshold(0.0));
	service.respond(
		"/get_all_edges_by_weight/",
		Ok(json!([
			{"source": "a", "target": "b", "weight": 0.9},
			{"source": "b", "target": "c", "weight": 0.4},
			{"source": "c", "target": "d", "weight": 0.0},
		])),
	);
	let query = view.weighted_query();
	let transition = block_on(view.run(&service, query, &loader));
	assert!(matches!(transition, Transition::Normalized { nodes: 3, links: 2, .. }));
	assert!(view.graph().node("d").is_none());
	assert!(view.state().last_error.is_none());
}

#[test]
fn load_that_cannot_start_does_not_stay_pending() {
	let service = FakeService::default();
	let loader = QueuedLoader::default();
	let mut view = view();
	service.respond("/get_images_by_class/", Ok(json!([{"id": "a"}, {"id": "b"}])));
	let query = GraphQuery::ClassRing {
		class_label: "c".into(),
	};
	block_on(view.run(&service, query.clone(), &loader));
	assert_eq!(view.state().images.pending_count(), 2);

	for request in loader.drain() {
		let err = Error::ImageLoadFailure {
			id: request.id.clone(),
			reason: "cannot create image element".into(),
		};
		assert!(!view.image_loaded(&request, Err(err)));
	}
	assert_eq!(view.state().images.pending_count(), 0);
	assert!(!view.state().images.is_pending("a"));

	block_on(view.run(&service, query, &loader));
	assert!(loader.drain().is_empty());
}
