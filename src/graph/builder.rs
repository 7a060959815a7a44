//! Normalizes every Query Service response shape into a [`Graph`].
//!
//! Decoding (`GraphSource::decode`) is the only fallible step: once rows are
//! typed, building cannot fail. All shapes share the same postcondition:
//! node ids are unique, links reference existing nodes, no self-loops.

use std::collections::HashMap;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::error::{Error, Result};
use super::model::{Graph, Link, LinkStyle, Node, NodeKind};
use super::query::GraphQuery;

/// Render size given to prebuilt-graph nodes when not configured.
pub const DEFAULT_PREBUILT_NODE_SIZE: f64 = 12.0;

/// Image-to-class edges render muted to set them apart from similarity edges.
const MEMBERSHIP_STYLE: LinkStyle = LinkStyle {
	color: Some((170, 170, 200)),
	width: None,
};

/// `{id}` row from `/get_images_by_class/`.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct ImageRow {
	pub id: String,
}

/// `{class_label, img_path}` row from `/get_all_images/`.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct CorpusRecord {
	pub class_label: String,
	pub img_path: String,
}

/// `{source, target, weight}` row from `/get_all_edges_by_weight/`.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct WeightedEdge {
	pub source: String,
	pub target: String,
	pub weight: f64,
}

/// `{id}` node of a prebuilt graph.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct PrebuiltNode {
	pub id: String,
}

/// `{source, target}` edge of a prebuilt graph.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct PrebuiltEdge {
	pub source: String,
	pub target: String,
}

#[derive(Deserialize)]
struct PrebuiltPayload {
	nodes: Vec<PrebuiltNode>,
	edges: Vec<PrebuiltEdge>,
}

/// Typed source rows, one variant per supported shape.
#[derive(Clone, Debug, PartialEq)]
pub enum GraphSource {
	ClassRing {
		images: Vec<ImageRow>,
	},
	ClassStar {
		images: Vec<ImageRow>,
		class_label: String,
	},
	FullCorpus {
		records: Vec<CorpusRecord>,
	},
	WeightedEdges {
		edges: Vec<WeightedEdge>,
	},
	Prebuilt {
		nodes: Vec<PrebuiltNode>,
		edges: Vec<PrebuiltEdge>,
	},
}

impl GraphSource {
	/// Decodes the raw payload returned for `query`.
	///
	/// Fails with [`Error::MalformedResponse`] when the payload is not the
	/// endpoint's shape. Weighted edges whose weight is not a positive finite
	/// number are dropped, endpoints included.
	pub fn decode(query: &GraphQuery, payload: Value) -> Result<Self> {
		let endpoint = query.endpoint();
		let source = match query {
			GraphQuery::ClassRing { .. } => GraphSource::ClassRing {
				images: rows(endpoint, payload)?,
			},
			GraphQuery::ClassStar { class_label } => GraphSource::ClassStar {
				images: rows(endpoint, payload)?,
				class_label: class_label.clone(),
			},
			GraphQuery::FullCorpus => GraphSource::FullCorpus {
				records: rows(endpoint, payload)?,
			},
			GraphQuery::WeightedEdges { .. } => {
				let mut edges: Vec<WeightedEdge> = rows(endpoint, payload)?;
				edges.retain(|e| {
					let usable = e.weight.is_finite() && e.weight > 0.0;
					if !usable {
						log::warn!("dropped edge {} -> {} with weight {}", e.source, e.target, e.weight);
					}
					usable
				});
				GraphSource::WeightedEdges { edges }
			}
			GraphQuery::Prebuilt { .. } => {
				let PrebuiltPayload { nodes, edges } =
					serde_json::from_value(payload).map_err(|e| Error::malformed(endpoint, e))?;
				GraphSource::Prebuilt { nodes, edges }
			}
		};
		Ok(source)
	}
}

fn rows<T: DeserializeOwned>(endpoint: &'static str, payload: Value) -> Result<Vec<T>> {
	if !payload.is_array() {
		return Err(Error::malformed(endpoint, "expected a JSON array"));
	}
	serde_json::from_value(payload).map_err(|e| Error::malformed(endpoint, e))
}

/// Stateless normalizer from [`GraphSource`] to [`Graph`].
#[derive(Clone, Debug)]
pub struct GraphModelBuilder {
	prebuilt_node_size: f64,
}

impl Default for GraphModelBuilder {
	fn default() -> Self {
		Self::new(DEFAULT_PREBUILT_NODE_SIZE)
	}
}

impl GraphModelBuilder {
	pub fn new(prebuilt_node_size: f64) -> Self {
		Self { prebuilt_node_size }
	}

	/// Decodes and builds in one step.
	pub fn normalize(&self, query: &GraphQuery, payload: Value) -> Result<Graph> {
		GraphSource::decode(query, payload).map(|source| self.build(&source))
	}

	/// Dispatches to the shape-specific builder.
	pub fn build(&self, source: &GraphSource) -> Graph {
		match source {
			GraphSource::ClassRing { images } => self.from_class_ring(images),
			GraphSource::ClassStar {
				images,
				class_label,
			} => self.from_class_star(images, class_label),
			GraphSource::FullCorpus { records } => self.from_full_corpus(records),
			GraphSource::WeightedEdges { edges } => self.from_weighted_edges(edges),
			GraphSource::Prebuilt { nodes, edges } => self.from_prebuilt_graph(nodes, edges),
		}
	}

	/// One image node per row, linked `i -> i + 1` and closed back to the
	/// first. Fewer than two distinct images yield no links.
	pub fn from_class_ring(&self, images: &[ImageRow]) -> Graph {
		let mut graph = Graph::new();
		for row in images {
			graph.insert_node(Node::image(&row.id));
		}
		let ids: Vec<String> = graph.nodes().iter().map(|n| n.id.clone()).collect();
		let n = ids.len();
		if n > 1 {
			for (i, id) in ids.iter().enumerate() {
				graph.insert_link(Link::new(id, &ids[(i + 1) % n]));
			}
		}
		graph
	}

	/// Image nodes each linked to one class node.
	///
	/// The class node is inserted first, so an image row whose id equals
	/// `class_label` is absorbed by it and gets no link of its own.
	pub fn from_class_star(&self, images: &[ImageRow], class_label: &str) -> Graph {
		let mut graph = Graph::new();
		graph.insert_node(Node::class(class_label).with_group(0));
		for row in images {
			graph.insert_node(Node::image(&row.id).with_group(0));
		}
		let members: Vec<String> = graph
			.nodes()
			.iter()
			.filter(|n| n.kind == NodeKind::Image)
			.map(|n| n.id.clone())
			.collect();
		for id in members {
			graph.insert_link(Link::new(id, class_label).with_style(MEMBERSHIP_STYLE));
		}
		graph
	}

	/// Class and image nodes deduplicated in first-seen order; one link per
	/// record, so repeated records repeat their link.
	pub fn from_full_corpus(&self, records: &[CorpusRecord]) -> Graph {
		let mut graph = Graph::new();
		let mut groups: HashMap<&str, u32> = HashMap::new();
		for record in records {
			let next = groups.len() as u32;
			let group = *groups.entry(record.class_label.as_str()).or_insert(next);
			graph.insert_node(Node::class(&record.class_label).with_group(group));
			graph.insert_node(Node::image(&record.img_path).with_group(group));
		}
		for record in records {
			graph.insert_link(
				Link::new(&record.img_path, &record.class_label).with_style(MEMBERSHIP_STYLE),
			);
		}
		graph
	}

	/// Endpoints become image nodes; weights are carried unchanged.
	pub fn from_weighted_edges(&self, edges: &[WeightedEdge]) -> Graph {
		let mut graph = Graph::new();
		for edge in edges {
			graph.insert_node(Node::image(&edge.source));
			graph.insert_node(Node::image(&edge.target));
		}
		for edge in edges {
			if !graph.insert_link(Link::new(&edge.source, &edge.target).with_weight(edge.weight)) {
				log::debug!("dropped self-loop on {}", edge.source);
			}
		}
		graph
	}

	/// Server-built graph taken as is; edges to unknown nodes are dropped.
	pub fn from_prebuilt_graph(&self, nodes: &[PrebuiltNode], edges: &[PrebuiltEdge]) -> Graph {
		let mut graph = Graph::new();
		for node in nodes {
			graph.insert_node(Node::image(&node.id).with_fixed_size(self.prebuilt_node_size));
		}
		for edge in edges {
			if !graph.insert_link(Link::new(&edge.source, &edge.target)) {
				log::warn!("dropped prebuilt edge {} -> {}", edge.source, edge.target);
			}
		}
		graph
	}
}
