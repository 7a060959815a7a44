//! Node diameter and link target distance.

use super::model::{Graph, Link};

/// Target link length for unweighted links, in layout units.
pub const DEFAULT_BASE_DISTANCE: f64 = 300.0;

/// Size of the rendering surface when a graph is committed.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewportMetrics {
	pub width: f64,
	pub height: f64,
}

impl Default for ViewportMetrics {
	fn default() -> Self {
		Self {
			width: 800.0,
			height: 600.0,
		}
	}
}

/// Layout inputs derived for the current graph and viewport.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LayoutParams {
	pub node_diameter: f64,
	pub viewport: ViewportMetrics,
}

#[derive(Clone, Copy, Debug)]
pub struct LayoutSizer {
	base_distance: f64,
}

impl Default for LayoutSizer {
	fn default() -> Self {
		Self::new(DEFAULT_BASE_DISTANCE)
	}
}

impl LayoutSizer {
	pub fn new(base_distance: f64) -> Self {
		Self { base_distance }
	}

	pub fn base_distance(&self) -> f64 {
		self.base_distance
	}

	/// `min(w, h) / (2 * sqrt(n))`, with an empty graph sized as one node.
	pub fn node_diameter(&self, node_count: usize, viewport: ViewportMetrics) -> f64 {
		let n = node_count.max(1) as f64;
		viewport.width.min(viewport.height) / (2.0 * n.sqrt())
	}

	/// Base distance, divided by the weight for weighted links.
	///
	/// Weights must be positive; the edge decoder drops anything else.
	pub fn link_distance(&self, link: &Link) -> f64 {
		match link.weight {
			Some(weight) => self.base_distance / weight,
			None => self.base_distance,
		}
	}

	pub fn layout(&self, graph: &Graph, viewport: ViewportMetrics) -> LayoutParams {
		LayoutParams {
			node_diameter: self.node_diameter(graph.node_count(), viewport),
			viewport,
		}
	}
}
