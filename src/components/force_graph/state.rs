use std::collections::{HashMap, HashSet};
use std::f64::consts::PI;

use force_graph::{DefaultNodeIdx, EdgeData, ForceGraph, NodeData, SimulationParameters};

use super::scale::render_size;
use super::types::{LinkInfo, NodeInfo};
use crate::graph::{Graph, LayoutParams, LayoutSizer};

const COLORS: &[&str] = &[
	"#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2", "#7f7f7f",
	"#bcbd22", "#17becf",
];

const LINK_RGB: (u8, u8, u8) = (100, 180, 255);
/// Fraction of the length error corrected per tick.
const LINK_STRENGTH: f32 = 0.1;

pub const HIT_RADIUS: f64 = 12.0;
const MIN_ZOOM: f64 = 0.1;
const MAX_ZOOM: f64 = 10.0;

#[derive(Clone, Debug, Default)]
pub struct ViewTransform {
	pub x: f64,
	pub y: f64,
	pub k: f64,
}

#[derive(Clone, Debug, Default)]
pub struct DragState {
	pub active: bool,
	pub node_idx: Option<DefaultNodeIdx>,
	pub start_x: f64,
	pub start_y: f64,
	pub node_start_x: f32,
	pub node_start_y: f32,
}

#[derive(Clone, Debug, Default)]
pub struct PanState {
	pub active: bool,
	pub start_x: f64,
	pub start_y: f64,
	pub transform_start_x: f64,
	pub transform_start_y: f64,
}

#[derive(Clone, Debug, Default)]
pub struct HoverState {
	pub node: Option<DefaultNodeIdx>,
	pub neighbors: HashSet<DefaultNodeIdx>,
	pub highlight_t: f64,
	pub prev_node: Option<DefaultNodeIdx>,
	pub prev_neighbors: HashSet<DefaultNodeIdx>,
	delay_t: f64,
}

pub struct EdgeSpec {
	pub source: DefaultNodeIdx,
	pub target: DefaultNodeIdx,
	/// Target length from the layout sizer.
	pub distance: f64,
}

pub struct ForceGraphState {
	pub graph: ForceGraph<NodeInfo, LinkInfo>,
	pub transform: ViewTransform,
	pub drag: DragState,
	pub pan: PanState,
	pub hover: HoverState,
	pub width: f64,
	pub height: f64,
	pub node_diameter: f64,
	pub animation_running: bool,
	pub flow_time: f64,
	pub edges: Vec<EdgeSpec>,
	/// Graph generation this simulation was built from.
	pub generation: u64,
}

fn group_color(group: Option<u32>) -> String {
	COLORS[group.unwrap_or(0) as usize % COLORS.len()].into()
}

impl ForceGraphState {
	pub fn new(data: &Graph, sizer: &LayoutSizer, layout: LayoutParams, generation: u64) -> Self {
		let mut graph = ForceGraph::new(SimulationParameters {
			force_charge: 150.0,
			force_spring: 0.02,
			force_max: 100.0,
			node_speed: 3000.0,
			damping_factor: 0.9,
		});
		let (width, height) = (layout.viewport.width, layout.viewport.height);
		let mut id_to_idx = HashMap::new();
		let mut edges = Vec::new();
		let spread = width.min(height) / 4.0;

		for (i, node) in data.nodes().iter().enumerate() {
			let angle = (i as f64) * 2.0 * PI / data.node_count() as f64;
			let (x, y) = ((spread * angle.cos()) as f32, (spread * angle.sin()) as f32);

			let idx = graph.add_node(NodeData {
				x,
				y,
				mass: 10.0,
				is_anchor: false,
				user_data: NodeInfo {
					id: node.id.clone(),
					kind: node.kind,
					label: node.name.clone(),
					color: group_color(node.group),
					fixed_size: node.fixed_size,
				},
			});
			id_to_idx.insert(node.id.as_str(), idx);
		}

		for link in data.links() {
			if let (Some(&source), Some(&target)) =
				(id_to_idx.get(link.source.as_str()), id_to_idx.get(link.target.as_str()))
			{
				let style = link.style.clone().unwrap_or_default();
				graph.add_edge(
					source,
					target,
					EdgeData {
						user_data: LinkInfo {
							rgb: style.color.unwrap_or(LINK_RGB),
							width: style.width,
						},
					},
				);
				edges.push(EdgeSpec {
					source,
					target,
					distance: sizer.link_distance(link),
				});
			}
		}

		Self {
			graph,
			edges,
			transform: ViewTransform {
				x: width / 2.0,
				y: height / 2.0,
				k: 1.0,
			},
			drag: DragState::default(),
			pan: PanState::default(),
			hover: HoverState::default(),
			width,
			height,
			node_diameter: layout.node_diameter,
			animation_running: true,
			flow_time: 0.0,
			generation,
		}
	}

	pub fn screen_to_graph(&self, sx: f64, sy: f64) -> (f64, f64) {
		(
			(sx - self.transform.x) / self.transform.k,
			(sy - self.transform.y) / self.transform.k,
		)
	}

	pub fn node_at_position(&self, sx: f64, sy: f64) -> Option<DefaultNodeIdx> {
		let (gx, gy) = self.screen_to_graph(sx, sy);
		let mut found = None;
		self.graph.visit_nodes(|node| {
			let (dx, dy) = (node.x() as f64 - gx, node.y() as f64 - gy);
			let size = node.data.user_data.fixed_size.unwrap_or(self.node_diameter);
			let radius = HIT_RADIUS.max(render_size(size, self.transform.k) / 2.0);
			if (dx * dx + dy * dy).sqrt() < radius {
				found = Some(node.index());
			}
		});
		found
	}

	pub fn set_hover(&mut self, node: Option<DefaultNodeIdx>) {
		if self.hover.node == node {
			return;
		}
		let was_hovering = self.hover.node.is_some();

		// Save previous state for fade-out
		if was_hovering && node.is_none() {
			self.hover.prev_node = self.hover.node.take();
			self.hover.prev_neighbors = std::mem::take(&mut self.hover.neighbors);
		} else {
			self.hover.prev_node = None;
			self.hover.prev_neighbors.clear();
		}

		self.hover.node = node;
		self.hover.neighbors.clear();

		if let Some(idx) = node {
			if !was_hovering {
				self.hover.delay_t = 0.0;
			}
			for edge in &self.edges {
				if edge.source == idx {
					self.hover.neighbors.insert(edge.target);
				} else if edge.target == idx {
					self.hover.neighbors.insert(edge.source);
				}
			}
		}
	}

	pub fn is_highlighted(&self, idx: DefaultNodeIdx) -> bool {
		self.hover.node == Some(idx)
			|| self.hover.neighbors.contains(&idx)
			|| self.hover.prev_node == Some(idx)
			|| self.hover.prev_neighbors.contains(&idx)
	}

	pub fn is_hovered(&self, idx: DefaultNodeIdx) -> bool {
		self.hover.node == Some(idx) || self.hover.prev_node == Some(idx)
	}

	pub fn has_active_highlight(&self) -> bool {
		self.hover.node.is_some() || self.hover.prev_node.is_some()
	}

	/// Starts a node drag when `(x, y)` hits a node, otherwise a pan.
	pub fn pointer_down(&mut self, x: f64, y: f64) {
		let Some(idx) = self.node_at_position(x, y) else {
			self.pan = PanState {
				active: true,
				start_x: x,
				start_y: y,
				transform_start_x: self.transform.x,
				transform_start_y: self.transform.y,
			};
			return;
		};
		let mut start = (0.0, 0.0);
		self.graph.visit_nodes(|node| {
			if node.index() == idx {
				start = (node.x(), node.y());
			}
		});
		self.drag = DragState {
			active: true,
			node_idx: Some(idx),
			start_x: x,
			start_y: y,
			node_start_x: start.0,
			node_start_y: start.1,
		};
	}

	pub fn pointer_move(&mut self, x: f64, y: f64) {
		if !self.drag.active {
			let hovered = self.node_at_position(x, y);
			self.set_hover(hovered);
		}

		if let (true, Some(idx)) = (self.drag.active, self.drag.node_idx) {
			let k = self.transform.k;
			let nx = self.drag.node_start_x + ((x - self.drag.start_x) / k) as f32;
			let ny = self.drag.node_start_y + ((y - self.drag.start_y) / k) as f32;
			// Dragged nodes stay pinned where they are dropped.
			self.graph.visit_nodes_mut(|node| {
				if node.index() == idx {
					node.data.x = nx;
					node.data.y = ny;
					node.data.is_anchor = true;
				}
			});
		} else if self.pan.active {
			self.transform.x = self.pan.transform_start_x + (x - self.pan.start_x);
			self.transform.y = self.pan.transform_start_y + (y - self.pan.start_y);
		}
	}

	pub fn pointer_up(&mut self) {
		self.drag = DragState::default();
		self.pan.active = false;
	}

	/// Zooms by one wheel step, keeping the point under the cursor fixed.
	pub fn zoom_at(&mut self, x: f64, y: f64, delta_y: f64) {
		let factor = if delta_y > 0.0 { 0.9 } else { 1.1 };
		let k = (self.transform.k * factor).clamp(MIN_ZOOM, MAX_ZOOM);
		let ratio = k / self.transform.k;
		self.transform.x = x - (x - self.transform.x) * ratio;
		self.transform.y = y - (y - self.transform.y) * ratio;
		self.transform.k = k;
	}

	pub fn tick(&mut self, dt: f32) {
		self.graph.update(dt);
		self.relax_links();
		self.flow_time += dt as f64;

		let (target, delay, speed) = if self.hover.node.is_some() {
			(1.0, 0.08, 1.8)
		} else {
			(0.0, 0.0, 1.26)
		};

		if self.hover.node.is_some() {
			self.hover.delay_t = (self.hover.delay_t + dt as f64).min(delay);
			if self.hover.delay_t >= delay {
				self.hover.highlight_t += (target - self.hover.highlight_t) * speed * dt as f64;
			}
		} else {
			self.hover.highlight_t += (target - self.hover.highlight_t) * speed * dt as f64;
			if self.hover.highlight_t < 0.01 {
				self.hover.highlight_t = 0.0;
				self.hover.prev_node = None;
				self.hover.prev_neighbors.clear();
			}
		}
	}

	/// Pulls each edge toward its target distance; anchored nodes stay put.
	fn relax_links(&mut self) {
		let mut positions = HashMap::new();
		self.graph.visit_nodes(|node| {
			positions.insert(node.index(), (node.x(), node.y()));
		});

		let mut shifts: HashMap<DefaultNodeIdx, (f32, f32)> = HashMap::new();
		for edge in &self.edges {
			let (Some(&(x1, y1)), Some(&(x2, y2))) =
				(positions.get(&edge.source), positions.get(&edge.target))
			else {
				continue;
			};
			let (dx, dy) = (x2 - x1, y2 - y1);
			let dist = (dx * dx + dy * dy).sqrt();
			if dist < 0.001 {
				continue;
			}
			let k = (dist - edge.distance as f32) / dist * LINK_STRENGTH * 0.5;
			let s = shifts.entry(edge.source).or_default();
			s.0 += dx * k;
			s.1 += dy * k;
			let t = shifts.entry(edge.target).or_default();
			t.0 -= dx * k;
			t.1 -= dy * k;
		}

		self.graph.visit_nodes_mut(|node| {
			if node.data.is_anchor {
				return;
			}
			if let Some(&(sx, sy)) = shifts.get(&node.index()) {
				node.data.x += sx;
				node.data.y += sy;
			}
		});
	}

	pub fn set_layout(&mut self, layout: LayoutParams) {
		self.width = layout.viewport.width;
		self.height = layout.viewport.height;
		self.node_diameter = layout.node_diameter;
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::graph::{Link, Node, ViewportMetrics};

	fn state() -> ForceGraphState {
		let mut graph = Graph::new();
		graph.insert_node(Node::image("a"));
		graph.insert_node(Node::image("b"));
		graph.insert_link(Link::new("a", "b").with_weight(2.0));
		let sizer = LayoutSizer::default();
		let layout = sizer.layout(&graph, ViewportMetrics::default());
		ForceGraphState::new(&graph, &sizer, layout, 1)
	}

	#[test]
	fn edges_carry_sized_distance() {
		let s = state();
		assert_eq!(s.edges.len(), 1);
		assert_eq!(s.edges[0].distance, LayoutSizer::default().base_distance() / 2.0);
	}

	#[test]
	fn empty_canvas_press_pans() {
		let mut s = state();
		let (x0, y0) = (s.transform.x, s.transform.y);
		s.pointer_down(1.0, 1.0);
		assert!(s.pan.active && !s.drag.active);
		s.pointer_move(11.0, 6.0);
		assert_eq!((s.transform.x, s.transform.y), (x0 + 10.0, y0 + 5.0));
		s.pointer_up();
		assert!(!s.pan.active);
	}

	#[test]
	fn zoom_keeps_cursor_point_fixed() {
		let mut s = state();
		let before = s.screen_to_graph(200.0, 150.0);
		s.zoom_at(200.0, 150.0, -1.0);
		let after = s.screen_to_graph(200.0, 150.0);
		assert!((before.0 - after.0).abs() < 1e-9 && (before.1 - after.1).abs() < 1e-9);
		for _ in 0..100 {
			s.zoom_at(0.0, 0.0, -1.0);
		}
		assert_eq!(s.transform.k, MAX_ZOOM);
	}
}
