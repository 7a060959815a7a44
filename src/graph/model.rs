//! Canonical node/link graph shared by every query shape.

use std::collections::HashMap;

/// Discriminates image nodes from class-label nodes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum NodeKind {
	/// A corpus image, keyed by its path or id.
	#[default]
	Image,
	/// A class label.
	Class,
}

impl NodeKind {
	/// Asset directory the node's thumbnail lives under.
	pub fn asset_dir(self) -> &'static str {
		match self {
			NodeKind::Image => "images",
			NodeKind::Class => "classes",
		}
	}
}

/// A graph vertex.
#[derive(Clone, Debug, PartialEq)]
pub struct Node {
	pub id: String,
	pub kind: NodeKind,
	/// Relative asset path, always `{kind dir}/{id}`.
	pub display_url: String,
	pub name: Option<String>,
	/// Palette slot; members of a class share the class's group.
	pub group: Option<u32>,
	/// Overrides the viewport-derived diameter when set.
	pub fixed_size: Option<f64>,
}

impl Node {
	/// Node with its display url derived from `kind` and `id`.
	pub fn new(id: impl Into<String>, kind: NodeKind) -> Self {
		let id = id.into();
		Self {
			display_url: format!("{}/{}", kind.asset_dir(), id),
			id,
			kind,
			name: None,
			group: None,
			fixed_size: None,
		}
	}

	/// Image node.
	pub fn image(id: impl Into<String>) -> Self {
		Self::new(id, NodeKind::Image)
	}

	/// Class node labelled with its own id.
	pub fn class(label: impl Into<String>) -> Self {
		let label = label.into();
		let mut node = Self::new(label.clone(), NodeKind::Class);
		node.name = Some(label);
		node
	}

	/// Sets the palette group.
	pub fn with_group(mut self, group: u32) -> Self {
		self.group = Some(group);
		self
	}

	/// Sets a fixed render size.
	pub fn with_fixed_size(mut self, size: f64) -> Self {
		self.fixed_size = Some(size);
		self
	}
}

/// Optional presentation hints carried by a link.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LinkStyle {
	/// RGB triple; the renderer supplies alpha.
	pub color: Option<(u8, u8, u8)>,
	/// Line width in screen pixels.
	pub width: Option<f64>,
}

/// A directed pair rendered as an undirected edge.
#[derive(Clone, Debug, PartialEq)]
pub struct Link {
	pub source: String,
	pub target: String,
	/// Positive similarity weight; `None` means unweighted.
	pub weight: Option<f64>,
	pub style: Option<LinkStyle>,
}

impl Link {
	/// Unweighted, unstyled link.
	pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
		Self {
			source: source.into(),
			target: target.into(),
			weight: None,
			style: None,
		}
	}

	/// Sets the weight.
	pub fn with_weight(mut self, weight: f64) -> Self {
		self.weight = Some(weight);
		self
	}

	/// Sets style hints.
	pub fn with_style(mut self, style: LinkStyle) -> Self {
		self.style = Some(style);
		self
	}

	/// Whether the layout should scale distance by weight.
	pub fn is_weighted(&self) -> bool {
		self.weight.is_some()
	}
}

/// Nodes unique by id in insertion order, links in sequence.
///
/// Links are only stored when both endpoints exist and differ, so every
/// link of a `Graph` references its own node set.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Graph {
	nodes: Vec<Node>,
	links: Vec<Link>,
	index: HashMap<String, usize>,
}

impl Graph {
	/// Empty graph.
	pub fn new() -> Self {
		Self::default()
	}

	/// Inserts `node` unless its id is already present. Returns whether it
	/// was added.
	pub fn insert_node(&mut self, node: Node) -> bool {
		if self.index.contains_key(&node.id) {
			return false;
		}
		self.index.insert(node.id.clone(), self.nodes.len());
		self.nodes.push(node);
		true
	}

	/// Appends `link` if both endpoints exist and it is not a self-loop.
	pub fn insert_link(&mut self, link: Link) -> bool {
		if link.source == link.target
			|| !self.contains(&link.source)
			|| !self.contains(&link.target)
		{
			return false;
		}
		self.links.push(link);
		true
	}

	pub fn nodes(&self) -> &[Node] {
		&self.nodes
	}

	pub fn links(&self) -> &[Link] {
		&self.links
	}

	pub fn node(&self, id: &str) -> Option<&Node> {
		self.index.get(id).map(|&i| &self.nodes[i])
	}

	pub fn contains(&self, id: &str) -> bool {
		self.index.contains_key(id)
	}

	pub fn node_count(&self) -> usize {
		self.nodes.len()
	}

	pub fn is_empty(&self) -> bool {
		self.nodes.is_empty()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn display_url_follows_kind() {
		assert_eq!(Node::image("cat/01.png").display_url, "images/cat/01.png");
		let class = Node::class("cat");
		assert_eq!(class.display_url, "classes/cat");
		assert_eq!(class.name.as_deref(), Some("cat"));
	}

	#[test]
	fn insert_node_is_idempotent() {
		let mut graph = Graph::new();
		assert!(graph.insert_node(Node::image("a")));
		assert!(!graph.insert_node(Node::class("a")));
		assert_eq!(graph.node_count(), 1);
		assert_eq!(graph.node("a").map(|n| n.kind), Some(NodeKind::Image));
	}

	#[test]
	fn rejects_self_loops_and_dangling_links() {
		let mut graph = Graph::new();
		graph.insert_node(Node::image("a"));
		graph.insert_node(Node::image("b"));
		assert!(!graph.insert_link(Link::new("a", "a")));
		assert!(!graph.insert_link(Link::new("a", "missing")));
		assert!(graph.insert_link(Link::new("a", "b")));
		assert_eq!(graph.links().len(), 1);
	}
}
