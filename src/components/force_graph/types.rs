use crate::graph::NodeKind;

/// Per-node data carried through the simulation.
#[derive(Clone, Debug, Default)]
pub struct NodeInfo {
	pub id: String,
	pub kind: NodeKind,
	pub label: Option<String>,
	pub color: String,
	pub fixed_size: Option<f64>,
}

#[derive(Clone, Debug, Default)]
pub struct LinkInfo {
	pub rgb: (u8, u8, u8),
	/// Screen-space line width override.
	pub width: Option<f64>,
}
