//! Zoom-relative sizing used by the per-node draw callback.
//!
//! The canvas is scaled by the zoom factor before nodes are drawn, so a
//! thumbnail drawn at `diameter / zoom` world units keeps the same on-screen
//! size at every zoom level. Markers do scale with zoom.

/// Radius of the filled marker drawn for nodes without a thumbnail.
pub const MARKER_RADIUS: f64 = 5.0;

/// World-space size that renders as `layout_size` screen pixels at `zoom`.
pub fn render_size(layout_size: f64, zoom: f64) -> f64 {
	if zoom.is_finite() && zoom > 0.0 {
		layout_size / zoom
	} else {
		layout_size
	}
}

/// How a single node is drawn this frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum NodeVisual<H> {
	/// Cached bitmap, `size` world units square, centered on the node.
	Thumbnail { image: H, size: f64 },
	/// Fallback filled circle.
	Marker { radius: f64 },
}

/// Picks the thumbnail when one is cached, otherwise the marker.
pub fn node_visual<H>(image: Option<H>, fixed_size: Option<f64>, node_diameter: f64, zoom: f64) -> NodeVisual<H> {
	match image {
		Some(image) => NodeVisual::Thumbnail {
			image,
			size: render_size(fixed_size.unwrap_or(node_diameter), zoom),
		},
		None => NodeVisual::Marker {
			radius: MARKER_RADIUS,
		},
	}
}
