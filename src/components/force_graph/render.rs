use std::f64::consts::PI;

use wasm_bindgen::JsValue;
use web_sys::{CanvasRenderingContext2d, HtmlImageElement};

use super::scale::{MARKER_RADIUS, NodeVisual, node_visual};
use super::state::ForceGraphState;
use super::types::NodeInfo;
use crate::graph::{ImageCache, NodeKind};

fn ease_out_cubic(t: f64) -> f64 {
	1.0 - (1.0 - t).powi(3)
}

pub fn render(
	state: &ForceGraphState,
	ctx: &CanvasRenderingContext2d,
	images: &ImageCache<HtmlImageElement>,
) {
	ctx.set_fill_style_str("#1a1a2e");
	ctx.fill_rect(0.0, 0.0, state.width, state.height);
	ctx.save();
	let _ = ctx.translate(state.transform.x, state.transform.y);
	let _ = ctx.scale(state.transform.k, state.transform.k);
	draw_edges(state, ctx);
	draw_nodes(state, ctx, images);
	ctx.restore();
}

fn draw_edges(state: &ForceGraphState, ctx: &CanvasRenderingContext2d) {
	let k = state.transform.k;
	let (line_width, dash, gap) = (1.5 / k, 8.0 / k, 4.0 / k);
	let dash_offset = -(state.flow_time * 30.0) % (dash + gap);
	let t = ease_out_cubic(state.hover.highlight_t);

	state.graph.visit_edges(|n1, n2, edge| {
		let (x1, y1, x2, y2) = (n1.x() as f64, n1.y() as f64, n2.x() as f64, n2.y() as f64);
		let (dx, dy) = (x2 - x1, y2 - y1);
		let dist = (dx * dx + dy * dy).sqrt();
		if dist < 0.001 {
			return;
		}

		let is_highlighted = state.is_highlighted(n1.index()) && state.is_highlighted(n2.index());
		let base_width = edge.user_data.width.map(|w| w / k).unwrap_or(line_width);

		// t=0: all edges at base (0.6), t=1: highlighted at 0.9, others at 0.15
		let (edge_alpha, width) = if is_highlighted {
			(0.6 + 0.3 * t, base_width * (1.0 + 0.3 * t))
		} else {
			(0.6 - 0.45 * t, base_width * (1.0 - 0.3 * t))
		};

		let (r, g, b) = edge.user_data.rgb;
		ctx.set_stroke_style_str(&format!("rgba({r}, {g}, {b}, {edge_alpha})"));
		ctx.set_line_width(width);
		let _ = ctx.set_line_dash(&js_sys::Array::of2(
			&JsValue::from_f64(dash),
			&JsValue::from_f64(gap),
		));
		ctx.set_line_dash_offset(dash_offset);

		let (ux, uy) = (dx / dist, dy / dist);
		ctx.begin_path();
		ctx.move_to(x1 + ux * MARKER_RADIUS, y1 + uy * MARKER_RADIUS);
		ctx.line_to(x2 - ux * MARKER_RADIUS, y2 - uy * MARKER_RADIUS);
		ctx.stroke();
	});
	let _ = ctx.set_line_dash(&js_sys::Array::new());
}

fn visual_radius(visual: &NodeVisual<&HtmlImageElement>) -> f64 {
	match visual {
		NodeVisual::Thumbnail { size, .. } => size / 2.0,
		NodeVisual::Marker { radius } => *radius,
	}
}

fn visual_for<'a>(
	info: &NodeInfo,
	state: &ForceGraphState,
	images: &'a ImageCache<HtmlImageElement>,
) -> NodeVisual<&'a HtmlImageElement> {
	node_visual(images.lookup(&info.id), info.fixed_size, state.node_diameter, state.transform.k)
}

/// Per-node draw callback: the cached thumbnail, or a filled marker while
/// none is available. `grow` scales either for hover emphasis. Returns the
/// drawn radius.
fn draw_node(
	info: &NodeInfo,
	(x, y): (f64, f64),
	ctx: &CanvasRenderingContext2d,
	k: f64,
	visual: NodeVisual<&HtmlImageElement>,
	grow: f64,
) -> f64 {
	let radius = visual_radius(&visual) * grow;
	match visual {
		NodeVisual::Thumbnail { image, .. } => {
			let _ = ctx.draw_image_with_html_image_element_and_dw_and_dh(
				image,
				x - radius,
				y - radius,
				radius * 2.0,
				radius * 2.0,
			);
		}
		NodeVisual::Marker { .. } => {
			ctx.begin_path();
			let _ = ctx.arc(x, y, radius, 0.0, 2.0 * PI);
			ctx.set_fill_style_str(&info.color);
			ctx.fill();
			if info.kind == NodeKind::Class {
				ctx.set_stroke_style_str("rgba(255, 255, 255, 0.8)");
				ctx.set_line_width(1.0 / k);
				ctx.stroke();
			}
		}
	}
	radius
}

fn draw_label(ctx: &CanvasRenderingContext2d, label: &str, x: f64, y: f64, radius: f64, k: f64) {
	ctx.set_font(&format!("{}px sans-serif", 10.0 / k.max(0.5)));
	let _ = ctx.fill_text(label, x + radius + 3.0, y + 3.0);
}

fn draw_nodes(state: &ForceGraphState, ctx: &CanvasRenderingContext2d, images: &ImageCache<HtmlImageElement>) {
	let (has_highlight, t, k) = (
		state.has_active_highlight(),
		ease_out_cubic(state.hover.highlight_t),
		state.transform.k,
	);

	state.graph.visit_nodes(|node| {
		let idx = node.index();
		if has_highlight && state.is_highlighted(idx) {
			return;
		}
		let info = &node.data.user_data;
		let (x, y) = (node.x() as f64, node.y() as f64);
		let alpha = 1.0 - 0.7 * t;
		ctx.set_global_alpha(alpha);
		let visual = visual_for(info, state, images);
		let radius = draw_node(info, (x, y), ctx, k, visual, 1.0 - 0.15 * t);
		ctx.set_global_alpha(1.0);

		if let Some(label) = &info.label {
			ctx.set_fill_style_str(&format!("rgba(255, 255, 255, {})", alpha * 0.8));
			draw_label(ctx, label, x, y, radius, k);
		}
	});

	if !has_highlight {
		return;
	}

	state.graph.visit_nodes(|node| {
		let idx = node.index();
		if !state.is_highlighted(idx) {
			return;
		}
		let (x, y) = (node.x() as f64, node.y() as f64);
		let is_hovered = state.is_hovered(idx);
		let is_neighbor =
			state.hover.neighbors.contains(&idx) || state.hover.prev_neighbors.contains(&idx);

		let (grow, glow_grow) = if is_hovered {
			(1.0 + 0.35 * t, 1.8 + 1.2 * t)
		} else if is_neighbor {
			(1.0 + 0.2 * t, 1.4 + 0.6 * t)
		} else {
			(1.0, 0.0)
		};

		let info = &node.data.user_data;
		let visual = visual_for(info, state, images);
		let radius = visual_radius(&visual) * grow;
		let glow_radius = visual_radius(&visual) * glow_grow;

		if glow_radius > 0.0 && t > 0.01 {
			if let Ok(gradient) = ctx.create_radial_gradient(x, y, radius * 0.3, x, y, glow_radius) {
				let alpha = if is_hovered { 0.35 * t } else { 0.2 * t };
				let _ = gradient.add_color_stop(0.0, &format!("rgba(255, 255, 255, {})", alpha));
				let _ = gradient.add_color_stop(0.6, &format!("rgba(200, 220, 255, {})", alpha * 0.3));
				let _ = gradient.add_color_stop(1.0, "rgba(255, 255, 255, 0)");
				ctx.begin_path();
				let _ = ctx.arc(x, y, glow_radius, 0.0, 2.0 * PI);
				#[allow(deprecated)]
				ctx.set_fill_style(&gradient);
				ctx.fill();
			}
		}

		draw_node(info, (x, y), ctx, k, visual, grow);

		if is_hovered && t > 0.01 {
			ctx.begin_path();
			let _ = ctx.arc(x, y, radius + 2.0 / k, 0.0, 2.0 * PI);
			ctx.set_stroke_style_str(&format!("rgba(255, 255, 255, {})", 0.7 * t));
			ctx.set_line_width(1.5 / k);
			ctx.stroke();
		}

		if let Some(label) = &info.label {
			ctx.set_fill_style_str("white");
			draw_label(ctx, label, x, y, radius, k);
		}
	});
}
