use egui::{Color32, Pos2, Rect, Stroke};

use crate::config::RenderStyle;
use crate::peaks::PeakSeries;
use crate::region::RegionSelection;
use crate::viewport::{Viewport, WaveLayout};


pub const WAVEFORM_HEIGHT: f32 = 120.0;

const HEIGHT_FILL: f32 = 0.8;
const MARKER_WIDTH: f32 = 2.0;
const ARROW_SIZE: f32 = 8.0;

const BACKGROUND: Color32 = Color32::from_rgb(31, 41, 55);
const WAVE_TOP: Color32 = Color32::from_rgb(64, 192, 255);
const WAVE_BOTTOM: Color32 = Color32::from_rgb(32, 128, 255);
const REGION_MARKER: Color32 = Color32::from_rgb(255, 128, 0);
const REGION_FILL: Color32 = Color32::from_rgba_premultiplied(51, 26, 0, 51);
const PLAYHEAD: Color32 = Color32::WHITE;


/// Scrolling waveform with a fixed playhead in the middle.
///
/// The returned response carries the drag interactions; the caller turns them into scrubbing.
pub struct WaveformView<'a> {
	pub style: RenderStyle,
	pub peaks: &'a PeakSeries,
	pub viewport: &'a mut Viewport,
	pub region: RegionSelection,
	pub duration: f64,
}


#[derive(Clone, Debug, PartialEq)]
pub struct Bar {
	pub left: f32,
	pub right: f32,
	pub top: f32,
	pub bottom: f32,
}

#[derive(Clone, Debug, PartialEq)]
pub enum WaveShape {
	Bars(Vec<Bar>),
	/// Upper envelope left to right, then the lower envelope back.
	Outline(Vec<Pos2>),
}

#[derive(Clone, Debug, PartialEq)]
pub struct RegionOverlay {
	pub start_x: f32,
	pub end_x: Option<f32>,
}

/// Everything one repaint draws, in screen coordinates.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderPlan {
	pub wave: WaveShape,
	pub region: Option<RegionOverlay>,
	pub playhead_x: f32,
}


impl egui::Widget for WaveformView<'_> {
	fn ui(self, ui: &mut egui::Ui) -> egui::Response {
		let desired_size = egui::vec2(ui.available_width(), WAVEFORM_HEIGHT);
		let (response, mut painter) = ui.allocate_painter(desired_size, egui::Sense::click_and_drag());
		let rect = response.rect;
		painter.set_clip_rect(rect);

		self.viewport.set_canvas_width(rect.width());

		let layout = self.viewport.layout();
		let pixels_per_point = ui.ctx().pixels_per_point();
		let plan = build_plan(self.peaks, &layout, self.viewport.scroll(), rect, self.style,
			self.region, self.duration, pixels_per_point);

		painter.rect(rect, 8.0, BACKGROUND, Stroke::NONE);
		paint(&painter, rect, &plan);

		response
	}
}


pub fn build_plan(peaks: &PeakSeries, layout: &WaveLayout, scroll: f32, rect: Rect, style: RenderStyle,
	region: RegionSelection, duration: f64, pixels_per_point: f32) -> RenderPlan
{
	let range = layout.visible_range(scroll, peaks.len());
	let values = peaks.values();

	let center_y = rect.center().y;
	let half_height = rect.height() * HEIGHT_FILL / 2.0;
	let snap = |x: f32| (x * pixels_per_point).round() / pixels_per_point;

	let wave = match style {
		RenderStyle::Bars => {
			let min_width = 1.0 / pixels_per_point;

			let bars = range.step_by(2)
				.map(|index| {
					let amplitude = values[index].abs().max(values[index + 1].abs());
					let x = rect.min.x + layout.bar_x(index, scroll);

					let left = snap(x);
					let right = snap(x + layout.bar_width).max(left + min_width);

					Bar {
						left,
						right,
						top: center_y - amplitude * half_height,
						bottom: center_y + amplitude * half_height,
					}
				})
				.collect();

			WaveShape::Bars(bars)
		}

		RenderStyle::Line => {
			let mid_x = |index: usize| rect.min.x + layout.bar_x(index, scroll) + layout.bar_width / 2.0;

			let upper = range.clone().step_by(2)
				.map(|index| Pos2::new(mid_x(index), center_y - values[index] * half_height));
			let lower = range.step_by(2).rev()
				.map(|index| Pos2::new(mid_x(index), center_y - values[index + 1] * half_height));

			WaveShape::Outline(upper.chain(lower).collect())
		}
	};

	let region = region.start().map(|start| RegionOverlay {
		start_x: rect.min.x + layout.time_to_x(start, duration, scroll),
		end_x: region.end().map(|end| rect.min.x + layout.time_to_x(end, duration, scroll)),
	});

	RenderPlan {
		wave,
		region,
		playhead_x: snap(rect.center().x),
	}
}


fn paint(painter: &egui::Painter, rect: Rect, plan: &RenderPlan) {
	match &plan.wave {
		WaveShape::Bars(bars) => {
			let mut mesh = egui::Mesh::default();

			for bar in bars {
				let top_color = gradient_at(rect, bar.top);
				let bottom_color = gradient_at(rect, bar.bottom);

				let base = mesh.vertices.len() as u32;
				mesh.colored_vertex(Pos2::new(bar.left, bar.top), top_color);
				mesh.colored_vertex(Pos2::new(bar.right, bar.top), top_color);
				mesh.colored_vertex(Pos2::new(bar.right, bar.bottom), bottom_color);
				mesh.colored_vertex(Pos2::new(bar.left, bar.bottom), bottom_color);
				mesh.add_triangle(base, base + 1, base + 2);
				mesh.add_triangle(base, base + 2, base + 3);
			}

			painter.add(egui::Shape::mesh(mesh));
		}

		WaveShape::Outline(points) => {
			if points.len() > 1 {
				painter.add(egui::Shape::closed_line(points.clone(), Stroke::new(1.5, WAVE_TOP)));
			}
		}
	}

	if let Some(region) = &plan.region {
		if let Some(end_x) = region.end_x {
			let fill = Rect::from_x_y_ranges(region.start_x..=end_x, rect.y_range());
			painter.rect_filled(fill, 0.0, REGION_FILL);
			painter.rect_filled(marker(rect, end_x, MARKER_WIDTH), 0.0, REGION_MARKER);
		}

		painter.rect_filled(marker(rect, region.start_x, MARKER_WIDTH), 0.0, REGION_MARKER);
	}

	let x = plan.playhead_x;
	painter.rect_filled(marker(rect, x, MARKER_WIDTH), 0.0, PLAYHEAD);
	painter.add(egui::Shape::convex_polygon(
		vec![
			Pos2::new(x - ARROW_SIZE, rect.min.y),
			Pos2::new(x + ARROW_SIZE, rect.min.y),
			Pos2::new(x, rect.min.y + ARROW_SIZE),
		],
		PLAYHEAD,
		Stroke::NONE,
	));
}


fn marker(rect: Rect, x: f32, width: f32) -> Rect {
	Rect::from_x_y_ranges((x - width / 2.0)..=(x + width / 2.0), rect.y_range())
}

fn gradient_at(rect: Rect, y: f32) -> Color32 {
	let t = ((y - rect.min.y) / rect.height()).clamp(0.0, 1.0);
	let lerp = |a: u8, b: u8| (a as f32 + (b as f32 - a as f32) * t).round() as u8;

	Color32::from_rgb(
		lerp(WAVE_TOP.r(), WAVE_BOTTOM.r()),
		lerp(WAVE_TOP.g(), WAVE_BOTTOM.g()),
		lerp(WAVE_TOP.b(), WAVE_BOTTOM.b()),
	)
}
