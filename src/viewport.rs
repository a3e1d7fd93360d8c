use std::ops::{Range, RangeInclusive};


#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BarGeometry {
	pub width: f32,
	pub gap: f32,
}

impl BarGeometry {
	pub fn pitch(&self, zoom: f32) -> f32 {
		(self.width + self.gap) * zoom
	}
}


#[derive(Clone, Copy, Debug, PartialEq)]
struct ViewportState {
	scroll_offset: f32,
	zoom: f32,
}


/// Pixel measurements for one frame, derived from the viewport and the loaded series.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WaveLayout {
	pub pitch: f32,
	pub bar_width: f32,
	pub total_width: f32,
	pub canvas_width: f32,
}

impl WaveLayout {
	pub fn half_width(&self) -> f32 {
		self.canvas_width / 2.0
	}

	pub fn clamp_scroll(&self, scroll: f32) -> f32 {
		let half = self.half_width();
		scroll.max(-half).min(self.total_width - half)
	}

	pub fn max_scroll(&self) -> f32 {
		self.total_width - self.half_width()
	}

	/// Flat index range of `[max, min]` pairs that can intersect the canvas.
	pub fn visible_range(&self, scroll: f32, series_len: usize) -> Range<usize> {
		if self.pitch <= 0.0 {
			return 0..0;
		}

		let bars_in_view = (self.canvas_width / self.pitch).ceil().max(0.0) as usize + 2;

		let first_bar = ((scroll - self.pitch) / self.pitch).floor().max(0.0) as usize;
		let start = (first_bar * 2).min(series_len);
		let end = (start + (bars_in_view + 2) * 2).min(series_len);

		start..end
	}

	/// Canvas-relative x of the bar for flat index `index`.
	pub fn bar_x(&self, index: usize, scroll: f32) -> f32 {
		(index / 2) as f32 * self.pitch - scroll
	}

	pub fn time_to_x(&self, time: f64, duration: f64, scroll: f32) -> f32 {
		if duration <= 0.0 {
			return -scroll;
		}

		(time / duration) as f32 * self.total_width - scroll
	}

	pub fn pixels_per_second(&self, duration: f64) -> f64 {
		if duration <= 0.0 {
			return 0.0;
		}

		self.total_width as f64 / duration
	}
}


pub struct Viewport {
	state: ViewportState,
	geometry: BarGeometry,
	zoom_range: RangeInclusive<f32>,
	num_buckets: usize,
	canvas_width: f32,
}


impl Viewport {
	pub fn new(geometry: BarGeometry, zoom_range: RangeInclusive<f32>, zoom: f32, num_buckets: usize) -> Viewport {
		let zoom = zoom.clamp(*zoom_range.start(), *zoom_range.end());

		Viewport {
			state: ViewportState {
				scroll_offset: 0.0,
				zoom,
			},
			geometry,
			zoom_range,
			num_buckets,
			canvas_width: 0.0,
		}
	}

	pub fn scroll(&self) -> f32 {
		self.state.scroll_offset
	}

	pub fn zoom(&self) -> f32 {
		self.state.zoom
	}

	pub fn zoom_range(&self) -> RangeInclusive<f32> {
		self.zoom_range.clone()
	}

	pub fn layout(&self) -> WaveLayout {
		let pitch = self.geometry.pitch(self.state.zoom);

		WaveLayout {
			pitch,
			bar_width: self.geometry.width * self.state.zoom,
			total_width: self.num_buckets as f32 * pitch,
			canvas_width: self.canvas_width,
		}
	}

	/// Position of the canvas center along the whole waveform, in `[0, 1]`.
	pub fn center_progress(&self) -> f64 {
		let layout = self.layout();
		if layout.total_width <= 0.0 {
			return 0.0;
		}

		let center = self.state.scroll_offset as f64 + layout.half_width() as f64;
		(center / layout.total_width as f64).clamp(0.0, 1.0)
	}

	pub fn time_at_center(&self, duration: f64) -> f64 {
		self.center_progress() * duration
	}

	pub fn set_scroll(&mut self, scroll: f32) {
		self.state.scroll_offset = self.layout().clamp_scroll(scroll);
	}

	/// Called on every paint. The waveform position under the center is kept across resizes.
	pub fn set_canvas_width(&mut self, width: f32) {
		if width == self.canvas_width {
			return;
		}

		let progress = self.center_progress();
		self.canvas_width = width.max(0.0);
		self.scroll_to_progress(progress);
	}

	/// Changes zoom without moving the time under the canvas center.
	pub fn set_zoom(&mut self, zoom: f32) {
		let progress = self.center_progress();
		self.state.zoom = zoom.clamp(*self.zoom_range.start(), *self.zoom_range.end());
		self.scroll_to_progress(progress);
	}

	pub fn center_on(&mut self, time: f64, duration: f64) {
		let progress = if duration > 0.0 { (time / duration).clamp(0.0, 1.0) } else { 0.0 };
		self.scroll_to_progress(progress);
	}

	pub fn scroll_to_end(&mut self) {
		self.state.scroll_offset = self.layout().max_scroll();
	}

	fn scroll_to_progress(&mut self, progress: f64) {
		let layout = self.layout();
		let target = (progress * layout.total_width as f64) as f32 - layout.half_width();
		self.state.scroll_offset = layout.clamp_scroll(target);
	}
}


#[cfg(test)]
mod tests {
	use super::*;

	const GEOMETRY: BarGeometry = BarGeometry { width: 6.0, gap: 1.0 };

	fn viewport(num_buckets: usize, width: f32) -> Viewport {
		let mut viewport = Viewport::new(GEOMETRY, 0.2..=2.0, 0.8, num_buckets);
		viewport.set_canvas_width(width);
		viewport
	}

	#[test]
	fn first_paint_centers_the_start() {
		let viewport = viewport(100, 400.0);
		assert_eq!(viewport.scroll(), -200.0);
		assert_eq!(viewport.time_at_center(50.0), 0.0);
	}

	#[test]
	fn visible_range_is_bounded_by_canvas_not_series() {
		for &num_buckets in &[10usize, 1_000, 100_000, 10_000_000] {
			let mut viewport = viewport(num_buckets, 800.0);
			viewport.center_on(0.5, 1.0);

			let layout = viewport.layout();
			let series_len = num_buckets * 2;
			let range = viewport.layout().visible_range(viewport.scroll(), series_len);

			assert!(range.start <= range.end);
			assert!(range.end <= series_len);

			let max_bars = (layout.canvas_width / layout.pitch).ceil() as usize + 4;
			assert!(range.len() <= max_bars * 2, "{} buckets drew {} values", num_buckets, range.len());
		}
	}

	#[test]
	fn visible_range_covers_every_bar_on_canvas() {
		let mut viewport = viewport(10_000, 640.0);
		viewport.set_scroll(12_345.0);

		let layout = viewport.layout();
		let range = layout.visible_range(viewport.scroll(), 20_000);

		assert!(layout.bar_x(range.start, viewport.scroll()) + layout.bar_width <= 0.0);
		assert!(layout.bar_x(range.end - 2, viewport.scroll()) >= layout.canvas_width);
	}

	#[test]
	fn scroll_is_clamped_to_half_canvas_overhang() {
		let mut viewport = viewport(100, 400.0);
		let total = viewport.layout().total_width;

		viewport.set_scroll(-10_000.0);
		assert_eq!(viewport.scroll(), -200.0);

		viewport.set_scroll(10_000.0);
		assert_eq!(viewport.scroll(), total - 200.0);
	}

	#[test]
	fn zoom_keeps_center_time() {
		let duration = 120.0;
		let mut viewport = viewport(240, 500.0);

		for &(time, zoom) in &[(0.0, 2.0), (37.5, 0.2), (61.0, 1.3), (120.0, 0.5), (90.25, 2.0)] {
			viewport.center_on(time, duration);
			let before = viewport.time_at_center(duration);

			viewport.set_zoom(zoom);
			let after = viewport.time_at_center(duration);

			assert!((before - after).abs() < 1e-3, "{before} != {after} at zoom {zoom}");
			assert!((after - time).abs() < 1e-3);
		}
	}

	#[test]
	fn zoom_is_clamped() {
		let mut viewport = viewport(10, 100.0);
		viewport.set_zoom(50.0);
		assert_eq!(viewport.zoom(), 2.0);
		viewport.set_zoom(0.0);
		assert_eq!(viewport.zoom(), 0.2);
	}

	#[test]
	fn resize_keeps_center_time() {
		let mut viewport = viewport(200, 300.0);
		viewport.center_on(40.0, 100.0);

		viewport.set_canvas_width(900.0);
		assert!((viewport.time_at_center(100.0) - 40.0).abs() < 1e-3);
	}
}
