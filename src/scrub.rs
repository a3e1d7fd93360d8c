use crate::frame::FrameTask;
use crate::playback::PlaybackEngine;
use crate::viewport::Viewport;


/// A pair of constants, one used below zoom 1.0 and one at or above it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Banded<T> {
	pub coarse: T,
	pub fine: T,
}

impl<T: Copy> Banded<T> {
	pub fn at(&self, zoom: f32) -> T {
		if zoom < 1.0 { self.coarse } else { self.fine }
	}
}


#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SmoothingProfile {
	pub step_factor: Banded<f64>,
	pub time_threshold: Banded<f64>,
	pub scroll_threshold: Banded<f64>,
	pub frame_delay_ms: Banded<f64>,
	pub min_change_mouse: Banded<f64>,
	pub min_change_touch: Banded<f64>,
}

impl SmoothingProfile {
	pub fn responsive() -> SmoothingProfile {
		SmoothingProfile {
			step_factor: Banded { coarse: 0.4, fine: 0.3 },
			time_threshold: Banded { coarse: 0.01, fine: 0.005 },
			scroll_threshold: Banded { coarse: 1.0, fine: 0.5 },
			frame_delay_ms: Banded { coarse: 24.0, fine: 16.0 },
			min_change_mouse: Banded { coarse: 0.2, fine: 0.05 },
			min_change_touch: Banded { coarse: 0.1, fine: 0.02 },
		}
	}

	pub fn gentle() -> SmoothingProfile {
		SmoothingProfile {
			step_factor: Banded { coarse: 0.2, fine: 0.15 },
			..SmoothingProfile::responsive()
		}
	}
}


#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointerKind {
	Mouse,
	Touch,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SeekTarget {
	pub time: f64,
	pub scroll: f32,
}


#[derive(Debug)]
struct DragState {
	pointer: PointerKind,
	last_x: f32,
	was_playing: bool,
	moved: bool,
}


pub struct ScrubController {
	profile: SmoothingProfile,
	sensitivity: f32,

	drag: Option<DragState>,
	last_update_ms: Option<f64>,
	smoothing: FrameTask<SeekTarget>,
}


impl ScrubController {
	pub fn new(profile: SmoothingProfile, sensitivity: f32) -> ScrubController {
		ScrubController {
			profile,
			sensitivity,

			drag: None,
			last_update_ms: None,
			smoothing: FrameTask::idle(),
		}
	}

	pub fn is_dragging(&self) -> bool {
		self.drag.is_some()
	}

	pub fn is_smoothing(&self) -> bool {
		self.smoothing.is_scheduled()
	}

	pub fn target(&self) -> Option<SeekTarget> {
		self.smoothing.pending().copied()
	}

	pub fn cancel(&mut self) {
		self.smoothing.cancel();
	}

	pub fn drag_start(&mut self, engine: &mut impl PlaybackEngine, x: f32, pointer: PointerKind) {
		let was_playing = engine.is_playing();
		if was_playing {
			engine.pause();
		}

		self.smoothing.cancel();
		self.drag = Some(DragState {
			pointer,
			last_x: x,
			was_playing,
			moved: false,
		});
	}

	pub fn drag_move(&mut self, engine: &mut impl PlaybackEngine, viewport: &mut Viewport, x: f32, now_ms: f64) {
		let Some(drag) = self.drag.as_mut() else {
			return
		};

		drag.moved = true;

		let zoom = viewport.zoom();
		let frame_delay = self.profile.frame_delay_ms.at(zoom);
		if matches!(self.last_update_ms, Some(last) if now_ms - last < frame_delay) {
			return;
		}
		self.last_update_ms = Some(now_ms);

		let delta = x - drag.last_x;
		drag.last_x = x;

		let min_change = match drag.pointer {
			PointerKind::Mouse => self.profile.min_change_mouse.at(zoom),
			PointerKind::Touch => self.profile.min_change_touch.at(zoom),
		};

		let duration = engine.duration();
		let layout = viewport.layout();
		let pixels_per_second = layout.pixels_per_second(duration);
		if pixels_per_second <= 0.0 {
			return;
		}

		let current_scroll = viewport.scroll();
		let target_scroll = layout.clamp_scroll(current_scroll - delta * self.sensitivity);
		let target_time = ((target_scroll + layout.half_width()) as f64 / pixels_per_second).clamp(0.0, duration);
		let target = SeekTarget { time: target_time, scroll: target_scroll };

		self.smoothing.cancel();

		let current_time = engine.current_time();
		let time_gap = (target.time - current_time).abs();
		let scroll_gap = (target.scroll - current_scroll).abs() as f64;

		if time_gap > min_change || scroll_gap > min_change {
			if self.smooth_step(engine, viewport, target) {
				self.smoothing.schedule(target);
			}
		} else {
			engine.set_time(target.time);
			viewport.set_scroll(target.scroll);
		}
	}

	/// Ends the drag. Returns true if playback was resumed.
	pub fn drag_release(&mut self, engine: &mut impl PlaybackEngine) -> bool {
		let Some(drag) = self.drag.take() else {
			return false
		};

		if drag.moved && drag.was_playing {
			engine.play();
			return true;
		}

		false
	}

	/// Advances an in-flight smoothing animation by one frame.
	pub fn frame(&mut self, engine: &mut impl PlaybackEngine, viewport: &mut Viewport) {
		if let Some(target) = self.smoothing.pending().copied() {
			if !self.smooth_step(engine, viewport, target) {
				self.smoothing.cancel();
			}
		}
	}

	/// Moves a fraction of the remaining gap toward `target`, or snaps onto it once the step
	/// is too small to matter. Returns true while more steps are needed.
	fn smooth_step(&self, engine: &mut impl PlaybackEngine, viewport: &mut Viewport, target: SeekTarget) -> bool {
		let zoom = viewport.zoom();
		let factor = self.profile.step_factor.at(zoom);

		let current_time = engine.current_time();
		let current_scroll = viewport.scroll();

		let time_step = (target.time - current_time) * factor;
		let scroll_step = (target.scroll - current_scroll) as f64 * factor;

		if time_step.abs() < self.profile.time_threshold.at(zoom)
			&& scroll_step.abs() < self.profile.scroll_threshold.at(zoom)
		{
			engine.set_time(target.time);
			viewport.set_scroll(target.scroll);
			return false;
		}

		engine.set_time(current_time + time_step);
		viewport.set_scroll(current_scroll + scroll_step as f32);
		true
	}
}


#[cfg(test)]
mod tests {
	use super::*;
	use crate::playback::testing::FakeEngine;
	use crate::viewport::BarGeometry;
	use rand::prelude::*;

	const DURATION: f64 = 60.0;

	fn setup(zoom: f32) -> (FakeEngine, Viewport, ScrubController) {
		let engine = FakeEngine::new(DURATION);
		let mut viewport = Viewport::new(BarGeometry { width: 6.0, gap: 1.0 }, 0.2..=2.0, zoom, 120);
		viewport.set_canvas_width(400.0);

		(engine, viewport, ScrubController::new(SmoothingProfile::responsive(), 1.0))
	}

	#[test]
	fn drag_pauses_and_resumes_only_after_movement() {
		let (mut engine, mut viewport, mut scrub) = setup(0.8);
		engine.play();

		scrub.drag_start(&mut engine, 100.0, PointerKind::Mouse);
		assert!(!engine.is_playing());
		assert!(!scrub.drag_release(&mut engine));
		assert!(!engine.is_playing());

		engine.play();
		scrub.drag_start(&mut engine, 100.0, PointerKind::Mouse);
		scrub.drag_move(&mut engine, &mut viewport, 80.0, 1000.0);
		assert!(scrub.drag_release(&mut engine));
		assert!(engine.is_playing());
	}

	#[test]
	fn drag_does_not_start_playback_that_was_paused() {
		let (mut engine, mut viewport, mut scrub) = setup(0.8);

		scrub.drag_start(&mut engine, 100.0, PointerKind::Mouse);
		scrub.drag_move(&mut engine, &mut viewport, 50.0, 1000.0);
		assert!(!scrub.drag_release(&mut engine));
		assert!(!engine.is_playing());
	}

	#[test]
	fn dragging_left_moves_time_forward() {
		let (mut engine, mut viewport, mut scrub) = setup(1.0);
		let start_scroll = viewport.scroll();

		scrub.drag_start(&mut engine, 300.0, PointerKind::Mouse);
		scrub.drag_move(&mut engine, &mut viewport, 230.0, 1000.0);
		while scrub.is_smoothing() {
			scrub.frame(&mut engine, &mut viewport);
		}

		// 14px per second at zoom 1
		assert_eq!(viewport.scroll(), start_scroll + 70.0);
		assert!((engine.current_time() - 5.0).abs() < 1e-6);
	}

	#[test]
	fn targets_are_clamped_to_track() {
		let (mut engine, mut viewport, mut scrub) = setup(1.0);
		let layout = viewport.layout();

		scrub.drag_start(&mut engine, 0.0, PointerKind::Mouse);
		scrub.drag_move(&mut engine, &mut viewport, 50_000.0, 1000.0);
		while scrub.is_smoothing() {
			scrub.frame(&mut engine, &mut viewport);
		}
		assert_eq!(viewport.scroll(), -layout.half_width());
		assert_eq!(engine.current_time(), 0.0);

		scrub.drag_move(&mut engine, &mut viewport, -50_000.0, 2000.0);
		while scrub.is_smoothing() {
			scrub.frame(&mut engine, &mut viewport);
		}
		assert_eq!(viewport.scroll(), layout.max_scroll());
		assert!((engine.current_time() - DURATION).abs() < 1e-6);
	}

	#[test]
	fn moves_inside_frame_delay_are_dropped() {
		let (mut engine, mut viewport, mut scrub) = setup(0.5);

		scrub.drag_start(&mut engine, 200.0, PointerKind::Mouse);
		scrub.drag_move(&mut engine, &mut viewport, 190.0, 1000.0);
		let scroll = viewport.scroll();
		assert_eq!(scrub.target().map(|t| t.scroll), Some(-190.0));

		// coarse zoom uses a 24ms delay
		scrub.drag_move(&mut engine, &mut viewport, 100.0, 1020.0);
		assert_eq!(viewport.scroll(), scroll);
		assert_eq!(scrub.target().map(|t| t.scroll), Some(-190.0));

		scrub.drag_move(&mut engine, &mut viewport, 100.0, 1030.0);
		assert_eq!(scrub.target().map(|t| t.scroll), Some(scroll + 90.0));
	}

	#[test]
	fn small_moves_apply_directly() {
		let (mut engine, mut viewport, mut scrub) = setup(1.5);
		engine.set_time(10.0);
		viewport.center_on(10.0, DURATION);
		let scroll = viewport.scroll();

		scrub.drag_start(&mut engine, 200.0, PointerKind::Mouse);
		scrub.drag_move(&mut engine, &mut viewport, 199.99, 1000.0);

		assert!(!scrub.is_smoothing());
		assert!((viewport.scroll() - (scroll + 0.01)).abs() < 1e-3);
	}

	#[test]
	fn new_drag_cancels_smoothing() {
		let (mut engine, mut viewport, mut scrub) = setup(1.0);

		scrub.drag_start(&mut engine, 300.0, PointerKind::Touch);
		scrub.drag_move(&mut engine, &mut viewport, 100.0, 1000.0);
		assert!(scrub.is_smoothing());

		scrub.drag_release(&mut engine);
		assert!(scrub.is_smoothing());

		scrub.drag_start(&mut engine, 10.0, PointerKind::Mouse);
		assert!(!scrub.is_smoothing());
	}

	#[test]
	fn smoothing_converges_in_bounded_frames() {
		let mut rng = StdRng::seed_from_u64(11);

		for _ in 0..200 {
			let zoom = rng.gen_range(0.2f32..=2.0);
			let (mut engine, mut viewport, mut scrub) = setup(zoom);
			engine.set_time(rng.gen_range(0.0..DURATION));
			viewport.set_scroll(rng.gen_range(-200.0..1500.0));

			let x0 = rng.gen_range(-2000.0f32..2000.0);
			let x1 = rng.gen_range(-2000.0f32..2000.0);

			scrub.drag_start(&mut engine, x0, PointerKind::Mouse);
			scrub.drag_move(&mut engine, &mut viewport, x1, 1000.0);

			let mut frames = 0;
			while scrub.is_smoothing() {
				let target = scrub.target().unwrap();
				scrub.frame(&mut engine, &mut viewport);
				frames += 1;
				assert!(frames < 100, "no convergence toward {target:?}");
			}
		}
	}
}
