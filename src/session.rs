use crate::config::{RenderStyle, ViewerConfig};
use crate::frame::FrameTask;
use crate::peaks::PeakSeries;
use crate::playback::{PlaybackEngine, PlayerEvent, Subscription};
use crate::region::{BoundaryAction, RegionSelection};
use crate::scrub::{PointerKind, ScrubController};
use crate::tempo::Tempo;
use crate::view::WaveformView;
use crate::viewport::{BarGeometry, Viewport};


#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
	Loaded,
	Playing,
	Paused,
}


/// One loaded file and everything the viewer tracks about it.
pub struct ViewerSession<E: PlaybackEngine> {
	name: String,
	engine: E,
	events: Subscription,

	peaks: PeakSeries,
	viewport: Viewport,
	region: RegionSelection,
	scrub: ScrubController,
	tempo: Tempo,

	looping: bool,
	state: SessionState,
	sync: FrameTask<()>,
	default_zoom: f32,
}


impl<E: PlaybackEngine> ViewerSession<E> {
	pub fn new(name: String, engine: E, peaks: PeakSeries, config: &ViewerConfig) -> ViewerSession<E> {
		let geometry = BarGeometry { width: config.bar_width, gap: config.bar_gap };
		let viewport = Viewport::new(geometry, config.zoom_min..=config.zoom_max, config.zoom_default, peaks.num_buckets());
		let events = engine.subscribe();

		ViewerSession {
			name,
			engine,
			events,

			peaks,
			viewport,
			region: RegionSelection::default(),
			scrub: ScrubController::new(config.smoothing.profile(), config.drag_sensitivity),
			tempo: Tempo::default(),

			looping: config.loop_by_default,
			state: SessionState::Loaded,
			sync: FrameTask::idle(),
			default_zoom: config.zoom_default,
		}
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn state(&self) -> SessionState {
		self.state
	}

	pub fn is_playing(&self) -> bool {
		self.state == SessionState::Playing
	}

	pub fn current_time(&self) -> f64 {
		self.engine.current_time()
	}

	pub fn is_scrubbing(&self) -> bool {
		self.scrub.is_dragging() || self.scrub.is_smoothing()
	}

	/// Time under the playhead. While scrubbing this runs ahead of the engine position.
	pub fn display_time(&self) -> f64 {
		if self.is_scrubbing() {
			self.viewport.time_at_center(self.engine.duration())
		} else {
			self.engine.current_time()
		}
	}

	pub fn duration(&self) -> f64 {
		self.engine.duration()
	}

	pub fn region(&self) -> RegionSelection {
		self.region
	}

	pub fn tempo(&self) -> Tempo {
		self.tempo
	}

	pub fn looping(&self) -> bool {
		self.looping
	}

	pub fn viewport(&self) -> &Viewport {
		&self.viewport
	}

	pub fn zoom_label(&self) -> String {
		format!("{:.1}x", self.viewport.zoom() / self.default_zoom)
	}

	pub fn waveform_view(&mut self, style: RenderStyle) -> WaveformView<'_> {
		WaveformView {
			style,
			peaks: &self.peaks,
			viewport: &mut self.viewport,
			region: self.region,
			duration: self.engine.duration(),
		}
	}

	/// Per-frame work: engine events, the smoothing step and the playback sync tick.
	pub fn frame(&mut self) {
		for event in self.events.drain() {
			self.handle_event(event);
		}

		self.scrub.frame(&mut self.engine, &mut self.viewport);

		if self.sync.is_scheduled() {
			self.playback_tick();
		}
	}

	pub fn toggle_play(&mut self) {
		if self.engine.is_playing() {
			self.engine.pause();
			self.on_paused();
			return;
		}

		if let Some(start) = self.region.start() {
			self.engine.set_time(start);
		}

		self.engine.play();
		self.on_playing();
	}

	pub fn skip_back(&mut self) {
		let target = self.region.start().unwrap_or(0.0);

		self.engine.set_time(target);
		self.viewport.center_on(target, self.engine.duration());

		self.engine.play();
		self.on_playing();
	}

	pub fn set_region_start(&mut self) {
		let now = self.engine.current_time();
		self.region.set_start(now);
		log::debug!("Region start set to {now:.3}s");
	}

	pub fn set_region_end(&mut self) {
		let now = self.engine.current_time();

		if self.region.set_end(now) {
			log::debug!("Region end set to {now:.3}s");

			if self.engine.is_playing() {
				self.engine.pause();
				self.on_paused();
			}
		}
	}

	pub fn clear_region(&mut self) {
		self.region.clear();
		log::debug!("Region cleared");
	}

	pub fn set_loop(&mut self, looping: bool) {
		if self.engine.is_playing() {
			self.engine.pause();
			self.on_paused();
		}

		self.looping = looping;
	}

	pub fn tempo_increase(&mut self) {
		let rate = self.tempo.increase();
		self.engine.set_playback_rate(rate);
		log::debug!("Tempo {}", self.tempo.label());
	}

	pub fn tempo_decrease(&mut self) {
		let rate = self.tempo.decrease();
		self.engine.set_playback_rate(rate);
		log::debug!("Tempo {}", self.tempo.label());
	}

	pub fn tempo_reset(&mut self) {
		let rate = self.tempo.reset();
		self.engine.set_playback_rate(rate);
		log::debug!("Tempo {}", self.tempo.label());
	}

	/// A smoothing animation in flight targets a scroll offset for the old zoom, so it is
	/// finished on the spot and the view recentred on its target time.
	pub fn set_zoom(&mut self, zoom: f32) {
		let pending = self.scrub.target();
		self.scrub.cancel();
		self.viewport.set_zoom(zoom);

		if let Some(target) = pending {
			self.engine.set_time(target.time);
			self.viewport.center_on(target.time, self.engine.duration());
		}
	}

	pub fn drag_start(&mut self, x: f32, pointer: PointerKind) {
		let was_playing = self.engine.is_playing();
		self.scrub.drag_start(&mut self.engine, x, pointer);

		if was_playing {
			self.on_paused();
		}
	}

	pub fn drag_move(&mut self, x: f32, now_ms: f64) {
		self.scrub.drag_move(&mut self.engine, &mut self.viewport, x, now_ms);
	}

	pub fn drag_release(&mut self) {
		if self.scrub.drag_release(&mut self.engine) {
			self.on_playing();
		}
	}

	fn handle_event(&mut self, event: PlayerEvent) {
		match event {
			PlayerEvent::Play => self.on_playing(),
			PlayerEvent::Pause => self.on_paused(),
			PlayerEvent::Finish => {
				self.on_paused();
				self.viewport.scroll_to_end();

				if self.looping {
					self.engine.set_time(self.region.restart_point());
					self.engine.play();
					self.on_playing();
				}
			}
		}
	}

	fn on_playing(&mut self) {
		if self.engine.is_playing() {
			self.state = SessionState::Playing;
			self.sync.schedule(());
		}
	}

	fn on_paused(&mut self) {
		if !self.engine.is_playing() {
			self.state = SessionState::Paused;
			self.sync.cancel();
		}
	}

	fn playback_tick(&mut self) {
		let duration = self.engine.duration();
		let current = self.engine.current_time();

		match self.region.check(current, duration, self.looping) {
			BoundaryAction::Continue => {}
			BoundaryAction::LoopTo(time) => {
				self.engine.set_time(time);
				self.engine.play();
			}
			BoundaryAction::Stop => {
				self.engine.pause();
				self.on_paused();
				return;
			}
		}

		self.viewport.center_on(self.engine.current_time(), duration);
	}
}

impl<E: PlaybackEngine> Drop for ViewerSession<E> {
	fn drop(&mut self) {
		self.sync.cancel();
		self.scrub.cancel();
		self.engine.destroy();
	}
}
