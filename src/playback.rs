use tokio::sync::broadcast;
use tokio::sync::broadcast::error::TryRecvError;


pub type TrackId = u64;


#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlayerEvent {
	Play,
	Pause,
	Finish,
}


/// The facade the viewer drives. One instance per loaded track.
pub trait PlaybackEngine {
	fn play(&mut self);
	fn pause(&mut self);

	/// Releases the loaded track. Calls after this are no-ops.
	fn destroy(&mut self);

	fn current_time(&self) -> f64;
	fn duration(&self) -> f64;
	fn is_playing(&self) -> bool;

	fn set_time(&mut self, seconds: f64);
	fn set_playback_rate(&mut self, rate: f64);

	fn subscribe(&self) -> Subscription;
}


/// Receives the events of a single track. Dropping it unsubscribes.
pub struct Subscription {
	track: TrackId,
	rx: broadcast::Receiver<(TrackId, PlayerEvent)>,
}

impl Subscription {
	pub fn new(track: TrackId, rx: broadcast::Receiver<(TrackId, PlayerEvent)>) -> Subscription {
		Subscription { track, rx }
	}

	/// Everything received since the last call, oldest first.
	pub fn drain(&mut self) -> Vec<PlayerEvent> {
		let mut events = Vec::new();

		loop {
			match self.rx.try_recv() {
				Ok((track, event)) if track == self.track => events.push(event),
				Ok(_) => {}
				Err(TryRecvError::Lagged(skipped)) => {
					log::warn!("Dropped {skipped} playback events for track {}", self.track);
				}
				Err(TryRecvError::Empty | TryRecvError::Closed) => break,
			}
		}

		events
	}
}


#[cfg(test)]
pub mod testing {
	use super::*;
	use std::cell::RefCell;
	use std::rc::Rc;

	#[derive(Debug, Default)]
	pub struct FakeState {
		pub time: f64,
		pub duration: f64,
		pub playing: bool,
		pub rate: f64,
		pub destroyed: bool,
		pub seeks: Vec<f64>,
	}

	/// In-memory engine. Time only moves when a test calls `advance`.
	pub struct FakeEngine {
		pub state: Rc<RefCell<FakeState>>,
		events: broadcast::Sender<(TrackId, PlayerEvent)>,
	}

	impl FakeEngine {
		pub fn new(duration: f64) -> FakeEngine {
			let (events, _) = broadcast::channel(64);
			let state = FakeState { duration, rate: 1.0, ..FakeState::default() };

			FakeEngine {
				state: Rc::new(RefCell::new(state)),
				events,
			}
		}

		pub fn handle(&self) -> Rc<RefCell<FakeState>> {
			self.state.clone()
		}

		pub fn emit(&self, event: PlayerEvent) {
			let _ = self.events.send((0, event));
		}
	}

	/// Moves time forward by `seconds * rate` if playing, stopping at the end like a real player.
	pub fn advance(engine: &Rc<RefCell<FakeState>>, seconds: f64) {
		let mut state = engine.borrow_mut();
		if state.playing {
			state.time = (state.time + seconds * state.rate).min(state.duration);
		}
	}

	impl PlaybackEngine for FakeEngine {
		fn play(&mut self) {
			let mut state = self.state.borrow_mut();
			if !state.destroyed && !state.playing {
				state.playing = true;
				drop(state);
				self.emit(PlayerEvent::Play);
			}
		}

		fn pause(&mut self) {
			let mut state = self.state.borrow_mut();
			if state.playing {
				state.playing = false;
				drop(state);
				self.emit(PlayerEvent::Pause);
			}
		}

		fn destroy(&mut self) {
			let mut state = self.state.borrow_mut();
			state.destroyed = true;
			state.playing = false;
		}

		fn current_time(&self) -> f64 {
			self.state.borrow().time
		}

		fn duration(&self) -> f64 {
			self.state.borrow().duration
		}

		fn is_playing(&self) -> bool {
			self.state.borrow().playing
		}

		fn set_time(&mut self, seconds: f64) {
			let mut state = self.state.borrow_mut();
			state.time = seconds.clamp(0.0, state.duration);
			state.seeks.push(seconds);
		}

		fn set_playback_rate(&mut self, rate: f64) {
			self.state.borrow_mut().rate = rate;
		}

		fn subscribe(&self) -> Subscription {
			Subscription::new(0, self.events.subscribe())
		}
	}
}
