/// Optional loop region in seconds. Whenever both bounds are set, `end > start`.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RegionSelection {
	start: Option<f64>,
	end: Option<f64>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum BoundaryAction {
	Continue,
	LoopTo(f64),
	Stop,
}


impl RegionSelection {
	pub fn start(&self) -> Option<f64> {
		self.start
	}

	pub fn end(&self) -> Option<f64> {
		self.end
	}

	pub fn bounds(&self) -> Option<(f64, f64)> {
		self.start.zip(self.end)
	}

	pub fn set_start(&mut self, now: f64) {
		self.start = Some(now);

		if matches!(self.end, Some(end) if end <= now) {
			self.end = None;
		}
	}

	/// Returns false and leaves the region untouched if `now` is not after the start.
	pub fn set_end(&mut self, now: f64) -> bool {
		if matches!(self.start, Some(start) if now <= start) {
			return false;
		}

		self.end = Some(now);
		true
	}

	pub fn clear(&mut self) {
		self.start = None;
		self.end = None;
	}

	/// Where looped playback restarts: the region start for a complete region, else zero.
	pub fn restart_point(&self) -> f64 {
		self.bounds().map_or(0.0, |(start, _)| start)
	}

	pub fn check(&self, current: f64, duration: f64, looping: bool) -> BoundaryAction {
		let boundary = self.bounds().map_or(duration, |(_, end)| end);

		if current < boundary {
			BoundaryAction::Continue
		} else if looping {
			BoundaryAction::LoopTo(self.restart_point())
		} else {
			BoundaryAction::Stop
		}
	}
}
