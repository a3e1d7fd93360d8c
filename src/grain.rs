use std::f32::consts::PI;


pub const GRAIN_SIZE: usize = 2048;
pub const OVERLAP_RATIO: f32 = 0.5;


/// Overlap-add grain player.
///
/// Every `hop` output frames a Hann-windowed grain is read from the source at its own
/// pitch, starting wherever the caller's read position has got to. Moving that position
/// at a rate other than 1 changes tempo without changing pitch.
///
/// The accumulator outlives a single output callback, so grains are always complete.
pub struct GrainShifter {
	window: Vec<f32>,
	hop: usize,

	accumulator: Vec<[f32; 2]>,
	cursor: usize,
}

impl GrainShifter {
	pub fn new() -> GrainShifter {
		let window = (0..GRAIN_SIZE)
			.map(|i| 0.5 * (1.0 - (2.0 * PI * i as f32 / GRAIN_SIZE as f32).cos()))
			.collect();

		GrainShifter {
			window,
			hop: (GRAIN_SIZE as f32 * OVERLAP_RATIO).round() as usize,

			accumulator: vec![[0.0; 2]; GRAIN_SIZE],
			cursor: 0,
		}
	}

	/// Drops any grains in flight. The next frame starts a fresh grain.
	pub fn reset(&mut self) {
		self.accumulator.fill([0.0; 2]);
		self.cursor = 0;
	}

	/// Produces one output frame. `position` is the source read position in frames;
	/// it is only sampled when a new grain starts.
	pub fn next_frame(&mut self, source: &[[f32; 2]], position: f64) -> [f32; 2] {
		if self.cursor == 0 {
			self.start_grain(source, position);
		}

		let frame = self.accumulator[self.cursor];
		self.cursor = (self.cursor + 1) % self.hop;
		frame
	}

	fn start_grain(&mut self, source: &[[f32; 2]], position: f64) {
		let hop = self.hop;
		self.accumulator.copy_within(hop.., 0);

		let len = self.accumulator.len();
		self.accumulator[len - hop..].fill([0.0; 2]);

		let start = position.max(0.0) as usize;
		let grain = source.get(start..).unwrap_or(&[]);

		for ((out, frame), &gain) in self.accumulator.iter_mut().zip(grain).zip(&self.window) {
			out[0] += frame[0] * gain;
			out[1] += frame[1] * gain;
		}
	}
}
