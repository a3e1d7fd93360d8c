pub const MIN_TEMPO: f64 = 0.5;
pub const MAX_TEMPO: f64 = 2.0;
pub const TEMPO_STEP: f64 = 0.1;


/// Playback rate, always within `[MIN_TEMPO, MAX_TEMPO]` and rounded to one decimal.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Tempo(f64);

impl Tempo {
	pub fn value(&self) -> f64 {
		self.0
	}

	pub fn increase(&mut self) -> f64 {
		self.set(self.0 + TEMPO_STEP)
	}

	pub fn decrease(&mut self) -> f64 {
		self.set(self.0 - TEMPO_STEP)
	}

	pub fn reset(&mut self) -> f64 {
		self.set(1.0)
	}

	pub fn label(&self) -> String {
		format!("{:.1}x", self.0)
	}

	fn set(&mut self, value: f64) -> f64 {
		let rounded = (value * 10.0).round() / 10.0;
		self.0 = rounded.clamp(MIN_TEMPO, MAX_TEMPO);
		self.0
	}
}

impl Default for Tempo {
	fn default() -> Self {
		Tempo(1.0)
	}
}


#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn steps_round_to_one_decimal() {
		let mut tempo = Tempo::default();
		assert_eq!(tempo.increase(), 1.1);
		assert_eq!(tempo.increase(), 1.2);
		assert_eq!(tempo.increase(), 1.3);
		assert_eq!(tempo.label(), "1.3x");

		let mut tempo = Tempo::default();
		for _ in 0..3 {
			tempo.decrease();
		}
		assert_eq!(tempo.value(), 0.7);
	}

	#[test]
	fn clamps_to_range() {
		let mut tempo = Tempo::default();
		for _ in 0..30 {
			tempo.increase();
		}
		assert_eq!(tempo.value(), MAX_TEMPO);

		for _ in 0..30 {
			tempo.decrease();
		}
		assert_eq!(tempo.value(), MIN_TEMPO);
	}

	#[test]
	fn reset_is_always_one() {
		let mut tempo = Tempo::default();
		tempo.decrease();
		tempo.decrease();
		assert_eq!(tempo.reset(), 1.0);

		for _ in 0..7 {
			tempo.increase();
		}
		assert_eq!(tempo.reset(), 1.0);
	}
}
