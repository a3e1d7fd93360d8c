use crate::error::ViewerError;


/// Normalized `(max, min)` pairs, one per time bucket, stored flat as `[max0, min0, max1, min1, ..]`.
#[derive(Clone, Debug, PartialEq)]
pub struct PeakSeries {
	values: Vec<f32>,
}


impl PeakSeries {
	/// Number of buckets for a track of `duration` seconds.
	pub fn bucket_count(duration: f64, bars_per_second: f32) -> usize {
		let buckets = (duration * bars_per_second as f64).ceil();
		if buckets.is_finite() && buckets >= 1.0 {
			buckets as usize
		} else {
			1
		}
	}

	pub fn extract(samples: &[f32], num_buckets: usize) -> Result<PeakSeries, ViewerError> {
		if samples.is_empty() {
			return Err(ViewerError::EmptyAudio);
		}

		let num_buckets = num_buckets.max(1);
		let num_samples = samples.len();
		let mut values = Vec::with_capacity(num_buckets * 2);

		for bucket in 0..num_buckets {
			let start = bucket * num_samples / num_buckets;
			let end = (bucket + 1) * num_samples / num_buckets;
			let block = &samples[start..end];

			if block.is_empty() {
				values.extend([0.0, 0.0]);
				continue;
			}

			let (max, min) = block.iter()
				.fold((f32::NEG_INFINITY, f32::INFINITY), |(max, min), &s| (max.max(s), min.min(s)));

			values.push(max);
			values.push(min);
		}

		let peak = values.iter().fold(0.0f32, |acc, v| acc.max(v.abs()));
		if peak > 0.0 {
			for value in &mut values {
				*value /= peak;
			}
		}

		Ok(PeakSeries { values })
	}

	/// Flat length, twice the bucket count.
	pub fn len(&self) -> usize {
		self.values.len()
	}

	pub fn num_buckets(&self) -> usize {
		self.values.len() / 2
	}

	pub fn values(&self) -> &[f32] {
		&self.values
	}

	pub fn pair(&self, bucket: usize) -> (f32, f32) {
		(self.values[bucket * 2], self.values[bucket * 2 + 1])
	}
}
