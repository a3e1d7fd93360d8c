use cpal::traits::{DeviceTrait, StreamTrait};

use std::sync::Arc;
use tokio::sync::Mutex;

use crate::error::ViewerError;
use crate::grain::GrainShifter;
use crate::playback::TrackId;


pub struct OutputStream {
	_stream: cpal::Stream,
}


/// Playback state shared between the audio callback and the player handles.
pub struct Transport {
	track: Option<TrackId>,
	frames: Vec<[f32; 2]>,
	sample_rate: u32,

	pub position: f64,
	pub rate: f64,
	pub playing: bool,
	pub finish_pending: bool,

	preserve_pitch: bool,
	shifter: GrainShifter,
}


impl OutputStream {
	pub fn start(device: &cpal::Device, config: cpal::StreamConfig, transport: Arc<Mutex<Transport>>) -> anyhow::Result<OutputStream> {
		let channels = config.channels as usize;
		let callback = Callback { transport, channels };

		let stream = device.build_output_stream(
			&config,

			move |data: &mut [f32], callback_info: &cpal::OutputCallbackInfo| {
				callback.process(data, callback_info);
			},

			move |err| {
				log::error!("Output stream error: {err}");
			}
		)?;

		stream.play()?;

		Ok(OutputStream {
			_stream: stream,
		})
	}
}


impl Transport {
	pub fn new(sample_rate: u32, preserve_pitch: bool) -> Transport {
		Transport {
			track: None,
			frames: Vec::new(),
			sample_rate,

			position: 0.0,
			rate: 1.0,
			playing: false,
			finish_pending: false,

			preserve_pitch,
			shifter: GrainShifter::new(),
		}
	}

	pub fn track(&self) -> Option<TrackId> {
		self.track
	}

	pub fn is_current(&self, track: TrackId) -> bool {
		self.track == Some(track)
	}

	/// Makes `track` current unless a newer track is already installed.
	pub fn try_install(&mut self, track: TrackId, frames: Vec<[f32; 2]>) -> Result<(), ViewerError> {
		if let Some(current) = self.track.filter(|&current| current > track) {
			return Err(ViewerError::EngineLoad(format!("superseded by track {current}")));
		}

		self.track = Some(track);
		self.frames = frames;
		self.position = 0.0;
		self.rate = 1.0;
		self.playing = false;
		self.finish_pending = false;
		self.shifter.reset();
		Ok(())
	}

	pub fn unload(&mut self, track: TrackId) {
		if self.is_current(track) {
			self.track = None;
			self.frames = Vec::new();
			self.position = 0.0;
			self.playing = false;
			self.finish_pending = false;
		}
	}

	pub fn current_time(&self) -> f64 {
		self.position / self.sample_rate as f64
	}

	pub fn seek(&mut self, seconds: f64) {
		let frame = seconds.max(0.0) * self.sample_rate as f64;
		self.position = frame.min(self.frames.len() as f64);
		self.finish_pending = false;
		self.shifter.reset();
	}

	pub fn at_end(&self) -> bool {
		self.position >= self.frames.len() as f64
	}

	/// Fills an interleaved output buffer and advances the play position by `rate` per frame.
	///
	/// With `preserve_pitch` the frames come from the grain player instead of being
	/// interpolated, so tempo changes leave the pitch alone.
	pub fn render(&mut self, data: &mut [f32], channels: usize) {
		data.fill(0.0);

		if !self.playing || self.frames.is_empty() {
			return;
		}

		let channels = channels.max(1);

		for out in data.chunks_exact_mut(channels) {
			let index = self.position as usize;
			let Some(&current) = self.frames.get(index) else {
				self.position = self.frames.len() as f64;
				self.playing = false;
				self.finish_pending = true;
				break
			};

			let [left, right] = if self.preserve_pitch {
				self.shifter.next_frame(&self.frames, self.position)
			} else {
				let next = self.frames.get(index + 1).copied().unwrap_or(current);
				let frac = (self.position - index as f64) as f32;
				[0, 1].map(|channel| current[channel] + (next[channel] - current[channel]) * frac)
			};

			if channels == 1 {
				out[0] = (left + right) * 0.5;
			} else {
				out[0] = left;
				out[1] = right;
			}

			self.position += self.rate;
		}
	}
}


struct Callback {
	transport: Arc<Mutex<Transport>>,
	channels: usize,
}

impl Callback {
	fn process(&self, data: &mut [f32], _: &cpal::OutputCallbackInfo) {
		let mut transport = self.transport.blocking_lock();
		transport.render(data, self.channels);
	}
}
