use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::sync::{Mutex, MutexGuard};
use tokio::task;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use cpal::traits::{HostTrait, DeviceTrait};

use crate::decode::DecodedAudio;
use crate::error::ViewerError;
use crate::output::{self, Transport};
use crate::playback::{PlaybackEngine, PlayerEvent, Subscription, TrackId};


/// Owns the audio output thread. Cheap to clone; every clone talks to the same thread.
#[derive(Clone)]
pub struct Coordinator {
	cmd_tx: mpsc::Sender<Command>,
	transport: Arc<Mutex<Transport>>,
	events: broadcast::Sender<(TrackId, PlayerEvent)>,

	output_rate: u32,
	next_track: Arc<AtomicU64>,
}


/// Handle to one loaded track. Dropping it releases the track.
pub struct Player {
	track: TrackId,
	duration: f64,
	destroyed: bool,

	cmd_tx: mpsc::Sender<Command>,
	transport: Arc<Mutex<Transport>>,
	events: broadcast::Sender<(TrackId, PlayerEvent)>,
}


#[derive(Debug)]
enum Command {
	Load {
		track: TrackId,
		frames: Vec<[f32; 2]>,
		reply: oneshot::Sender<Result<(), ViewerError>>,
	},

	Unload(TrackId),
}



impl Coordinator {
	pub async fn start(preserve_pitch: bool) -> anyhow::Result<Coordinator> {
		let (cmd_tx, cmd_rx) = mpsc::channel(16);
		let (ready_tx, ready_rx) = oneshot::channel();
		let (events, _) = broadcast::channel(64);
		let async_handle = tokio::runtime::Handle::current();

		std::thread::spawn({
			let events = events.clone();

			move || {
				if let Err(err) = start_inner(cmd_rx, ready_tx, events, preserve_pitch, async_handle) {
					log::error!("Audio thread stopped: {err:#}");
				}
			}
		});

		let (output_rate, transport) = ready_rx.await
			.map_err(|_| anyhow::anyhow!("Audio thread exited before opening an output stream"))??;

		Ok(Coordinator {
			cmd_tx,
			transport,
			events,

			output_rate,
			next_track: Arc::new(AtomicU64::new(1)),
		})
	}

	/// Resamples `audio` to the device rate and makes it the current track.
	///
	/// A load that completes after a newer one has been installed is rejected.
	pub async fn load(&self, audio: DecodedAudio) -> Result<Player, ViewerError> {
		let track = self.next_track.fetch_add(1, Ordering::Relaxed);
		let output_rate = self.output_rate;

		let frames = task::spawn_blocking(move || prepare_frames(audio, output_rate)).await??;
		let duration = frames.len() as f64 / output_rate as f64;

		let (reply_tx, reply_rx) = oneshot::channel();
		self.cmd_tx.send(Command::Load { track, frames, reply: reply_tx }).await
			.map_err(|_| ViewerError::EngineLoad("audio thread has stopped".into()))?;

		reply_rx.await
			.map_err(|_| ViewerError::EngineLoad("audio thread dropped the load request".into()))??;

		log::info!("Track {track} ready ({duration:.2}s at {output_rate} Hz)");

		Ok(Player {
			track,
			duration,
			destroyed: false,

			cmd_tx: self.cmd_tx.clone(),
			transport: self.transport.clone(),
			events: self.events.clone(),
		})
	}
}



fn start_inner(mut cmd_rx: mpsc::Receiver<Command>,
	ready_tx: oneshot::Sender<anyhow::Result<(u32, Arc<Mutex<Transport>>)>>,
	events: broadcast::Sender<(TrackId, PlayerEvent)>,
	preserve_pitch: bool,
	async_handle: tokio::runtime::Handle) -> anyhow::Result<()>
{
	let opened = open_output(preserve_pitch);
	let (output_config, transport, _output_stream) = match opened {
		Ok(opened) => opened,
		Err(err) => {
			let message = format!("{err:#}");
			let _ = ready_tx.send(Err(err));
			anyhow::bail!(message);
		}
	};

	let _ = ready_tx.send(Ok((output_config.sample_rate.0, transport.clone())));

	// Required because cpal::Stream is not Send.
	async_handle.block_on(async move {
		use tokio::time::MissedTickBehavior;

		let mut interval = tokio::time::interval(std::time::Duration::from_millis(16));
		interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

		loop {
			tokio::select!{
				value = cmd_rx.recv() => match value {
					Some(cmd) => match cmd {
						Command::Load { track, frames, reply } => {
							let result = transport.lock().await.try_install(track, frames);
							let _ = reply.send(result);
						}

						Command::Unload(track) => {
							transport.lock().await.unload(track);
						}
					}

					None => break,
				},

				_ = interval.tick() => {
					let mut transport = transport.lock().await;

					if transport.finish_pending {
						transport.finish_pending = false;

						if let Some(track) = transport.track() {
							let _ = events.send((track, PlayerEvent::Finish));
						}
					}
				}
			}
		}

		Ok(())
	})
}


fn open_output(preserve_pitch: bool) -> anyhow::Result<(cpal::StreamConfig, Arc<Mutex<Transport>>, output::OutputStream)> {
	let host = cpal::default_host();
	let output_device = host.default_output_device().ok_or_else(|| anyhow::Error::msg("No default output device"))?;

	log::info!("Using output device {}", output_device.name().unwrap_or_else(|_| "<unnamed>".into()));

	let output_config = cpal::StreamConfig {
		channels: 2,
		.. output_device.default_output_config()?.config()
	};

	let transport = Arc::new(Mutex::new(Transport::new(output_config.sample_rate.0, preserve_pitch)));
	let output_stream = output::OutputStream::start(&output_device, output_config.clone(), transport.clone())?;

	Ok((output_config, transport, output_stream))
}


/// Converts decoded audio into stereo frames at the output sample rate.
fn prepare_frames(audio: DecodedAudio, output_rate: u32) -> Result<Vec<[f32; 2]>, ViewerError> {
	let DecodedAudio { channels, sample_rate } = audio;

	let mut channels = channels.into_iter();
	let left = channels.next().ok_or(ViewerError::EmptyAudio)?;
	let right = channels.next().unwrap_or_else(|| left.clone());

	let (left, right) = if sample_rate == output_rate || left.is_empty() {
		(left, right)
	} else {
		let ratio = output_rate as f64 / sample_rate as f64;
		let mut waves = resample(vec![left, right], ratio)?;
		let right = waves.pop().unwrap_or_default();
		let left = waves.pop().unwrap_or_default();
		(left, right)
	};

	Ok(left.into_iter().zip(right).map(|(l, r)| [l, r]).collect())
}


fn resample(waves_in: Vec<Vec<f32>>, sample_rate_ratio: f64) -> Result<Vec<Vec<f32>>, ViewerError> {
	use rubato::{Resampler, SincFixedIn, InterpolationType, InterpolationParameters, WindowFunction};
	let params = InterpolationParameters {
		sinc_len: 256,
		f_cutoff: 0.95,
		interpolation: InterpolationType::Linear,
		oversampling_factor: 256,
		window: WindowFunction::BlackmanHarris2,
	};

	let mut resampler = SincFixedIn::<f32>::new(
		sample_rate_ratio,
		2.0,
		params,
		waves_in[0].len(),
		waves_in.len(),
	).map_err(|err| ViewerError::Resample(err.to_string()))?;

	resampler.process(&waves_in, None)
		.map_err(|err| ViewerError::Resample(err.to_string()))
}



impl Player {
	pub fn track(&self) -> TrackId {
		self.track
	}

	/// The shared transport, if this player's track is still the one loaded.
	fn transport(&self) -> Option<MutexGuard<'_, Transport>> {
		if self.destroyed {
			return None;
		}

		let transport = task::block_in_place(|| self.transport.blocking_lock());
		transport.is_current(self.track).then_some(transport)
	}

	fn emit(&self, event: PlayerEvent) {
		let _ = self.events.send((self.track, event));
	}
}

impl PlaybackEngine for Player {
	fn play(&mut self) {
		let started = match self.transport() {
			Some(mut transport) if !transport.playing => {
				if transport.at_end() {
					transport.position = 0.0;
				}
				transport.playing = true;
				transport.finish_pending = false;
				true
			}
			_ => false,
		};

		if started {
			self.emit(PlayerEvent::Play);
		}
	}

	fn pause(&mut self) {
		let stopped = match self.transport() {
			Some(mut transport) if transport.playing => {
				transport.playing = false;
				true
			}
			_ => false,
		};

		if stopped {
			self.emit(PlayerEvent::Pause);
		}
	}

	fn destroy(&mut self) {
		if self.destroyed {
			return;
		}

		self.destroyed = true;
		if let Err(err) = self.cmd_tx.try_send(Command::Unload(self.track)) {
			log::warn!("Could not release track {}: {err}", self.track);
		}
	}

	fn current_time(&self) -> f64 {
		self.transport().map_or(0.0, |transport| transport.current_time())
	}

	fn duration(&self) -> f64 {
		self.duration
	}

	fn is_playing(&self) -> bool {
		self.transport().map_or(false, |transport| transport.playing)
	}

	fn set_time(&mut self, seconds: f64) {
		if let Some(mut transport) = self.transport() {
			transport.seek(seconds);
		}
	}

	fn set_playback_rate(&mut self, rate: f64) {
		if let Some(mut transport) = self.transport() {
			transport.rate = rate;
		}
	}

	fn subscribe(&self) -> Subscription {
		Subscription::new(self.track, self.events.subscribe())
	}
}

impl Drop for Player {
	fn drop(&mut self) {
		self.destroy();
	}
}


#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn mono_is_duplicated_to_both_sides() {
		let audio = DecodedAudio { channels: vec![vec![0.1, 0.2, 0.3]], sample_rate: 48000 };
		let frames = prepare_frames(audio, 48000).unwrap();
		assert_eq!(frames, vec![[0.1, 0.1], [0.2, 0.2], [0.3, 0.3]]);
	}

	#[test]
	fn extra_channels_are_dropped() {
		let audio = DecodedAudio {
			channels: vec![vec![1.0, 2.0], vec![3.0, 4.0], vec![5.0, 6.0]],
			sample_rate: 44100,
		};
		let frames = prepare_frames(audio, 44100).unwrap();
		assert_eq!(frames, vec![[1.0, 3.0], [2.0, 4.0]]);
	}

	#[test]
	fn resampling_scales_length() {
		let samples: Vec<f32> = (0..22050).map(|i| (i as f32 * 0.01).sin()).collect();
		let audio = DecodedAudio { channels: vec![samples.clone(), samples], sample_rate: 22050 };

		let frames = prepare_frames(audio, 44100).unwrap();
		let expected = 44100usize;
		assert!(frames.len().abs_diff(expected) < 600, "got {} frames", frames.len());
	}
}
