use std::fs::File;
use std::path::Path;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::error::ViewerError;


/// Extensions offered by the open-file dialog.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["mp3", "wav", "m4a", "aac", "ogg", "flac"];


/// Fully decoded audio, one `Vec` per channel.
#[derive(Clone, Debug)]
pub struct DecodedAudio {
	pub channels: Vec<Vec<f32>>,
	pub sample_rate: u32,
}

impl DecodedAudio {
	pub fn num_frames(&self) -> usize {
		self.channels.first().map_or(0, Vec::len)
	}

	pub fn duration(&self) -> f64 {
		if self.sample_rate == 0 {
			return 0.0;
		}

		self.num_frames() as f64 / self.sample_rate as f64
	}

	pub fn first_channel(&self) -> &[f32] {
		self.channels.first().map_or(&[], Vec::as_slice)
	}
}


pub fn decode_file(path: &Path) -> Result<DecodedAudio, ViewerError> {
	let file = File::open(path)?;
	let mss = MediaSourceStream::new(Box::new(file), Default::default());

	let mut hint = Hint::new();
	if let Some(ext) = path.extension().and_then(|ext| ext.to_str()) {
		hint.with_extension(ext);
	}

	let probed = symphonia::default::get_probe()
		.format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())?;

	let mut format = probed.format;
	let track = format.tracks().iter()
		.find(|track| track.codec_params.codec != CODEC_TYPE_NULL)
		.ok_or(ViewerError::NoAudioTrack)?;

	let track_id = track.id;
	let codec_params = track.codec_params.clone();
	let mut decoder = symphonia::default::get_codecs().make(&codec_params, &DecoderOptions::default())?;

	let mut sample_rate = codec_params.sample_rate.unwrap_or(44100);
	let mut channels: Vec<Vec<f32>> = Vec::new();

	loop {
		let packet = match format.next_packet() {
			Ok(packet) => packet,
			Err(SymphoniaError::IoError(err)) if err.kind() == std::io::ErrorKind::UnexpectedEof => break,
			Err(SymphoniaError::ResetRequired) => break,
			Err(err) => return Err(err.into()),
		};

		if packet.track_id() != track_id {
			continue;
		}

		let decoded = match decoder.decode(&packet) {
			Ok(decoded) => decoded,
			Err(SymphoniaError::DecodeError(msg)) => {
				log::warn!("Skipping undecodable packet in {}: {msg}", path.display());
				continue;
			}
			Err(err) => return Err(err.into()),
		};

		let spec = *decoded.spec();
		sample_rate = spec.rate;

		let num_channels = spec.channels.count().max(1);
		if channels.len() < num_channels {
			channels.resize_with(num_channels, Vec::new);
		}

		let mut sample_buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
		sample_buf.copy_interleaved_ref(decoded);

		for frame in sample_buf.samples().chunks_exact(num_channels) {
			for (channel, &sample) in channels.iter_mut().zip(frame) {
				channel.push(sample);
			}
		}
	}

	let audio = DecodedAudio { channels, sample_rate };
	if audio.num_frames() == 0 {
		return Err(ViewerError::EmptyAudio);
	}

	log::info!("Decoded {} ({} channels, {} Hz, {:.2}s)",
		path.display(), audio.channels.len(), audio.sample_rate, audio.duration());

	Ok(audio)
}


#[cfg(test)]
mod tests {
	use super::*;

	fn write_wav(path: &Path, sample_rate: u32, channels: u16, frames: &[[i16; 2]]) {
		let spec = hound::WavSpec {
			channels,
			sample_rate,
			bits_per_sample: 16,
			sample_format: hound::SampleFormat::Int,
		};

		let mut writer = hound::WavWriter::create(path, spec).unwrap();
		for frame in frames {
			for &sample in &frame[..channels as usize] {
				writer.write_sample(sample).unwrap();
			}
		}
		writer.finalize().unwrap();
	}

	#[test]
	fn decodes_stereo_wav_into_planar_channels() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("tone.wav");

		let frames: Vec<[i16; 2]> = (0..8000)
			.map(|i| if i % 2 == 0 { [16384, -16384] } else { [-16384, 16384] })
			.collect();
		write_wav(&path, 8000, 2, &frames);

		let audio = decode_file(&path).unwrap();
		assert_eq!(audio.sample_rate, 8000);
		assert_eq!(audio.channels.len(), 2);
		assert_eq!(audio.num_frames(), 8000);
		assert!((audio.duration() - 1.0).abs() < 1e-9);

		assert!((audio.channels[0][0] - 0.5).abs() < 1e-3);
		assert!((audio.channels[1][0] + 0.5).abs() < 1e-3);
	}

	#[test]
	fn empty_wav_is_rejected() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("empty.wav");
		write_wav(&path, 44100, 1, &[]);

		assert!(decode_file(&path).is_err());
	}

	#[test]
	fn garbage_file_is_a_decode_error() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("noise.mp3");
		std::fs::write(&path, b"definitely not audio data").unwrap();

		assert!(matches!(decode_file(&path), Err(ViewerError::Decode(_))));
	}

	#[test]
	fn missing_file_is_an_io_error() {
		let result = decode_file(Path::new("/nonexistent/scrubwave/test.wav"));
		assert!(matches!(result, Err(ViewerError::Io(_))));
	}
}
