use thiserror::Error;


#[derive(Debug, Error)]
pub enum ViewerError {
	#[error("failed to read audio file: {0}")]
	Io(#[from] std::io::Error),

	#[error("failed to decode audio: {0}")]
	Decode(#[from] symphonia::core::errors::Error),

	#[error("file contains no decodable audio track")]
	NoAudioTrack,

	#[error("audio contains no samples")]
	EmptyAudio,

	#[error("failed to resample audio: {0}")]
	Resample(String),

	#[error("playback engine failed to load track: {0}")]
	EngineLoad(String),

	#[error("background task failed: {0}")]
	Task(#[from] tokio::task::JoinError),
}
