use anyhow::Result;
use std::path::PathBuf;


mod app;
mod config;
mod coordinator;
mod decode;
mod error;
mod frame;
mod grain;
mod output;
mod peaks;
mod playback;
mod region;
mod scrub;
mod session;
mod tempo;
mod view;
mod viewport;

use app::ViewerApp;
use config::ViewerConfig;
use coordinator::Coordinator;


#[tokio::main]
async fn main() -> Result<()> {
	env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

	let config = ViewerConfig::load();
	let coordinator = Coordinator::start(config.preserve_pitch).await?;

	let initial_file = std::env::args_os().nth(1).map(PathBuf::from);

	eframe::run_native("Scrubwave", <_>::default(), Box::new(move |_cc| {
		Box::new(ViewerApp::new(config, coordinator, initial_file))
	}));

	Ok(())
}
