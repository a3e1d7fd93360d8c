use eframe::egui;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tokio::task;

use crate::config::ViewerConfig;
use crate::coordinator::{Coordinator, Player};
use crate::decode::{self, SUPPORTED_EXTENSIONS};
use crate::error::ViewerError;
use crate::peaks::PeakSeries;
use crate::scrub::PointerKind;
use crate::session::ViewerSession;


const KEY_HINT: &str = "Space play/pause   [ ] region   Esc clear   +/- tempo   0 reset   L loop   Home back";


pub struct ViewerApp {
	config: ViewerConfig,
	coordinator: Coordinator,
	session: Option<ViewerSession<Player>>,

	load_tx: mpsc::UnboundedSender<LoadResult>,
	load_rx: mpsc::UnboundedReceiver<LoadResult>,
	loads: LoadTracker,
	last_error: Option<String>,
}


/// Tags open requests so only the latest one is allowed to become the session.
#[derive(Debug, Default)]
struct LoadTracker {
	generation: u64,
	loading: Option<PathBuf>,
}


struct LoadResult {
	generation: u64,
	path: PathBuf,
	result: Result<(PeakSeries, Player), ViewerError>,
}


impl ViewerApp {
	pub fn new(config: ViewerConfig, coordinator: Coordinator, initial_file: Option<PathBuf>) -> ViewerApp {
		let (load_tx, load_rx) = mpsc::unbounded_channel();

		let mut app = ViewerApp {
			config,
			coordinator,
			session: None,

			load_tx,
			load_rx,
			loads: LoadTracker::default(),
			last_error: None,
		};

		if let Some(path) = initial_file {
			app.open_file(path);
		}

		app
	}

	/// Drops the current session and starts decoding `path` in the background.
	pub fn open_file(&mut self, path: PathBuf) {
		if let Some(session) = self.session.take() {
			log::info!("Closing {}", session.name());
		}

		let generation = self.loads.begin(path.clone());
		self.last_error = None;

		log::info!("Loading {}", path.display());

		let coordinator = self.coordinator.clone();
		let bars_per_second = self.config.bars_per_second;
		let load_tx = self.load_tx.clone();

		tokio::spawn(async move {
			let result = load_track(&coordinator, path.clone(), bars_per_second).await;
			let _ = load_tx.send(LoadResult { generation, path, result });
		});
	}

	fn poll_loads(&mut self) {
		while let Ok(loaded) = self.load_rx.try_recv() {
			if !self.loads.finish(loaded.generation) {
				log::debug!("Discarding stale load of {}", loaded.path.display());
				continue;
			}

			match loaded.result {
				Ok((peaks, player)) => {
					let name = display_name(&loaded.path);
					log::info!("Opened {name} as track {} ({} buckets)", player.track(), peaks.num_buckets());
					self.session = Some(ViewerSession::new(name, player, peaks, &self.config));
				}

				Err(err) => {
					log::error!("Failed to open {}: {err}", loaded.path.display());
					self.last_error = Some(format!("Could not open {}: {err}", display_name(&loaded.path)));
				}
			}
		}
	}

	fn handle_keys(&mut self, ctx: &egui::Context) {
		if ctx.wants_keyboard_input() {
			return;
		}

		let Some(session) = self.session.as_mut() else {
			return
		};

		let events = ctx.input().events.clone();

		for event in events {
			match event {
				egui::Event::Key { key, pressed: true, .. } => match key {
					egui::Key::Space => session.toggle_play(),
					egui::Key::Escape => session.clear_region(),
					egui::Key::Home => session.skip_back(),
					_ => {}
				}

				egui::Event::Text(text) => match text.as_str() {
					"[" => session.set_region_start(),
					"]" => session.set_region_end(),
					"+" | "=" => session.tempo_increase(),
					"-" => session.tempo_decrease(),
					"0" => session.tempo_reset(),
					"l" | "L" => {
						let looping = !session.looping();
						session.set_loop(looping);
					}
					_ => {}
				}

				_ => {}
			}
		}
	}

	fn dropped_file(ctx: &egui::Context) -> Option<PathBuf> {
		ctx.input().raw.dropped_files.iter()
			.find_map(|file| file.path.clone())
	}

	fn toolbar(&mut self, ui: &mut egui::Ui) -> Option<PathBuf> {
		let mut picked = None;

		ui.horizontal(|ui| {
			if ui.button("Open...").clicked() {
				picked = rfd::FileDialog::new()
					.add_filter("Audio", SUPPORTED_EXTENSIONS)
					.pick_file();
			}

			let has_session = self.session.is_some();
			ui.separator();

			let tempo_label = self.session.as_ref()
				.map_or_else(|| "1.0x".to_owned(), |session| session.tempo().label());

			if ui.add_enabled(has_session, egui::Button::new("-")).clicked() {
				if let Some(session) = self.session.as_mut() {
					session.tempo_decrease();
				}
			}

			ui.label(tempo_label);

			if ui.add_enabled(has_session, egui::Button::new("+")).clicked() {
				if let Some(session) = self.session.as_mut() {
					session.tempo_increase();
				}
			}

			if ui.add_enabled(has_session, egui::Button::new("Reset")).clicked() {
				if let Some(session) = self.session.as_mut() {
					session.tempo_reset();
				}
			}

			ui.separator();

			let Some(session) = self.session.as_mut() else {
				return
			};

			if ui.add_enabled(session.region().start().is_some(), egui::Button::new("Clear Region")).clicked() {
				session.clear_region();
			}

			let mut looping = session.looping();
			if ui.checkbox(&mut looping, "Loop").changed() {
				session.set_loop(looping);
			}

			ui.separator();

			let mut zoom = session.viewport().zoom();
			let slider = egui::Slider::new(&mut zoom, session.viewport().zoom_range())
				.step_by(0.1)
				.show_value(false);

			if ui.add(slider).changed() {
				session.set_zoom(zoom);
			}

			ui.label(session.zoom_label());
		});

		picked
	}

	fn transport_bar(&mut self, ui: &mut egui::Ui) {
		let Some(session) = self.session.as_mut() else {
			return
		};

		ui.horizontal(|ui| {
			if ui.button("|<").on_hover_text("Back to region start").clicked() {
				session.skip_back();
			}

			if ui.button("[").on_hover_text("Set region start").clicked() {
				session.set_region_start();
			}

			let label = if session.is_playing() { "Pause" } else { "Play" };
			if ui.button(label).clicked() {
				session.toggle_play();
			}

			if ui.button("]").on_hover_text("Set region end").clicked() {
				session.set_region_end();
			}

			ui.separator();
			ui.monospace(format!("{} / {}", format_time(session.display_time()), format_time(session.duration())));

			if let Some((start, end)) = session.region().bounds() {
				ui.separator();
				ui.monospace(format!("region {} - {}", format_time(start), format_time(end)));
			} else if let Some(start) = session.region().start() {
				ui.separator();
				ui.monospace(format!("region from {}", format_time(start)));
			}
		});
	}
}


impl eframe::App for ViewerApp {
	fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
		self.poll_loads();

		if let Some(path) = Self::dropped_file(ctx) {
			self.open_file(path);
		}

		self.handle_keys(ctx);

		if let Some(session) = self.session.as_mut() {
			session.frame();
		}

		let mut picked = None;

		egui::CentralPanel::default().show(ctx, |ui| {
			picked = self.toolbar(ui);

			if let Some(err) = &self.last_error {
				ui.colored_label(egui::Color32::LIGHT_RED, err.as_str());
			}

			if let Some(path) = &self.loads.loading {
				ui.horizontal(|ui| {
					ui.spinner();
					ui.label(format!("Loading {}", display_name(path)));
				});
			}

			let render_style = self.config.render_style;
			let touching = ctx.input().any_touches();
			let now_ms = ctx.input().time * 1000.0;

			if let Some(session) = self.session.as_mut() {
				ui.heading(session.name());

				let response = ui.add(session.waveform_view(render_style));
				let pointer = if touching { PointerKind::Touch } else { PointerKind::Mouse };

				if response.drag_started() {
					if let Some(pos) = response.interact_pointer_pos() {
						session.drag_start(pos.x, pointer);
					}
				} else if response.dragged() {
					if let Some(pos) = response.interact_pointer_pos() {
						session.drag_move(pos.x, now_ms);
					}
				}

				if response.drag_released() {
					session.drag_release();
				}

				if session.is_scrubbing() {
					ctx.output().cursor_icon = egui::CursorIcon::Grabbing;
				} else if response.hovered() {
					ctx.output().cursor_icon = egui::CursorIcon::Grab;
				}
			} else if self.loads.loading.is_none() {
				ui.label("Open an audio file or drop one here.");
			}

			self.transport_bar(ui);
			ui.weak(KEY_HINT);
		});

		if let Some(path) = picked {
			self.open_file(path);
		}

		ctx.request_repaint();
	}
}



impl LoadTracker {
	fn begin(&mut self, path: PathBuf) -> u64 {
		self.generation += 1;
		self.loading = Some(path);
		self.generation
	}

	/// Returns false for a result that a later request has superseded.
	fn finish(&mut self, generation: u64) -> bool {
		if generation != self.generation {
			return false;
		}

		self.loading = None;
		true
	}
}


async fn load_track(coordinator: &Coordinator, path: PathBuf, bars_per_second: f32) -> Result<(PeakSeries, Player), ViewerError> {
	let (audio, peaks) = task::spawn_blocking(move || -> Result<_, ViewerError> {
		let audio = decode::decode_file(&path)?;
		let num_buckets = PeakSeries::bucket_count(audio.duration(), bars_per_second);
		let peaks = PeakSeries::extract(audio.first_channel(), num_buckets)?;
		Ok((audio, peaks))
	}).await??;

	let player = coordinator.load(audio).await?;
	Ok((peaks, player))
}


fn display_name(path: &Path) -> String {
	path.file_name()
		.map_or_else(|| path.display().to_string(), |name| name.to_string_lossy().into_owned())
}


fn format_time(seconds: f64) -> String {
	let tenths = (seconds.max(0.0) * 10.0).round() as u64;
	let (minutes, tenths) = (tenths / 600, tenths % 600);
	format!("{}:{:02}.{}", minutes, tenths / 10, tenths % 10)
}
