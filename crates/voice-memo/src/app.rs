use crate::{AppCommand, AppError, AppResult, RecordingRef, console};

use std::{
    io::{self, Write},
    panic::Location,
    time::{Duration, Instant},
};

use error_location::ErrorLocation;
use tokio::sync::mpsc;
use tracing::{info, instrument, warn};
use uuid::Uuid;
use voice_memo_core::{AmplitudeStream, EventReceiver, RecordingController, RecordingRecord};

const METER_REFRESH: Duration = Duration::from_millis(100);

/// Main application state.
///
/// Runs on the async runtime and is the only owner of the controller, so
/// every state transition happens on this task. Console lines arrive from a
/// blocking reader; device work arrives as control events.
pub struct App {
    pub(crate) controller: RecordingController,
    pub(crate) events_rx: EventReceiver,
    pub(crate) lines_rx: mpsc::Receiver<String>,
    /// Records as last printed, for resolving list positions.
    pub(crate) visible: Vec<RecordingRecord>,
    meter_active: bool,
}

impl App {
    pub(crate) fn new(
        controller: RecordingController,
        events_rx: EventReceiver,
        lines_rx: mpsc::Receiver<String>,
    ) -> Self {
        Self {
            controller,
            events_rx,
            lines_rx,
            visible: Vec::new(),
            meter_active: false,
        }
    }

    /// Run the main application event loop.
    #[instrument(skip(self))]
    pub(crate) async fn run(mut self) -> AppResult<()> {
        info!("Voice-Memo starting");

        let mut state_rx = self.controller.subscribe();
        let mut shown = state_rx.borrow_and_update().clone();
        let mut levels: Option<AmplitudeStream> = None;
        let mut last_meter = Instant::now();

        self.show_list(shown.recordings.clone());
        if !shown.permission_granted {
            self.controller.request_permission();
        }
        prompt();

        loop {
            tokio::select! {
                line = self.lines_rx.recv() => {
                    let Some(line) = line else {
                        info!("Console input closed");
                        break;
                    };

                    match line.parse::<AppCommand>() {
                        Ok(AppCommand::Shutdown) => {
                            info!("Shutdown requested");
                            break;
                        }
                        Ok(command) => {
                            if let Err(e) = self.handle_command(command) {
                                warn!(error = ?e, "Command failed");
                                self.say(&format!("Error: {}", e.user_message()));
                            }
                        }
                        Err(e) => self.say(&e.user_message()),
                    }

                    if levels.is_none() {
                        levels = self.controller.amplitude();
                    }
                    prompt();
                }

                Some(event) = self.events_rx.recv() => {
                    self.controller.handle_event(event);
                }

                Ok(()) = state_rx.changed() => {
                    let next = state_rx.borrow_and_update().clone();
                    for line in console::render_transition(&shown, &next) {
                        self.say(&line);
                    }
                    shown = next;
                }

                level = next_level(&mut levels) => match level {
                    Some(level) => {
                        if last_meter.elapsed() >= METER_REFRESH {
                            print!("{}", console::meter_line(level, shown.current_duration));
                            let _ = io::stdout().flush();
                            self.meter_active = true;
                            last_meter = Instant::now();
                        }
                    }
                    None => {
                        levels = None;
                    }
                },
            }
        }

        self.controller.shutdown();
        info!("Voice-Memo shut down successfully");

        Ok(())
    }

    /// Apply one console command to the controller.
    #[instrument(skip(self))]
    pub(crate) fn handle_command(&mut self, command: AppCommand) -> AppResult<()> {
        match command {
            AppCommand::Record => self.controller.start_recording()?,
            AppCommand::Stop => {
                let state = self.controller.state();
                if state.is_recording {
                    self.controller.stop_recording()?;
                } else if state.playing.is_some() {
                    self.controller.stop_playback();
                } else {
                    self.say("Nothing to stop");
                }
            }
            AppCommand::Play(reference) => {
                let id = self.resolve(reference)?;
                self.controller.play(id)?;
            }
            AppCommand::Delete(reference) => {
                let id = self.resolve(reference)?;
                self.controller.delete_recording(id)?;
                self.visible.retain(|r| r.id() != id);
                self.say("Deleted");
            }
            AppCommand::Export(reference, destination) => {
                let id = self.resolve(reference)?;
                let target = self.controller.export_recording(id, &destination)?;
                self.say(&format!("Exported to {}", target.display()));
            }
            AppCommand::List => {
                let records = self.controller.state().recordings;
                self.show_list(records);
            }
            AppCommand::Search(query) => {
                let records = self.controller.search(&query);
                self.show_list(records);
            }
            AppCommand::Status => {
                for line in console::render_status(&self.controller.state()) {
                    self.say(&line);
                }
            }
            AppCommand::Dismiss => self.controller.clear_error(),
            AppCommand::Permission => self.controller.request_permission(),
            AppCommand::Help => self.say(console::HELP),
            AppCommand::Shutdown => {}
        }

        Ok(())
    }

    /// Turn a console reference into a catalog id.
    #[track_caller]
    pub(crate) fn resolve(&self, reference: RecordingRef) -> AppResult<Uuid> {
        match reference {
            RecordingRef::Id(id) => Ok(id),
            RecordingRef::Index(n) => self
                .visible
                .get(n.wrapping_sub(1))
                .map(|r| r.id())
                .ok_or_else(|| AppError::UnknownRecording {
                    reference: n.to_string(),
                    location: ErrorLocation::from(Location::caller()),
                }),
        }
    }

    fn show_list(&mut self, records: Vec<RecordingRecord>) {
        let storage_dir = self.controller.catalog().storage_dir().to_path_buf();
        for line in console::render_list(&records, &storage_dir) {
            self.say(&line);
        }
        self.visible = records;
    }

    fn say(&mut self, line: &str) {
        if self.meter_active {
            println!();
            self.meter_active = false;
        }
        println!("{}", line);
    }
}

fn prompt() {
    print!("> ");
    let _ = io::stdout().flush();
}

/// Next level from the running capture, or never when there is none.
async fn next_level(levels: &mut Option<AmplitudeStream>) -> Option<f32> {
    match levels {
        Some(stream) => stream.next().await,
        None => std::future::pending().await,
    }
}
