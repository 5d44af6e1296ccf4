//! Text rendering for the interactive console.

use std::{path::Path, time::Duration};

use voice_memo_core::{ControllerState, RecordingRecord};

const METER_WIDTH: usize = 30;

pub(crate) const HELP: &str = "\
Commands:
  record                      start recording
  stop                        stop recording or playback
  play <n|id>                 play (again to stop)
  delete <n|id>               delete recording and file
  export <n|id> <path>        copy recording to a file or directory
  list                        show all recordings
  search <text>               show recordings whose name contains text
  status                      show current state
  dismiss                     clear the last error
  permission                  ask for microphone access
  quit                        exit";

/// Elapsed time as `m:ss`.
pub(crate) fn format_elapsed(elapsed: Duration) -> String {
    let total = elapsed.as_secs();
    format!("{}:{:02}", total / 60, total % 60)
}

/// Byte count with a binary unit.
pub(crate) fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}

/// Horizontal bar for a level in `0.0..=1.0`.
pub(crate) fn meter_bar(level: f32, width: usize) -> String {
    let level = if level.is_finite() { level.clamp(0.0, 1.0) } else { 0.0 };
    let filled = ((level * width as f32).round() as usize).min(width);
    format!("[{}{}]", "#".repeat(filled), "-".repeat(width - filled))
}

/// Single-line recording indicator, redrawn in place.
pub(crate) fn meter_line(level: f32, elapsed: Duration) -> String {
    format!(
        "\r* REC {} {}",
        format_elapsed(elapsed),
        meter_bar(level, METER_WIDTH)
    )
}

/// Numbered listing of `records`.
pub(crate) fn render_list(records: &[RecordingRecord], storage_dir: &Path) -> Vec<String> {
    if records.is_empty() {
        return vec!["No recordings".to_string()];
    }

    records
        .iter()
        .enumerate()
        .map(|(i, record)| {
            let size = record
                .file_size(storage_dir)
                .map(format_size)
                .unwrap_or_else(|| "?".to_string());
            format!(
                "{:>3}. {}  {}  {}  {}",
                i + 1,
                record.display_name(),
                record.formatted_duration(),
                record.created_at().format("%Y-%m-%d %H:%M"),
                size
            )
        })
        .collect()
}

/// Summary of `state`.
pub(crate) fn render_status(state: &ControllerState) -> Vec<String> {
    let mut lines = Vec::new();

    let activity = if state.is_recording {
        format!("Recording ({})", format_elapsed(state.current_duration))
    } else if let Some(id) = state.playing {
        format!("Playing {}", display_name_of(state, id))
    } else {
        "Idle".to_string()
    };
    lines.push(activity);

    lines.push(format!(
        "Microphone access: {}",
        if state.permission_granted { "granted" } else { "not granted" }
    ));
    lines.push(format!("Recordings: {}", state.recordings.len()));

    if let Some(error) = &state.last_error {
        lines.push(format!("Error: {} (type 'dismiss' to clear)", error));
    }

    lines
}

/// Messages describing what changed between two published states.
pub(crate) fn render_transition(prev: &ControllerState, next: &ControllerState) -> Vec<String> {
    let mut lines = Vec::new();

    if !prev.permission_granted && next.permission_granted {
        lines.push("Microphone access granted".to_string());
    }

    match (prev.is_recording, next.is_recording) {
        (false, true) => lines.push("Recording... (type 'stop' to finish)".to_string()),
        (true, false) => match next.recordings.first() {
            Some(newest) if next.recordings.len() > prev.recordings.len() => lines.push(format!(
                "Saved {} ({})",
                newest.display_name(),
                newest.formatted_duration()
            )),
            _ => lines.push("Recording stopped".to_string()),
        },
        _ => {}
    }

    if prev.playing != next.playing {
        match next.playing {
            Some(id) => lines.push(format!("Playing {}", display_name_of(next, id))),
            None => lines.push("Playback stopped".to_string()),
        }
    }

    lines
}

fn display_name_of(state: &ControllerState, id: uuid::Uuid) -> String {
    state
        .recordings
        .iter()
        .find(|r| r.id() == id)
        .map(|r| r.display_name().to_string())
        .unwrap_or_else(|| id.to_string())
}
