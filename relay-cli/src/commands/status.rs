//! Shared colouring of run and stage state

use colored::{ColoredString, Colorize};
use relay_core::domain::log::{LogEntry, LogLevel};
use relay_core::domain::run::{RunStatus, StageStatus};

pub fn colorize_run_status(status: RunStatus) -> ColoredString {
    let text = status.to_string();
    match status {
        RunStatus::Queued => text.yellow(),
        RunStatus::Running => text.cyan(),
        RunStatus::Succeeded => text.green(),
        RunStatus::Failed => text.red(),
    }
}

pub fn colorize_stage_status(status: StageStatus) -> ColoredString {
    let text = format!("{:?}", status);
    match status {
        StageStatus::Pending => text.dimmed(),
        StageStatus::Running => text.cyan(),
        StageStatus::Succeeded => text.green(),
        StageStatus::Failed => text.red(),
    }
}

pub fn print_log_entry(entry: &LogEntry) {
    let level = entry.level.to_string().to_uppercase();
    let level = match entry.level {
        LogLevel::Debug => level.dimmed(),
        LogLevel::Info => level.cyan(),
        LogLevel::Warning => level.yellow(),
        LogLevel::Error => level.red(),
    };

    println!(
        "    {} [{}] {}",
        entry.timestamp.format("%H:%M:%S").to_string().dimmed(),
        level,
        entry.message
    );
}
