//! `binasa watch`: follow the live snapshot stream until Ctrl-C.

use std::sync::Arc;

use binasa_core::{
    Connectivity, Controller, Notification, NotificationLevel, SnapshotWatchStream,
    StatusSnapshot,
};
use futures_util::StreamExt;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::watch;

use crate::cli::{GlobalOpts, OutputFormat, WatchArgs};
use crate::error::CliError;
use crate::output::{self, Painter};

use super::status::link_label;
use super::util::on_off;

pub async fn handle(
    args: WatchArgs,
    controller: &Controller,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let painter = Painter::new(global.color);
    let mut snapshots = controller.snapshots().into_stream();
    let mut connectivity = controller.connectivity();
    let mut notifications = controller.notifications();

    controller.start().await?;
    let result = follow(
        args.count,
        global,
        painter,
        &mut snapshots,
        &mut connectivity,
        &mut notifications,
    )
    .await;
    controller.stop().await;
    result
}

async fn follow(
    count: Option<usize>,
    global: &GlobalOpts,
    painter: Painter,
    snapshots: &mut SnapshotWatchStream,
    connectivity: &mut watch::Receiver<Connectivity>,
    notifications: &mut broadcast::Receiver<Arc<Notification>>,
) -> Result<(), CliError> {
    let mut seen = 0usize;
    if count == Some(0) {
        return Ok(());
    }

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::debug!("interrupted");
                return Ok(());
            }
            snap = snapshots.next() => {
                let Some(snap) = snap else { return Ok(()) };
                let line = render_update(global.output, &snap, painter)?;
                output::print_output(&line, global.quiet);
                seen += 1;
                if count.is_some_and(|n| seen >= n) {
                    return Ok(());
                }
            }
            changed = connectivity.changed() => {
                if changed.is_err() {
                    return Ok(());
                }
                let link = connectivity.borrow_and_update().clone();
                tracing::debug!(push = %link.push, degraded = link.poll_degraded, "link changed");
                if !global.quiet && matches!(global.output, OutputFormat::Table) {
                    eprintln!("{} link: {}", painter.dim("--"), link_label(&link, painter));
                }
            }
            note = notifications.recv() => match note {
                Ok(note) => {
                    if !global.quiet {
                        eprintln!("{}", render_notification(&note, painter));
                    }
                }
                Err(RecvError::Lagged(n)) => tracing::debug!(skipped = n, "notifications lagged"),
                Err(RecvError::Closed) => return Ok(()),
            },
        }
    }
}

/// One line per update: a compact summary for tables, NDJSON otherwise.
fn render_update(
    format: OutputFormat,
    snap: &StatusSnapshot,
    painter: Painter,
) -> Result<String, CliError> {
    match format {
        OutputFormat::Table => Ok(summary_line(snap, painter)),
        OutputFormat::Plain => Ok(format!(
            "{} water={} foam={} pump={}",
            snap.observed_at.to_rfc3339(),
            snap.water_level_percent,
            snap.foam_percent,
            on_off(snap.pump_on)
        )),
        // Streams stay one document per line regardless of pretty/compact.
        _ => output::render_single(OutputFormat::JsonCompact, snap, |_| String::new(), |_| {
            String::new()
        }),
    }
}

fn summary_line(snap: &StatusSnapshot, painter: Painter) -> String {
    let pump = if snap.pump_on {
        painter.good("ON ")
    } else {
        painter.dim("OFF")
    };
    let mut line = format!(
        "{}  water {:>3}%  foam {:>3}%  pump {pump}  sensors {}/{}",
        painter.dim(&snap.last_updated().format("%H:%M:%S").to_string()),
        snap.water_level_percent,
        snap.foam_percent,
        snap.connected_sensor_count(),
        snap.connected_sensors.len(),
    );
    if snap.pump_manual_mode {
        line.push_str("  manual");
    }
    if snap.system_shutdown {
        line.push_str(&format!("  {}", painter.bad("SHUTDOWN")));
    }
    line
}

fn render_notification(note: &Notification, painter: Painter) -> String {
    let tag = match note.level {
        NotificationLevel::Success => painter.good("ok"),
        NotificationLevel::Error => painter.bad("error"),
        NotificationLevel::Warning => painter.warn("warn"),
        NotificationLevel::Info => painter.dim("info"),
    };
    format!("[{tag}] {}: {}", note.title, note.message)
}
