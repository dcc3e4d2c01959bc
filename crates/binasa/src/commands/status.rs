//! `binasa status`: one fetch, one render.

use binasa_core::{Connectivity, Controller, StatusSnapshot};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output::{self, Painter};

use super::util::on_off;

pub async fn handle(controller: &Controller, global: &GlobalOpts) -> Result<(), CliError> {
    let snap = controller.refresh().await?;
    let painter = Painter::new(global.color);
    let out = render_snapshot(global, &snap, painter)?;
    output::print_output(&out, global.quiet);
    Ok(())
}

/// Render a snapshot in the selected output format.
pub fn render_snapshot(
    global: &GlobalOpts,
    snap: &StatusSnapshot,
    painter: Painter,
) -> Result<String, CliError> {
    output::render_single(global.output, snap, |s| detail(s, painter), plain)
}

fn detail(s: &StatusSnapshot, painter: Painter) -> String {
    let pump = match (s.pump_on, s.pump_manual_mode) {
        (true, true) => format!("{} (manual)", painter.good("ON")),
        (true, false) => painter.good("ON"),
        (false, true) => format!("{} (manual)", painter.dim("OFF")),
        (false, false) => painter.dim("OFF"),
    };
    let system = if s.system_shutdown {
        painter.bad("SHUTDOWN")
    } else {
        painter.good("running")
    };
    let sensors = s
        .connected_sensors
        .iter()
        .map(|c| if *c { "●" } else { "○" })
        .collect::<Vec<_>>()
        .join(" ");
    let foam = match s.foam_threshold {
        Some(limit) if s.foam_percent >= limit => {
            painter.warn(&format!("{}% (limit {limit}%)", s.foam_percent))
        }
        Some(limit) => format!("{}% (limit {limit}%)", s.foam_percent),
        None => format!("{}%", s.foam_percent),
    };

    let mut rows = vec![
        ("Water", format!("{}%", s.water_level_percent)),
        ("Foam", foam),
        ("Pump", pump),
        ("System", system),
        (
            "Sensors",
            format!(
                "{sensors}  ({}/{} connected)",
                s.connected_sensor_count(),
                s.connected_sensors.len()
            ),
        ),
    ];
    if let Some(ref t) = s.device_time {
        rows.push(("Device time", t.clone()));
    }
    rows.push((
        "Updated",
        painter.dim(&format!(
            "{} via {}",
            s.last_updated().format("%H:%M:%S"),
            s.source
        )),
    ));
    output::detail_block(&rows)
}

fn plain(s: &StatusSnapshot) -> String {
    format!(
        "water={}\nfoam={}\npump={}\nmanual={}\nshutdown={}\nsensors={}",
        s.water_level_percent,
        s.foam_percent,
        on_off(s.pump_on),
        s.pump_manual_mode,
        s.system_shutdown,
        s.connected_sensor_count()
    )
}

/// One-line link indicator, e.g. `live` or `polling (connection refused)`.
pub fn link_label(c: &Connectivity, painter: Painter) -> String {
    use binasa_core::LinkMode;

    let mode = c.mode();
    let label = mode.to_string();
    let label = match mode {
        LinkMode::Live => painter.good(&label),
        LinkMode::Polling => painter.warn(&label),
        LinkMode::Degraded => painter.bad(&label),
    };
    match (&c.last_error, mode) {
        (Some(err), LinkMode::Degraded) => format!("{label} ({err})"),
        _ => label,
    }
}
