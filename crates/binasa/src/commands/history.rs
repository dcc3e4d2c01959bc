//! `binasa history`: daily water/foam samples.

use binasa_core::{Controller, HistoryPoint};
use tabled::Tabled;

use crate::cli::{GlobalOpts, HistoryArgs, OutputFormat};
use crate::error::CliError;
use crate::output;

use super::util::parse_date;

#[derive(Tabled)]
struct HistoryRow {
    #[tabled(rename = "Time")]
    time: String,
    #[tabled(rename = "Water %")]
    water: String,
    #[tabled(rename = "Foam %")]
    foam: String,
}

impl HistoryRow {
    fn from_point(p: &HistoryPoint) -> Self {
        Self {
            time: p.hora.clone(),
            water: format!("{:.0}", p.agua),
            foam: format!("{:.0}", p.espuma),
        }
    }
}

pub async fn handle(
    args: HistoryArgs,
    controller: &Controller,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let date = parse_date(args.date.as_deref())?;
    let points = controller.history(date).await?;
    tracing::debug!(%date, samples = points.len(), "history fetched");

    if points.is_empty() && matches!(global.output, OutputFormat::Table) {
        if !global.quiet {
            eprintln!("No samples recorded on {date}.");
        }
        return Ok(());
    }

    let out = output::render_list(global.output, &points, HistoryRow::from_point, |p| {
        format!("{}\t{}\t{}", p.hora, p.agua, p.espuma)
    })?;
    output::print_output(&out, global.quiet);
    Ok(())
}
