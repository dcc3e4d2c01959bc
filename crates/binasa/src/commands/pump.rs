//! `binasa pump`: toggle the pump and wait for the device to confirm.

use std::time::Duration;

use binasa_core::{CommandOutcome, Controller, PumpAction};

use crate::cli::{GlobalOpts, PumpArgs, PumpCommand};
use crate::error::CliError;
use crate::output::{self, Painter};

use super::status::render_snapshot;
use super::util::{PromptConfirmation, ensure_interactive};

pub async fn handle(
    args: PumpArgs,
    controller: &Controller,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        PumpCommand::Toggle { wait, no_wait } => {
            // Keep snapshots flowing so the confirmation can arrive by push,
            // poll or the post-command re-sync, whichever comes first.
            controller.start().await?;
            let result = toggle(controller, global, (!no_wait).then_some(wait)).await;
            controller.stop().await;
            result
        }
    }
}

async fn toggle(
    controller: &Controller,
    global: &GlobalOpts,
    wait_secs: Option<u64>,
) -> Result<(), CliError> {
    let painter = Painter::new(global.color);
    let current = controller.refresh().await?;
    let planned = PumpAction::toggle_from(current.pump_on);
    ensure_interactive(planned, global.yes)?;

    let mut snapshots = controller.snapshots();
    let outcome = controller
        .issue_command(&PromptConfirmation { yes: global.yes })
        .await?;

    let (action, message) = match outcome {
        CommandOutcome::Cancelled => {
            if !global.quiet {
                eprintln!("Cancelled, nothing was sent.");
            }
            return Ok(());
        }
        CommandOutcome::Sent { action, message } => (action, message),
    };

    if !global.quiet {
        eprintln!(
            "{} {}",
            painter.good("✓"),
            message.as_deref().unwrap_or("Command accepted")
        );
    }

    let Some(secs) = wait_secs else {
        return Ok(());
    };

    let target = action.target_state();
    let confirmed = tokio::time::timeout(
        Duration::from_secs(secs),
        snapshots.wait_for(|s| s.pump_on == target),
    )
    .await;

    match confirmed {
        Ok(Some(snap)) => {
            tracing::info!(%action, source = %snap.source, "pump state confirmed");
            let out = render_snapshot(global, &snap, painter)?;
            output::print_output(&out, global.quiet);
            Ok(())
        }
        Ok(None) => Err(CliError::Internal("snapshot stream closed".into())),
        Err(_) => Err(CliError::Unconfirmed {
            action,
            seconds: secs,
        }),
    }
}
