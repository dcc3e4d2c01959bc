//! Shared helpers for command handlers.

use std::future::Future;
use std::io::{self, IsTerminal};
use std::pin::Pin;

use binasa_core::{Confirmation, PumpAction};
use chrono::{Local, NaiveDate};

use crate::error::CliError;

/// Prompt for confirmation, auto-approving if `--yes` was passed.
pub fn confirm(message: &str, yes_flag: bool) -> Result<bool, CliError> {
    if yes_flag {
        return Ok(true);
    }
    let confirmed = dialoguer::Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()
        .map_err(|e| CliError::Io(io::Error::other(e)))?;
    Ok(confirmed)
}

/// Fail early when a prompt would be needed but nobody can answer it.
pub fn ensure_interactive(action: PumpAction, yes_flag: bool) -> Result<(), CliError> {
    if yes_flag || io::stdin().is_terminal() {
        Ok(())
    } else {
        Err(CliError::NonInteractiveRequiresYes { action })
    }
}

/// Terminal prompt for pump commands.
///
/// The prompt blocks on stdin, so it runs on the blocking pool while the
/// controller keeps ingesting updates.
#[derive(Debug, Clone, Copy)]
pub struct PromptConfirmation {
    pub yes: bool,
}

impl Confirmation for PromptConfirmation {
    fn confirm(&self, action: PumpAction) -> Pin<Box<dyn Future<Output = bool> + Send + '_>> {
        let yes = self.yes;
        Box::pin(async move {
            let prompt = format!("Switch the pump {action}?");
            match tokio::task::spawn_blocking(move || confirm(&prompt, yes)).await {
                Ok(Ok(answer)) => answer,
                Ok(Err(e)) => {
                    tracing::warn!(error = %e, "confirmation prompt failed");
                    false
                }
                Err(e) => {
                    tracing::warn!(error = %e, "confirmation prompt task panicked");
                    false
                }
            }
        })
    }
}

/// Parse a `--date` value, defaulting to today in local time.
pub fn parse_date(raw: Option<&str>) -> Result<NaiveDate, CliError> {
    match raw {
        None => Ok(Local::now().date_naive()),
        Some(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map_err(|e| {
            CliError::Validation {
                field: "date".into(),
                reason: format!("expected YYYY-MM-DD, got '{s}': {e}"),
            }
        }),
    }
}

/// `on` / `off` label for a pump state.
pub fn on_off(on: bool) -> &'static str {
    if on { "on" } else { "off" }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn parses_iso_dates() {
        assert_eq!(
            parse_date(Some("2024-03-09")).unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 9).unwrap()
        );
    }

    #[test]
    fn rejects_other_date_formats() {
        let err = parse_date(Some("09/03/2024")).unwrap_err();
        assert!(matches!(err, CliError::Validation { ref field, .. } if field == "date"));
    }

    #[tokio::test]
    async fn yes_flag_confirms_without_prompting() {
        let confirmation = PromptConfirmation { yes: true };
        assert!(confirmation.confirm(PumpAction::On).await);
        assert!(ensure_interactive(PumpAction::On, true).is_ok());
    }
}
