// ── Pump command types ──
//
// At most one pump command is in flight. The slot is claimed before the
// request goes out and released when the reply (or failure) comes back,
// whichever way the dispatch future exits.

use std::sync::{Mutex, PoisonError};

use binasa_api::PumpAction;
use chrono::{DateTime, Utc};
use futures_util::future::BoxFuture;
use serde::Serialize;

use crate::error::CoreError;

/// Shown when the device gave no usable explanation for a failure.
pub const GENERIC_COMMAND_FAILURE: &str = "Could not control the pump";

/// Operator confirmation for a pump command.
///
/// Implemented by the presentation layer (a prompt, a dialog, a `--yes`
/// flag). Returning `false` cancels the command before anything is sent.
pub trait Confirmation: Send + Sync {
    fn confirm(&self, action: PumpAction) -> BoxFuture<'_, bool>;
}

impl<F> Confirmation for F
where
    F: Fn(PumpAction) -> bool + Send + Sync,
{
    fn confirm(&self, action: PumpAction) -> BoxFuture<'_, bool> {
        let answer = self(action);
        Box::pin(async move { answer })
    }
}

/// Confirms every command without asking.
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoConfirm;

impl Confirmation for AutoConfirm {
    fn confirm(&self, _action: PumpAction) -> BoxFuture<'_, bool> {
        Box::pin(async { true })
    }
}

/// The command currently awaiting a device reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PendingCommand {
    pub action: PumpAction,
    pub issued_at: DateTime<Utc>,
}

/// How a dispatched command ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    /// The device accepted the command. The displayed pump state changes
    /// only once a later snapshot confirms it.
    Sent {
        action: PumpAction,
        /// Device acknowledgement text, e.g. "Bomba encendida".
        message: Option<String>,
    },
    /// The operator declined; nothing was sent.
    Cancelled,
}

// ── Pending slot ─────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub(crate) struct PendingSlot {
    slot: Mutex<Option<PendingCommand>>,
}

impl PendingSlot {
    pub(crate) fn get(&self) -> Option<PendingCommand> {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Occupy the slot, or report the command already holding it.
    pub(crate) fn claim(&self, action: PumpAction) -> Result<PendingGuard<'_>, CoreError> {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(pending) = *slot {
            return Err(CoreError::CommandPending {
                action: pending.action,
                since: pending.issued_at,
            });
        }
        *slot = Some(PendingCommand {
            action,
            issued_at: Utc::now(),
        });
        Ok(PendingGuard { owner: self })
    }

    fn clear(&self) {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

/// Releases the pending slot on drop.
pub(crate) struct PendingGuard<'a> {
    owner: &'a PendingSlot,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.owner.clear();
    }
}
