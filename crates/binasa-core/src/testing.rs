// In-memory pump controller for engine tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use binasa_api::{ControlReply, HistoryPoint, PumpAction, StatusPayload};
use chrono::NaiveDate;
use futures_util::future::BoxFuture;
use serde_json::Value;
use tokio::sync::Semaphore;

use crate::device::DeviceApi;

#[derive(Debug, Clone)]
pub(crate) enum ControlBehavior {
    /// Accept and flip the pump, answering like the firmware does.
    Accept,
    /// `{"error": ...}` with HTTP 200.
    DeviceError(String),
    /// Bare non-success status.
    Http(u16),
}

struct State {
    /// `None` makes `/status` fail with a 503.
    status: Option<Value>,
    control: ControlBehavior,
}

pub(crate) struct FakeDevice {
    state: Mutex<State>,
    gate: Semaphore,
    held: Mutex<bool>,
    pub(crate) status_calls: AtomicUsize,
    pub(crate) control_calls: AtomicUsize,
}

impl FakeDevice {
    pub(crate) fn new(status: Value) -> Self {
        Self {
            state: Mutex::new(State {
                status: Some(status),
                control: ControlBehavior::Accept,
            }),
            gate: Semaphore::new(0),
            held: Mutex::new(false),
            status_calls: AtomicUsize::new(0),
            control_calls: AtomicUsize::new(0),
        }
    }

    fn state(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn set_status(&self, status: Option<Value>) {
        self.state().status = status;
    }

    pub(crate) fn set_control(&self, behavior: ControlBehavior) {
        self.state().control = behavior;
    }

    /// The current status document as a payload.
    #[allow(clippy::unwrap_used)]
    pub(crate) fn payload(&self) -> StatusPayload {
        StatusPayload::from_value(self.state().status.clone().unwrap()).unwrap()
    }

    /// Park `send_control` until [`release_control`](Self::release_control).
    pub(crate) fn hold_control(&self) {
        *self.held.lock().unwrap_or_else(PoisonError::into_inner) = true;
    }

    pub(crate) fn release_control(&self) {
        *self.held.lock().unwrap_or_else(PoisonError::into_inner) = false;
        self.gate.add_permits(1);
    }

    fn is_held(&self) -> bool {
        *self.held.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl DeviceApi for FakeDevice {
    fn fetch_status(&self) -> BoxFuture<'_, Result<StatusPayload, binasa_api::Error>> {
        Box::pin(async move {
            self.status_calls.fetch_add(1, Ordering::SeqCst);
            let status = self.state().status.clone();
            match status {
                Some(value) => StatusPayload::from_value(value),
                None => Err(binasa_api::Error::Http {
                    status: 503,
                    message: None,
                }),
            }
        })
    }

    fn send_control(
        &self,
        action: PumpAction,
    ) -> BoxFuture<'_, Result<ControlReply, binasa_api::Error>> {
        Box::pin(async move {
            self.control_calls.fetch_add(1, Ordering::SeqCst);
            if self.is_held() {
                if let Ok(permit) = self.gate.acquire().await {
                    permit.forget();
                }
            }

            let mut state = self.state();
            match state.control.clone() {
                ControlBehavior::Accept => {
                    if let Some(Value::Object(doc)) = state.status.as_mut() {
                        doc.insert("pump".into(), Value::Bool(action.target_state()));
                    }
                    let message = match action {
                        PumpAction::On => "Bomba encendida",
                        PumpAction::Off => "Bomba apagada",
                    };
                    Ok(ControlReply {
                        status: Some("ok".into()),
                        message: Some(message.into()),
                        error: None,
                    })
                }
                ControlBehavior::DeviceError(message) => Err(binasa_api::Error::Device { message }),
                ControlBehavior::Http(status) => Err(binasa_api::Error::Http {
                    status,
                    message: None,
                }),
            }
        })
    }

    fn fetch_history(
        &self,
        _date: NaiveDate,
    ) -> BoxFuture<'_, Result<Vec<HistoryPoint>, binasa_api::Error>> {
        Box::pin(async { Ok(Vec::new()) })
    }
}
