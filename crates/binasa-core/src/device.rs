// ── Device seam ──
//
// The controller talks to the pump controller through this trait so the
// synchronization engine can run against an in-memory device in tests.

use binasa_api::{ControlReply, DeviceClient, HistoryPoint, PumpAction, StatusPayload};
use chrono::NaiveDate;
use futures_util::future::BoxFuture;

/// Request/response surface of the pump controller.
pub trait DeviceApi: Send + Sync {
    /// `GET /status`.
    fn fetch_status(&self) -> BoxFuture<'_, Result<StatusPayload, binasa_api::Error>>;

    /// `POST /control`.
    fn send_control(
        &self,
        action: PumpAction,
    ) -> BoxFuture<'_, Result<ControlReply, binasa_api::Error>>;

    /// `GET /history?date=...`.
    fn fetch_history(
        &self,
        date: NaiveDate,
    ) -> BoxFuture<'_, Result<Vec<HistoryPoint>, binasa_api::Error>>;
}

impl DeviceApi for DeviceClient {
    fn fetch_status(&self) -> BoxFuture<'_, Result<StatusPayload, binasa_api::Error>> {
        Box::pin(self.status())
    }

    fn send_control(
        &self,
        action: PumpAction,
    ) -> BoxFuture<'_, Result<ControlReply, binasa_api::Error>> {
        Box::pin(self.control(action))
    }

    fn fetch_history(
        &self,
        date: NaiveDate,
    ) -> BoxFuture<'_, Result<Vec<HistoryPoint>, binasa_api::Error>> {
        Box::pin(self.history(date))
    }
}
