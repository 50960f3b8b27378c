//! HTTP handlers for towa-api.

pub mod fees;
pub mod health;
pub mod index;
pub mod letters;
pub mod moderation;
pub mod openings;
pub mod stats;
pub mod telemetry;

use towa_core::TelemetryEvent;

use crate::AppState;

/// Record a side-effect telemetry event. Failures are logged, never surfaced.
pub(crate) async fn emit(state: &AppState, event: TelemetryEvent) {
    let kind = event.event;
    if let Err(e) = state.telemetry.record(event).await {
        tracing::warn!(
            subsystem = "api",
            component = "telemetry",
            event = %kind,
            error = %e,
            "Telemetry event dropped"
        );
    }
}
