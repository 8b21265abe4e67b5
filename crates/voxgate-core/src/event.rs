// ── Door-update events ───────────────────────────────────────────────
//
// Each account owns one broadcast channel; the watcher publishes every
// genuinely new door-log entry on it exactly once. Entries keep the
// vendor's field names when serialized, so an embedder can re-fire
// them on its own bus under `DOOR_UPDATE_EVENT` unchanged.

use std::sync::Arc;

use tokio::sync::broadcast;
use voxgate_api::models::DoorLogEntry;

/// Bus event name embedders fire for each new door-log entry.
pub const DOOR_UPDATE_EVENT: &str = "akuvox_door_update";

/// Buffered events per subscriber before lag kicks in.
const EVENT_CHANNEL_SIZE: usize = 64;

pub type DoorEventSender = broadcast::Sender<Arc<DoorLogEntry>>;
pub type DoorEventReceiver = broadcast::Receiver<Arc<DoorLogEntry>>;

/// Create the per-account door-event channel.
pub fn door_event_channel() -> (DoorEventSender, DoorEventReceiver) {
    broadcast::channel(EVENT_CHANNEL_SIZE)
}
