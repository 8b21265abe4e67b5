// voxgate-core: Account lifecycle and door-log watching on top of voxgate-api.

pub mod account;
pub mod config;
pub mod convert;
pub mod error;
pub mod event;
pub mod model;
pub mod poller;
pub mod store;

// ── Primary re-exports ──────────────────────────────────────────────
pub use account::{Account, AccountState};
pub use config::{AccountConfig, ScreenshotPolicy, SignIn};
pub use error::CoreError;
pub use event::{DOOR_UPDATE_EVENT, DoorEventReceiver, DoorEventSender};
pub use poller::{DoorLogPoller, LogDecision};
pub use store::{AccountStore, StoreError};

// Re-export model types at the crate root for ergonomics.
pub use model::{Camera, DeviceSnapshot, DeviceTopology, DoorRelay, KeyDoor, TemporaryKey};

// The event payload type comes from the API crate; embedders usually
// only ever touch it through here.
pub use voxgate_api::models::DoorLogEntry;
