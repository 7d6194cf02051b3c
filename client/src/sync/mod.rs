//! Sync pipeline: triggers in, view updates out.

mod controller;
mod trigger;

pub use controller::{OverlapPolicy, RefreshOutcome, SyncController, SyncStats, ViewState};
pub use trigger::{
    spawn_periodic, trigger_channel, Trigger, TriggerHandle, TRIGGER_QUEUE_CAPACITY,
};
