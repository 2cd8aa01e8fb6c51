pub mod phase_event_recorder;
pub mod phase_sync;
