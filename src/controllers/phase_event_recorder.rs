use crate::Error;
use derive_more::Display;
use kube::runtime::events::{Event, EventType, Recorder};

pub struct PhaseEventRecorder(Recorder);

impl From<Recorder> for PhaseEventRecorder {
    fn from(recorder: Recorder) -> Self {
        PhaseEventRecorder(recorder)
    }
}

impl PhaseEventRecorder {
    pub async fn info<N>(&self, action: EventAction, reason: EventReason, note: N) -> Result<(), Error>
    where
        N: Into<String>,
    {
        self.publish(EventType::Normal, action, reason, note).await
    }

    pub async fn warn<N>(&self, action: EventAction, reason: EventReason, note: N) -> Result<(), Error>
    where
        N: Into<String>,
    {
        self.publish(EventType::Warning, action, reason, note).await
    }

    pub async fn publish<N>(&self, type_: EventType, action: EventAction, reason: EventReason, note: N) -> Result<(), Error>
    where
        N: Into<String>,
    {
        Ok(self
            .0
            .publish(Event {
                type_,
                action: action.to_string(),
                reason: reason.to_string(),
                note: Some(note.into()),
                secondary: None,
            })
            .await?)
    }
}

#[derive(Display, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventAction {
    #[display("SyncPhase")]
    SyncPhase,
}

#[derive(Display, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventReason {
    #[display("PhaseChanged")]
    PhaseChanged,
}
