use crate::messages::EventUserUpdate;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PresenceChange {
    Appeared,
    Disappeared,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PresenceEvent {
    pub change: PresenceChange,
    pub update: EventUserUpdate,
}

/// Ordered roster of tracked user ids, insertion order preserved.
#[derive(Debug, Default)]
pub struct PresenceTracker {
    roster: Vec<i32>,
}

impl PresenceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn roster(&self) -> &[i32] {
        &self.roster
    }

    /// The engine never re-announces a live id, so duplicates are not checked.
    pub fn on_appear(&mut self, id: i32) -> PresenceEvent {
        self.roster.push(id);
        self.event(PresenceChange::Appeared, id)
    }

    /// Unknown ids produce no event.
    pub fn on_disappear(&mut self, id: i32) -> Option<PresenceEvent> {
        let pos = self.roster.iter().position(|&known| known == id)?;
        self.roster.remove(pos);
        Some(self.event(PresenceChange::Disappeared, id))
    }

    pub fn clear(&mut self) {
        self.roster.clear();
    }

    fn event(&self, change: PresenceChange, id: i32) -> PresenceEvent {
        PresenceEvent {
            change,
            update: EventUserUpdate {
                key_id: id,
                user_ids: self.roster.clone(),
            },
        }
    }
}
