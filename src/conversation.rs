use std::collections::HashMap;
use std::sync::Mutex;

use serde::Serialize;

use crate::wizard_fsm::WizardState;

/// Identifiers the wizard carries between messages.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionKey {
    PlanId,
    DayId,
    MuscleGroupId,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SessionData {
    pub plan_id: Option<i32>,
    pub day_id: Option<i32>,
    pub muscle_group_id: Option<i32>,
}

impl SessionData {
    pub fn get(&self, key: SessionKey) -> Option<i32> {
        match key {
            SessionKey::PlanId => self.plan_id,
            SessionKey::DayId => self.day_id,
            SessionKey::MuscleGroupId => self.muscle_group_id,
        }
    }

    pub fn set(&mut self, key: SessionKey, value: i32) {
        let slot = match key {
            SessionKey::PlanId => &mut self.plan_id,
            SessionKey::DayId => &mut self.day_id,
            SessionKey::MuscleGroupId => &mut self.muscle_group_id,
        };
        *slot = Some(value);
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Session {
    pub state: WizardState,
    pub data: SessionData,
}

impl Session {
    pub fn idle() -> Self {
        Self::default()
    }

    pub fn with_state(mut self, state: WizardState) -> Self {
        self.state = state;
        self
    }

    pub fn with(mut self, key: SessionKey, value: i32) -> Self {
        self.data.set(key, value);
        self
    }
}

/// In-memory conversation sessions keyed by the chat user's external id.
///
/// Sessions live as long as the process does. Users never share a session and
/// the last write for a user wins.
#[derive(Default)]
pub struct ConversationStore {
    sessions: Mutex<HashMap<i64, Session>>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, user: i64) -> Session {
        self.with_sessions(|sessions| sessions.get(&user).cloned().unwrap_or_default())
    }

    pub fn state(&self, user: i64) -> WizardState {
        self.get(user).state
    }

    pub fn set(&self, user: i64, state: WizardState) {
        self.with_sessions(|sessions| {
            sessions.entry(user).or_default().state = state;
        });
    }

    pub fn update(&self, user: i64, key: SessionKey, value: i32) {
        self.with_sessions(|sessions| {
            sessions.entry(user).or_default().data.set(key, value);
        });
    }

    pub fn replace(&self, user: i64, session: Session) {
        self.with_sessions(|sessions| {
            if session == Session::idle() {
                sessions.remove(&user);
            } else {
                sessions.insert(user, session);
            }
        });
    }

    pub fn clear(&self, user: i64) {
        self.with_sessions(|sessions| {
            sessions.remove(&user);
        });
    }

    #[cfg(test)]
    fn active_count(&self) -> usize {
        self.with_sessions(|sessions| sessions.len())
    }

    fn with_sessions<R>(&self, f: impl FnOnce(&mut HashMap<i64, Session>) -> R) -> R {
        let mut guard = match self.sessions.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut guard)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_user_reads_as_idle() {
        let store = ConversationStore::new();
        assert_eq!(store.get(7), Session::idle());
        assert!(store.state(7).is_idle());
    }

    #[test]
    fn set_update_and_clear() {
        let store = ConversationStore::new();
        store.set(1, WizardState::ChoosingDay);
        store.update(1, SessionKey::PlanId, 12);
        store.update(1, SessionKey::DayId, 3);

        let session = store.get(1);
        assert_eq!(session.state, WizardState::ChoosingDay);
        assert_eq!(session.data.get(SessionKey::PlanId), Some(12));
        assert_eq!(session.data.get(SessionKey::DayId), Some(3));
        assert_eq!(session.data.get(SessionKey::MuscleGroupId), None);

        store.clear(1);
        assert_eq!(store.get(1), Session::idle());
        assert_eq!(store.active_count(), 0);
    }

    #[test]
    fn sessions_are_independent_per_user() {
        let store = ConversationStore::new();
        store.set(1, WizardState::WaitingForPlanName);
        store.set(2, WizardState::ChoosingDay);
        store.clear(1);

        assert!(store.state(1).is_idle());
        assert_eq!(store.state(2), WizardState::ChoosingDay);
    }

    #[test]
    fn replacing_with_idle_forgets_the_user() {
        let store = ConversationStore::new();
        store.replace(
            5,
            Session::idle()
                .with_state(WizardState::ChoosingMuscleOrRest)
                .with(SessionKey::DayId, 9),
        );
        assert_eq!(store.active_count(), 1);

        store.replace(5, Session::idle());
        assert_eq!(store.active_count(), 0);
    }
}
