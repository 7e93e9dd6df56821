use rust_fsm::*;
use serde::{Deserialize, Serialize};

state_machine! {
    plan_wizard(Idle)

    Idle(HydrateWaitingForPlanName) => WaitingForPlanName,
    Idle(HydrateChoosingDay) => ChoosingDay,
    Idle(HydrateChoosingMuscleOrRest) => ChoosingMuscleOrRest,

    Idle(BeginPlan) => WaitingForPlanName,
    WaitingForPlanName(NamePlan) => ChoosingDay,
    ChoosingDay(PickDay) => ChoosingMuscleOrRest,
    ChoosingMuscleOrRest(PickMuscle) => ChoosingMuscleOrRest,
    ChoosingMuscleOrRest(PickRest) => Idle,
    ChoosingMuscleOrRest(Finish) => Idle
}

/// Where a user currently is in the plan-creation conversation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardState {
    #[default]
    Idle,
    WaitingForPlanName,
    ChoosingDay,
    ChoosingMuscleOrRest,
}

impl WizardState {
    pub fn is_idle(self) -> bool {
        matches!(self, WizardState::Idle)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WizardAction {
    BeginPlan,
    NamePlan,
    PickDay,
    PickMuscle,
    PickRest,
    Finish,
}

fn hydrate(machine: &mut plan_wizard::StateMachine, state: WizardState) -> Result<(), ()> {
    let input = match state {
        WizardState::Idle => return Ok(()),
        WizardState::WaitingForPlanName => plan_wizard::Input::HydrateWaitingForPlanName,
        WizardState::ChoosingDay => plan_wizard::Input::HydrateChoosingDay,
        WizardState::ChoosingMuscleOrRest => plan_wizard::Input::HydrateChoosingMuscleOrRest,
    };
    machine.consume(&input).map_err(|_| ())?;
    Ok(())
}

fn expected_next_state(current: WizardState, action: WizardAction) -> Option<WizardState> {
    match (current, action) {
        (WizardState::Idle, WizardAction::BeginPlan) => Some(WizardState::WaitingForPlanName),
        (WizardState::WaitingForPlanName, WizardAction::NamePlan) => Some(WizardState::ChoosingDay),
        (WizardState::ChoosingDay, WizardAction::PickDay) => {
            Some(WizardState::ChoosingMuscleOrRest)
        }
        (WizardState::ChoosingMuscleOrRest, WizardAction::PickMuscle) => {
            Some(WizardState::ChoosingMuscleOrRest)
        }
        (WizardState::ChoosingMuscleOrRest, WizardAction::PickRest) => Some(WizardState::Idle),
        (WizardState::ChoosingMuscleOrRest, WizardAction::Finish) => Some(WizardState::Idle),
        _ => None,
    }
}

pub fn transition(current: WizardState, action: WizardAction) -> Option<WizardState> {
    let mut machine = plan_wizard::StateMachine::new();
    hydrate(&mut machine, current).ok()?;

    let input = match action {
        WizardAction::BeginPlan => plan_wizard::Input::BeginPlan,
        WizardAction::NamePlan => plan_wizard::Input::NamePlan,
        WizardAction::PickDay => plan_wizard::Input::PickDay,
        WizardAction::PickMuscle => plan_wizard::Input::PickMuscle,
        WizardAction::PickRest => plan_wizard::Input::PickRest,
        WizardAction::Finish => plan_wizard::Input::Finish,
    };

    machine.consume(&input).ok()?;
    expected_next_state(current, action)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wizard_walks_name_day_muscle_done() {
        assert_eq!(
            transition(WizardState::Idle, WizardAction::BeginPlan),
            Some(WizardState::WaitingForPlanName)
        );
        assert_eq!(
            transition(WizardState::WaitingForPlanName, WizardAction::NamePlan),
            Some(WizardState::ChoosingDay)
        );
        assert_eq!(
            transition(WizardState::ChoosingDay, WizardAction::PickDay),
            Some(WizardState::ChoosingMuscleOrRest)
        );
        assert_eq!(
            transition(WizardState::ChoosingMuscleOrRest, WizardAction::PickMuscle),
            Some(WizardState::ChoosingMuscleOrRest)
        );
        assert_eq!(
            transition(WizardState::ChoosingMuscleOrRest, WizardAction::Finish),
            Some(WizardState::Idle)
        );
    }

    #[test]
    fn rest_ends_the_wizard() {
        assert_eq!(
            transition(WizardState::ChoosingMuscleOrRest, WizardAction::PickRest),
            Some(WizardState::Idle)
        );
    }

    #[test]
    fn wizard_rejects_out_of_order_steps() {
        assert_eq!(transition(WizardState::Idle, WizardAction::PickDay), None);
        assert_eq!(transition(WizardState::ChoosingDay, WizardAction::PickMuscle), None);
        assert_eq!(
            transition(WizardState::WaitingForPlanName, WizardAction::BeginPlan),
            None
        );
        assert_eq!(transition(WizardState::Idle, WizardAction::Finish), None);
    }
}
