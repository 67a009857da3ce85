//! The dialogue state machine, separated from text heuristics (intent
//! module) and from delivery (dialog module) so transitions are testable
//! on their own.

use lumora_schema::{SpaceType, Step};
use lumora_session::SessionState;

use crate::intent;

/// What the controller should do after transitions were applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Hand off to the manager-transfer collaborator; no catalog or LLM
    /// work this turn.
    Transfer,
    /// Still in greeting: ask which kind of space is being lit.
    AskSpaceType,
    /// Collecting slots: ask exactly one clarifying question.
    AskSlot { space: SpaceType, slot: Slot },
    /// Enough is known: match products and recommend.
    Recommend {
        space: Option<SpaceType>,
        broaden: bool,
    },
}

/// A slot the dialogue still needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    Area,
    Height,
    Lux,
}

/// First slot still missing, in the order the conversation asks for them.
pub fn next_missing_slot(state: &SessionState) -> Option<Slot> {
    if state.context.area.is_none() {
        Some(Slot::Area)
    } else if state.context.height.is_none() {
        Some(Slot::Height)
    } else if state.context.lux.is_none() {
        Some(Slot::Lux)
    } else {
        None
    }
}

/// Apply one incoming message to the session state. Transition rules run
/// in priority order: transfer request, greeting space detection, slot
/// extraction (last write wins, never unset), example defaults, and the
/// questions→recommendation advance once all slots are present.
pub fn advance(state: &mut SessionState, message: &str) -> Outcome {
    let lower = message.to_lowercase();

    if intent::wants_transfer(&lower) {
        state.step = Step::TransferToManager;
        return Outcome::Transfer;
    }

    if state.step == Step::Greeting {
        if let Some(space) = intent::detect_space_type(&lower) {
            state.context.space = Some(space);
            state.step = Step::Questions(space);
        }
    }

    let slots = intent::extract_slots(message);
    apply_slots(state, &slots);

    let nothing_known = state.context.area.is_none()
        && state.context.height.is_none()
        && state.context.lux.is_none();
    if nothing_known && intent::wants_example(&lower) {
        let space = state.context.space.unwrap_or(SpaceType::Custom);
        apply_slots(state, &intent::example_defaults(space));
    }

    if state.context.is_complete() && state.step.is_questions() {
        if let Step::Questions(space) = state.step {
            state.step = Step::Recommendation(space);
        }
    }

    match state.step {
        Step::TransferToManager => Outcome::Transfer,
        Step::Recommendation(space) => Outcome::Recommend {
            space: Some(space),
            broaden: false,
        },
        Step::RecommendationSent => Outcome::Recommend {
            space: state.context.space,
            broaden: intent::wants_alternatives(&lower),
        },
        Step::Questions(space) => {
            state.questions_asked += 1;
            let slot = next_missing_slot(state).unwrap_or(Slot::Area);
            Outcome::AskSlot { space, slot }
        }
        Step::Greeting => {
            state.questions_asked += 1;
            Outcome::AskSpaceType
        }
    }
}

fn apply_slots(state: &mut SessionState, slots: &intent::SlotUpdate) {
    if let Some(area) = &slots.area {
        state.context.area = Some(area.clone());
    }
    if let Some(height) = &slots.height {
        state.context.height = Some(height.clone());
    }
    if let Some(lux) = &slots.lux {
        state.context.lux = Some(lux.clone());
    }
}
