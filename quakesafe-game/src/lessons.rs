//! Post-simulation lessons drawn from the player's choices.
use crate::constants::{
    LESSON_HIGH_RISK_FACTOR, LESSON_INTENSITY_THRESHOLD, LESSON_LOW_RISK_FACTOR,
    LESSON_PROTECTION_THRESHOLD, LESSON_UNDERSPEND_RATIO, REFERENCE_EVENT_MAGNITUDE,
};
use crate::numbers::i64_to_f64;
use crate::state::SessionState;

const STRUCTURE_LESSON: &str = "Building structural integrity is critical during severe earthquakes. Reinforced concrete and steel frames significantly increase survival rates in Nepal.";
const UNDERSPEND_LESSON: &str = "Underspending on preparedness can be costly. Data from Nepal shows that each dollar spent on preparedness saved approximately seven dollars in recovery costs.";

/// Lessons for the session, in rule order. Rules are independent; any subset may fire.
#[must_use]
pub fn generate_lessons(state: &SessionState, intensity: f64) -> Vec<String> {
    let mut lessons = Vec::new();

    let weak_structure = state
        .building_structure()
        .is_none_or(|s| s.protection_score < LESSON_PROTECTION_THRESHOLD);
    if weak_structure {
        lessons.push(STRUCTURE_LESSON.to_string());
    }

    if intensity > LESSON_INTENSITY_THRESHOLD {
        lessons.push(format!(
            "At magnitude {intensity:.1}, this earthquake was comparable to the {REFERENCE_EVENT_MAGNITUDE:.1} magnitude Nepal earthquake, which caused catastrophic damage to unreinforced structures."
        ));
    }

    let reserve = i64_to_f64(state.total_budget()) * LESSON_UNDERSPEND_RATIO;
    if i64_to_f64(state.available_funds()) > reserve {
        lessons.push(UNDERSPEND_LESSON.to_string());
    }

    if let Some(location) = state.location() {
        let name = &location.name;
        if location.earthquake_risk_factor > LESSON_HIGH_RISK_FACTOR {
            lessons.push(format!(
                "Living in {name}, a high-risk area, meant your building experienced stronger shaking than many other regions of Nepal. Data from 2015 showed that buildings in this region needed additional reinforcement to withstand such forces."
            ));
        } else if location.earthquake_risk_factor < LESSON_LOW_RISK_FACTOR {
            lessons.push(format!(
                "Though {name} experienced less intense shaking than other regions, the 2015 earthquake showed that distance from urban centers created challenges for emergency response and aid distribution."
            ));
        }
    }

    lessons
}
