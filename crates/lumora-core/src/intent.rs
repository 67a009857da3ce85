//! Free-text intent and slot heuristics, kept behind a typed interface so
//! the state machine never touches raw pattern matching.

use std::sync::LazyLock;

use lumora_schema::SpaceType;
use regex::Regex;

static AREA_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d+)\s*(?:м2|м²|кв\.?\s*м)").expect("area pattern"));
static HEIGHT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)высот[^\d]{0,20}(\d+)\s*м").expect("height pattern"));
static LUX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d+)\s*лк").expect("lux pattern"));

const TRANSFER_TOKENS: &[&str] = &[
    "менеджер",
    "оператор",
    "человек",
    "свяжитесь",
    "позвоните",
    "перезвон",
];

const EXAMPLE_TOKENS: &[&str] = &["пример", "покажи"];

const ALTERNATIVE_TOKENS: &[&str] = &["други", "альтернатив", "ещё вариант", "еще вариант"];

const SPACE_VOCAB: &[(SpaceType, &[&str])] = &[
    (SpaceType::Office, &["офис", "кабинет"]),
    (SpaceType::Workshop, &["цех", "мастерск", "производств"]),
    (
        SpaceType::Street,
        &["улиц", "уличн", "двор", "парковк", "территори"],
    ),
    (SpaceType::Warehouse, &["склад", "ангар"]),
];

const CUSTOM_VOCAB: &[&str] = &["стадион", "парк", "спорт", "площадк", "объект", "проект"];

fn contains_any(message_lower: &str, tokens: &[&str]) -> bool {
    tokens.iter().any(|t| message_lower.contains(t))
}

/// "Talk to a human" request, honored from any state.
pub fn wants_transfer(message_lower: &str) -> bool {
    contains_any(message_lower, TRANSFER_TOKENS)
}

/// "Show me an example" request for canned parameters.
pub fn wants_example(message_lower: &str) -> bool {
    contains_any(message_lower, EXAMPLE_TOKENS)
}

/// "Show other options" request for a broader listing.
pub fn wants_alternatives(message_lower: &str) -> bool {
    contains_any(message_lower, ALTERNATIVE_TOKENS)
}

/// Space category mentioned in the message. Concrete space types win over
/// the generic "custom object" vocabulary.
pub fn detect_space_type(message_lower: &str) -> Option<SpaceType> {
    for (space, tokens) in SPACE_VOCAB {
        if contains_any(message_lower, tokens) {
            return Some(*space);
        }
    }
    if contains_any(message_lower, CUSTOM_VOCAB) {
        return Some(SpaceType::Custom);
    }
    None
}

/// Numeric slots extracted from one message. Values stay as the digit
/// strings the customer typed; no unit conversion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SlotUpdate {
    pub area: Option<String>,
    pub height: Option<String>,
    pub lux: Option<String>,
}

impl SlotUpdate {
    pub fn is_empty(&self) -> bool {
        self.area.is_none() && self.height.is_none() && self.lux.is_none()
    }
}

/// Pull area, height and target illuminance out of the raw (not
/// lowercased) message. First match per slot wins within one message.
pub fn extract_slots(message: &str) -> SlotUpdate {
    SlotUpdate {
        area: AREA_RE.captures(message).map(|c| c[1].to_owned()),
        height: HEIGHT_RE.captures(message).map(|c| c[1].to_owned()),
        lux: LUX_RE.captures(message).map(|c| c[1].to_owned()),
    }
}

/// Canned parameters per space type, used when the customer asks for an
/// example instead of giving real numbers.
pub fn example_defaults(space: SpaceType) -> SlotUpdate {
    let (area, height, lux) = match space {
        SpaceType::Office => ("50", "3", "400"),
        SpaceType::Workshop => ("200", "6", "300"),
        SpaceType::Street => ("500", "8", "20"),
        SpaceType::Warehouse => ("1000", "8", "200"),
        SpaceType::Custom => ("300", "5", "200"),
    };
    SlotUpdate {
        area: Some(area.to_owned()),
        height: Some(height.to_owned()),
        lux: Some(lux.to_owned()),
    }
}
