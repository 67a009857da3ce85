use std::fmt;
use std::str::FromStr;

use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// One lighting fixture from the catalog snapshot. Every field may be
/// missing in the source data; lookups degrade to `None`, never an error.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Product {
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub power_w: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub lumens: Option<f64>,
    #[serde(default)]
    pub ip_rating: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    /// Free-text spec line from the price list, fallback search field.
    #[serde(default)]
    pub raw: Option<String>,
}

/// Accepts a JSON number, a numeric string, or anything else (-> None).
/// Catalog rows come from spreadsheet extraction and are not trustworthy.
fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| match v {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }))
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Relevance {
    High,
    Low,
}

/// A catalog entry ranked against a query. Ephemeral: recomputed per
/// query, cached only by query+category key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoredProduct {
    #[serde(flatten)]
    pub product: Product,
    pub score: u32,
    pub relevance: Relevance,
    pub display_lumens: String,
}

/// Space category the customer is lighting.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SpaceType {
    Office,
    Workshop,
    Street,
    Warehouse,
    Custom,
}

impl SpaceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Office => "office",
            Self::Workshop => "workshop",
            Self::Street => "street",
            Self::Warehouse => "warehouse",
            Self::Custom => "custom",
        }
    }

    pub const ALL: [SpaceType; 5] = [
        Self::Office,
        Self::Workshop,
        Self::Street,
        Self::Warehouse,
        Self::Custom,
    ];
}

impl fmt::Display for SpaceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SpaceType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "office" => Ok(Self::Office),
            "workshop" => Ok(Self::Workshop),
            "street" => Ok(Self::Street),
            "warehouse" => Ok(Self::Warehouse),
            "custom" => Ok(Self::Custom),
            _ => Err(()),
        }
    }
}

/// Conversation step. Internally a tagged pair of space type and phase;
/// on the wire it keeps the legacy string vocabulary
/// (`"office_questions"`, `"recommendation_sent"`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Greeting,
    Questions(SpaceType),
    Recommendation(SpaceType),
    RecommendationSent,
    TransferToManager,
}

impl Step {
    pub fn wire_name(&self) -> String {
        match self {
            Self::Greeting => "greeting".to_owned(),
            Self::Questions(space) => format!("{space}_questions"),
            Self::Recommendation(space) => format!("{space}_recommendation"),
            Self::RecommendationSent => "recommendation_sent".to_owned(),
            Self::TransferToManager => "transfer_to_manager".to_owned(),
        }
    }

    /// Space type this step is scoped to, if any.
    pub fn space(&self) -> Option<SpaceType> {
        match self {
            Self::Questions(space) | Self::Recommendation(space) => Some(*space),
            _ => None,
        }
    }

    pub fn is_questions(&self) -> bool {
        matches!(self, Self::Questions(_))
    }
}

impl Default for Step {
    fn default() -> Self {
        Self::Greeting
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.wire_name())
    }
}

impl FromStr for Step {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "greeting" => return Ok(Self::Greeting),
            "recommendation_sent" => return Ok(Self::RecommendationSent),
            "transfer_to_manager" => return Ok(Self::TransferToManager),
            _ => {}
        }
        if let Some(space) = s.strip_suffix("_questions") {
            return space.parse().map(Self::Questions);
        }
        if let Some(space) = s.strip_suffix("_recommendation") {
            return space.parse().map(Self::Recommendation);
        }
        Err(())
    }
}

impl Serialize for Step {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.wire_name())
    }
}

impl<'de> Deserialize<'de> for Step {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse()
            .map_err(|()| D::Error::custom(format!("unknown conversation step: {s}")))
    }
}

/// Slots accumulated over the conversation. Values stay as the strings
/// the customer typed; later messages overwrite but never unset.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SpaceContext {
    #[serde(rename = "type", default)]
    pub space: Option<SpaceType>,
    #[serde(default)]
    pub area: Option<String>,
    #[serde(default)]
    pub height: Option<String>,
    #[serde(default)]
    pub lux: Option<String>,
}

impl SpaceContext {
    /// All sizing slots present: the dialogue can move to a recommendation.
    pub fn is_complete(&self) -> bool {
        self.area.is_some() && self.height.is_some() && self.lux.is_some()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One conversation turn kept in bounded history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub step: Step,
    pub context: SpaceContext,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    pub assistant_text: String,
    pub products: Vec<ScoredProduct>,
    pub session: SessionSnapshot,
}

/// Sizing context attached to a lead: the accumulated slots plus the
/// fixture count computed for them, when known.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct LeadContext {
    #[serde(flatten)]
    pub space: SpaceContext,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<u32>,
}

/// Quote request assembled from session state, handed to lead storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteLead {
    pub contact: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub products: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<LeadContext>,
}

/// Manager hand-off: contact plus the recent conversation verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferLead {
    pub contact: String,
    pub chat_history: Vec<Turn>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn product_tolerates_missing_and_junk_fields() {
        let p: Product = serde_json::from_str(
            r#"{"model":"NRG-TOP-100","power_w":"100","lumens":null,"ip_rating":"IP65"}"#,
        )
        .expect("parse");
        assert_eq!(p.model.as_deref(), Some("NRG-TOP-100"));
        assert_eq!(p.power_w, Some(100.0));
        assert_eq!(p.lumens, None);
        assert_eq!(p.name, None);

        let junk: Product =
            serde_json::from_str(r#"{"power_w":{"nested":true},"lumens":"13000"}"#).expect("parse");
        assert_eq!(junk.power_w, None);
        assert_eq!(junk.lumens, Some(13000.0));
    }

    #[test]
    fn step_wire_roundtrip() {
        let steps = [
            Step::Greeting,
            Step::Questions(SpaceType::Office),
            Step::Recommendation(SpaceType::Warehouse),
            Step::RecommendationSent,
            Step::TransferToManager,
        ];
        for step in steps {
            let json = serde_json::to_string(&step).expect("serialize");
            let back: Step = serde_json::from_str(&json).expect("deserialize");
            assert_eq!(step, back);
        }
        assert_eq!(
            serde_json::to_string(&Step::Questions(SpaceType::Office)).expect("serialize"),
            "\"office_questions\""
        );
    }

    #[test]
    fn step_rejects_unknown_vocabulary() {
        assert!(serde_json::from_str::<Step>("\"lobby_questions\"").is_err());
        assert!(serde_json::from_str::<Step>("\"done\"").is_err());
    }

    #[test]
    fn chat_request_accepts_camel_case_session_id() {
        let req: ChatRequest =
            serde_json::from_str(r#"{"message":"офис","sessionId":"abc"}"#).expect("parse");
        assert_eq!(req.session_id.as_deref(), Some("abc"));

        let bare: ChatRequest = serde_json::from_str(r#"{"message":"офис"}"#).expect("parse");
        assert!(bare.session_id.is_none());
    }

    #[test]
    fn context_completeness() {
        let mut ctx = SpaceContext::default();
        assert!(!ctx.is_complete());
        ctx.area = Some("50".into());
        ctx.height = Some("3".into());
        assert!(!ctx.is_complete());
        ctx.lux = Some("400".into());
        assert!(ctx.is_complete());
    }
}
