use std::sync::Arc;
use std::time::Duration;

use lumora_catalog::{
    category_for_space, estimate_lumens, fixture_quantity, Matcher, BROAD_LIMIT, DEFAULT_LIMIT,
};
use lumora_provider::{LlmMessage, LlmProvider, LlmRequest};
use lumora_schema::{
    ChatRequest, ChatResponse, LeadContext, QuoteLead, Role, ScoredProduct, SessionSnapshot,
    TransferLead, Turn,
};
use lumora_session::{HistoryStore, SessionState, SessionStore};
use tracing::{debug, warn};

use crate::config::ScenarioConfig;
use crate::error::ChatError;
use crate::machine::{self, Outcome};
use crate::prompt;

const LLM_MAX_TOKENS: u32 = 600;
const LLM_TEMPERATURE: f32 = 0.5;

/// Orchestrates one chat turn: classify the message, update session
/// state, match products, size the installation, and assemble the reply
/// via the LLM collaborator with a scripted fallback.
///
/// All collaborators are injected; the controller owns no global state.
pub struct DialogueController {
    matcher: Arc<Matcher>,
    sessions: Arc<SessionStore>,
    history: Arc<HistoryStore>,
    provider: Option<Arc<dyn LlmProvider>>,
    model: String,
    scenario: ScenarioConfig,
    llm_timeout: Duration,
}

impl DialogueController {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        matcher: Arc<Matcher>,
        sessions: Arc<SessionStore>,
        history: Arc<HistoryStore>,
        provider: Option<Arc<dyn LlmProvider>>,
        model: impl Into<String>,
        scenario: ScenarioConfig,
        llm_timeout: Duration,
    ) -> Self {
        Self {
            matcher,
            sessions,
            history,
            provider,
            model: model.into(),
            scenario,
            llm_timeout,
        }
    }

    /// Handle one chat message. `fallback_session` stands in for a missing
    /// session id (e.g. caller network identity); conflating sessions that
    /// way is a documented limitation of the calling protocol.
    pub async fn handle_message(
        &self,
        request: &ChatRequest,
        fallback_session: Option<&str>,
    ) -> Result<ChatResponse, ChatError> {
        let message = request.message.trim();
        if message.is_empty() {
            return Err(ChatError::EmptyMessage);
        }
        let key = request
            .session_id
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .or(fallback_session)
            .ok_or(ChatError::MissingSessionId)?;
        if self.provider.is_none() {
            return Err(ChatError::ProviderUnconfigured);
        }

        let fetch = self.sessions.get_or_create(key);
        let mut state = fetch.state;
        if fetch.expired_previous {
            // Expired session equals a brand-new conversation.
            self.history.clear(key);
        }

        let outcome = machine::advance(&mut state, message);
        debug!(session = key, step = %state.step, ?outcome, "dialogue turn");
        self.history.push(key, Turn::user(message));

        let (reply, products) = match outcome {
            Outcome::Transfer => (self.scenario.transfer_reply.clone(), Vec::new()),
            Outcome::AskSpaceType => {
                let instruction = prompt::greeting_instruction();
                let reply = self
                    .complete(key, instruction, self.scenario.fallback_reply.clone())
                    .await;
                (reply, Vec::new())
            }
            Outcome::AskSlot { space, slot } => {
                let instruction = prompt::question_instruction(space, slot, &state.context);
                let reply = self
                    .complete(key, instruction, self.scenario.fallback_reply.clone())
                    .await;
                (reply, Vec::new())
            }
            Outcome::Recommend { space, broaden } => {
                self.recommend(key, &mut state, message, space, broaden)
                    .await
            }
        };

        self.history.push(key, Turn::assistant(&reply));
        self.sessions.update(key, state.clone());

        Ok(ChatResponse {
            assistant_text: reply,
            products,
            session: SessionSnapshot {
                step: state.step,
                context: state.context,
            },
        })
    }

    async fn recommend(
        &self,
        key: &str,
        state: &mut SessionState,
        message: &str,
        space: Option<lumora_schema::SpaceType>,
        broaden: bool,
    ) -> (String, Vec<ScoredProduct>) {
        let limit = if broaden { BROAD_LIMIT } else { DEFAULT_LIMIT };
        let category = space.and_then(category_for_space);
        let products = self.matcher.find(message, category, limit);

        let top_flux = products.first().and_then(|top| {
            estimate_lumens(top.product.power_w, top.product.lumens).map(|l| l as f64)
        });
        let quantity = fixture_quantity(
            state.context.area.as_deref().and_then(|s| s.parse().ok()),
            state.context.lux.as_deref().and_then(|s| s.parse().ok()),
            top_flux,
        );

        let lead_in = self.scenario.lead_in(state.phrase_index).to_owned();
        state.phrase_index = (state.phrase_index + 1) % self.scenario.lead_ins.len().max(1);
        state.last_products = products
            .iter()
            .filter_map(|p| p.product.model.clone())
            .collect();
        state.last_quantity = quantity;

        let fallback = match products.first().and_then(|p| p.product.model.as_deref()) {
            Some(model) => format!("{lead_in} {model}"),
            None => self.scenario.fallback_reply.clone(),
        };
        let instruction =
            prompt::recommendation_instruction(&lead_in, &products, quantity, &state.context);
        let reply = self.complete(key, instruction, fallback).await;

        // The recommendation has been delivered; later messages read as a
        // fresh inquiry without clearing accumulated context.
        state.step = lumora_schema::Step::RecommendationSent;
        (reply, products)
    }

    /// One bounded LLM call; any failure, timeout or empty completion
    /// degrades to the scripted fallback and is logged, never surfaced.
    async fn complete(&self, key: &str, instruction: String, fallback: String) -> String {
        let Some(provider) = &self.provider else {
            return fallback;
        };

        let messages = self
            .history
            .recent(key)
            .into_iter()
            .map(|turn| {
                let role = match turn.role {
                    Role::System => "system",
                    Role::User => "user",
                    Role::Assistant => "assistant",
                };
                LlmMessage::new(role, turn.content)
            })
            .collect();

        let request = LlmRequest {
            model: self.model.clone(),
            system: Some(format!("{}\n\n{instruction}", prompt::system_prompt())),
            messages,
            max_tokens: LLM_MAX_TOKENS,
            temperature: LLM_TEMPERATURE,
        };

        match tokio::time::timeout(self.llm_timeout, provider.chat(request)).await {
            Ok(Ok(response)) if !response.text.trim().is_empty() => {
                response.text.trim().to_owned()
            }
            Ok(Ok(_)) => {
                warn!(session = key, "llm returned empty completion, using scripted fallback");
                fallback
            }
            Ok(Err(error)) => {
                warn!(session = key, %error, "llm call failed, using scripted fallback");
                fallback
            }
            Err(_) => {
                warn!(
                    session = key,
                    timeout_ms = self.llm_timeout.as_millis() as u64,
                    "llm call timed out, using scripted fallback"
                );
                fallback
            }
        }
    }

    /// Assemble a quote lead from what the session has accumulated.
    pub fn quote_lead(
        &self,
        session_key: &str,
        contact: impl Into<String>,
        name: Option<String>,
        message: Option<String>,
    ) -> QuoteLead {
        let state = self.sessions.peek(session_key);
        let (products, context) = match state {
            Some(state) => {
                let products = if state.last_products.is_empty() {
                    None
                } else {
                    Some(state.last_products.clone())
                };
                let context = Some(LeadContext {
                    space: state.context,
                    quantity: state.last_quantity,
                });
                (products, context)
            }
            None => (None, None),
        };
        QuoteLead {
            contact: contact.into(),
            name,
            products,
            message,
            context,
        }
    }

    /// Assemble a manager-transfer lead: contact plus bounded recent history.
    pub fn transfer_lead(&self, session_key: &str, contact: impl Into<String>) -> TransferLead {
        TransferLead {
            contact: contact.into(),
            chat_history: self.history.recent(session_key),
        }
    }
}
