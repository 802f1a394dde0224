//! LLM-backed decision engine.
//!
//! Given conversation history and a set of candidate chains, asks a model
//! to score every chain's relevance and turns the free-text answer into an
//! ordered, budget-sliced [`ExecutionPlan`]. Malformed answers are repaired
//! through a bounded retry loop: each attempt is classified as success,
//! recoverable, or fatal by an explicit state machine rather than by
//! exception control flow, and corrective prompts are appended to (never
//! replace) the message list between attempts.

use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    Budget, ChatHistory, ChatMessage, ControllerSection, ExecutionLogEntry, ExecutionPlan,
    ExecutionUnit, DEFAULT_UNIT_RANK,
};
use crate::domain::ports::{Chain, ModelCallOptions, ModelClient, ModelError, ModelMessage};

use super::scoring::{self, SpecialistScore};

/// Runtime configuration for [`LlmController`].
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Minimum score a specialist must reach to be dispatched. The default
    /// of `0.0` accepts any parsed score.
    pub response_threshold: f64,

    /// Maximum number of execution units per plan; clamped to the number
    /// of known chains. `None` means one unit per chain.
    pub top_k: Option<usize>,

    /// Advisory parallelism flag carried on the produced plan.
    pub parallelism: bool,

    /// Scoring attempts before [`DomainError::ExhaustedRetries`].
    pub max_retries: u32,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            response_threshold: 0.0,
            top_k: None,
            parallelism: false,
            max_retries: 3,
        }
    }
}

impl ControllerConfig {
    /// Construct from the `[controller]` section of a loaded config file.
    pub fn from_section(section: &ControllerSection) -> Self {
        Self {
            response_threshold: section.response_threshold,
            top_k: section.top_k,
            parallelism: section.parallelism,
            max_retries: section.max_retries,
        }
    }
}

/// Classification of one scoring attempt.
enum AttemptOutcome {
    /// All validations passed; records are matched to their chains.
    Success(Vec<(Arc<dyn Chain>, SpecialistScore)>),
    /// Worth a corrective follow-up prompt, if retries remain.
    Recoverable(String),
    /// Raised immediately, regardless of remaining retries.
    Fatal(DomainError),
}

/// Controller that uses a language model to decide the execution plan.
pub struct LlmController {
    chains: Vec<Arc<dyn Chain>>,
    model: Arc<dyn ModelClient>,
    response_threshold: f64,
    top_k: usize,
    parallelism: bool,
    max_retries: u32,
    system_message: ModelMessage,
    call_options: ModelCallOptions,
}

impl LlmController {
    /// Create a controller over the given candidate chains.
    ///
    /// # Errors
    /// [`DomainError::InvalidConfiguration`] when the chain set is empty,
    /// chain names collide case-insensitively, or `max_retries` is zero.
    pub fn new(
        chains: Vec<Arc<dyn Chain>>,
        model: Arc<dyn ModelClient>,
        config: ControllerConfig,
    ) -> DomainResult<Self> {
        if chains.is_empty() {
            return Err(DomainError::InvalidConfiguration(
                "at least one chain is required".to_string(),
            ));
        }
        for (index, chain) in chains.iter().enumerate() {
            let duplicate = chains[..index]
                .iter()
                .any(|other| other.name().eq_ignore_ascii_case(chain.name()));
            if duplicate {
                return Err(DomainError::InvalidConfiguration(format!(
                    "duplicate chain name `{}`",
                    chain.name()
                )));
            }
        }
        if config.max_retries == 0 {
            return Err(DomainError::InvalidConfiguration(
                "max_retries must be at least 1".to_string(),
            ));
        }

        let top_k = config
            .top_k
            .map_or(chains.len(), |k| k.min(chains.len()));
        let system_message = Self::build_system_message(&chains, top_k);

        Ok(Self {
            chains,
            model,
            response_threshold: config.response_threshold,
            top_k,
            parallelism: config.parallelism,
            max_retries: config.max_retries,
            system_message,
            call_options: ModelCallOptions::default(),
        })
    }

    /// Number of units a produced plan may carry at most.
    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Decide an execution plan for the current conversation state.
    ///
    /// Model usage from every attempt is accounted against `budget`,
    /// including one `"call"` consumption per attempt. With no user
    /// message in `history`, no scoring request is made and the plan is
    /// empty.
    ///
    /// # Errors
    /// - [`DomainError::UnknownSpecialist`] / [`DomainError::AmbiguousSinglePick`] -
    ///   fatal plan violations, raised without retrying
    /// - [`DomainError::ExhaustedRetries`] - no parsable response within
    ///   `max_retries` attempts
    /// - [`DomainError::Cancelled`] - `cancel` fired during a model call
    /// - [`DomainError::Model`] - non-transient model call failure
    /// - [`DomainError::Budget`] - accounting rejected a consumption
    pub async fn plan(
        &self,
        history: &ChatHistory,
        budget: &Budget,
        log_entry: Option<&ExecutionLogEntry>,
        cancel: &CancellationToken,
    ) -> DomainResult<ExecutionPlan> {
        let Some(user_message) = history.try_last_user_message() else {
            debug!("no user message in history; producing an empty plan");
            return Ok(ExecutionPlan::new(Vec::new(), self.parallelism));
        };

        let mut messages = vec![
            self.system_message.clone(),
            ModelMessage::user(format!(
                "Score Specialists for:\n `{}`",
                user_message.message()
            )),
        ];
        let mut last_response = String::new();

        for attempt in 1..=self.max_retries {
            let result = tokio::select! {
                () = cancel.cancelled() => return Err(DomainError::Cancelled),
                result = self.model.post_chat_request(&messages, &self.call_options) => result,
            };
            budget.add_consumption(1.0, "call", &format!("{}:calls", self.model.model_name()))?;

            match result {
                Ok(response) => {
                    for consumption in response.consumptions() {
                        budget.add(consumption)?;
                    }
                    let text = response.first_choice().to_string();
                    debug!(attempt, response = %text, "model response");
                    last_response.clone_from(&text);

                    match self.evaluate_response(&text) {
                        AttemptOutcome::Success(scored) => {
                            let plan = self.build_plan(scored, budget);
                            if let Some(entry) = log_entry {
                                entry.record("attempts", attempt);
                                entry.record("response", text);
                                entry.record("plan_size", plan.len());
                            }
                            return Ok(plan);
                        }
                        AttemptOutcome::Recoverable(reason) => {
                            warn!(attempt, %reason, "recoverable scoring failure");
                            messages.push(ModelMessage::assistant(format!(
                                "Your response is not correctly formatted:\n{text}"
                            )));
                            messages.push(ModelMessage::user(format!("Fix:\n{reason}")));
                        }
                        AttemptOutcome::Fatal(error) => return Err(error),
                    }
                }
                // Transient transport failures consume a retry but leave the
                // message list untouched: there is no response to correct.
                Err(ModelError::Timeout(secs)) => {
                    warn!(attempt, secs, "model call timed out");
                }
                Err(ModelError::RateLimited(detail)) => {
                    warn!(attempt, %detail, "model call rate limited");
                }
                Err(error @ ModelError::CallFailed(_)) => return Err(error.into()),
            }
        }

        if let Some(entry) = log_entry {
            entry.record("attempts", self.max_retries);
            entry.record("last_response", last_response.clone());
        }
        Err(DomainError::ExhaustedRetries {
            attempts: self.max_retries,
            last_response,
        })
    }

    /// Classify one response according to the scoring contract.
    fn evaluate_response(&self, response: &str) -> AttemptOutcome {
        let records = scoring::parse_response(response);
        if records.is_empty() {
            return AttemptOutcome::Recoverable(
                "none of your scores could be parsed; follow exactly the formatting instructions"
                    .to_string(),
            );
        }

        let mut scored = Vec::with_capacity(records.len());
        for record in records {
            match self.find_chain(&record.name) {
                Some(chain) => scored.push((chain, record)),
                None => {
                    warn!(specialist = %record.name, "no chain found with that name");
                    return AttemptOutcome::Fatal(DomainError::UnknownSpecialist(record.name));
                }
            }
        }

        if self.top_k > 1 {
            let missing: Vec<&str> = self
                .chains
                .iter()
                .map(|chain| chain.name())
                .filter(|name| {
                    !scored
                        .iter()
                        .any(|(chain, _)| chain.name().eq_ignore_ascii_case(name))
                })
                .collect();
            if !missing.is_empty() {
                return AttemptOutcome::Recoverable(format!(
                    "missing scores for [{}]; score all Specialists",
                    missing.join(", ")
                ));
            }
        }

        if self.top_k == 1 && scored.len() > 1 {
            return AttemptOutcome::Fatal(DomainError::AmbiguousSinglePick(scored.len()));
        }

        AttemptOutcome::Success(scored)
    }

    /// Sort, filter, truncate, and map surviving records to execution units.
    fn build_plan(
        &self,
        mut scored: Vec<(Arc<dyn Chain>, SpecialistScore)>,
        budget: &Budget,
    ) -> ExecutionPlan {
        // Stable sort: equal scores keep their parse order.
        scored.sort_by(|a, b| b.1.score.total_cmp(&a.1.score));

        let units = scored
            .into_iter()
            .filter(|(_, record)| record.score >= self.response_threshold)
            .take(self.top_k)
            .map(|(chain, record)| {
                let seed = if chain.supports_instructions() {
                    Some(
                        ChatMessage::chain(record.instructions.unwrap_or_default())
                            .with_source(chain.name()),
                    )
                } else {
                    None
                };
                let name = format!("{};{}", chain.name(), record.score);
                ExecutionUnit::new(chain, budget.child(), seed, name, DEFAULT_UNIT_RANK)
            })
            .collect();

        ExecutionPlan::new(units, self.parallelism)
    }

    fn find_chain(&self, name: &str) -> Option<Arc<dyn Chain>> {
        self.chains
            .iter()
            .find(|chain| chain.name().eq_ignore_ascii_case(name))
            .cloned()
    }

    fn build_system_message(chains: &[Arc<dyn Chain>], top_k: usize) -> ModelMessage {
        let answer_choices = chains
            .iter()
            .map(|chain| {
                format!(
                    "name: {};description: {};{}",
                    chain.name(),
                    chain.description(),
                    chain.supports_instructions()
                )
            })
            .collect::<Vec<_>>()
            .join("\n");

        let instruction = if top_k == 1 {
            "Score only the most relevant and best Specialist."
        } else {
            "Score all Specialists."
        };
        let instruction_line = format!("1. {instruction}");
        let grammar = scoring::response_grammar();

        let task_description = [
            "# ROLE",
            "You are a knowledgeable expert responsible to fairly score Specialists.",
            "The score will reflect how relevant a Specialist is to solve or execute a user task.",
            "\n# INSTRUCTIONS",
            instruction_line.as_str(),
            "2. Read carefully the user task and the Specialist description to score its relevance.",
            "3. Score from 0 (poor relevance or out of scope) to 10 (perfectly relevant).",
            "4. Ignore the Specialist's name and its order in the list when scoring.",
            "5. If a Specialist supports instructions, give any useful instructions to execute the user task.",
            "\n# FORMATTING",
            "1. The Specialist list is precisely formatted as:",
            "name: {name};description: {description};{boolean indicating if the Specialist supports instructions}",
            "2. Your response is precisely formatted as one line per scored Specialist:",
            grammar.as_str(),
            "\n# SPECIALISTS",
            answer_choices.as_str(),
        ];
        ModelMessage::system(task_description.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use crate::domain::ports::ModelResponse;

    struct FakeChain {
        name: &'static str,
        supports_instructions: bool,
    }

    #[async_trait]
    impl Chain for FakeChain {
        fn name(&self) -> &str {
            self.name
        }

        fn description(&self) -> &str {
            "a fake chain"
        }

        fn supports_instructions(&self) -> bool {
            self.supports_instructions
        }

        async fn execute(
            &self,
            _history: &ChatHistory,
            _seed: Option<&ChatMessage>,
            _budget: &Budget,
        ) -> DomainResult<Vec<ChatMessage>> {
            Ok(Vec::new())
        }
    }

    struct SilentModel;

    #[async_trait]
    impl crate::domain::ports::ModelClient for SilentModel {
        fn model_name(&self) -> &str {
            "silent"
        }

        async fn post_chat_request(
            &self,
            _messages: &[ModelMessage],
            _options: &ModelCallOptions,
        ) -> Result<ModelResponse, ModelError> {
            Ok(ModelResponse::new(vec![String::new()], Vec::new()))
        }
    }

    fn chains(names: &[&'static str]) -> Vec<Arc<dyn Chain>> {
        names
            .iter()
            .map(|name| {
                Arc::new(FakeChain {
                    name,
                    supports_instructions: false,
                }) as Arc<dyn Chain>
            })
            .collect()
    }

    fn controller(names: &[&'static str], config: ControllerConfig) -> LlmController {
        LlmController::new(chains(names), Arc::new(SilentModel), config).unwrap()
    }

    #[test]
    fn test_rejects_empty_chain_set() {
        let result = LlmController::new(
            Vec::new(),
            Arc::new(SilentModel),
            ControllerConfig::default(),
        );
        assert!(matches!(
            result,
            Err(DomainError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_rejects_case_insensitive_duplicate_names() {
        let result = LlmController::new(
            chains(&["Search", "search"]),
            Arc::new(SilentModel),
            ControllerConfig::default(),
        );
        assert!(matches!(
            result,
            Err(DomainError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_rejects_zero_retries() {
        let result = LlmController::new(
            chains(&["search"]),
            Arc::new(SilentModel),
            ControllerConfig {
                max_retries: 0,
                ..ControllerConfig::default()
            },
        );
        assert!(matches!(
            result,
            Err(DomainError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_top_k_clamps_to_chain_count() {
        let clamped = controller(
            &["a", "b"],
            ControllerConfig {
                top_k: Some(10),
                ..ControllerConfig::default()
            },
        );
        assert_eq!(clamped.top_k(), 2);

        let unbounded = controller(&["a", "b", "c"], ControllerConfig::default());
        assert_eq!(unbounded.top_k(), 3);
    }

    #[test]
    fn test_system_message_enumerates_specialists() {
        let controller = controller(&["search", "math"], ControllerConfig::default());
        let content = &controller.system_message.content;
        assert!(content.contains("name: search;description: a fake chain;false"));
        assert!(content.contains("name: math;description: a fake chain;false"));
        assert!(content.contains("Score all Specialists."));
        assert!(content.contains(&scoring::response_grammar()));
    }

    #[test]
    fn test_system_message_single_pick_wording() {
        let controller = controller(
            &["search", "math"],
            ControllerConfig {
                top_k: Some(1),
                ..ControllerConfig::default()
            },
        );
        assert!(controller
            .system_message
            .content
            .contains("Score only the most relevant and best Specialist."));
    }

    #[tokio::test]
    async fn test_empty_history_yields_empty_plan() {
        let controller = controller(&["search"], ControllerConfig::default());
        let budget = Budget::infinite();
        let plan = controller
            .plan(
                &ChatHistory::new(),
                &budget,
                None,
                &CancellationToken::new(),
            )
            .await
            .unwrap();
        assert!(plan.is_empty());
        assert_eq!(budget.consumption_value("call", "silent:calls"), 0.0);
    }
}
