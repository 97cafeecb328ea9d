//! Per-turn routing between the data agent and the reasoning agent.
//!
//! The router never answers on its own. It resolves the active repository,
//! checks whether the message answers a pending follow-up proposal, asks
//! its model to classify the intent, and hands the turn to the chosen
//! agent (or to both, data first). Two cases are settled without any model
//! call: a turn with no repository to work on, and an ambiguous reply to a
//! proposal. Both produce a clarifying question.

pub mod context;
pub mod intent;

pub use context::{extract_proposed_action, find_repo_mention, RepoMention};
pub use intent::{classify_affirmation, Affirmation, ConversationState, Intent, RouteDecision};

use crate::agent::bridge::{GET_GITHUB_INFO, NO_INFORMATION};
use crate::agent::prompts::ROUTER_INSTRUCTIONS;
use crate::agent::{Agent, RunEvent, RunInput, Team};
use crate::llm::ChatMessage;
use crate::models::{history_window, HistoryMessage, Member, RepoId, ToolExecution};
use anyhow::Result;
use serde_json::json;
use std::time::Instant;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};

pub const REPO_QUESTION: &str = "Which repository would you like me to look at? Please give it in owner/repo format, for example `agno-agi/agno`.";

const EMPTY_REPLY: &str = "I couldn't put together an answer for that. Could you rephrase the question?";

/// Which agent(s) a session talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EntryPoint {
    /// Route every turn through the intent classifier.
    #[default]
    Team,
    /// Always the data agent.
    Data,
    /// Always the reasoning agent.
    Reasoning,
}

/// Conversation state a turn starts from.
#[derive(Debug, Clone, Default)]
pub struct TurnContext<'a> {
    /// Messages before this turn, oldest first.
    pub history: &'a [HistoryMessage],
    /// Sticky repository from earlier turns.
    pub repo: Option<&'a RepoId>,
    /// Follow-up proposed in the previous reply.
    pub pending_action: Option<&'a str>,
    pub events: Option<UnboundedSender<RunEvent>>,
}

/// Everything a turn produced.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnOutcome {
    pub reply: String,
    pub tools: Vec<ToolExecution>,
    /// Agent that wrote the reply; `None` for router clarifications.
    pub member: Option<Member>,
    /// Repository to carry into the next turn.
    pub repo: Option<RepoId>,
    /// Follow-up proposed by this reply, if any.
    pub proposed_action: Option<String>,
    pub state: ConversationState,
}

/// Routes turns to the team's agents.
#[derive(Clone)]
pub struct Router {
    team: Team,
    entry: EntryPoint,
    history_messages: usize,
}

impl Router {
    pub fn new(team: Team, entry: EntryPoint, history_messages: usize) -> Self {
        Self {
            team,
            entry,
            history_messages,
        }
    }

    pub fn team(&self) -> &Team {
        &self.team
    }

    /// Repository for this turn: named in the message, else the sticky one.
    ///
    /// A token after a weak cue ("in cookbook/teams") only establishes a
    /// repository when there is none yet; it never replaces one.
    pub fn resolve_repo(message: &str, sticky: Option<&RepoId>) -> Option<RepoId> {
        match (find_repo_mention(message), sticky) {
            (Some(RepoMention::Weak(named)), Some(current)) => {
                if &named != current {
                    debug!("Keeping {}; '{}' read as a path", current, named);
                }
                Some(current.clone())
            }
            (Some(mention), _) => {
                let named = mention.into_repo();
                if sticky != Some(&named) {
                    info!("Repository context set to {}", named);
                }
                Some(named)
            }
            (None, _) => sticky.cloned(),
        }
    }

    /// Decide how to handle `message`.
    pub async fn decide(&self, message: &str, ctx: &TurnContext<'_>) -> Result<RouteDecision> {
        if let Some(action) = ctx.pending_action {
            match classify_affirmation(message) {
                Affirmation::Affirmative => {
                    info!("Affirmation received; executing proposed action");
                    return Ok(RouteDecision::ExecuteProposed(action.to_string()));
                }
                Affirmation::Ambiguous => {
                    return Ok(RouteDecision::Clarify(format!(
                        "Did you want me to go ahead with \"{}\", or is there something else you'd like to explore?",
                        action
                    )));
                }
                Affirmation::Other => {}
            }
        }

        let Some(repo) = Self::resolve_repo(message, ctx.repo) else {
            debug!("No repository context; asking the user");
            return Ok(RouteDecision::Clarify(REPO_QUESTION.to_string()));
        };

        let intent = match self.entry {
            EntryPoint::Data => Intent::Data,
            EntryPoint::Reasoning => Intent::Reasoning,
            EntryPoint::Team => self.classify(message, &repo, ctx.history).await?,
        };
        info!("Routing turn as {}", intent);
        Ok(RouteDecision::Dispatch(intent))
    }

    /// Carry out a decision made by [`Router::decide`].
    pub async fn execute(
        &self,
        decision: RouteDecision,
        message: &str,
        ctx: &TurnContext<'_>,
    ) -> Result<TurnOutcome> {
        let repo = Self::resolve_repo(message, ctx.repo);
        let history = history_window(ctx.history, self.history_messages);
        let repo_context = repo.as_ref().map(|r| format!("Active repository: {}", r));

        let (content, tools, member) = match decision {
            RouteDecision::Clarify(question) => {
                let state = if repo.is_none() {
                    ConversationState::NoRepoContext
                } else {
                    ConversationState::AwaitingClarification
                };
                // A refusal to guess keeps the earlier proposal alive.
                let proposed_action = if state == ConversationState::AwaitingClarification {
                    ctx.pending_action.map(str::to_string)
                } else {
                    None
                };
                return Ok(TurnOutcome {
                    reply: question,
                    tools: Vec::new(),
                    member: None,
                    repo,
                    proposed_action,
                    state,
                });
            }

            RouteDecision::Dispatch(Intent::Data) => {
                let response = self
                    .team
                    .data
                    .run(
                        RunInput::new(message)
                            .with_history(history)
                            .with_context(repo_context)
                            .with_events(ctx.events.clone()),
                    )
                    .await?;
                (response.content, response.tools, Member::Data)
            }

            RouteDecision::Dispatch(Intent::Reasoning) => {
                let response = self
                    .team
                    .reasoning
                    .run(
                        RunInput::new(message)
                            .with_history(history)
                            .with_context(repo_context)
                            .with_events(ctx.events.clone()),
                    )
                    .await?;
                (response.content, response.tools, Member::Reasoning)
            }

            RouteDecision::Dispatch(Intent::DataThenReasoning) => {
                let gathered = self
                    .team
                    .data
                    .run(
                        RunInput::new(message)
                            .with_history(history.clone())
                            .with_context(repo_context.clone())
                            .with_events(ctx.events.clone()),
                    )
                    .await?;
                let facts = gathered.content.as_deref().unwrap_or(NO_INFORMATION);
                let context = join_context(
                    repo_context,
                    format!("Data gathered by the GitHub Agent for this question:\n{}", facts),
                );
                let response = self
                    .team
                    .reasoning
                    .run(
                        RunInput::new(message)
                            .with_history(history)
                            .with_context(Some(context))
                            .with_events(ctx.events.clone()),
                    )
                    .await?;
                let mut tools = gathered.tools;
                tools.extend(response.tools);
                (response.content, tools, Member::Reasoning)
            }

            RouteDecision::ExecuteProposed(action) => {
                let synthesizer = self.synthesizer();
                let execution = self
                    .run_proposed(&action, synthesizer, ctx.events.as_ref())
                    .await;
                let context = join_context(
                    repo_context,
                    format!(
                        "The user approved your proposed step `{}: {}`. It has been executed and returned:\n{}\n\nAnswer using this result, relate it to the earlier question, and propose the next step.",
                        GET_GITHUB_INFO,
                        action,
                        execution.content.as_deref().unwrap_or_default()
                    ),
                );
                let response = synthesizer
                    .run(
                        RunInput::new(message)
                            .with_history(history)
                            .with_context(Some(context))
                            .with_events(ctx.events.clone()),
                    )
                    .await?;
                let mut tools = vec![execution];
                tools.extend(response.tools);
                let member = match self.entry {
                    EntryPoint::Data => Member::Data,
                    _ => Member::Reasoning,
                };
                (response.content, tools, member)
            }
        };

        let reply = content
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| EMPTY_REPLY.to_string());
        let proposed_action = extract_proposed_action(&reply);
        if let Some(action) = &proposed_action {
            debug!("Reply proposes follow-up: {}", action);
        }

        Ok(TurnOutcome {
            reply,
            tools,
            member: Some(member),
            state: if repo.is_some() {
                ConversationState::RepoEstablished
            } else {
                ConversationState::NoRepoContext
            },
            repo,
            proposed_action,
        })
    }

    /// Decide and execute in one step.
    pub async fn respond(&self, message: &str, ctx: &TurnContext<'_>) -> Result<TurnOutcome> {
        let decision = self.decide(message, ctx).await?;
        self.execute(decision, message, ctx).await
    }

    fn synthesizer(&self) -> &Agent {
        match self.entry {
            EntryPoint::Data => &self.team.data,
            _ => &self.team.reasoning,
        }
    }

    /// Ask the router model for an intent.
    async fn classify(
        &self,
        message: &str,
        repo: &RepoId,
        history: &[HistoryMessage],
    ) -> Result<Intent> {
        let mut messages = vec![ChatMessage::system(format!(
            "{}\n\nActive repository: {}",
            ROUTER_INSTRUCTIONS, repo
        ))];
        messages.extend(history_window(history, self.history_messages));
        messages.push(ChatMessage::user(message));

        let reply = self.team.router_model.complete(&messages, &[]).await?;
        let verdict = reply.content.unwrap_or_default();
        debug!("Router verdict: {:?}", verdict);
        Ok(Intent::parse(&verdict))
    }

    /// Re-issue an approved proposal through the delegation bridge, recording
    /// it like any other tool call of `agent`.
    async fn run_proposed(
        &self,
        action: &str,
        agent: &Agent,
        events: Option<&UnboundedSender<RunEvent>>,
    ) -> ToolExecution {
        let tool_args = json!({ "query": action });
        if let Some(tx) = events {
            let _ = tx.send(RunEvent::ToolStarted {
                agent: agent.name().to_string(),
                tool_name: GET_GITHUB_INFO.to_string(),
                tool_args: tool_args.clone(),
            });
        }

        let start = Instant::now();
        let (content, success) = match self.team.bridge.request(action).await {
            Ok(text) => (text, true),
            Err(e) => {
                warn!("Proposed action failed: {:#}", e);
                (format!("Error: {:#}", e), false)
            }
        };

        let execution = ToolExecution {
            tool_name: GET_GITHUB_INFO.to_string(),
            tool_args,
            content: Some(content),
            success,
            elapsed_ms: start.elapsed().as_millis() as u64,
        };

        if let Some(tx) = events {
            let _ = tx.send(RunEvent::ToolCompleted {
                agent: agent.name().to_string(),
                execution: execution.clone(),
            });
        }
        execution
    }
}

fn join_context(base: Option<String>, extra: String) -> String {
    match base {
        Some(base) => format!("{}\n\n{}", base, extra),
        None => extra,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GeneralConfig;
    use crate::llm::testing::ScriptedModel;
    use crate::llm::{ModelReply, ToolCall};
    use std::sync::Arc;

    struct Fixture {
        primary: Arc<ScriptedModel>,
        reasoning: Arc<ScriptedModel>,
        router_model: Arc<ScriptedModel>,
        router: Router,
    }

    fn fixture(
        entry: EntryPoint,
        primary: Vec<ModelReply>,
        reasoning: Vec<ModelReply>,
        verdicts: Vec<ModelReply>,
    ) -> Fixture {
        let primary = Arc::new(ScriptedModel::new(primary));
        let reasoning = Arc::new(ScriptedModel::new(reasoning));
        let router_model = Arc::new(ScriptedModel::new(verdicts));
        let team = Team::assemble(
            &GeneralConfig::default(),
            primary.clone(),
            reasoning.clone(),
            router_model.clone(),
            vec![],
        );
        Fixture {
            primary,
            reasoning,
            router_model,
            router: Router::new(team, entry, 10),
        }
    }

    fn repo(s: &str) -> RepoId {
        s.parse().unwrap()
    }

    #[tokio::test]
    async fn test_sticky_repository_is_kept() {
        let f = fixture(
            EntryPoint::Team,
            vec![ModelReply::text("Here are the branches.")],
            vec![],
            vec![ModelReply::text("data")],
        );
        let sticky = repo("a-org/b-repo");
        let history = vec![
            HistoryMessage::user("Summarize 'a-org/b-repo'"),
            HistoryMessage::assistant("It is a library.", vec![]),
        ];
        let ctx = TurnContext {
            history: &history,
            repo: Some(&sticky),
            ..Default::default()
        };

        let outcome = f.router.respond("List the branches", &ctx).await.unwrap();

        assert_eq!(outcome.repo, Some(sticky));
        assert_eq!(outcome.member, Some(Member::Data));
        assert_eq!(outcome.state, ConversationState::RepoEstablished);
        let prompt = f.primary.system_prompt(0).unwrap();
        assert!(prompt.contains("Active repository: a-org/b-repo"));
    }

    #[test]
    fn test_paths_do_not_replace_sticky_repository() {
        let sticky = repo("agno-agi/agno");
        for message in [
            "What's in cookbook/teams?",
            "Explain the code in agno/team",
            "show the files for cookbook/agents",
        ] {
            assert_eq!(
                Router::resolve_repo(message, Some(&sticky)),
                Some(sticky.clone()),
                "{}",
                message
            );
        }

        assert_eq!(
            Router::resolve_repo("How many open issues are in facebook/react?", None),
            Some(repo("facebook/react"))
        );
        assert_eq!(
            Router::resolve_repo("Now summarize 'facebook/react'", Some(&sticky)),
            Some(repo("facebook/react"))
        );
    }

    #[tokio::test]
    async fn test_named_repository_switches_context() {
        let f = fixture(
            EntryPoint::Team,
            vec![],
            vec![ModelReply::text("It is a web framework.")],
            vec![ModelReply::text("reasoning")],
        );
        let sticky = repo("a-org/b-repo");
        let ctx = TurnContext {
            repo: Some(&sticky),
            ..Default::default()
        };

        let outcome = f
            .router
            .respond("What does the repository c-org/d-repo do?", &ctx)
            .await
            .unwrap();

        assert_eq!(outcome.repo, Some(repo("c-org/d-repo")));
        assert_eq!(outcome.member, Some(Member::Reasoning));
        assert!(f
            .reasoning
            .system_prompt(0)
            .unwrap()
            .contains("Active repository: c-org/d-repo"));
    }

    #[tokio::test]
    async fn test_no_repository_asks_without_calling_anything() {
        let f = fixture(EntryPoint::Team, vec![], vec![], vec![]);

        let outcome = f
            .router
            .respond("What does this project do?", &TurnContext::default())
            .await
            .unwrap();

        assert_eq!(outcome.reply, REPO_QUESTION);
        assert!(outcome.reply.contains("owner/repo"));
        assert_eq!(outcome.member, None);
        assert!(outcome.tools.is_empty());
        assert_eq!(outcome.state, ConversationState::NoRepoContext);
        assert_eq!(f.primary.request_count(), 0);
        assert_eq!(f.reasoning.request_count(), 0);
        assert_eq!(f.router_model.request_count(), 0);
    }

    #[tokio::test]
    async fn test_affirmation_reexecutes_exact_proposal() {
        let f = fixture(
            EntryPoint::Team,
            vec![ModelReply::text("agents/a.py: class A(Agent)")],
            vec![ModelReply::text("Found one agent: a.py.")],
            vec![],
        );
        let sticky = repo("agno-agi/agno");
        let action = "search for code containing \"Agent\" in agno-agi/agno";
        let ctx = TurnContext {
            repo: Some(&sticky),
            pending_action: Some(action),
            ..Default::default()
        };

        let decision = f.router.decide("yes", &ctx).await.unwrap();
        assert_eq!(decision, RouteDecision::ExecuteProposed(action.to_string()));

        let outcome = f.router.execute(decision, "yes", &ctx).await.unwrap();

        assert_eq!(
            f.primary.user_message(0).as_deref(),
            Some("Internal request: search for code containing \"Agent\" in agno-agi/agno")
        );
        assert_eq!(f.router_model.request_count(), 0);
        assert_eq!(outcome.tools[0].tool_name, "get_github_info");
        assert_eq!(outcome.tools[0].tool_args, json!({"query": action}));
        assert_eq!(outcome.reply, "Found one agent: a.py.");
        assert_eq!(outcome.member, Some(Member::Reasoning));
        assert_eq!(outcome.proposed_action, None);
        assert!(f
            .reasoning
            .system_prompt(0)
            .unwrap()
            .contains("agents/a.py: class A(Agent)"));
    }

    #[tokio::test]
    async fn test_ambiguous_affirmation_asks_and_keeps_proposal() {
        let f = fixture(EntryPoint::Team, vec![], vec![], vec![]);
        let sticky = repo("agno-agi/agno");
        let ctx = TurnContext {
            repo: Some(&sticky),
            pending_action: Some("list the files in libs/"),
            ..Default::default()
        };

        let outcome = f.router.respond("maybe", &ctx).await.unwrap();

        assert!(outcome.reply.contains("list the files in libs/"));
        assert_eq!(outcome.state, ConversationState::AwaitingClarification);
        assert_eq!(outcome.proposed_action.as_deref(), Some("list the files in libs/"));
        assert_eq!(f.primary.request_count(), 0);
        assert_eq!(f.reasoning.request_count(), 0);
    }

    #[tokio::test]
    async fn test_new_request_replaces_proposal() {
        let f = fixture(
            EntryPoint::Team,
            vec![],
            vec![ModelReply::text(
                "The scheduler polls jobs.\n\nget_github_info: get the contents of scheduler.py in agno-agi/agno",
            )],
            vec![ModelReply::text("reasoning")],
        );
        let sticky = repo("agno-agi/agno");
        let ctx = TurnContext {
            repo: Some(&sticky),
            pending_action: Some("list the files in libs/"),
            ..Default::default()
        };

        let outcome = f.router.respond("Explain the scheduler", &ctx).await.unwrap();

        assert_eq!(
            outcome.proposed_action.as_deref(),
            Some("get the contents of scheduler.py in agno-agi/agno")
        );
        assert_eq!(f.router_model.request_count(), 1);
    }

    #[tokio::test]
    async fn test_data_then_reasoning_passes_facts() {
        let f = fixture(
            EntryPoint::Team,
            vec![ModelReply::text("README: a multi-agent framework")],
            vec![ModelReply::text("It is built around teams of agents.")],
            vec![ModelReply::text("both")],
        );
        let sticky = repo("agno-agi/agno");
        let ctx = TurnContext {
            repo: Some(&sticky),
            ..Default::default()
        };

        let outcome = f
            .router
            .respond("Read the README and explain the architecture", &ctx)
            .await
            .unwrap();

        assert_eq!(outcome.member, Some(Member::Reasoning));
        assert_eq!(f.primary.request_count(), 1);
        assert!(f
            .reasoning
            .system_prompt(0)
            .unwrap()
            .contains("README: a multi-agent framework"));
    }

    #[tokio::test]
    async fn test_data_entry_skips_classifier() {
        let f = fixture(
            EntryPoint::Data,
            vec![
                ModelReply::tool_calls(vec![ToolCall {
                    id: "c1".into(),
                    name: "get_repository".into(),
                    arguments: json!({"repo_name": "agno-agi/agno"}),
                }]),
                ModelReply::text("Summary"),
            ],
            vec![],
            vec![],
        );

        let outcome = f
            .router
            .respond("Summarize 'agno-agi/agno' repo", &TurnContext::default())
            .await
            .unwrap();

        assert_eq!(outcome.member, Some(Member::Data));
        assert_eq!(outcome.repo, Some(repo("agno-agi/agno")));
        assert_eq!(f.router_model.request_count(), 0);
        // No GitHub toolset in this team, so the call is reported back as unknown.
        assert!(!outcome.tools[0].success);
    }

    #[tokio::test]
    async fn test_empty_agent_answer_gets_placeholder() {
        let f = fixture(
            EntryPoint::Reasoning,
            vec![],
            vec![ModelReply::default()],
            vec![],
        );
        let sticky = repo("agno-agi/agno");
        let ctx = TurnContext {
            repo: Some(&sticky),
            ..Default::default()
        };
        let outcome = f.router.respond("Explain it", &ctx).await.unwrap();
        assert_eq!(outcome.reply, EMPTY_REPLY);
    }
}
