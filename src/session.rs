//! Conversation sessions.
//!
//! A [`Session`] owns everything that outlives a single turn: the message
//! history, the sticky repository, the pending follow-up proposal, and the
//! agent runtime. Agents are never mutated in place. Changing credentials
//! or restarting builds a fresh runtime under the next epoch number.

use crate::agent::{build_team, RunEvent, Team};
use crate::config::{Config, Credentials};
use crate::models::{HistoryMessage, Member, RepoId};
use crate::router::{ConversationState, EntryPoint, RouteDecision, Router, TurnContext, TurnOutcome};
use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{error, info};

/// Builds a team from configuration and credentials.
pub type TeamFactory = Arc<dyn Fn(&Config, &Credentials) -> Result<Team> + Send + Sync>;

/// A router over one generation of agents.
pub struct AgentRuntime {
    pub epoch: u64,
    pub router: Router,
}

/// Result of [`Session::ask`].
#[derive(Debug, Clone)]
pub struct TurnReply {
    /// The assistant message appended to the history.
    pub message: HistoryMessage,
    pub member: Option<Member>,
    /// The turn failed and `message` carries the apology.
    pub failed: bool,
}

/// Serialized form of a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub started_at: DateTime<Utc>,
    pub repo: Option<RepoId>,
    #[serde(default)]
    pub pending_action: Option<String>,
    #[serde(default)]
    pub state: ConversationState,
    pub history: Vec<HistoryMessage>,
}

pub struct Session {
    config: Config,
    credentials: Credentials,
    entry: EntryPoint,
    factory: TeamFactory,
    runtime: AgentRuntime,
    history: Vec<HistoryMessage>,
    repo: Option<RepoId>,
    pending_action: Option<String>,
    state: ConversationState,
    started_at: DateTime<Utc>,
}

impl Session {
    /// Create a session backed by the configured endpoints.
    pub fn new(config: Config, credentials: Credentials, entry: EntryPoint) -> Result<Self> {
        Self::with_factory(config, credentials, entry, Arc::new(build_team))
    }

    pub fn with_factory(
        config: Config,
        credentials: Credentials,
        entry: EntryPoint,
        factory: TeamFactory,
    ) -> Result<Self> {
        let runtime = build_runtime(&factory, &config, &credentials, entry, 1)?;
        Ok(Self {
            config,
            credentials,
            entry,
            factory,
            runtime,
            history: Vec::new(),
            repo: None,
            pending_action: None,
            state: ConversationState::NoRepoContext,
            started_at: Utc::now(),
        })
    }

    pub fn history(&self) -> &[HistoryMessage] {
        &self.history
    }

    pub fn repo(&self) -> Option<&RepoId> {
        self.repo.as_ref()
    }

    pub fn pending_action(&self) -> Option<&str> {
        self.pending_action.as_deref()
    }

    pub fn state(&self) -> ConversationState {
        self.state
    }

    pub fn epoch(&self) -> u64 {
        self.runtime.epoch
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn entry(&self) -> EntryPoint {
        self.entry
    }

    pub fn team(&self) -> &Team {
        self.runtime.router.team()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Establish the repository context up front.
    pub fn set_repo(&mut self, repo: RepoId) {
        info!("Repository context set to {}", repo);
        self.repo = Some(repo);
        self.state = ConversationState::RepoEstablished;
    }

    /// Run one user turn.
    ///
    /// Failures do not escape: they become an apologetic assistant message
    /// in the history, and the session stays usable.
    pub async fn ask(
        &mut self,
        message: &str,
        events: Option<UnboundedSender<RunEvent>>,
    ) -> TurnReply {
        let message = message.trim();
        let prior = self.history.len();
        self.history.push(HistoryMessage::user(message));

        match self.route(message, prior, events).await {
            Ok(outcome) => {
                self.repo = outcome.repo;
                self.pending_action = outcome.proposed_action;
                self.state = outcome.state;
                let reply = HistoryMessage::assistant(outcome.reply, outcome.tools);
                self.history.push(reply.clone());
                TurnReply {
                    message: reply,
                    member: outcome.member,
                    failed: false,
                }
            }
            Err(e) => {
                error!("Turn failed: {:#}", e);
                self.repo = Router::resolve_repo(message, self.repo.as_ref());
                self.state = if self.repo.is_some() {
                    ConversationState::RepoEstablished
                } else {
                    ConversationState::NoRepoContext
                };
                let reply = HistoryMessage::assistant(
                    format!("Sorry, I encountered an error: {:#}", e),
                    Vec::new(),
                );
                self.history.push(reply.clone());
                TurnReply {
                    message: reply,
                    member: None,
                    failed: true,
                }
            }
        }
    }

    async fn route(
        &mut self,
        message: &str,
        prior: usize,
        events: Option<UnboundedSender<RunEvent>>,
    ) -> Result<TurnOutcome> {
        let ctx = TurnContext {
            history: &self.history[..prior],
            repo: self.repo.as_ref(),
            pending_action: self.pending_action.as_deref(),
            events,
        };
        let decision = self.runtime.router.decide(message, &ctx).await?;
        if matches!(decision, RouteDecision::ExecuteProposed(_)) {
            self.state = ConversationState::ExecutingProposedAction;
        }
        self.runtime.router.execute(decision, message, &ctx).await
    }

    /// Swap the GitHub token and rebuild the agents.
    ///
    /// The conversation is kept. On failure the previous runtime stays in place.
    pub fn replace_github_token(&mut self, token: &str) -> Result<()> {
        let token = token.trim();
        if token.is_empty() {
            bail!("GitHub token cannot be empty");
        }
        let credentials = self.credentials.with_github_token(token);
        let runtime = build_runtime(
            &self.factory,
            &self.config,
            &credentials,
            self.entry,
            self.runtime.epoch + 1,
        )?;
        self.credentials = credentials;
        self.runtime = runtime;
        info!("GitHub token replaced; agents rebuilt (epoch {})", self.runtime.epoch);
        Ok(())
    }

    /// Start over: empty conversation, no repository, fresh agents.
    pub fn restart(&mut self) -> Result<()> {
        let runtime = build_runtime(
            &self.factory,
            &self.config,
            &self.credentials,
            self.entry,
            self.runtime.epoch + 1,
        )?;
        self.runtime = runtime;
        self.history.clear();
        self.repo = None;
        self.pending_action = None;
        self.state = ConversationState::NoRepoContext;
        self.started_at = Utc::now();
        info!("Session restarted (epoch {})", self.runtime.epoch);
        Ok(())
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            started_at: self.started_at,
            repo: self.repo.clone(),
            pending_action: self.pending_action.clone(),
            state: self.state,
            history: self.history.clone(),
        }
    }

    /// Write the conversation to `path` as JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(&self.snapshot())
            .context("Failed to serialize session")?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write session file: {}", path.display()))?;
        info!("Session saved to {}", path.display());
        Ok(())
    }

    /// Replace the conversation with one saved by [`Session::save`].
    pub fn restore(&mut self, path: &Path) -> Result<()> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read session file: {}", path.display()))?;
        let snapshot: SessionSnapshot = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse session file: {}", path.display()))?;

        self.started_at = snapshot.started_at;
        self.repo = snapshot.repo;
        self.pending_action = snapshot.pending_action;
        self.state = snapshot.state;
        self.history = snapshot.history;
        info!(
            "Session restored from {} ({} messages)",
            path.display(),
            self.history.len()
        );
        Ok(())
    }
}

fn build_runtime(
    factory: &TeamFactory,
    config: &Config,
    credentials: &Credentials,
    entry: EntryPoint,
    epoch: u64,
) -> Result<AgentRuntime> {
    let team = factory(config, credentials).context("Failed to build agents")?;
    Ok(AgentRuntime {
        epoch,
        router: Router::new(team, entry, config.general.history_messages),
    })
}
