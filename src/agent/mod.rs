//! LLM agents and the capabilities they use.
//!
//! The data agent calls GitHub directly; the reasoning agent reaches
//! GitHub only through the delegation bridge.

pub mod agent_loop;
pub mod bridge;
pub mod github_tools;
pub mod prompts;
pub mod reasoning_tools;
pub mod team;
pub mod tools;

pub use agent_loop::{Agent, RunEvent, RunInput};
pub use team::{build_team, Team};
