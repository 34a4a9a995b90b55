pub mod dify_chat;
pub mod dify_workflow;
pub mod health;
pub mod legacy;
pub mod openai;

use serde::Deserialize;

/// `agent_id` may arrive in the query string instead of the body.
#[derive(Debug, Deserialize)]
pub struct AgentIdQuery {
    pub agent_id: Option<String>,
}
