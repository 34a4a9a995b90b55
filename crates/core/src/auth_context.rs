use crate::agent::Agent;
use std::time::Instant;

/// Created once authentication succeeds; scoped to a single inbound request
/// and never shared across requests.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub agent_id: String,
    pub credential: String,
    pub agent: Agent,
    pub received_at: Instant,
}

impl AuthContext {
    pub fn new(credential: String, agent: Agent) -> Self {
        Self {
            agent_id: agent.agent_id.clone(),
            credential,
            agent,
            received_at: Instant::now(),
        }
    }
}
