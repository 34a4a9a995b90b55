use async_trait::async_trait;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;
use std::sync::RwLock;

/// Which wire dialect an agent's upstream speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AgentKind {
    OpenAi,
    OpenAiCompatible,
    DifyChat,
    DifyWorkflow,
}

impl AgentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::OpenAiCompatible => "openai_compatible",
            Self::DifyChat => "dify-chat",
            Self::DifyWorkflow => "dify-workflow",
        }
    }
}

impl std::fmt::Display for AgentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AgentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "openai" => Ok(Self::OpenAi),
            "openai_compatible" => Ok(Self::OpenAiCompatible),
            "dify-chat" => Ok(Self::DifyChat),
            "dify-workflow" => Ok(Self::DifyWorkflow),
            _ => Err(format!("unknown agent kind: {s}")),
        }
    }
}

impl Serialize for AgentKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for AgentKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(D::Error::custom)
    }
}

/// Informational tag describing which response shape an agent's callers expect.
/// Not consulted by the dispatch pipeline; passed through as metadata only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseFormat {
    OpenAi,
    Dify,
}

impl ResponseFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Dify => "dify",
        }
    }
}

impl std::fmt::Display for ResponseFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ResponseFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "openai" => Ok(Self::OpenAi),
            "dify" => Ok(Self::Dify),
            _ => Err(format!("unknown response format: {s}")),
        }
    }
}

impl Serialize for ResponseFormat {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ResponseFormat {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(D::Error::custom)
    }
}

/// A configured upstream endpoint: the unit of tenancy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    pub agent_id: String,
    pub connector_key: String,
    pub upstream_url: String,
    pub upstream_key: String,
    pub kind: AgentKind,
    pub qps: u32,
    pub enabled: bool,
    pub supports_streaming: bool,
    pub response_format: ResponseFormat,
}

impl Agent {
    /// Token-bucket refill rate in tokens/second, as required by the limiter.
    pub fn rate(&self) -> u32 {
        self.qps
    }

    /// Token-bucket burst capacity: `2 * qps`.
    pub fn burst(&self) -> u32 {
        self.qps.saturating_mul(2)
    }
}

/// Failure modes surfaced by an `AgentRepository` lookup.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("agent store unavailable: {0}")]
    Unavailable(String),
}

/// The sole external collaborator the core consumes for agent state. Whatever
/// persists agent records (the admin CRUD surface, its schema and
/// migrations) lives outside this crate; the core only reads through this
/// trait.
#[async_trait]
pub trait AgentRepository: Send + Sync {
    /// Look up an agent by its opaque external id. `Ok(None)` means the id is
    /// unknown; transport/store failures are `Err`.
    async fn lookup(&self, agent_id: &str) -> Result<Option<Agent>, RepositoryError>;
}

/// A reference, in-process `AgentRepository` so this crate is runnable and
/// testable standalone. A production host is expected to supply its own
/// store-backed implementation; this one never fails with `Unavailable`.
#[derive(Debug, Default)]
pub struct InMemoryAgentRepository {
    agents: RwLock<HashMap<String, Agent>>,
}

impl InMemoryAgentRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_agents(agents: impl IntoIterator<Item = Agent>) -> Self {
        let map = agents.into_iter().map(|a| (a.agent_id.clone(), a)).collect();
        Self {
            agents: RwLock::new(map),
        }
    }

    pub fn insert(&self, agent: Agent) {
        self.agents
            .write()
            .expect("agent map lock poisoned")
            .insert(agent.agent_id.clone(), agent);
    }
}

#[async_trait]
impl AgentRepository for InMemoryAgentRepository {
    async fn lookup(&self, agent_id: &str) -> Result<Option<Agent>, RepositoryError> {
        Ok(self
            .agents
            .read()
            .expect("agent map lock poisoned")
            .get(agent_id)
            .cloned())
    }
}
