use crate::agent::{Agent, AgentRepository, RepositoryError};
use moka::future::Cache;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("agent not found")]
    NotFound,
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Bounded-TTL, request-coalescing cache in front of an `AgentRepository`.
/// Built on `moka`'s `get_with`, which guarantees concurrent misses for the
/// same key collapse into a single repository call.
pub struct AgentDirectory {
    repository: Arc<dyn AgentRepository>,
    cache: Cache<String, Agent>,
}

impl AgentDirectory {
    pub fn new(repository: Arc<dyn AgentRepository>, ttl: Duration) -> Self {
        let ttl = ttl.min(Duration::from_secs(60));
        let cache = Cache::builder().time_to_live(ttl).build();
        Self { repository, cache }
    }

    pub async fn lookup(&self, agent_id: &str) -> Result<Agent, DirectoryError> {
        let repository = Arc::clone(&self.repository);
        let id = agent_id.to_string();

        self.cache
            .try_get_with(agent_id.to_string(), async move {
                match repository.lookup(&id).await {
                    Ok(Some(agent)) => Ok(agent),
                    Ok(None) => Err(DirectoryError::NotFound),
                    Err(e) => Err(DirectoryError::Repository(e)),
                }
            })
            .await
            .map_err(|e: Arc<DirectoryError>| match &*e {
                DirectoryError::NotFound => DirectoryError::NotFound,
                DirectoryError::Repository(RepositoryError::Unavailable(msg)) => {
                    DirectoryError::Repository(RepositoryError::Unavailable(msg.clone()))
                }
            })
    }
}
