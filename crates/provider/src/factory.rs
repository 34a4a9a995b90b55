use crate::adapter::BackendAdapter;
use gateway_core::agent::AgentKind;
use gateway_core::error::GatewayError;

/// Pure mapping from an agent's declared kind to the adapter that knows its
/// wire dialect.
pub fn adapter_for(kind: AgentKind) -> Result<BackendAdapter, GatewayError> {
    match kind {
        AgentKind::OpenAi | AgentKind::OpenAiCompatible => Ok(BackendAdapter::OpenAiCompatible),
        AgentKind::DifyChat => Ok(BackendAdapter::DifyChat),
        AgentKind::DifyWorkflow => Ok(BackendAdapter::DifyWorkflow),
    }
}
