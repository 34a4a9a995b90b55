pub mod adapter;
pub mod dify_chat;
pub mod dify_workflow;
pub mod factory;
pub mod openai_compat;
pub mod sse;
pub mod upstream;

pub use adapter::BackendAdapter;
pub use factory::adapter_for;
pub use upstream::{ResponseClass, UpstreamRequest};
