//! Upstream dispatcher
//!
//! Everything needed to talk to the chat-completion API: model-class rules,
//! wire types and the request/response exchange itself.

pub mod dispatcher;
pub mod model_class;
pub mod types;

pub use dispatcher::{build_endpoint, complete, dispatch, prepare_messages};
pub use model_class::{ModelClass, TokenBounds, classify_model, normalize_token_limit};
pub use types::{ChatMessage, Role, UpstreamCompletion, UpstreamRequest};
