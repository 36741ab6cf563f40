mod message;
mod pipeline;

pub use message::{with_insights, Message, Role, Transcript};
pub use pipeline::{
    ChatPipeline, ConversationContext, ErrorBanner, PipelineSettings, PipelineState, SendOutcome,
};
