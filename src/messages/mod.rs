pub mod reconciler;
pub mod storage;
pub mod types;

pub use reconciler::MessageReconciler;
pub use storage::EchoStorage;
pub use types::{Message, MessageId, ToolCall, ToolCallKind, NAVIGATION_TOOL_KIND};
