pub mod chat;
pub mod prompts;

pub use chat::ChatView;
pub use prompts::{PromptPanel, PromptToggle};
