pub mod conversation;
pub mod events;
pub mod prompt;
pub mod session;

pub use conversation::Conversation;
pub use events::SessionEvent;
pub use session::{BusyFlag, ChatSession};
