pub mod conversation;
pub mod selector;
pub mod transcript;

pub use conversation::Conversation;
pub use selector::{ResponseSelector, EXERCISE_WORKSHEET};
pub use transcript::Transcript;
