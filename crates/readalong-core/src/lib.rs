pub mod ids;
pub mod types;

pub use ids::{SessionId, StoryId, UserId};
pub use types::{Difficulty, Role};
