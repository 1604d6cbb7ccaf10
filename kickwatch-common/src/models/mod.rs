pub mod channel;
pub mod follow;
pub mod identity;

pub use channel::{ChannelStatus, StatusMapping};
pub use follow::FollowRecord;
pub use identity::IdentityContext;
