pub mod api;
pub mod repository_traits;

pub use api::ChannelFetcher;
pub use repository_traits::{CookieJar, FollowDocumentRepository, FollowStore};
