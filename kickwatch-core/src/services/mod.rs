pub mod ranking;
pub mod reconcile_service;
pub mod selector_service;

pub use ranking::{live_ranked, rank_follows};
pub use reconcile_service::{FollowReconciler, FollowSnapshot, ReconcileOptions};
pub use selector_service::{
    decide_current, ActiveChannelSelector, NowPlaying, PlaybackState, PlaybackTicket, SelectionState,
};
