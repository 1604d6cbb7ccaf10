// src/follows/mod.rs

pub mod store;

pub use store::{
    normalize_slug, AnonymousFollowStore, AuthenticatedFollowStore, FollowBackends,
    GUEST_COOKIE_NAME, GUEST_COOKIE_TTL_DAYS,
};
