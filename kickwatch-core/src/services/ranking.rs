// File: kickwatch-core/src/services/ranking.rs

use std::cmp::Ordering;
use kickwatch_common::models::{ChannelStatus, StatusMapping};

fn is_live(status: Option<&ChannelStatus>) -> bool {
    status.map(|s| s.is_ok() && s.is_live).unwrap_or(false)
}

fn viewers(status: Option<&ChannelStatus>) -> i64 {
    status.map(|s| s.ranking_viewers()).unwrap_or(-1)
}

fn compare(a: Option<&ChannelStatus>, b: Option<&ChannelStatus>) -> Ordering {
    is_live(b)
        .cmp(&is_live(a))
        .then_with(|| viewers(b).cmp(&viewers(a)))
}

/// Display order for a follow list: live first, then most viewers (unknown
/// counts as -1), then the original follow order.
///
/// `follows` must be in insertion order; the sort is stable so it provides the
/// final tie-break.
pub fn rank_follows(follows: &[String], statuses: &StatusMapping) -> Vec<String> {
    let mut ranked: Vec<&String> = follows.iter().collect();
    ranked.sort_by(|a, b| compare(statuses.get(*a), statuses.get(*b)));
    ranked.into_iter().cloned().collect()
}

/// The ranked order restricted to channels currently live.
pub fn live_ranked(follows: &[String], statuses: &StatusMapping) -> Vec<String> {
    rank_follows(follows, statuses)
        .into_iter()
        .filter(|slug| is_live(statuses.get(slug)))
        .collect()
}
