// File: kickwatch-core/src/platforms/kick/normalizer.rs
//
// Turns whatever the Kick channel endpoint returned into a `ChannelStatus`.
//
// The upstream shape drifts: the channel may or may not be wrapped in a
// `channel` object, the live-stream object lives under several names, and the
// viewer count has four spellings. Each output field therefore has an ordered
// table of `FieldRule`s; the first rule that yields a usable value wins and the
// field falls back to a fixed default when none does. The live flag is the
// exception: it is set when any of its candidates is.
//
// "Usable" depends on the field kind:
//   - text:  a non-empty JSON string
//   - count: a non-negative JSON number (fractions are truncated)
//   - flag:  any non-null value, coerced (numbers != 0, "true"/"1", non-empty objects)
//            and OR-ed across every present candidate
//
// Normalization is pure and never fails. Decoding errors belong to the fetcher.

use serde_json::Value;
use kickwatch_common::models::ChannelStatus;

/// Which object a rule's path starts from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Root {
    /// The response body as received.
    Payload,
    /// `payload.channel` when it is an object, else the payload itself.
    Channel,
    /// `channel.user`.
    User,
    /// The live-stream object, resolved through `LIVESTREAM_RULES`.
    Livestream,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Seg {
    Key(&'static str),
    Index(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldRule {
    pub root: Root,
    pub path: &'static [Seg],
}

const fn rule(root: Root, path: &'static [Seg]) -> FieldRule {
    FieldRule { root, path }
}

use Root::{Channel, Livestream, Payload, User};
use Seg::{Index, Key};

/// Where the live-stream object may be found. Only `Payload`/`Channel` roots are valid here.
pub const LIVESTREAM_RULES: &[FieldRule] = &[
    rule(Channel, &[Key("livestream")]),
    rule(Channel, &[Key("live_stream")]),
    rule(Payload, &[Key("livestream")]),
    rule(Payload, &[Key("livestreams"), Index(0)]),
];

pub const SLUG_RULES: &[FieldRule] = &[
    rule(Channel, &[Key("slug")]),
];

pub const NAME_RULES: &[FieldRule] = &[
    rule(User, &[Key("username")]),
    rule(Channel, &[Key("name")]),
];

pub const PROFILE_PIC_RULES: &[FieldRule] = &[
    rule(User, &[Key("profile_pic")]),
    rule(User, &[Key("profile_picture")]),
    rule(Channel, &[Key("profile_pic")]),
    rule(Channel, &[Key("thumbnail_url")]),
];

pub const TITLE_RULES: &[FieldRule] = &[
    rule(Livestream, &[Key("session_title")]),
    rule(Livestream, &[Key("title")]),
    rule(Channel, &[Key("session_title")]),
];

pub const IS_LIVE_RULES: &[FieldRule] = &[
    rule(Livestream, &[Key("is_live")]),
    rule(Livestream, &[Key("isLive")]),
];

pub const VIEWER_COUNT_RULES: &[FieldRule] = &[
    rule(Livestream, &[Key("viewer_count")]),
    rule(Livestream, &[Key("viewers")]),
    rule(Livestream, &[Key("viewersCount")]),
    rule(Livestream, &[Key("viewers_count")]),
];

pub const CATEGORY_RULES: &[FieldRule] = &[
    rule(Livestream, &[Key("category"), Key("name")]),
    rule(Channel, &[Key("category"), Key("name")]),
    rule(Channel, &[Key("recent_categories"), Index(0), Key("name")]),
];

pub const PLAYBACK_URL_RULES: &[FieldRule] = &[
    rule(Livestream, &[Key("playback_url")]),
    rule(Livestream, &[Key("source")]),
    rule(Channel, &[Key("playback_url")]),
    rule(Payload, &[Key("playback_url")]),
];

pub const THUMBNAIL_RULES: &[FieldRule] = &[
    rule(Livestream, &[Key("thumbnail"), Key("url")]),
    rule(Livestream, &[Key("thumbnail_url")]),
    rule(Livestream, &[Key("thumbnail")]),
    rule(Channel, &[Key("thumbnail_url")]),
];

/// The starting objects every rule resolves against.
struct Roots<'a> {
    payload: &'a Value,
    channel: &'a Value,
    user: Option<&'a Value>,
    livestream: Option<&'a Value>,
}

impl<'a> Roots<'a> {
    fn new(payload: &'a Value) -> Self {
        let channel = payload
            .get("channel")
            .filter(|c| c.is_object())
            .unwrap_or(payload);
        let user = channel.get("user").filter(|u| u.is_object());

        let mut roots = Roots { payload, channel, user, livestream: None };
        let livestream = LIVESTREAM_RULES
            .iter()
            .filter_map(|r| roots.resolve(r))
            .find(|v| v.is_object());
        roots.livestream = livestream;
        roots
    }

    fn root(&self, root: Root) -> Option<&'a Value> {
        match root {
            Root::Payload => Some(self.payload),
            Root::Channel => Some(self.channel),
            Root::User => self.user,
            Root::Livestream => self.livestream,
        }
    }

    fn resolve(&self, rule: &FieldRule) -> Option<&'a Value> {
        let mut cur = self.root(rule.root)?;
        for seg in rule.path {
            cur = match seg {
                Seg::Key(k) => cur.get(*k)?,
                Seg::Index(i) => cur.get(*i)?,
            };
        }
        (!cur.is_null()).then_some(cur)
    }

    fn first_text(&self, rules: &[FieldRule]) -> Option<String> {
        rules
            .iter()
            .filter_map(|r| self.resolve(r))
            .find_map(|v| v.as_str().filter(|s| !s.is_empty()))
            .map(|s| s.to_string())
    }

    fn first_count(&self, rules: &[FieldRule]) -> Option<u64> {
        rules
            .iter()
            .filter_map(|r| self.resolve(r))
            .find_map(as_count)
    }

    fn any_flag(&self, rules: &[FieldRule]) -> bool {
        rules
            .iter()
            .filter_map(|r| self.resolve(r))
            .any(truthy)
    }
}

fn as_count(v: &Value) -> Option<u64> {
    if let Some(n) = v.as_u64() {
        return Some(n);
    }
    v.as_f64()
        .filter(|f| f.is_finite() && *f >= 0.0)
        .map(|f| f.trunc() as u64)
}

fn truthy(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Value::String(s) => matches!(s.trim().to_lowercase().as_str(), "true" | "1" | "yes"),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// Builds a healthy `ChannelStatus` from an upstream payload.
///
/// Missing fields default to `is_live = false`, `viewer_count = Some(0)`,
/// `name = fallback_slug` and `None` elsewhere.
pub fn normalize_channel(payload: &Value, fallback_slug: &str) -> ChannelStatus {
    let roots = Roots::new(payload);

    let slug = roots
        .first_text(SLUG_RULES)
        .unwrap_or_else(|| fallback_slug.to_string())
        .to_lowercase();

    ChannelStatus {
        name: roots.first_text(NAME_RULES).unwrap_or_else(|| fallback_slug.to_string()),
        profile_pic: roots.first_text(PROFILE_PIC_RULES),
        title: roots.first_text(TITLE_RULES),
        is_live: roots.any_flag(IS_LIVE_RULES),
        viewer_count: Some(roots.first_count(VIEWER_COUNT_RULES).unwrap_or(0)),
        category: roots.first_text(CATEGORY_RULES),
        playback_url: roots.first_text(PLAYBACK_URL_RULES),
        thumbnail_url: roots.first_text(THUMBNAIL_RULES),
        error: None,
        slug,
    }
}
