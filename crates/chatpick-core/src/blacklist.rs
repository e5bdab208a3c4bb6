//! Blacklist filter — the accept predicate and the pop-from-the-end candidate walk.
//!
//! Every comparison is case-insensitive: usernames, prefixes and suffixes are
//! case-folded once when the [`Blacklist`] is built, and each candidate is
//! folded (and its comment trimmed) when it is checked.
//!
//! # Prefix / suffix rule
//!
//! Under the default [`AffixRule::Both`] a comment is rejected only when it
//! starts with a banned prefix *and* ends with a banned suffix. A comment that
//! matches just one of the two lists still passes. [`AffixRule::Either`]
//! rejects a comment that matches either list.

use crate::config::BlacklistConfig;
use crate::types::ChatMessage;
use serde::Deserialize;
use std::collections::HashSet;

/// How the prefix and suffix lists combine when rejecting a comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AffixRule {
    /// Reject only if the comment matches a prefix AND a suffix.
    #[default]
    Both,
    /// Reject if the comment matches a prefix OR a suffix.
    Either,
}

/// Immutable, case-folded blacklist built once from [`BlacklistConfig`].
#[derive(Debug, Clone, Default)]
pub struct Blacklist {
    users: HashSet<String>,
    prefixes: Vec<String>,
    suffixes: Vec<String>,
    rule: AffixRule,
}

impl Blacklist {
    pub fn new<U, P, S>(users: U, prefixes: P, suffixes: S, rule: AffixRule) -> Self
    where
        U: IntoIterator,
        U::Item: AsRef<str>,
        P: IntoIterator,
        P::Item: AsRef<str>,
        S: IntoIterator,
        S::Item: AsRef<str>,
    {
        Self {
            users: fold_entries(users).collect(),
            prefixes: fold_entries(prefixes).collect(),
            suffixes: fold_entries(suffixes).collect(),
            rule,
        }
    }

    pub fn from_config(cfg: &BlacklistConfig) -> Self {
        Self::new(
            split_list(&cfg.users),
            split_list(&cfg.begin_with),
            split_list(&cfg.end_with),
            cfg.affix_rule,
        )
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty() && self.prefixes.is_empty() && self.suffixes.is_empty()
    }

    pub fn rule(&self) -> AffixRule {
        self.rule
    }

    /// `true` if the message may be read out.
    pub fn accepts(&self, chat: &ChatMessage) -> bool {
        if self.users.contains(&fold_case(&chat.username)) {
            return false;
        }

        let comment = fold_case(chat.comment.trim());
        let banned_start = self.prefixes.iter().any(|p| comment.starts_with(p.as_str()));
        let banned_end = self.suffixes.iter().any(|s| comment.ends_with(s.as_str()));

        match self.rule {
            AffixRule::Both => !banned_start || !banned_end,
            AffixRule::Either => !banned_start && !banned_end,
        }
    }

    /// Walk `order` from its end, returning the first accepted message.
    ///
    /// `order` holds positions into `chats`; the last element is tried first.
    /// Positions outside `chats` are skipped. Returns `None` once `order` is
    /// exhausted without a match.
    pub fn select<'a>(&self, chats: &'a [ChatMessage], mut order: Vec<usize>) -> Option<&'a ChatMessage> {
        while let Some(idx) = order.pop() {
            let Some(chat) = chats.get(idx) else { continue };
            if self.accepts(chat) {
                return Some(chat);
            }
            tracing::trace!(username = %chat.username, "blacklisted candidate skipped");
        }
        None
    }
}

/// Split a comma-separated config value into trimmed, non-empty entries.
pub fn split_list(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(',').map(str::trim).filter(|s| !s.is_empty())
}

/// Full Unicode case fold: lowercase, then the expansions and sigma forms
/// where folding differs from lowercasing (`ß` → `ss`, `ς` → `σ`, ligatures).
pub fn fold_case(s: &str) -> String {
    let lower = s.to_lowercase();
    if lower.is_ascii() {
        return lower;
    }
    let mut folded = String::with_capacity(lower.len());
    for c in lower.chars() {
        match c {
            'ß' => folded.push_str("ss"),
            'ŉ' => folded.push_str("\u{2bc}n"),
            'ﬀ' => folded.push_str("ff"),
            'ﬁ' => folded.push_str("fi"),
            'ﬂ' => folded.push_str("fl"),
            'ﬃ' => folded.push_str("ffi"),
            'ﬄ' => folded.push_str("ffl"),
            'ﬅ' | 'ﬆ' => folded.push_str("st"),
            'ς' => folded.push('σ'),
            'ſ' => folded.push('s'),
            'µ' => folded.push('μ'),
            'ϐ' => folded.push('β'),
            'ϑ' => folded.push('θ'),
            'ϕ' => folded.push('φ'),
            'ϖ' => folded.push('π'),
            'ϰ' => folded.push('κ'),
            'ϱ' => folded.push('ρ'),
            'ϵ' => folded.push('ε'),
            'ẛ' => folded.push('ṡ'),
            '\u{345}' => folded.push('ι'),
            other => folded.push(other),
        }
    }
    folded
}

fn fold_entries<I>(items: I) -> impl Iterator<Item = String>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    items
        .into_iter()
        .map(|s| fold_case(s.as_ref().trim()))
        .filter(|s| !s.is_empty())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
