//! Selector — builds the candidate window for one request and runs the
//! blacklist filter over it.
//!
//! The window is the last `random_limit` parsed messages of the channel log.
//! Each mode only changes the order positions are handed to
//! [`Blacklist::select`], which tries the *last* position first:
//!
//! | Mode      | Order                                          |
//! |-----------|------------------------------------------------|
//! | `Last`    | ascending, so the newest message is tried first |
//! | `Random`  | ascending, then shuffled uniformly             |
//! | `Mention` | ascending over the `@channel` subset only      |

use crate::blacklist::{fold_case, Blacklist};
use crate::log_store::LogStore;
use crate::types::{ChatMessage, SelectionMode, SelectionRequest, SelectionResult};
use rand::seq::SliceRandom;
use rand::Rng;
use std::io;

/// Reason returned when the channel log has no chat messages.
pub const NO_CHATS: &str = "No chats to retrieve";

/// Picks one message per request from a channel's log.
#[derive(Debug, Clone)]
pub struct Selector {
    store: LogStore,
    blacklist: Blacklist,
    random_limit: usize,
}

impl Selector {
    pub fn new(store: LogStore, blacklist: Blacklist, random_limit: usize) -> Self {
        Self {
            store,
            blacklist,
            random_limit: random_limit.max(1),
        }
    }

    pub fn random_limit(&self) -> usize {
        self.random_limit
    }

    pub fn blacklist(&self) -> &Blacklist {
        &self.blacklist
    }

    /// Read the channel log and select one message.
    ///
    /// Only real I/O failures are errors; a missing log, an empty window and
    /// an exhausted blacklist walk all come back as `NotFound`.
    pub fn select(&self, request: &SelectionRequest) -> io::Result<SelectionResult> {
        self.select_with_rng(request, &mut rand::rng())
    }

    /// [`Selector::select`] with a caller-supplied RNG (for `Random` mode).
    pub fn select_with_rng<R: Rng + ?Sized>(
        &self,
        request: &SelectionRequest,
        rng: &mut R,
    ) -> io::Result<SelectionResult> {
        let chats = self.store.read_messages(&request.channel)?;
        let result = self.select_from(&chats, &request.channel, request.mode, rng);
        tracing::debug!(
            channel = %request.channel,
            mode = %request.mode,
            parsed = chats.len(),
            found = result.is_found(),
            "selection finished"
        );
        Ok(result)
    }

    /// Selection over an already-parsed message list (oldest first).
    pub fn select_from<R: Rng + ?Sized>(
        &self,
        chats: &[ChatMessage],
        channel: &str,
        mode: SelectionMode,
        rng: &mut R,
    ) -> SelectionResult {
        let window = window(chats, self.random_limit);
        if window.is_empty() {
            return SelectionResult::NotFound(NO_CHATS.to_string());
        }

        match mode {
            SelectionMode::Last => self.filter(window, ascending(window.len())),
            SelectionMode::Random => {
                let mut order = ascending(window.len());
                order.shuffle(rng);
                self.filter(window, order)
            }
            SelectionMode::Mention => {
                let mentions = mentions_of(window, channel);
                if mentions.is_empty() {
                    return SelectionResult::NotFound(self.no_mentions_reason());
                }
                self.filter(&mentions, ascending(mentions.len()))
            }
        }
    }

    fn filter(&self, chats: &[ChatMessage], order: Vec<usize>) -> SelectionResult {
        match self.blacklist.select(chats, order) {
            Some(chat) => SelectionResult::Found(chat.clone()),
            None => SelectionResult::NotFound(self.exhausted_reason()),
        }
    }

    fn exhausted_reason(&self) -> String {
        format!(
            "Content in the last {} chats is blacklisted based on message or username",
            self.random_limit
        )
    }

    fn no_mentions_reason(&self) -> String {
        format!(
            "No one has mentioned you in the last {} chats yet",
            self.random_limit
        )
    }
}

/// The last `limit` messages (or all of them, if there are fewer).
pub fn window(chats: &[ChatMessage], limit: usize) -> &[ChatMessage] {
    &chats[chats.len().saturating_sub(limit)..]
}

/// Messages whose trimmed, case-folded comment starts or ends with
/// `@{channel}`.
pub fn mentions_of(chats: &[ChatMessage], channel: &str) -> Vec<ChatMessage> {
    let tag = format!("@{}", fold_case(channel));
    chats
        .iter()
        .filter(|chat| {
            let comment = fold_case(chat.comment.trim());
            comment.starts_with(&tag) || comment.ends_with(&tag)
        })
        .cloned()
        .collect()
}

fn ascending(len: usize) -> Vec<usize> {
    (0..len).collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
