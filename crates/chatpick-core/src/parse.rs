//! Chat line parser — pulls `(username, comment)` pairs out of relay text.
//!
//! Relay chat lines look like
//! `:carol!carol@carol.tmi.twitch.tv PRIVMSG #chan :hello world`. The pattern
//! takes the nick between the leading `:` and `!`, skips greedily up to the
//! last `#tag` that is still followed by a `:`, and keeps everything after
//! that `:` as the comment. A comment containing `#word:` is therefore cut
//! after it; a `#` with no later `:` stays in the comment.
//! It runs over whole log text; each line is matched on its own and anything
//! that does not match (timestamps, welcome numerics, JOINs) is skipped.

use crate::types::ChatMessage;
use regex::Regex;
use std::sync::LazyLock;

static CHAT_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r":(?P<username>\w*)!.*#\w*.*?:(?P<comment>.*)")
        .expect("chat line pattern must compile")
});

/// Parse every chat message in `text`, oldest first.
pub fn parse_chats(text: &str) -> Vec<ChatMessage> {
    CHAT_LINE
        .captures_iter(text)
        .map(|caps| ChatMessage {
            username: caps["username"].to_string(),
            comment: caps["comment"].trim_end_matches('\r').to_string(),
        })
        .collect()
}

/// Parse a single relay line. Returns `None` for anything that is not chat.
pub fn parse_chat_line(line: &str) -> Option<ChatMessage> {
    parse_chats(line).into_iter().next()
}
