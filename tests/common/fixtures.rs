//! Static relay corpora used across harnesses.
#![allow(dead_code)]

/// Lines the relay sends right after the handshake. The ingestor discards the
/// first two non-PING lines it sees.
pub const WELCOME_BURST: &[&str] = &[
    ":tmi.twitch.tv 001 reader :Welcome, GLHF!\r\n",
    ":reader!reader@reader.tmi.twitch.tv JOIN #chan\r\n",
];

/// Keep-alive probe and the reply the ingestor must send.
pub const PING: &str = "PING :tmi.twitch.tv\r\n";
pub const PONG: &str = "PONG :tmi.twitch.tv";

/// Relay notice for a rejected token.
pub const AUTH_FAILED: &str = ":tmi.twitch.tv NOTICE * :Login authentication failed\r\n";

/// A mixed chat corpus for `#chan`: two mentions, one command, one URL.
pub const CORPUS_CHAT: &[(&str, &str)] = &[
    ("alice", "hello everyone"),
    ("Nightbot", "Stream uptime: 2h"),
    ("carol", "@chan can you read this?"),
    ("dave", "!uptime"),
    ("erin", "check out https://spam.example.com"),
    ("frank", "great play @Chan"),
    ("grace", "gg"),
];
