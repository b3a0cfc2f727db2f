//! Single-slot waiting queue and nickname rules

use std::sync::Arc;

use crate::ws::connection::Connection;

/// Nickname used when the requested one is unusable
pub const DEFAULT_NICKNAME: &str = "Player";
pub const MIN_NICKNAME_CHARS: usize = 2;
pub const MAX_NICKNAME_CHARS: usize = 12;

const DUPLICATE_SUFFIX: &str = "(2)";

/// At most one connection waits for an opponent
#[derive(Debug, Default)]
pub enum WaitingSlot {
    #[default]
    Empty,
    OneWaiting(Arc<Connection>),
}

impl WaitingSlot {
    /// The waiting connection, if it is still open
    pub fn open_waiter(&self) -> Option<&Arc<Connection>> {
        match self {
            Self::OneWaiting(conn) if !conn.is_closed() => Some(conn),
            _ => None,
        }
    }

    #[cfg(test)]
    pub fn is_waiting(&self) -> bool {
        matches!(self, Self::OneWaiting(_))
    }

    /// Park `conn` as the waiter, replacing whatever was there
    pub fn park(&mut self, conn: Arc<Connection>) {
        *self = Self::OneWaiting(conn);
    }

    pub fn take(&mut self) -> Option<Arc<Connection>> {
        match std::mem::take(self) {
            Self::OneWaiting(conn) => Some(conn),
            Self::Empty => None,
        }
    }

    /// Empty the slot if `conn` is the one waiting in it
    pub fn clear_if(&mut self, conn: &Arc<Connection>) -> bool {
        match self {
            Self::OneWaiting(waiting) if Arc::ptr_eq(waiting, conn) => {
                *self = Self::Empty;
                true
            }
            _ => false,
        }
    }
}

fn is_nickname_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | ' ') || ('\u{0400}'..='\u{04FF}').contains(&c)
}

/// Strip disallowed characters and enforce the 2..=12 character length
pub fn sanitize_nickname(raw: &str) -> String {
    let cleaned: Vec<char> = raw.chars().filter(|c| is_nickname_char(*c)).collect();
    if cleaned.len() < MIN_NICKNAME_CHARS {
        return DEFAULT_NICKNAME.to_string();
    }
    cleaned.into_iter().take(MAX_NICKNAME_CHARS).collect()
}

/// Mark the second of two identical nicknames, staying within the length cap
pub fn disambiguate(nickname: &str) -> String {
    let max_base = MAX_NICKNAME_CHARS - DUPLICATE_SUFFIX.chars().count();
    let mut renamed: String = nickname.chars().take(max_base).collect();
    renamed.push_str(DUPLICATE_SUFFIX);
    renamed
}
