//! Shared primitive types used across the progress store.

/// Score points. Event values come from the static score table.
pub type Points = i32;

/// Any interaction counter or game-logic variable.
pub type Count = i32;

/// Separator used when joining composite counter keys.
/// Never part of the identifier charset.
pub const KEY_SEPARATOR: char = '|';

/// Namespace marker for composite keys with no actor.
pub const GLOBAL_ACTOR: &str = "*";

/// Escapes a separator, global marker or itself inside a composite key part.
pub const KEY_ESCAPE: char = '\\';

/// Identifiers (nouns, verbs, topics, actors) are restricted to
/// ASCII alphanumerics and underscore.
pub fn is_identifier(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}
