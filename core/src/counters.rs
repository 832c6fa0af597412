//! Interaction counters keyed by (actor?, noun, topic-or-verb).
//!
//! Composite keys are joined as `actor|noun|detail`. A missing actor is
//! written as a bare `*`, so `(noun, topic)` and `(actor, noun, topic)` never
//! share a slot. Identifiers should not contain `*`, `|` or `\`; when one
//! does, the character is written with a `\` escape so the key stays unique.

use crate::{
    ci_map::CounterTable,
    types::{is_identifier, Count, GLOBAL_ACTOR, KEY_ESCAPE, KEY_SEPARATOR},
};

/// A borrowed composite key, as passed to the counter accessors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InteractionKey<'a> {
    pub actor:  Option<&'a str>,
    pub noun:   &'a str,
    pub detail: &'a str,
}

impl<'a> InteractionKey<'a> {
    pub fn global(noun: &'a str, detail: &'a str) -> Self {
        Self { actor: None, noun, detail }
    }

    pub fn for_actor(actor: &'a str, noun: &'a str, detail: &'a str) -> Self {
        Self { actor: Some(actor), noun, detail }
    }

    pub fn join(&self) -> String {
        for part in self.actor.into_iter().chain([self.noun, self.detail]) {
            if !is_identifier(part) {
                log::warn!("counter key part '{part}' is not a plain identifier");
            }
        }

        let mut joined = String::with_capacity(
            self.actor.map_or(1, str::len) + self.noun.len() + self.detail.len() + 2,
        );
        match self.actor {
            Some(actor) => push_escaped(&mut joined, actor),
            None => joined.push_str(GLOBAL_ACTOR),
        }
        joined.push(KEY_SEPARATOR);
        push_escaped(&mut joined, self.noun);
        joined.push(KEY_SEPARATOR);
        push_escaped(&mut joined, self.detail);
        joined
    }
}

fn push_escaped(out: &mut String, part: &str) {
    for c in part.chars() {
        if c == KEY_SEPARATOR || c == KEY_ESCAPE || GLOBAL_ACTOR.starts_with(c) {
            out.push(KEY_ESCAPE);
        }
        out.push(c);
    }
}

/// A composite key read back out of a joined string.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ParsedKey {
    pub actor:  Option<String>,
    pub noun:   String,
    pub detail: String,
}

impl ParsedKey {
    /// Split a joined key back into its parts, undoing escapes.
    pub fn parse(joined: &str) -> Option<Self> {
        let mut fields: Vec<(String, bool)> = Vec::with_capacity(3);
        let mut current = String::new();
        let mut escaped_any = false;
        let mut chars = joined.chars();
        while let Some(c) = chars.next() {
            if c == KEY_ESCAPE {
                current.push(chars.next()?);
                escaped_any = true;
            } else if c == KEY_SEPARATOR {
                fields.push((std::mem::take(&mut current), escaped_any));
                escaped_any = false;
            } else {
                current.push(c);
            }
        }
        fields.push((current, escaped_any));

        let [(actor, actor_escaped), (noun, _), (detail, _)]: [(String, bool); 3] =
            fields.try_into().ok()?;
        let actor = if actor == GLOBAL_ACTOR && !actor_escaped { None } else { Some(actor) };
        Some(Self { actor, noun, detail })
    }

    pub fn as_key(&self) -> InteractionKey<'_> {
        InteractionKey {
            actor:  self.actor.as_deref(),
            noun:   &self.noun,
            detail: &self.detail,
        }
    }
}

/// Counter table addressed by composite keys. Used for both topic counts
/// and noun/verb counts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InteractionCounts {
    table: CounterTable,
}

impl InteractionCounts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &InteractionKey<'_>) -> Count {
        self.table.count(&key.join())
    }

    pub fn set(&mut self, key: &InteractionKey<'_>, count: Count) {
        self.table.set_count(&key.join(), count);
    }

    pub fn increment(&mut self, key: &InteractionKey<'_>) -> Count {
        self.table.increment(&key.join())
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Entries as (parsed key, count). Keys that fail to parse are skipped.
    pub fn iter(&self) -> impl Iterator<Item = (ParsedKey, Count)> + '_ {
        self.table
            .iter()
            .filter_map(|(k, v)| ParsedKey::parse(k).map(|key| (key, *v)))
    }

    pub(crate) fn table(&self) -> &CounterTable {
        &self.table
    }

    pub(crate) fn replace(&mut self, table: CounterTable) {
        self.table = table;
    }
}
