//! Named boolean switches for game logic.
//!
//! A flag is either set or absent; absent reads as false.

use crate::ci_map::CiMap;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlagSet {
    flags: CiMap<bool>,
}

impl FlagSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> bool {
        self.flags.get(name).copied().unwrap_or(false)
    }

    /// Returns false if the flag was already set.
    pub fn set(&mut self, name: &str) -> bool {
        if self.get(name) {
            return false;
        }
        self.flags.insert(name, true);
        true
    }

    /// Returns false if the flag was not set.
    pub fn clear(&mut self, name: &str) -> bool {
        self.flags.remove(name).unwrap_or(false)
    }

    /// Names of all currently-set flags.
    pub fn set_flags(&self) -> impl Iterator<Item = &str> {
        self.flags.iter().filter(|(_, v)| **v).map(|(k, _)| k)
    }

    pub fn len(&self) -> usize {
        self.flags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }

    /// Log every set flag. Debugging aid only.
    pub fn dump(&self, label: &str) {
        log::info!("{label} flags ({} set):", self.len());
        for name in self.set_flags() {
            log::info!("  {name}");
        }
    }

    pub(crate) fn table(&self) -> &CiMap<bool> {
        &self.flags
    }

    /// Replace all flags from a loaded table. False entries are dropped.
    pub(crate) fn replace(&mut self, table: CiMap<bool>) {
        let mut flags = CiMap::new();
        for (name, value) in table.iter() {
            if *value {
                flags.insert(name, true);
            }
        }
        self.flags = flags;
    }
}
