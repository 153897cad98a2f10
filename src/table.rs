//! Symbol Interning Table
//!
//! ## Invariants
//!
//! 1. **Idempotent**: once a name has an id, every later lookup returns it.
//! 2. **Injective**: no id is ever shared by two names.
//! 3. **Monotonic**: the table never shrinks and the cursor never moves back.
//! 4. **Atomic merge**: a unit's scratch entries are merged all together or
//!    not at all. A unit that fails before merging leaves no trace.
//!
//! Interning during a unit goes through a [`ScratchTable`], which reads the
//! persistent [`SymbolTable`] but never writes it. Only
//! [`SymbolTable::merge_unit`] mutates persistent state, and it takes
//! `&mut self`, so callers sharing a table across threads need a single
//! writer around it.

use crate::codec::CachePayload;
use crate::error::{CachePayloadError, InternConsistencyError};
use crate::ident::IdCursor;
use std::collections::HashMap;

/// Process-wide name → id mapping, in insertion order.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    entries: Vec<(String, String)>,
    by_name: HashMap<String, usize>,
    by_id: HashMap<String, usize>,
    cursor: IdCursor,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a table from a previously exported payload.
    pub fn from_snapshot(payload: &CachePayload) -> Result<Self, CachePayloadError> {
        payload.validate()?;
        let mut table = SymbolTable {
            cursor: payload.next,
            ..Default::default()
        };
        for (name, id) in &payload.entries {
            table.insert(name.clone(), id.clone());
        }
        Ok(table)
    }

    /// Replaces the whole table with `payload`. On error the table is untouched.
    pub fn load_snapshot(&mut self, payload: &CachePayload) -> Result<(), CachePayloadError> {
        *self = Self::from_snapshot(payload)?;
        tracing::debug!(
            entries = self.entries.len(),
            cursor = %self.cursor,
            "loaded interning snapshot"
        );
        Ok(())
    }

    pub fn export_snapshot(&self) -> CachePayload {
        CachePayload {
            entries: self.entries.clone(),
            next: self.cursor,
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.by_name
            .get(name)
            .map(|&i| self.entries[i].1.as_str())
    }

    /// Reverse lookup.
    pub fn name_of(&self, id: &str) -> Option<&str> {
        self.by_id.get(id).map(|&i| self.entries[i].0.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn cursor(&self) -> IdCursor {
        self.cursor
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, i)| (n.as_str(), i.as_str()))
    }

    /// Interns `name` directly into the persistent table.
    ///
    /// Units should go through [`SymbolTable::begin_unit`] instead so a
    /// failed unit cannot leave partial state behind.
    pub fn intern(&mut self, name: &str) -> String {
        if let Some(id) = self.get(name) {
            return id.to_string();
        }
        let id = self.cursor.next_id();
        tracing::debug!(name, id = %id, "allocated id");
        self.insert(name.to_string(), id.clone());
        id
    }

    /// Fresh scratch table whose allocations continue from this table's cursor.
    pub fn begin_unit(&self) -> ScratchTable {
        ScratchTable::new(self.cursor)
    }

    /// Folds a finished unit's scratch entries into the table.
    ///
    /// Returns the number of names that were new to the table.
    pub fn merge_unit(&mut self, scratch: ScratchTable) -> Result<usize, InternConsistencyError> {
        for entry in &scratch.entries {
            match self.get(&entry.name) {
                Some(existing) if existing != entry.id => {
                    return Err(InternConsistencyError::NameRemapped {
                        name: entry.name.clone(),
                        existing: existing.to_string(),
                        incoming: entry.id.clone(),
                    });
                }
                Some(_) => {}
                None => {
                    if let Some(owner) = self.name_of(&entry.id) {
                        return Err(InternConsistencyError::IdReused {
                            id: entry.id.clone(),
                            existing: owner.to_string(),
                            incoming: entry.name.clone(),
                        });
                    }
                }
            }
        }

        let mut added = 0;
        for entry in scratch.entries {
            if !self.by_name.contains_key(&entry.name) {
                self.insert(entry.name, entry.id);
                added += 1;
            }
        }
        self.cursor = self.cursor.max(scratch.cursor);
        tracing::debug!(added, cursor = %self.cursor, "merged unit scratch");
        Ok(added)
    }

    fn insert(&mut self, name: String, id: String) {
        let index = self.entries.len();
        self.by_name.insert(name.clone(), index);
        self.by_id.insert(id.clone(), index);
        self.entries.push((name, id));
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScratchEntry {
    pub name: String,
    pub id: String,
    /// True when the id was allocated by this unit rather than found in the
    /// persistent table.
    pub allocated: bool,
}

/// Names interned by one unit, in first-use order.
#[derive(Debug, Clone)]
pub struct ScratchTable {
    entries: Vec<ScratchEntry>,
    index: HashMap<String, usize>,
    cursor: IdCursor,
}

impl ScratchTable {
    pub fn new(base: IdCursor) -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
            cursor: base,
        }
    }

    pub fn intern(&mut self, table: &SymbolTable, name: &str) -> String {
        if let Some(&i) = self.index.get(name) {
            return self.entries[i].id.clone();
        }
        let (id, allocated) = match table.get(name) {
            Some(id) => (id.to_string(), false),
            None => {
                let id = self.cursor.next_id();
                tracing::debug!(name, id = %id, "allocated id");
                (id, true)
            }
        };
        self.index.insert(name.to_string(), self.entries.len());
        self.entries.push(ScratchEntry {
            name: name.to_string(),
            id: id.clone(),
            allocated,
        });
        id
    }

    pub fn entries(&self) -> &[ScratchEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of ids this unit allocated.
    pub fn allocated(&self) -> usize {
        self.entries.iter().filter(|e| e.allocated).count()
    }

    pub fn cursor(&self) -> IdCursor {
        self.cursor
    }
}
