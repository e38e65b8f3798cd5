//! Deduplication registry for opaque associated-data values.

use std::collections::HashMap;

use rand::Rng;
use serde_json::Value;

/// Maps opaque data values to stable `u32` identifiers.
///
/// Two structurally equal values always intern to the same id, and an id is
/// never reassigned to a different value while the registry lives. The
/// registry is append-only and owned by a single `Navigator`, so its growth
/// is bounded by that navigator's lifetime.
#[derive(Debug, Default)]
pub(crate) struct DataRegistry {
    values: HashMap<u32, Value>,
}

impl DataRegistry {
    pub fn new() -> Self {
        Self {
            values: HashMap::new(),
        }
    }

    /// Return the id of an equal known value, or allocate a fresh random id.
    ///
    /// Equality is the data type's own structural equality. Ids are drawn at
    /// random from the full `u32` space and re-drawn on collision; exhausting
    /// the space is treated as practically impossible.
    pub fn intern(&mut self, value: &Value) -> u32 {
        for (id, known) in &self.values {
            if known == value {
                return *id;
            }
        }

        let mut rng = rand::rng();
        let mut id = rng.random::<u32>();
        while self.values.contains_key(&id) {
            id = rng.random::<u32>();
        }

        self.values.insert(id, value.clone());
        log::debug!("Interned data value as id {} ({} known values)", id, self.len());
        id
    }

    /// The value a given id stands for, if the id was allocated here.
    pub fn value_of(&self, id: u32) -> Option<&Value> {
        self.values.get(&id)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }
}
