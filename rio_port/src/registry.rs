//! Ordered, name-indexed registry.
//!
//! One authoritative `Vec<T>` in registration order plus a name → index
//! table, updated together on every insertion. Lookups by name are O(1)
//! `HashMap` hits; lookups by index are slice indexing.

use rio_common::port::error::PortError;
use std::collections::HashMap;

/// Items stored in a [`Registry`] expose a unique name.
pub trait Named {
    /// Registry key.
    fn name(&self) -> &str;
}

/// Registration-ordered collection keyed by name.
#[derive(Debug)]
pub struct Registry<T> {
    kind: &'static str,
    items: Vec<T>,
    by_name: HashMap<String, usize>,
}

impl<T: Named> Registry<T> {
    /// Create an empty registry. `kind` names the item type in errors.
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            items: Vec::new(),
            by_name: HashMap::new(),
        }
    }

    /// Append an item.
    ///
    /// # Errors
    /// `PortError::DuplicateName` if the name is taken; the registry is
    /// unchanged.
    pub fn insert(&mut self, item: T) -> Result<usize, PortError> {
        if self.by_name.contains_key(item.name()) {
            return Err(PortError::DuplicateName {
                kind: self.kind,
                name: item.name().to_string(),
            });
        }
        let index = self.items.len();
        self.by_name.insert(item.name().to_string(), index);
        self.items.push(item);
        Ok(index)
    }

    /// Whether `name` is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Lookup by exact name.
    pub fn get(&self, name: &str) -> Result<&T, PortError> {
        let index = self.index_of(name)?;
        Ok(&self.items[index])
    }

    /// Mutable lookup by exact name.
    pub fn get_mut(&mut self, name: &str) -> Result<&mut T, PortError> {
        let index = self.index_of(name)?;
        Ok(&mut self.items[index])
    }

    /// Lookup by registration order.
    pub fn at(&self, index: usize) -> Result<&T, PortError> {
        self.items.get(index).ok_or_else(|| self.not_found(index))
    }

    /// Mutable lookup by registration order.
    pub fn at_mut(&mut self, index: usize) -> Result<&mut T, PortError> {
        let kind = self.kind;
        self.items.get_mut(index).ok_or(PortError::NotFound {
            kind,
            key: index.to_string(),
        })
    }

    /// Registration index of `name`.
    pub fn index_of(&self, name: &str) -> Result<usize, PortError> {
        self.by_name.get(name).copied().ok_or_else(|| PortError::NotFound {
            kind: self.kind,
            key: name.to_string(),
        })
    }

    /// Number of registered items.
    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the registry is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Items in registration order.
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    /// Mutable items in registration order.
    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, T> {
        self.items.iter_mut()
    }

    /// Names in registration order.
    pub fn names(&self) -> Vec<String> {
        self.items.iter().map(|item| item.name().to_string()).collect()
    }

    fn not_found(&self, index: usize) -> PortError {
        PortError::NotFound {
            kind: self.kind,
            key: index.to_string(),
        }
    }
}
