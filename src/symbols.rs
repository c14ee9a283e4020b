use indexmap::IndexMap;
use indexmap::map::Entry;

use crate::error::ErrorKind;

/// Label to address bindings, in definition order. Names are
/// case-sensitive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SymbolTable {
    labels: IndexMap<String, u16>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `name` to `address`. A name can only be bound once.
    pub fn define(&mut self, name: &str, address: u16) -> Result<(), ErrorKind> {
        match self.labels.entry(name.to_owned()) {
            Entry::Occupied(_) => Err(ErrorKind::DuplicateLabel(name.to_owned())),
            Entry::Vacant(e) => {
                e.insert(address);
                Ok(())
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<u16> {
        self.labels.get(name).copied()
    }

    pub fn address_of(&self, name: &str) -> Result<u16, ErrorKind> {
        self.get(name)
            .ok_or_else(|| ErrorKind::UndefinedLabel(name.to_owned()))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u16)> + '_ {
        self.labels.iter().map(|(name, addr)| (name.as_str(), *addr))
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}
