//! Quantity names and their physical units.

use std::{collections::BTreeSet, fmt::Display};

use kstring::KString;

/// The unit of a quantity is encoded in the first character of its
/// name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitClass {
    /// `t...`: time spent
    Seconds,
    /// `h...` (e.g. `hindex`) and `n...`: numbers of things
    Count,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error(
    "quantity {name:?} has no known unit: names must start with \
     't' (seconds), 'h' or 'n' (counts)"
)]
pub struct UnknownUnitClass {
    pub name: KString,
}

impl UnitClass {
    pub fn of_name(name: &str) -> Result<Self, UnknownUnitClass> {
        match name.chars().next() {
            Some('t') => Ok(UnitClass::Seconds),
            Some('h') | Some('n') => Ok(UnitClass::Count),
            _ => Err(UnknownUnitClass {
                name: KString::from_ref(name),
            }),
        }
    }

    pub fn unit_str(self) -> &'static str {
        match self {
            UnitClass::Seconds => "seconds",
            UnitClass::Count => "1",
        }
    }
}

impl Display for UnitClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.unit_str())
    }
}

/// The quantity names available in every loaded record, sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuantityCatalog {
    names: Vec<KString>,
}

impl QuantityCatalog {
    pub fn new(names: impl IntoIterator<Item = KString>) -> Self {
        let names: BTreeSet<KString> = names.into_iter().collect();
        Self {
            names: names.into_iter().collect(),
        }
    }

    pub fn names(&self) -> &[KString] {
        &self.names
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names
            .binary_search_by(|n| n.as_str().cmp(name))
            .is_ok()
    }

    /// Longest names first, so that a name which is a part of a
    /// longer one is only considered after the longer one. Equal
    /// lengths are sorted alphabetically.
    pub fn longest_first(&self) -> Vec<&KString> {
        let mut names: Vec<&KString> = self.names.iter().collect();
        names.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        names
    }
}
