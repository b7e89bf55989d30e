//! The performance data of one timestep, and where it comes from.

use std::{borrow::Cow, collections::BTreeMap};

use kstring::KString;
use ndarray::{Array1, ArrayView1};

use crate::expression::QuantityLookup;

/// The name under which the process boundaries are also available as
/// a quantity.
pub const HINDEX: &str = "hindex";

/// Per-process measurements of one timestep. Arrays are indexed by
/// process rank.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    timestep: u64,
    quantities: BTreeMap<KString, Array1<f64>>,
    /// The first patch (in curve order) owned by each process.
    hindex: Vec<u64>,
}

impl Record {
    /// `quantities` must not contain `hindex`, it is added from
    /// `hindex` (any existing entry is replaced).
    pub fn new(
        timestep: u64,
        mut quantities: BTreeMap<KString, Array1<f64>>,
        hindex: Vec<u64>,
    ) -> Self {
        quantities.insert(
            KString::from_static(HINDEX),
            hindex.iter().map(|&i| i as f64).collect(),
        );
        Self {
            timestep,
            quantities,
            hindex,
        }
    }

    pub fn timestep(&self) -> u64 {
        self.timestep
    }

    pub fn hindex(&self) -> &[u64] {
        &self.hindex
    }

    pub fn num_processes(&self) -> usize {
        self.hindex.len()
    }

    pub fn quantities(&self) -> &BTreeMap<KString, Array1<f64>> {
        &self.quantities
    }

    pub fn quantity_names(&self) -> impl Iterator<Item = &KString> {
        self.quantities.keys()
    }
}

impl QuantityLookup for Record {
    fn quantity(&self, name: &str) -> Option<ArrayView1<'_, f64>> {
        self.quantities.quantity(name)
    }
}

/// Something that can be read into records, in any order.
pub trait RecordSource {
    /// For messages.
    fn name(&self) -> Cow<'_, str>;

    fn open(&self) -> anyhow::Result<Vec<Record>>;
}

/// Records that are already in memory, e.g. for tests or when
/// generated by another program.
#[derive(Debug, Clone)]
pub struct InMemorySource {
    pub name: String,
    pub records: Vec<Record>,
}

impl RecordSource for InMemorySource {
    fn name(&self) -> Cow<'_, str> {
        Cow::Borrowed(&self.name)
    }

    fn open(&self) -> anyhow::Result<Vec<Record>> {
        Ok(self.records.clone())
    }
}

impl<S: RecordSource + ?Sized> RecordSource for &S {
    fn name(&self) -> Cow<'_, str> {
        (**self).name()
    }

    fn open(&self) -> anyhow::Result<Vec<Record>> {
        (**self).open()
    }
}

impl<S: RecordSource + ?Sized> RecordSource for Box<S> {
    fn name(&self) -> Cow<'_, str> {
        (**self).name()
    }

    fn open(&self) -> anyhow::Result<Vec<Record>> {
        (**self).open()
    }
}
