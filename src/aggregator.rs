//! Collecting the records of one or more sources (e.g. a simulation
//! and its restarts) into a single timestep-ordered sequence.

use itertools::{EitherOrBoth, Itertools};
use kstring::KString;

use crate::{
    debug, info,
    quantity::QuantityCatalog,
    record::{Record, RecordSource},
    warn,
};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum AggregateError {
    #[error("could not open source {source_name:?}: {message}")]
    SourceUnavailable {
        source_name: String,
        message: String,
    },
    #[error("no records found")]
    NoRecords,
    #[error(
        "incompatible records: timestep {timestep} has {found} processes, while \
         timestep {first_timestep} has {expected}"
    )]
    InconsistentTopology {
        timestep: u64,
        found: usize,
        first_timestep: u64,
        expected: usize,
    },
}

/// The names present in both sorted sequences, sorted.
fn intersect_sorted<'a>(a: &'a [KString], b: &'a [KString]) -> Vec<KString> {
    a.iter()
        .merge_join_by(b.iter(), |x, y| x.cmp(y))
        .filter_map(|eob| match eob {
            EitherOrBoth::Both(x, _) => Some(x.clone()),
            EitherOrBoth::Left(_) => None,
            EitherOrBoth::Right(_) => None,
        })
        .collect()
}

#[derive(Debug, Clone)]
pub struct Aggregate {
    records: Vec<Record>,
    catalog: QuantityCatalog,
    num_processes: usize,
}

impl Aggregate {
    /// All sources must open successfully. Records are sorted by
    /// timestep; records with the same timestep are all kept, in
    /// source order.
    pub fn load<S: RecordSource>(sources: &[S]) -> Result<Self, AggregateError> {
        let mut records = Vec::new();
        for source in sources {
            let mut loaded = source
                .open()
                .map_err(|e| AggregateError::SourceUnavailable {
                    source_name: source.name().into_owned(),
                    message: format!("{e:#}"),
                })?;
            info!("{} records from {:?}", loaded.len(), source.name());
            records.append(&mut loaded);
        }
        Self::from_records(records)
    }

    pub fn from_records(mut records: Vec<Record>) -> Result<Self, AggregateError> {
        // Stable, thus keeps source order for equal timesteps
        records.sort_by_key(|r| r.timestep());

        let first = records.first().ok_or(AggregateError::NoRecords)?;
        let num_processes = first.num_processes();
        for record in &records {
            if record.num_processes() != num_processes {
                return Err(AggregateError::InconsistentTopology {
                    timestep: record.timestep(),
                    found: record.num_processes(),
                    first_timestep: first.timestep(),
                    expected: num_processes,
                });
            }
        }

        for (a, b) in records.iter().tuple_windows() {
            if a.timestep() == b.timestep() {
                warn!(
                    "timestep {} appears more than once, only the first one is used",
                    a.timestep()
                );
            }
        }

        let mut common: Option<Vec<KString>> = None;
        for record in &records {
            let names: Vec<KString> = record.quantity_names().cloned().collect();
            common = Some(match common {
                None => names,
                Some(common) => intersect_sorted(&common, &names),
            });
        }
        let catalog = QuantityCatalog::new(common.unwrap_or_default());
        debug!("common quantities: {:?}", catalog.names());

        Ok(Self {
            records,
            catalog,
            num_processes,
        })
    }

    /// In ascending order, including duplicates.
    pub fn timesteps(&self) -> Vec<u64> {
        self.records.iter().map(|r| r.timestep()).collect()
    }

    /// The quantity names that every record has.
    pub fn quantities(&self) -> &QuantityCatalog {
        &self.catalog
    }

    pub fn num_processes(&self) -> usize {
        self.num_processes
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// The first record with the given timestep.
    pub fn record(&self, timestep: u64) -> Option<&Record> {
        let i = self.records.partition_point(|r| r.timestep() < timestep);
        self.records.get(i).filter(|r| r.timestep() == timestep)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use anyhow::bail;
    use ndarray::Array1;

    use super::*;
    use crate::record::InMemorySource;

    fn record(timestep: u64, names: &[&str], hindex: Vec<u64>) -> Record {
        let n = hindex.len();
        let quantities: BTreeMap<KString, Array1<f64>> = names
            .iter()
            .map(|name| {
                (
                    KString::from_ref(name),
                    Array1::from_elem(n, timestep as f64),
                )
            })
            .collect();
        Record::new(timestep, quantities, hindex)
    }

    fn source(name: &str, records: Vec<Record>) -> InMemorySource {
        InMemorySource {
            name: name.into(),
            records,
        }
    }

    struct Broken;

    impl RecordSource for Broken {
        fn name(&self) -> std::borrow::Cow<'_, str> {
            "broken".into()
        }

        fn open(&self) -> anyhow::Result<Vec<Record>> {
            bail!("could not open the file")
        }
    }

    #[test]
    fn t_ordering_and_intersection() {
        let a = source(
            "a",
            vec![
                record(20, &["t_a", "t_b", "n_c"], vec![0, 2]),
                record(10, &["t_a", "t_b"], vec![0, 1]),
            ],
        );
        let b = source("b", vec![record(15, &["t_b", "t_a", "n_d"], vec![0, 3])]);
        let agg = Aggregate::load(&[a, b]).unwrap();
        assert_eq!(agg.timesteps(), [10, 15, 20]);
        assert_eq!(agg.num_processes(), 2);
        let names: Vec<&str> = agg.quantities().names().iter().map(|n| n.as_str()).collect();
        assert_eq!(names, ["hindex", "t_a", "t_b"]);
        assert_eq!(agg.record(15).map(|r| r.hindex()), Some(&[0, 3][..]));
        assert!(agg.record(16).is_none());
    }

    #[test]
    fn t_duplicates_are_kept() {
        let a = source("a", vec![record(10, &["t_a"], vec![0, 1])]);
        let b = source(
            "b",
            vec![
                record(10, &["t_a"], vec![0, 2]),
                record(5, &["t_a"], vec![0, 3]),
            ],
        );
        let agg = Aggregate::load(&[a, b]).unwrap();
        assert_eq!(agg.timesteps(), [5, 10, 10]);
        // The first loaded one wins
        assert_eq!(agg.record(10).map(|r| r.hindex()), Some(&[0, 1][..]));
    }

    #[test]
    fn t_errors() {
        let empty: [InMemorySource; 0] = [];
        assert_eq!(
            Aggregate::load(&empty).err(),
            Some(AggregateError::NoRecords)
        );
        assert_eq!(
            Aggregate::load(&[source("a", vec![])]).err(),
            Some(AggregateError::NoRecords)
        );

        let a = source(
            "a",
            vec![
                record(1, &["t_a"], vec![0, 1]),
                record(2, &["t_a"], vec![0, 1, 2]),
            ],
        );
        assert_eq!(
            Aggregate::load(&[a]).err(),
            Some(AggregateError::InconsistentTopology {
                timestep: 2,
                found: 3,
                first_timestep: 1,
                expected: 2
            })
        );

        let sources: Vec<Box<dyn RecordSource>> = vec![
            Box::new(source("a", vec![record(1, &["t_a"], vec![0])])),
            Box::new(Broken),
        ];
        assert_eq!(
            Aggregate::load(&sources).err(),
            Some(AggregateError::SourceUnavailable {
                source_name: "broken".into(),
                message: "could not open the file".into()
            })
        );
    }
}
