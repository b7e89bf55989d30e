use kstring::KString;
use ndarray::{Array1, Array2};
use rayon::prelude::{IntoParallelRefIterator, ParallelIterator};

use crate::{
    aggregator::Aggregate,
    axes::{linspace, Axes, Axis, AxisSink},
    expression::Operation,
    hilbert::GridShape,
    histogram::Bins,
    info,
    partition::{ranks_1d, Orientation},
    performances::{
        error::{ConfigurationError, DiagnosticError, QueryError},
        options::{ModeKind, PerformancesOpts},
        spatial::SpatialCache,
    },
    record::{Record, RecordSource},
    simulation::SimulationMetadata,
    warn,
};

/// The result of extracting one timestep.
#[derive(Debug, Clone, PartialEq)]
pub enum Extraction {
    /// One value per process
    Raw(Array1<f64>),
    /// One value per patch; NaN where no process owns the patch
    Map1D(Array1<f64>),
    /// One value per patch, indexed `[x, y]`
    Map2D(Array2<f64>),
    /// Number of processes per bin
    Histogram(Array1<u64>),
}

impl Extraction {
    pub fn shape(&self) -> Vec<usize> {
        match self {
            Extraction::Raw(a) | Extraction::Map1D(a) => vec![a.len()],
            Extraction::Map2D(a) => a.shape().to_vec(),
            Extraction::Histogram(a) => vec![a.len()],
        }
    }
}

/// A process boundary line in simulation units, see
/// `Performances::rank_contours`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineSegment {
    pub orientation: Orientation,
    /// x for vertical lines, y for horizontal ones
    pub at: f64,
    pub from: f64,
    pub to: f64,
}

/// How patches are laid out in `map` mode.
#[derive(Debug)]
enum Layout {
    /// Patches along x in order
    Linear { n_patches: usize },
    /// Patches along the Hilbert curve
    Hilbert {
        cache: SpatialCache,
        patch_length: [f64; 2],
    },
}

#[derive(Debug)]
enum Transform {
    Raw,
    Map(Layout),
    Histogram(Bins),
}

/// A performances diagnostic: the value of one formula over the
/// processes of the selected timesteps, raw, as a map over the
/// simulation domain, or as a histogram.
#[derive(Debug)]
pub struct Performances {
    aggregate: Aggregate,
    operation: Operation,
    transform: Transform,
    data_log: bool,
    timesteps: Vec<u64>,
    axes: Axes,
}

fn map_layout(metadata: Option<&SimulationMetadata>) -> Result<(Layout, Vec<Axis>), DiagnosticError> {
    let metadata = metadata.ok_or(ConfigurationError::MissingMetadata)?;
    metadata.check().map_err(ConfigurationError::from)?;
    let ndim = metadata.ndim();
    if ndim > 2 {
        return Err(DiagnosticError::UnsupportedDimensionality(ndim));
    }

    let axes: Vec<Axis> = (0..ndim)
        .map(|axis| {
            let n = metadata.number_of_patches[axis] as usize;
            let length = metadata.domain_length(axis);
            let half_patch = metadata.patch_length(axis) * 0.5;
            let name = ["x", "y"][axis];
            Axis {
                kind: name.into(),
                shape: n,
                centers: linspace(half_patch, length - half_patch, n),
                label: name.into(),
                units: "L_r".into(),
                log: false,
            }
        })
        .collect();

    let layout = if ndim == 1 {
        Layout::Linear {
            n_patches: metadata.number_of_patches[0] as usize,
        }
    } else {
        let shape =
            GridShape::from_patches(metadata.number_of_patches[0], metadata.number_of_patches[1])?;
        Layout::Hilbert {
            cache: SpatialCache::new(shape),
            patch_length: [metadata.patch_length(0), metadata.patch_length(1)],
        }
    };
    Ok((layout, axes))
}

impl Performances {
    /// The options (and, for `map`, the metadata) are checked before
    /// any source is opened.
    pub fn open<S: RecordSource>(
        sources: &[S],
        metadata: Option<&SimulationMetadata>,
        opts: &PerformancesOpts,
    ) -> Result<Self, DiagnosticError> {
        let mode = opts.check()?;

        let mut axes = Axes::default();
        let transform = match mode.kind {
            ModeKind::Raw => Transform::Raw,
            ModeKind::Map => {
                let (layout, map_axes) = map_layout(metadata)?;
                axes.axes = map_axes;
                Transform::Map(layout)
            }
            ModeKind::Histogram(bins) => Transform::Histogram(bins),
        };

        let aggregate = Aggregate::load(sources)?;
        let operation = Operation::compile(&mode.formula, aggregate.quantities())?;

        let timesteps = opts.timesteps.select(&aggregate.timesteps());
        if timesteps.is_empty() {
            return Err(DiagnosticError::TimestepsNotFound);
        }
        info!(
            "{} of {} timesteps selected",
            timesteps.len(),
            aggregate.timesteps().len()
        );

        match &transform {
            Transform::Raw => {
                let n = aggregate.num_processes();
                axes.append_axis(Axis {
                    kind: "index of each process".into(),
                    shape: n,
                    centers: Array1::from_shape_fn(n, |i| i as f64),
                    label: "index of each process".into(),
                    units: "".into(),
                    log: false,
                });
                axes.set_units(operation.unit_expr());
                axes.set_title(operation.formula());
            }
            Transform::Map(_) => {
                axes.set_units(operation.unit_expr());
                axes.set_title(operation.formula());
            }
            Transform::Histogram(bins) => {
                axes.append_axis(Axis {
                    kind: "quantity".into(),
                    shape: bins.nsteps(),
                    centers: bins.centers(),
                    label: "quantity".into(),
                    units: "".into(),
                    log: false,
                });
                axes.set_units("1");
                axes.set_title("number of processes");
            }
        }

        Ok(Self {
            aggregate,
            operation,
            transform,
            data_log: opts.data_log,
            timesteps,
            axes,
        })
    }

    /// All timesteps in the sources, in ascending order.
    pub fn available_timesteps(&self) -> Vec<u64> {
        let mut timesteps = self.aggregate.timesteps();
        timesteps.dedup();
        timesteps
    }

    /// The selected timesteps.
    pub fn timesteps(&self) -> &[u64] {
        &self.timesteps
    }

    /// The quantities that can be used in formulas.
    pub fn available_quantities(&self) -> &[KString] {
        self.aggregate.quantities().names()
    }

    pub fn operation(&self) -> &Operation {
        &self.operation
    }

    pub fn axes(&self) -> &Axes {
        &self.axes
    }

    /// Hand the axis metadata to `sink`.
    pub fn describe(&self, sink: &mut dyn AxisSink) {
        for axis in &self.axes.axes {
            sink.append_axis(axis.clone());
        }
        sink.set_title(&self.axes.title);
        sink.set_units(&self.axes.units);
    }

    pub fn title(&self) -> &str {
        &self.axes.title
    }

    pub fn value_units(&self) -> &str {
        &self.axes.units
    }

    pub fn info(&self) -> String {
        format!("Performances diagnostic {}", self.title())
    }

    /// Base name for exported files.
    pub fn export_prefix(&self) -> String {
        let mut prefix = String::from("Performances_");
        for name in self.operation.quantities() {
            prefix.push_str(name);
        }
        prefix
    }

    fn record(&self, timestep: u64) -> Result<&Record, QueryError> {
        if self.timesteps.binary_search(&timestep).is_err() {
            return Err(QueryError::TimestepNotFound(timestep));
        }
        self.aggregate
            .record(timestep)
            .ok_or(QueryError::TimestepNotFound(timestep))
    }

    /// The value of the formula for each process, after the
    /// logarithm if requested.
    fn values(&self, record: &Record) -> Result<Array1<f64>, QueryError> {
        let n = self.aggregate.num_processes();
        let values = self.operation.evaluate(record, n)?;
        if values.len() != n {
            return Err(QueryError::ShapeMismatch {
                expected: n,
                found: values.len(),
            });
        }
        if !self.data_log {
            return Ok(values);
        }
        if let Some((process, &value)) = values.iter().enumerate().find(|&(_, &v)| !(v > 0.)) {
            return Err(QueryError::NonPositiveLogInput { process, value });
        }
        Ok(values.mapv_into(f64::log10))
    }

    pub fn try_extract(&self, timestep: u64) -> Result<Extraction, QueryError> {
        let record = self.record(timestep)?;
        let values = self.values(record)?;
        let value_of = |rank: Option<u32>| rank.map_or(f64::NAN, |r| values[r as usize]);
        Ok(match &self.transform {
            Transform::Raw => Extraction::Raw(values.clone()),
            Transform::Map(Layout::Linear { n_patches }) => {
                let ranks = ranks_1d(record.hindex(), *n_patches)?;
                Extraction::Map1D(ranks.into_iter().map(value_of).collect())
            }
            Transform::Map(Layout::Hilbert { cache, .. }) => {
                let ranks = cache.ranks(record.hindex())?;
                let inner = ranks.inner();
                let shape = cache.shape();
                Extraction::Map2D(Array2::from_shape_fn(
                    (shape.patches_x(), shape.patches_y()),
                    |(ix, iy)| value_of(inner[[iy, ix]]),
                ))
            }
            Transform::Histogram(bins) => Extraction::Histogram(bins.count(values.view())),
        })
    }

    /// Like `try_extract`, but errors are only reported as warnings.
    pub fn extract(&self, timestep: u64) -> Option<Extraction> {
        match self.try_extract(timestep) {
            Ok(extraction) => Some(extraction),
            Err(e) => {
                warn!("timestep {timestep}: {e}");
                None
            }
        }
    }

    /// Build what is shared between timesteps up front, so that
    /// extraction does not have to.
    pub fn prepare(&self) {
        if let Transform::Map(Layout::Hilbert { cache, .. }) = &self.transform {
            cache.hilbert();
        }
    }

    /// Extract all selected timesteps, in parallel.
    pub fn extract_all(&self) -> Vec<(u64, Option<Extraction>)> {
        self.prepare();
        self.timesteps
            .par_iter()
            .map(|&timestep| (timestep, self.extract(timestep)))
            .collect()
    }

    fn hilbert_layout(&self) -> Result<(&SpatialCache, [f64; 2]), QueryError> {
        match &self.transform {
            Transform::Map(Layout::Hilbert {
                cache,
                patch_length,
            }) => Ok((cache, *patch_length)),
            _ => Err(QueryError::NotASpatialMap),
        }
    }

    /// The owning process of each patch, indexed `[x, y]` like
    /// `Extraction::Map2D`.
    pub fn rank_layout(&self, timestep: u64) -> Result<Array2<Option<u32>>, QueryError> {
        let (cache, _) = self.hilbert_layout()?;
        let record = self.record(timestep)?;
        let ranks = cache.ranks(record.hindex())?;
        Ok(ranks.inner().t().to_owned())
    }

    /// The outlines of the regions owned by each process, in
    /// simulation units.
    pub fn rank_contours(&self, timestep: u64) -> Result<Vec<LineSegment>, QueryError> {
        let (cache, [length_x, length_y]) = self.hilbert_layout()?;
        let record = self.record(timestep)?;
        let ranks = cache.ranks(record.hindex())?;
        Ok(ranks
            .boundary_segments()
            .into_iter()
            .map(|segment| {
                let (at_scale, along_scale) = match segment.orientation {
                    Orientation::Vertical => (length_x, length_y),
                    Orientation::Horizontal => (length_y, length_x),
                };
                LineSegment {
                    orientation: segment.orientation,
                    at: segment.at as f64 * at_scale,
                    from: segment.from as f64 * along_scale,
                    to: segment.to as f64 * along_scale,
                }
            })
            .collect())
    }

    /// `[x_min, x_max, y_min, y_max]` of a 2-D map.
    pub fn extent(&self) -> Option<[f64; 4]> {
        let (cache, [length_x, length_y]) = self.hilbert_layout().ok()?;
        let shape = cache.shape();
        Some([
            0.,
            shape.patches_x() as f64 * length_x,
            0.,
            shape.patches_y() as f64 * length_y,
        ])
    }
}
