//! A diagnostic that may have failed to load: loading never fails,
//! instead the diagnostic is marked invalid and keeps the reason, and
//! queries on it only warn.

use crate::{
    performances::{DiagnosticError, Extraction, Performances, PerformancesOpts},
    record::RecordSource,
    simulation::SimulationMetadata,
    warn,
};

#[derive(Debug)]
pub struct Diagnostic {
    performances: Result<Performances, DiagnosticError>,
}

impl Diagnostic {
    pub fn load<S: RecordSource>(
        sources: &[S],
        metadata: Option<&SimulationMetadata>,
        opts: &PerformancesOpts,
    ) -> Self {
        let performances = Performances::open(sources, metadata, opts);
        if let Err(e) = &performances {
            warn!("{e}");
        }
        Self { performances }
    }

    pub fn is_valid(&self) -> bool {
        self.performances.is_ok()
    }

    /// Why the diagnostic is invalid.
    pub fn error(&self) -> Option<&DiagnosticError> {
        self.performances.as_ref().err()
    }

    pub fn performances(&self) -> Option<&Performances> {
        self.validated()
    }

    fn validated(&self) -> Option<&Performances> {
        match &self.performances {
            Ok(performances) => Some(performances),
            Err(e) => {
                warn!("invalid diagnostic: {e}");
                None
            }
        }
    }

    /// The selected timesteps; empty if invalid.
    pub fn timesteps(&self) -> &[u64] {
        self.validated().map_or(&[][..], |p| p.timesteps())
    }

    pub fn extract(&self, timestep: u64) -> Option<Extraction> {
        self.validated()?.extract(timestep)
    }

    pub fn extract_all(&self) -> Vec<(u64, Option<Extraction>)> {
        self.validated()
            .map(|p| p.extract_all())
            .unwrap_or_default()
    }

    pub fn info(&self) -> String {
        match &self.performances {
            Ok(p) => p.info(),
            Err(e) => format!("Invalid diagnostic: {e}"),
        }
    }
}
