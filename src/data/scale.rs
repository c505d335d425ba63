use std::collections::BTreeMap;

use super::filter::mean_flux_in;
use super::model::{Interval, SpectrumSet};

/// Rest-frame band whose mean flux lines the raw spectra up on screen.
pub const REFERENCE_BAND: Interval = Interval::new(1590.0, 1650.0);

/// Per-label multiplicative factors for the working plot.
///
/// Display only: the factors never reach the continuum fit or the written
/// normalized spectra.
#[derive(Debug, Clone, PartialEq)]
pub struct ScaleFactors {
    reference: String,
    factors: BTreeMap<String, f64>,
    /// Labels without usable flux in [`REFERENCE_BAND`]; these keep 1.0.
    pub uncovered: Vec<String>,
}

impl ScaleFactors {
    /// Scale every spectrum to the mean reference-band flux of `reference`.
    pub fn compute(spectra: &SpectrumSet, reference: &str) -> Self {
        let means: BTreeMap<&str, Option<f64>> = spectra
            .iter()
            .map(|(label, sp)| {
                let mean = mean_flux_in(sp, REFERENCE_BAND).filter(|m| m.is_finite() && *m != 0.0);
                (label.as_str(), mean)
            })
            .collect();

        let reference_mean = means.get(reference).copied().flatten();
        let mut factors = BTreeMap::new();
        let mut uncovered = Vec::new();

        for (label, mean) in &means {
            let factor = if *label == reference {
                1.0
            } else {
                match (reference_mean, mean) {
                    (Some(r), Some(m)) => r / m,
                    _ => {
                        log::warn!("no flux in {REFERENCE_BAND} for '{label}', leaving it unscaled");
                        uncovered.push(label.to_string());
                        1.0
                    }
                }
            };
            log::debug!("scale factor {label}: {factor}");
            factors.insert(label.to_string(), factor);
        }

        ScaleFactors {
            reference: reference.to_string(),
            factors,
            uncovered,
        }
    }

    pub fn reference(&self) -> &str {
        &self.reference
    }

    /// Factor for `label`; unknown labels are left unscaled.
    pub fn factor(&self, label: &str) -> f64 {
        self.factors.get(label).copied().unwrap_or(1.0)
    }
}
