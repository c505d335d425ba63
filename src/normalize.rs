use std::collections::BTreeMap;

use crate::continuum::{model_for, Continuum, ContinuumModel};
use crate::data::filter::{indices_in_windows, median_snr};
use crate::data::model::{Interval, Spectrum, WindowSet};
use crate::error::{FitError, NormalizeError};
use crate::state::{Session, SessionParams};

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// A spectrum divided by its fitted continuum.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedSpectrum {
    /// Rest-frame wavelength, normalized flux and normalized flux error.
    pub spectrum: Spectrum,
    /// Continuum evaluated at every wavelength sample.
    pub continuum: Vec<f64>,
    pub fit: Continuum,
    /// Number of samples that fed the fit.
    pub fit_samples: usize,
}

/// What happened to one spectrum during a run.
#[derive(Debug, Clone)]
pub struct SpectrumOutcome {
    pub label: String,
    /// Median SNR over the SNR window, `None` when the window is empty.
    pub snr: Option<f64>,
    pub result: Result<NormalizedSpectrum, FitError>,
}

/// Everything a `normalize` command produced, in active-list order.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub snr_window: Interval,
    pub spectra: Vec<SpectrumOutcome>,
}

impl RunOutcome {
    /// One line for the shared SNR log: id, window, then `label snr` pairs.
    pub fn snr_line(&self, short_id: &str) -> String {
        let mut line = format!("{short_id} {} {}", self.snr_window.start, self.snr_window.end);
        for outcome in &self.spectra {
            match outcome.snr {
                Some(snr) => line.push_str(&format!(" {} {snr}", outcome.label)),
                None => line.push_str(&format!(" {} nan", outcome.label)),
            }
        }
        line
    }

    /// Successfully normalized spectra keyed by label.
    pub fn normalized(&self) -> BTreeMap<String, NormalizedSpectrum> {
        self.spectra
            .iter()
            .filter_map(|o| o.result.as_ref().ok().map(|n| (o.label.clone(), n.clone())))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

/// Refuse spectra that do not carry all three columns.
pub fn validate(label: &str, spectrum: &Spectrum) -> Result<(), NormalizeError> {
    let columns = spectrum.complete_columns();
    if columns != 3 {
        return Err(NormalizeError::MalformedSpectrum {
            label: label.to_string(),
            columns,
        });
    }
    Ok(())
}

/// Fit `model` to the windowed samples of `working` and divide `original`
/// by the result.
///
/// Both spectra share the wavelength grid; `working` may be smoothed, the
/// division always uses the untouched `original` columns.
pub fn normalize_spectrum(
    original: &Spectrum,
    working: &Spectrum,
    windows: &WindowSet,
    model: &dyn ContinuumModel,
) -> Result<NormalizedSpectrum, FitError> {
    let idx = indices_in_windows(&working.wavelength, windows.as_slice());
    log::debug!("fitting {} samples from {} window(s)", idx.len(), windows.len());
    let pick = |col: &[f64]| idx.iter().map(|&i| col[i]).collect::<Vec<f64>>();
    let fit = model.fit(
        &pick(&working.wavelength),
        &pick(&working.flux),
        &pick(&working.flux_error),
    )?;

    let continuum = fit.evaluate_all(&original.wavelength);
    let divide = |col: &[f64]| {
        col.iter()
            .zip(&continuum)
            .map(|(v, c)| v / c)
            .collect::<Vec<f64>>()
    };
    let spectrum = Spectrum {
        wavelength: original.wavelength.clone(),
        flux: divide(&original.flux),
        flux_error: divide(&original.flux_error),
    };

    Ok(NormalizedSpectrum {
        spectrum,
        continuum,
        fit,
        fit_samples: idx.len(),
    })
}

/// Normalize every active spectrum of `session` with `params`.
///
/// All active spectra are validated before anything is computed, so a
/// malformed one aborts the run without partial results. Fit failures are
/// recorded per spectrum and do not stop the others.
pub fn run(session: &Session, params: &SessionParams) -> Result<RunOutcome, NormalizeError> {
    let mut selected = Vec::with_capacity(params.active.len());
    for label in params.active.iter() {
        let original = session
            .original
            .get(label)
            .ok_or_else(|| NormalizeError::UnknownSpectrum(label.to_string()))?;
        let working = session.working.get(label).unwrap_or(original);
        validate(label, original)?;
        validate(label, working)?;
        selected.push((label, original, working));
    }

    let model = model_for(&params.function);
    let spectra = selected
        .into_iter()
        .map(|(label, original, working)| {
            let snr = median_snr(original, params.snr_window);
            let result = match &model {
                Ok(model) => normalize_spectrum(original, working, &params.windows, model.as_ref()),
                Err(e) => Err(e.clone()),
            };
            SpectrumOutcome {
                label: label.to_string(),
                snr,
                result,
            }
        })
        .collect();

    Ok(RunOutcome {
        snr_window: params.snr_window,
        spectra,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::continuum::{FunctionFamily, LinearFit};
    use crate::data::scale::ScaleFactors;
    use crate::data::model::{ObjectInfo, SpectrumSet};

    fn windows() -> WindowSet {
        WindowSet::new(vec![
            Interval::new(1300.0, 1320.0),
            Interval::new(1590.0, 1620.0),
        ])
        .unwrap()
    }

    fn sloped() -> Spectrum {
        Spectrum::from_samples((0..=600).map(|i| {
            let w = 1200.0 + i as f64;
            (w, 10.0 - 0.002 * w + if (1540.0..1560.0).contains(&w) { 3.0 } else { 0.0 }, 0.5)
        }))
    }

    fn session(spectrum: Spectrum) -> Session {
        let object = ObjectInfo {
            name: "SDSS J000000.00+000000.0".into(),
            short_id: "J000000".into(),
            ra: 0.0,
            dec: 0.0,
            gmag: 18.0,
            redshift: 2.0,
            mjd: [("SDSS".to_string(), 52000.0)].into_iter().collect(),
        };
        let mut spectra = SpectrumSet::new();
        spectra.insert("SDSS".into(), spectrum);
        let scale = ScaleFactors::compute(&spectra, "SDSS");
        Session::new(object, spectra, scale, 5)
    }

    #[test]
    fn flat_unit_continuum_leaves_flux_unchanged() {
        let sp = Spectrum::from_samples((0..50).map(|i| (1300.0 + i as f64, 1.0, 0.1)));
        let mut original = sp.clone();
        original.flux[10] = 1.7;
        let windows = WindowSet::new(vec![Interval::new(1299.0, 1350.0)]).unwrap();

        let out = normalize_spectrum(&original, &sp, &windows, &LinearFit).unwrap();
        for (a, b) in out.spectrum.flux.iter().zip(&original.flux) {
            assert!((a - b).abs() < 1e-9);
        }
        assert_eq!(out.spectrum.wavelength, original.wavelength);
    }

    #[test]
    fn division_uses_the_original_not_the_working_copy() {
        let original = sloped();
        let working = original.with_flux(vec![1.0; original.len()]);
        let out = normalize_spectrum(&original, &working, &windows(), &LinearFit).unwrap();
        // The continuum of the flat working copy is 1.0, so the original survives.
        for (a, b) in out.spectrum.flux.iter().zip(&original.flux) {
            assert!((a - b).abs() < 1e-9);
        }
    }

    #[test]
    fn line_continuum_is_divided_out() {
        let original = sloped();
        let out = normalize_spectrum(&original, &original, &windows(), &LinearFit).unwrap();
        // Away from the emission bump the normalized flux is 1.
        let i = original.wavelength.iter().position(|&w| w == 1700.0).unwrap();
        assert!((out.spectrum.flux[i] - 1.0).abs() < 1e-9);
        let expected_err = 0.5 / (10.0 - 0.002 * 1700.0);
        assert!((out.spectrum.flux_error[i] - expected_err).abs() < 1e-9);
        assert_eq!(out.fit_samples, 19 + 29);
    }

    #[test]
    fn malformed_spectrum_aborts_whole_run() {
        let mut broken = sloped();
        broken.flux_error.truncate(10);
        let s = session(broken);
        let params = SessionParams::defaults(&s.object, s.labels());
        let err = run(&s, &params).unwrap_err();
        assert!(matches!(err, NormalizeError::MalformedSpectrum { columns: 2, .. }));
    }

    #[test]
    fn unsupported_function_is_reported_per_spectrum() {
        let s = session(sloped());
        let mut params = SessionParams::defaults(&s.object, s.labels());
        params.function = FunctionFamily::from("cubic");
        let outcome = run(&s, &params).unwrap();
        assert_eq!(outcome.spectra.len(), 1);
        assert_eq!(
            outcome.spectra[0].result.as_ref().unwrap_err(),
            &FitError::UnsupportedFunction("cubic".into())
        );
        assert!(outcome.spectra[0].snr.is_some());
        assert!(outcome.normalized().is_empty());
    }

    #[test]
    fn snr_line_lists_every_processed_spectrum() {
        let outcome = RunOutcome {
            snr_window: Interval::new(1600.0, 1700.0),
            spectra: vec![
                SpectrumOutcome {
                    label: "SDSS".into(),
                    snr: Some(12.5),
                    result: Err(FitError::Singular),
                },
                SpectrumOutcome {
                    label: "GEM1".into(),
                    snr: None,
                    result: Err(FitError::Singular),
                },
            ],
        };
        assert_eq!(outcome.snr_line("J000000"), "J000000 1600 1700 SDSS 12.5 GEM1 nan");
    }
}
