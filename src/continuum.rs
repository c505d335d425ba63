use std::fmt;

use nalgebra::{DMatrix, DVector, Matrix2, Vector2, SVD};
use serde::{Deserialize, Serialize};

use crate::error::FitError;

// ---------------------------------------------------------------------------
// FunctionFamily – the user's selection
// ---------------------------------------------------------------------------

/// Continuum function chosen with `funcType`.
///
/// Unrecognised names are kept verbatim so they can be persisted and
/// reported when a fit is attempted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FunctionFamily {
    PowerLaw,
    Linear,
    Other(String),
}

impl From<&str> for FunctionFamily {
    fn from(name: &str) -> Self {
        match name {
            "plaw" => FunctionFamily::PowerLaw,
            "poly" => FunctionFamily::Linear,
            other => FunctionFamily::Other(other.to_string()),
        }
    }
}

impl From<String> for FunctionFamily {
    fn from(name: String) -> Self {
        FunctionFamily::from(name.as_str())
    }
}

impl From<FunctionFamily> for String {
    fn from(family: FunctionFamily) -> Self {
        family.to_string()
    }
}

impl fmt::Display for FunctionFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FunctionFamily::PowerLaw => write!(f, "plaw"),
            FunctionFamily::Linear => write!(f, "poly"),
            FunctionFamily::Other(name) => write!(f, "{name}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Continuum – a fitted model
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Continuum {
    /// `flux = slope * wavelength + intercept`
    Line { slope: f64, intercept: f64 },
    /// `flux = amplitude * wavelength ^ index`
    PowerLaw { amplitude: f64, index: f64 },
}

impl Continuum {
    pub fn evaluate(&self, wavelength: f64) -> f64 {
        match *self {
            Continuum::Line { slope, intercept } => slope * wavelength + intercept,
            Continuum::PowerLaw { amplitude, index } => amplitude * wavelength.powf(index),
        }
    }

    pub fn evaluate_all(&self, wavelength: &[f64]) -> Vec<f64> {
        wavelength.iter().map(|&w| self.evaluate(w)).collect()
    }
}

impl fmt::Display for Continuum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Continuum::Line { slope, intercept } => write!(f, "y = ({slope})x + ({intercept})"),
            Continuum::PowerLaw { amplitude, index } => write!(f, "y = ({amplitude})x^({index})"),
        }
    }
}

// ---------------------------------------------------------------------------
// ContinuumModel – fitting strategies
// ---------------------------------------------------------------------------

pub trait ContinuumModel {
    /// Human readable name used in console output.
    fn name(&self) -> &'static str;

    /// The functional form, e.g. `y = mx + b`.
    fn equation(&self) -> &'static str;

    /// Fit the model to the given samples (all slices have equal length).
    fn fit(&self, wavelength: &[f64], flux: &[f64], flux_error: &[f64])
        -> Result<Continuum, FitError>;
}

/// Strategy for a function family, or `UnsupportedFunction` for unknown names.
pub fn model_for(family: &FunctionFamily) -> Result<Box<dyn ContinuumModel>, FitError> {
    match family {
        FunctionFamily::PowerLaw => Ok(Box::new(PowerLawFit::default())),
        FunctionFamily::Linear => Ok(Box::new(LinearFit)),
        FunctionFamily::Other(name) => Err(FitError::UnsupportedFunction(name.clone())),
    }
}

/// Ordinary least-squares straight line.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinearFit;

impl ContinuumModel for LinearFit {
    fn name(&self) -> &'static str {
        "Polynomial"
    }

    fn equation(&self) -> &'static str {
        "y = mx + b"
    }

    fn fit(&self, wavelength: &[f64], flux: &[f64], _flux_error: &[f64]) -> Result<Continuum, FitError> {
        let n = wavelength.len().min(flux.len());
        if n < 2 {
            return Err(FitError::TooFewSamples { needed: 2, found: n });
        }

        let design = DMatrix::from_fn(n, 2, |i, j| if j == 0 { wavelength[i] } else { 1.0 });
        let target = DVector::from_column_slice(&flux[..n]);
        let svd = SVD::new(design, true, true);
        if svd.rank(1e-10 * svd.singular_values.max()) < 2 {
            return Err(FitError::Singular);
        }
        let solution = svd.solve(&target, 1e-12).map_err(|_| FitError::Singular)?;

        Ok(Continuum::Line {
            slope: solution[0],
            intercept: solution[1],
        })
    }
}

/// Power law fitted by Levenberg-Marquardt, weighted by the flux errors.
///
/// Internally the model is `A * (x / pivot)^b` with the pivot at the
/// geometric mean wavelength, which keeps the normal equations well
/// conditioned; the amplitude is converted back on return.
#[derive(Debug, Clone, Copy)]
pub struct PowerLawFit {
    pub max_iterations: usize,
    pub tolerance: f64,
}

impl Default for PowerLawFit {
    fn default() -> Self {
        PowerLawFit {
            max_iterations: 200,
            tolerance: 1e-10,
        }
    }
}

struct Point {
    u: f64,
    y: f64,
    sigma: f64,
}

fn chi_square(points: &[Point], p: Vector2<f64>) -> f64 {
    points
        .iter()
        .map(|pt| {
            let r = (pt.y - p[0] * pt.u.powf(p[1])) / pt.sigma;
            r * r
        })
        .sum()
}

/// Weighted straight-line fit of ln y against ln u over positive fluxes.
fn log_linear_guess(points: &[Point]) -> Option<Vector2<f64>> {
    let (mut sw, mut sx, mut sy, mut sxx, mut sxy) = (0.0, 0.0, 0.0, 0.0, 0.0);
    for pt in points.iter().filter(|pt| pt.y > 0.0) {
        let w = (pt.y / pt.sigma).powi(2);
        let (x, y) = (pt.u.ln(), pt.y.ln());
        sw += w;
        sx += w * x;
        sy += w * y;
        sxx += w * x * x;
        sxy += w * x * y;
    }
    let det = sw * sxx - sx * sx;
    if sw == 0.0 || det.abs() < f64::EPSILON * sw * sxx.max(1.0) {
        return None;
    }
    let index = (sw * sxy - sx * sy) / det;
    let ln_amplitude = (sy - index * sx) / sw;
    let guess = Vector2::new(ln_amplitude.exp(), index);
    guess.iter().all(|v| v.is_finite()).then_some(guess)
}

impl ContinuumModel for PowerLawFit {
    fn name(&self) -> &'static str {
        "Power-law"
    }

    fn equation(&self) -> &'static str {
        "y = a*x^b"
    }

    fn fit(&self, wavelength: &[f64], flux: &[f64], flux_error: &[f64]) -> Result<Continuum, FitError> {
        let usable: Vec<(f64, f64, f64)> = wavelength
            .iter()
            .zip(flux)
            .zip(flux_error)
            .map(|((&x, &y), &s)| (x, y, s))
            .filter(|(x, y, s)| *x > 0.0 && y.is_finite() && s.is_finite() && *s > 0.0)
            .collect();
        if usable.len() < 2 {
            return Err(FitError::TooFewSamples {
                needed: 2,
                found: usable.len(),
            });
        }
        if usable.len() < wavelength.len() {
            log::debug!(
                "power-law fit: ignoring {} samples without a positive finite error",
                wavelength.len() - usable.len()
            );
        }

        let pivot = (usable.iter().map(|(x, _, _)| x.ln()).sum::<f64>() / usable.len() as f64).exp();
        let points: Vec<Point> = usable
            .iter()
            .map(|&(x, y, sigma)| Point { u: x / pivot, y, sigma })
            .collect();

        let mut p = log_linear_guess(&points).unwrap_or_else(|| {
            let mean = points.iter().map(|pt| pt.y).sum::<f64>() / points.len() as f64;
            Vector2::new(mean, 0.0)
        });
        let mut chi2 = chi_square(&points, p);
        let mut lambda = 1e-3;
        let mut converged = false;

        'outer: for iteration in 0..self.max_iterations {
            let mut jtj = Matrix2::zeros();
            let mut jtr = Vector2::zeros();
            for pt in &points {
                let model = p[0] * pt.u.powf(p[1]);
                let grad = Vector2::new(pt.u.powf(p[1]), model * pt.u.ln()) / pt.sigma;
                let residual = (pt.y - model) / pt.sigma;
                jtj += grad * grad.transpose();
                jtr += grad * residual;
            }

            loop {
                let mut damped = jtj;
                damped[(0, 0)] *= 1.0 + lambda;
                damped[(1, 1)] *= 1.0 + lambda;
                let Some(step) = damped.lu().solve(&jtr) else {
                    lambda *= 10.0;
                    if lambda > 1e12 {
                        return Err(FitError::Singular);
                    }
                    continue;
                };

                let candidate = p + step;
                let candidate_chi2 = chi_square(&points, candidate);
                if candidate_chi2.is_finite() && candidate_chi2 <= chi2 {
                    let small_step = step[0].abs() <= self.tolerance * candidate[0].abs().max(f64::MIN_POSITIVE)
                        && step[1].abs() <= self.tolerance * candidate[1].abs().max(1.0);
                    let small_gain = chi2 - candidate_chi2 <= self.tolerance * chi2;
                    p = candidate;
                    chi2 = candidate_chi2;
                    lambda = (lambda / 10.0).max(1e-12);
                    if small_step || small_gain {
                        log::debug!("power-law fit converged after {} iterations", iteration + 1);
                        converged = true;
                        break 'outer;
                    }
                    break;
                }

                lambda *= 10.0;
                if lambda > 1e12 {
                    // No downhill step left: already at the minimum.
                    converged = true;
                    break 'outer;
                }
            }
        }

        if !converged {
            log::warn!(
                "power-law fit stopped after {} iterations without meeting tolerance",
                self.max_iterations
            );
        }

        let (scaled_amplitude, index) = (p[0], p[1]);
        Ok(Continuum::PowerLaw {
            amplitude: scaled_amplitude * pivot.powf(-index),
            index,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> Vec<f64> {
        (0..200).map(|i| 1200.0 + i as f64 * 3.0).collect()
    }

    #[test]
    fn family_names_round_trip() {
        assert_eq!(FunctionFamily::from("plaw"), FunctionFamily::PowerLaw);
        assert_eq!(FunctionFamily::from("poly"), FunctionFamily::Linear);
        assert_eq!(FunctionFamily::from("spline").to_string(), "spline");
        let json = serde_json::to_string(&FunctionFamily::PowerLaw).unwrap();
        assert_eq!(json, "\"plaw\"");
    }

    #[test]
    fn unknown_family_is_an_error() {
        let err = model_for(&FunctionFamily::from("gauss")).err().unwrap();
        assert_eq!(err, FitError::UnsupportedFunction("gauss".into()));
    }

    #[test]
    fn line_fit_reproduces_exact_line() {
        let x = grid();
        let y: Vec<f64> = x.iter().map(|w| -0.0025 * w + 7.5).collect();
        let err = vec![0.1; x.len()];

        let fit = LinearFit.fit(&x, &y, &err).unwrap();
        let Continuum::Line { slope, intercept } = fit else {
            panic!("expected a line, got {fit:?}");
        };
        assert!((slope + 0.0025).abs() < 1e-10);
        assert!((intercept - 7.5).abs() < 1e-9);
        for (w, f) in x.iter().zip(&y) {
            assert!((fit.evaluate(*w) - f).abs() < 1e-9);
        }
    }

    #[test]
    fn line_fit_needs_two_distinct_wavelengths() {
        let err = LinearFit.fit(&[1500.0], &[1.0], &[0.1]).unwrap_err();
        assert_eq!(err, FitError::TooFewSamples { needed: 2, found: 1 });
        let err = LinearFit
            .fit(&[1500.0, 1500.0], &[1.0, 2.0], &[0.1, 0.1])
            .unwrap_err();
        assert_eq!(err, FitError::Singular);
    }

    #[test]
    fn power_law_recovers_parameters() {
        let (a, b) = (5000.0, -1.2);
        let x = grid();
        let y: Vec<f64> = x.iter().map(|w| a * w.powf(b)).collect();
        let err: Vec<f64> = y.iter().map(|f| 0.05 * f).collect();

        let fit = PowerLawFit::default().fit(&x, &y, &err).unwrap();
        let Continuum::PowerLaw { amplitude, index } = fit else {
            panic!("expected a power law, got {fit:?}");
        };
        assert!((amplitude - a).abs() / a < 1e-6, "amplitude {amplitude}");
        assert!((index - b).abs() < 1e-8, "index {index}");
    }

    #[test]
    fn power_law_tolerates_negligible_noise() {
        let (a, b) = (120.0, -0.7);
        let x = grid();
        let y: Vec<f64> = x
            .iter()
            .enumerate()
            .map(|(i, w)| {
                let wiggle = if i % 2 == 0 { 1.0 + 1e-6 } else { 1.0 - 1e-6 };
                a * w.powf(b) * wiggle
            })
            .collect();
        let err: Vec<f64> = x.iter().map(|w| 0.01 + 1e-5 * w).collect();

        let fit = PowerLawFit::default().fit(&x, &y, &err).unwrap();
        let Continuum::PowerLaw { amplitude, index } = fit else {
            panic!("expected a power law, got {fit:?}");
        };
        assert!((amplitude - a).abs() / a < 1e-3, "amplitude {amplitude}");
        assert!((index - b).abs() < 1e-3, "index {index}");
    }

    #[test]
    fn power_law_starts_from_mean_without_positive_flux() {
        let x = grid();
        let y = vec![-1.0; x.len()];
        let err = vec![0.1; x.len()];
        let fit = PowerLawFit::default().fit(&x, &y, &err).unwrap();
        for w in &x {
            assert!((fit.evaluate(*w) + 1.0).abs() < 1e-6);
        }
    }
}
