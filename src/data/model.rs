use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Interval – a wavelength (or axis) range
// ---------------------------------------------------------------------------

/// A `[start, end]` pair. Used for fit windows, the SNR window and axis limits.
///
/// Membership is strict on both sides: a sample sitting exactly on a bound is
/// outside the interval.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Interval {
    pub start: f64,
    pub end: f64,
}

impl Interval {
    pub const fn new(start: f64, end: f64) -> Self {
        Interval { start, end }
    }

    /// Build an interval with the bounds in ascending order.
    pub fn ordered(a: f64, b: f64) -> Self {
        if a <= b {
            Interval::new(a, b)
        } else {
            Interval::new(b, a)
        }
    }

    /// Both bounds rounded to the nearest integer wavelength.
    pub fn rounded(self) -> Self {
        Interval::new(self.start.round(), self.end.round())
    }

    pub fn contains(&self, value: f64) -> bool {
        value > self.start && value < self.end
    }

    /// Same interval with both bounds multiplied by `factor`.
    pub fn scaled(self, factor: f64) -> Self {
        Interval::new(self.start * factor, self.end * factor)
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.start, self.end)
    }
}

// ---------------------------------------------------------------------------
// Spectrum – column-wise wavelength / flux / flux error
// ---------------------------------------------------------------------------

/// One spectrum stored as three columns of equal length.
///
/// The loader keeps whatever it could parse, so a file with short rows ends
/// up with uneven columns; [`Spectrum::complete_columns`] exposes that so the
/// normalization run can refuse it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Spectrum {
    /// Rest-frame wavelength in Å, strictly increasing.
    pub wavelength: Vec<f64>,
    pub flux: Vec<f64>,
    pub flux_error: Vec<f64>,
}

impl Spectrum {
    pub fn from_samples<I>(samples: I) -> Self
    where
        I: IntoIterator<Item = (f64, f64, f64)>,
    {
        let mut spectrum = Spectrum::default();
        for (wavelength, flux, flux_error) in samples {
            spectrum.wavelength.push(wavelength);
            spectrum.flux.push(flux);
            spectrum.flux_error.push(flux_error);
        }
        spectrum
    }

    /// Number of samples (length of the wavelength column).
    pub fn len(&self) -> usize {
        self.wavelength.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wavelength.is_empty()
    }

    /// How many of the three columns are fully populated.
    pub fn complete_columns(&self) -> usize {
        let n = self.wavelength.len();
        if n == 0 {
            return 0;
        }
        1 + usize::from(self.flux.len() == n) + usize::from(self.flux_error.len() == n)
    }

    /// Iterate `(wavelength, flux, flux_error)` triples.
    pub fn samples(&self) -> impl Iterator<Item = (f64, f64, f64)> + '_ {
        self.wavelength
            .iter()
            .zip(&self.flux)
            .zip(&self.flux_error)
            .map(|((&w, &f), &e)| (w, f, e))
    }

    /// Copy of this spectrum with a replaced flux column.
    pub fn with_flux(&self, flux: Vec<f64>) -> Self {
        Spectrum {
            wavelength: self.wavelength.clone(),
            flux,
            flux_error: self.flux_error.clone(),
        }
    }

    /// Smallest and largest wavelength.
    pub fn wavelength_range(&self) -> Option<(f64, f64)> {
        let first = *self.wavelength.first()?;
        let last = *self.wavelength.last()?;
        Some((first.min(last), first.max(last)))
    }

    /// Whether the wavelength coverage spans `window` completely.
    pub fn covers(&self, window: Interval) -> bool {
        self.wavelength_range()
            .is_some_and(|(lo, hi)| lo <= window.start && hi >= window.end)
    }
}

/// Spectra of one object keyed by their label ("SDSS", "BOSS", "GEM1", ...).
pub type SpectrumSet = BTreeMap<String, Spectrum>;

// ---------------------------------------------------------------------------
// ObjectInfo – what the manifest says about the target
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct ObjectInfo {
    /// Full designation, e.g. `SDSS J141955.28+522741.5`.
    pub name: String,
    /// Manifest file stem, used to build output filenames.
    pub short_id: String,
    pub ra: f64,
    pub dec: f64,
    pub gmag: f64,
    /// Emission redshift.
    pub redshift: f64,
    /// Observation date (MJD) per spectrum label.
    pub mjd: BTreeMap<String, f64>,
}

impl ObjectInfo {
    /// Conversion factor between rest and observed frame, `1 + z`.
    pub fn frame_factor(&self) -> f64 {
        1.0 + self.redshift
    }

    pub fn mjd_of(&self, label: &str) -> Option<f64> {
        self.mjd.get(label).copied()
    }
}

// ---------------------------------------------------------------------------
// WindowSet – relatively line-free fit windows
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("the fit window set cannot be empty")]
pub struct EmptyWindowSet;

/// Outcome of toggling a window in a [`WindowSet`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WindowEdit {
    Added(Interval),
    Removed(Interval),
    /// Removed, but only one window is left to constrain the fit.
    RemovedLeavingOne(Interval),
    /// The window is the last one and stays.
    RefusedLast(Interval),
}

/// Ordered, never-empty list of fit windows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Interval>", into = "Vec<Interval>")]
pub struct WindowSet(Vec<Interval>);

impl WindowSet {
    pub fn new(windows: Vec<Interval>) -> Result<Self, EmptyWindowSet> {
        if windows.is_empty() {
            return Err(EmptyWindowSet);
        }
        Ok(WindowSet(windows))
    }

    /// Build a set that is non-empty by construction.
    pub fn from_first(first: Interval, rest: impl IntoIterator<Item = Interval>) -> Self {
        let mut windows = vec![first];
        windows.extend(rest);
        WindowSet(windows)
    }

    /// Remove `window` if an identical one exists, otherwise append it.
    pub fn toggle(&mut self, window: Interval) -> WindowEdit {
        let Some(pos) = self.0.iter().position(|w| *w == window) else {
            self.0.push(window);
            return WindowEdit::Added(window);
        };
        match self.0.len() {
            1 => WindowEdit::RefusedLast(window),
            2 => {
                self.0.remove(pos);
                WindowEdit::RemovedLeavingOne(window)
            }
            _ => {
                self.0.remove(pos);
                WindowEdit::Removed(window)
            }
        }
    }

    pub fn as_slice(&self) -> &[Interval] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl TryFrom<Vec<Interval>> for WindowSet {
    type Error = EmptyWindowSet;

    fn try_from(windows: Vec<Interval>) -> Result<Self, Self::Error> {
        WindowSet::new(windows)
    }
}

impl From<WindowSet> for Vec<Interval> {
    fn from(set: WindowSet) -> Self {
        set.0
    }
}

impl fmt::Display for WindowSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|w| w.to_string()).collect();
        write!(f, "[{}]", parts.join(", "))
    }
}
