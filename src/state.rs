use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::continuum::FunctionFamily;
use crate::data::filter::smoothed;
use crate::data::model::{Interval, ObjectInfo, SpectrumSet, WindowSet};
use crate::data::scale::ScaleFactors;
use crate::normalize::NormalizedSpectrum;

// ---------------------------------------------------------------------------
// ActiveSet – which spectra take part
// ---------------------------------------------------------------------------

/// Ordered list of spectrum labels. Toggling appends or removes a label.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActiveSet(Vec<String>);

impl ActiveSet {
    pub fn new<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ActiveSet(labels.into_iter().map(Into::into).collect())
    }

    /// Remove `label` if present, append it otherwise. Returns whether the
    /// label is active afterwards.
    pub fn toggle(&mut self, label: &str) -> bool {
        if let Some(pos) = self.0.iter().position(|l| l == label) {
            self.0.remove(pos);
            false
        } else {
            self.0.push(label.to_string());
            true
        }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Drop labels for which `known` is false.
    pub fn retain_known(&mut self, known: impl Fn(&str) -> bool) {
        self.0.retain(|l| known(l.as_str()));
    }
}

impl fmt::Display for ActiveSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.0.join(", "))
    }
}

// ---------------------------------------------------------------------------
// Session – the loaded object
// ---------------------------------------------------------------------------

/// Object metadata plus every generation of its spectra.
pub struct Session {
    pub object: ObjectInfo,
    /// Spectra as loaded (rest frame). Never modified.
    pub original: SpectrumSet,
    /// Copies shown in the working plot and fitted; possibly smoothed.
    pub working: SpectrumSet,
    pub scale: ScaleFactors,
    /// Output of the latest normalization run.
    pub normalized: BTreeMap<String, NormalizedSpectrum>,
    boxcar_width: usize,
}

impl Session {
    pub fn new(
        object: ObjectInfo,
        spectra: SpectrumSet,
        scale: ScaleFactors,
        boxcar_width: usize,
    ) -> Self {
        Session {
            object,
            working: spectra.clone(),
            original: spectra,
            scale,
            normalized: BTreeMap::new(),
            boxcar_width,
        }
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.original.keys().map(String::as_str)
    }

    pub fn has_spectrum(&self, label: &str) -> bool {
        self.original.contains_key(label)
    }

    pub fn boxcar_width(&self) -> usize {
        self.boxcar_width
    }

    /// Rebuild the working copies from the originals, smoothed or not.
    pub fn set_smoothing(&mut self, smooth: bool) {
        self.working = self
            .original
            .iter()
            .map(|(label, sp)| {
                let copy = if smooth {
                    smoothed(sp, self.boxcar_width)
                } else {
                    sp.clone()
                };
                (label.clone(), copy)
            })
            .collect();
    }
}

// ---------------------------------------------------------------------------
// SessionParams – normalization settings
// ---------------------------------------------------------------------------

pub const DEFAULT_FIT_WINDOWS: [Interval; 3] = [
    Interval::new(1300.0, 1320.0),
    Interval::new(1590.0, 1620.0),
    Interval::new(1700.0, 1750.0),
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionParams {
    #[serde(rename = "funcType")]
    pub function: FunctionFamily,
    pub smooth: bool,
    #[serde(rename = "SNRreg")]
    pub snr_window: Interval,
    pub xlimits: Interval,
    pub ylimits: Interval,
    #[serde(rename = "RLF")]
    pub windows: WindowSet,
    #[serde(rename = "normlist")]
    pub active: ActiveSet,
    /// Diagnostic figure name without extension.
    pub filename: String,
}

impl SessionParams {
    pub fn defaults<'a>(object: &ObjectInfo, labels: impl IntoIterator<Item = &'a str>) -> Self {
        SessionParams {
            function: FunctionFamily::PowerLaw,
            smooth: true,
            snr_window: Interval::new(1600.0, 1700.0),
            xlimits: Interval::new(1100.0, 1800.0),
            ylimits: Interval::new(0.0, 40.0),
            windows: WindowSet::from_first(
                DEFAULT_FIT_WINDOWS[0],
                DEFAULT_FIT_WINDOWS[1..].iter().copied(),
            ),
            active: ActiveSet::new(labels),
            filename: format!("spectra{}", object.short_id),
        }
    }
}

// ---------------------------------------------------------------------------
// PlotParams – presentation settings of the review figure
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlotParams {
    pub smooth: bool,
    pub lw: f64,
    pub xlimits: Interval,
    pub ylimits: Interval,
    pub annotations: bool,
    /// Shade the fit windows.
    #[serde(rename = "showRLF")]
    pub show_windows: bool,
    #[serde(rename = "RLF")]
    pub windows: WindowSet,
    #[serde(rename = "plotlist")]
    pub active: ActiveSet,
    /// Figure name without extension.
    pub filename: String,
}

impl PlotParams {
    pub fn defaults(object: &ObjectInfo, windows: WindowSet, active: ActiveSet) -> Self {
        PlotParams {
            smooth: true,
            lw: 1.0,
            xlimits: Interval::new(1200.0, 1600.0),
            ylimits: Interval::new(0.0, 2.5),
            annotations: true,
            show_windows: false,
            windows,
            active,
            filename: format!("norm{}", object.short_id),
        }
    }
}
