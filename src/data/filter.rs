use super::model::{Interval, Spectrum};

// ---------------------------------------------------------------------------
// Boxcar smoothing
// ---------------------------------------------------------------------------

/// Centred moving average of `width` samples (bumped to the next odd number).
///
/// Near the ends the window shrinks to the samples that exist, so the output
/// has the same length as the input and a constant signal stays constant.
pub fn boxcar(values: &[f64], width: usize) -> Vec<f64> {
    let half = width.max(1) / 2;
    if half == 0 || values.is_empty() {
        return values.to_vec();
    }
    (0..values.len())
        .map(|i| {
            let lo = i.saturating_sub(half);
            let hi = (i + half + 1).min(values.len());
            let window = &values[lo..hi];
            window.iter().sum::<f64>() / window.len() as f64
        })
        .collect()
}

/// Copy of `spectrum` with a boxcar-smoothed flux column.
pub fn smoothed(spectrum: &Spectrum, width: usize) -> Spectrum {
    spectrum.with_flux(boxcar(&spectrum.flux, width))
}

// ---------------------------------------------------------------------------
// Window selection
// ---------------------------------------------------------------------------

/// Indices of samples strictly inside any of `windows`.
///
/// The union is taken window by window; overlapping windows select a sample
/// more than once, which weights it accordingly in the fit.
pub fn indices_in_windows(wavelength: &[f64], windows: &[Interval]) -> Vec<usize> {
    windows
        .iter()
        .flat_map(|w| {
            wavelength
                .iter()
                .enumerate()
                .filter(move |(_, &lam)| w.contains(lam))
                .map(|(i, _)| i)
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Statistics
// ---------------------------------------------------------------------------

/// Median of `values`; the mean of the two middle values for even counts.
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// Median of flux / flux_error over samples inside `window`.
pub fn median_snr(spectrum: &Spectrum, window: Interval) -> Option<f64> {
    let ratios: Vec<f64> = spectrum
        .samples()
        .filter(|(lam, _, _)| window.contains(*lam))
        .map(|(_, flux, err)| flux / err)
        .collect();
    median(&ratios)
}

/// Mean flux over samples inside `band`.
pub fn mean_flux_in(spectrum: &Spectrum, band: Interval) -> Option<f64> {
    let (sum, count) = spectrum
        .wavelength
        .iter()
        .zip(&spectrum.flux)
        .filter(|(lam, _)| band.contains(**lam))
        .fold((0.0, 0usize), |(s, n), (_, f)| (s + f, n + 1));
    (count > 0).then(|| sum / count as f64)
}
