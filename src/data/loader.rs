use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use super::model::{ObjectInfo, Spectrum, SpectrumSet};

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// One `label MJD path` line of a manifest.
#[derive(Debug, Clone, PartialEq)]
pub struct ManifestEntry {
    pub label: String,
    pub mjd: f64,
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Manifest {
    pub object: ObjectInfo,
    pub entries: Vec<ManifestEntry>,
}

/// Load a `<short>.card` manifest and every spectrum it lists.
///
/// Spectra are returned in the rest frame (wavelength divided by `1 + z`).
pub fn load_card(path: &Path) -> Result<(ObjectInfo, SpectrumSet)> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();
    if ext != "card" {
        bail!(
            "{} is not a .card manifest (expected name, RA Dec, gmag, redshift, \
             then one 'label MJD path' line per spectrum)",
            path.display()
        );
    }

    let short_id = path
        .file_stem()
        .and_then(|s| s.to_str())
        .context("manifest file name is not valid UTF-8")?
        .to_string();
    let base = path.parent().unwrap_or_else(|| Path::new("."));
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading manifest {}", path.display()))?;
    let manifest = parse_card(&text, &short_id, base)?;

    let mut spectra = SpectrumSet::new();
    for entry in &manifest.entries {
        let observed = read_spectrum(&entry.path)
            .with_context(|| format!("loading spectrum '{}'", entry.label))?;
        if observed.is_empty() {
            log::warn!("'{}' has no samples", entry.label);
        }
        log::info!(
            "loaded '{}' ({} samples) from {}",
            entry.label,
            observed.len(),
            entry.path.display()
        );
        spectra.insert(entry.label.clone(), to_rest_frame(&observed, manifest.object.redshift));
    }

    Ok((manifest.object, spectra))
}

// ---------------------------------------------------------------------------
// Manifest parsing
// ---------------------------------------------------------------------------

/// Parse manifest text. Relative spectrum paths are resolved against `base`.
///
/// Layout (blank lines and `#` comments ignored):
///
/// ```text
/// SDSS J141955.28+522741.5
/// 214.98035 52.46155
/// 18.92
/// 2.147
/// SDSS 52368.0 spectra/sdss.txt
/// BOSS 55652.0 spectra/boss.txt
/// ```
pub fn parse_card(text: &str, short_id: &str, base: &Path) -> Result<Manifest> {
    let mut lines = text
        .lines()
        .enumerate()
        .map(|(i, l)| (i + 1, l.trim()))
        .filter(|(_, l)| !l.is_empty() && !l.starts_with('#'));

    let (_, name) = lines.next().context("manifest is empty; expected the object name")?;

    let (line_no, coords) = lines.next().context("manifest is missing the 'RA Dec' line")?;
    let mut parts = coords.split_whitespace();
    let ra = parse_float(parts.next(), line_no, "RA")?;
    let dec = parse_float(parts.next(), line_no, "Dec")?;

    let (line_no, gmag) = lines.next().context("manifest is missing the g magnitude line")?;
    let gmag = parse_float(Some(gmag), line_no, "gmag")?;

    let (line_no, z) = lines.next().context("manifest is missing the redshift line")?;
    let redshift = parse_float(Some(z), line_no, "redshift")?;

    let mut entries: Vec<ManifestEntry> = Vec::new();
    let mut mjd = BTreeMap::new();
    for (line_no, line) in lines {
        let parts: Vec<&str> = line.split_whitespace().collect();
        let [label, epoch, file, ..] = parts.as_slice() else {
            bail!("line {line_no}: expected 'label MJD path', got '{line}'");
        };
        if mjd.contains_key(*label) {
            bail!("line {line_no}: spectrum label '{label}' appears twice");
        }
        let epoch = parse_float(Some(*epoch), line_no, "MJD")?;
        let file = Path::new(file);
        let path = if file.is_absolute() {
            file.to_path_buf()
        } else {
            base.join(file)
        };
        mjd.insert(label.to_string(), epoch);
        entries.push(ManifestEntry {
            label: label.to_string(),
            mjd: epoch,
            path,
        });
    }
    if entries.is_empty() {
        bail!("manifest lists no spectra");
    }

    Ok(Manifest {
        object: ObjectInfo {
            name: name.to_string(),
            short_id: short_id.to_string(),
            ra,
            dec,
            gmag,
            redshift,
            mjd,
        },
        entries,
    })
}

fn parse_float(token: Option<&str>, line_no: usize, what: &str) -> Result<f64> {
    let token = token.with_context(|| format!("line {line_no}: missing {what}"))?;
    token
        .parse::<f64>()
        .with_context(|| format!("line {line_no}: {what} '{token}' is not a number"))
}

// ---------------------------------------------------------------------------
// Spectrum files
// ---------------------------------------------------------------------------

/// Read a whitespace-delimited `wavelength flux flux_error` file.
pub fn read_spectrum(path: &Path) -> Result<Spectrum> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    parse_spectrum(BufReader::new(file))
}

/// Parse spectrum rows. Columns past the third are ignored; short rows are
/// kept as far as they go, which leaves the spectrum with uneven columns.
pub fn parse_spectrum<R: BufRead>(reader: R) -> Result<Spectrum> {
    let mut spectrum = Spectrum::default();
    let mut short_rows = 0usize;

    for (i, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("reading row {}", i + 1))?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let values = line
            .split_whitespace()
            .take(3)
            .map(|tok| {
                tok.parse::<f64>()
                    .with_context(|| format!("row {}: '{tok}' is not a number", i + 1))
            })
            .collect::<Result<Vec<f64>>>()?;

        if values.len() < 3 {
            short_rows += 1;
        }
        let columns = [
            &mut spectrum.wavelength,
            &mut spectrum.flux,
            &mut spectrum.flux_error,
        ];
        for (column, value) in columns.into_iter().zip(values) {
            column.push(value);
        }
    }

    if short_rows > 0 {
        log::warn!("{short_rows} row(s) have fewer than three columns");
    }
    Ok(spectrum)
}

/// Divide wavelengths by `1 + z`.
pub fn to_rest_frame(spectrum: &Spectrum, redshift: f64) -> Spectrum {
    let factor = 1.0 + redshift;
    Spectrum {
        wavelength: spectrum.wavelength.iter().map(|w| w / factor).collect(),
        flux: spectrum.flux.clone(),
        flux_error: spectrum.flux_error.clone(),
    }
}
