use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};

use super::model::Spectrum;

/// Write a normalized spectrum as `wavelength flux flux_error` rows, one
/// sample per line, with wavelengths multiplied by `frame_factor`.
pub fn write_normalized(path: &Path, spectrum: &Spectrum, frame_factor: f64) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b' ')
        .has_headers(false)
        .from_path(path)
        .with_context(|| format!("creating {}", path.display()))?;
    for (wavelength, flux, flux_error) in spectrum.samples() {
        writer
            .serialize((wavelength * frame_factor, flux, flux_error))
            .with_context(|| format!("writing {}", path.display()))?;
    }
    writer.flush().with_context(|| format!("flushing {}", path.display()))?;
    Ok(())
}

/// Append one line to the cross-object SNR log, creating it if needed.
pub fn append_line(path: &Path, line: &str) -> Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("opening {}", path.display()))?;
    writeln!(file, "{line}").with_context(|| format!("appending to {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::loader::parse_spectrum;
    use std::io::Cursor;

    #[test]
    fn normalized_file_is_in_observed_frame() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("normJ000000.sdss");
        let sp = Spectrum::from_samples([(1200.0, 1.0, 0.1), (1200.5, 0.95, 0.1)]);

        write_normalized(&path, &sp, 3.0).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 2);
        let back = parse_spectrum(Cursor::new(text)).unwrap();
        assert_eq!(back.wavelength, vec![3600.0, 3601.5]);
        assert_eq!(back.flux, sp.flux);
        assert_eq!(back.flux_error, sp.flux_error);
    }

    #[test]
    fn append_line_never_truncates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("SNR_outfile.dat");
        append_line(&path, "J1 1600 1700 SDSS 10").unwrap();
        append_line(&path, "J2 1600 1700 BOSS 4").unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "J1 1600 1700 SDSS 10\nJ2 1600 1700 BOSS 4\n");
    }
}
