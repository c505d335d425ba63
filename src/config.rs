use std::path::{Path, PathBuf};

use clap::Parser;

// ---------------------------------------------------------------------------
// Command line
// ---------------------------------------------------------------------------

/// Interactively continuum-normalize the spectra listed in a `.card` manifest.
#[derive(Debug, Clone, Parser)]
#[command(name = "spectra-normalizer", version, about)]
pub struct Args {
    /// Manifest file `<short>.card`: name, RA Dec, gmag, redshift, then
    /// `label MJD path` per spectrum.
    pub manifest: PathBuf,

    /// Directory for figures, normalized spectra and parameter logs.
    #[arg(short, long, default_value = ".")]
    pub output_dir: PathBuf,

    /// JSON style configuration mapping survey tags to line colors.
    #[arg(long)]
    pub styles: Option<PathBuf>,

    /// Shared SNR log; relative paths are placed in the output directory.
    #[arg(long, default_value = "SNR_outfile.dat")]
    pub snr_log: PathBuf,

    /// Boxcar smoothing width in samples (even widths round up).
    #[arg(long, default_value_t = 5)]
    pub boxcar_width: usize,

    /// Spectrum the others are scaled to when it is loaded.
    #[arg(long, default_value = "SDSS")]
    pub reference: String,
}

// ---------------------------------------------------------------------------
// Output locations
// ---------------------------------------------------------------------------

/// Where every file for one object goes.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputPaths {
    dir: PathBuf,
    short_id: String,
    snr_log: PathBuf,
}

impl OutputPaths {
    pub fn new(dir: &Path, short_id: &str, snr_log: &Path) -> Self {
        let snr_log = if snr_log.is_absolute() {
            snr_log.to_path_buf()
        } else {
            dir.join(snr_log)
        };
        OutputPaths {
            dir: dir.to_path_buf(),
            short_id: short_id.to_string(),
            snr_log,
        }
    }

    /// `norm<short>.<label>` with the label lower-cased.
    pub fn normalized_spectrum(&self, label: &str) -> PathBuf {
        self.dir
            .join(format!("norm{}.{}", self.short_id, label.to_lowercase()))
    }

    pub fn normalization_log(&self) -> PathBuf {
        self.dir.join(format!("norm{}.parm.json", self.short_id))
    }

    pub fn plot_log(&self) -> PathBuf {
        self.dir.join(format!("plot{}.parm.json", self.short_id))
    }

    /// SVG figure named `<name>.svg`.
    pub fn figure(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.svg"))
    }

    pub fn snr_log(&self) -> &Path {
        &self.snr_log
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn naming_conventions() {
        let paths = OutputPaths::new(Path::new("/out"), "J141955", Path::new("SNR_outfile.dat"));
        assert_eq!(paths.normalized_spectrum("GEM1"), PathBuf::from("/out/normJ141955.gem1"));
        assert_eq!(paths.normalization_log(), PathBuf::from("/out/normJ141955.parm.json"));
        assert_eq!(paths.plot_log(), PathBuf::from("/out/plotJ141955.parm.json"));
        assert_eq!(paths.figure("spectraJ141955"), PathBuf::from("/out/spectraJ141955.svg"));
        assert_eq!(paths.snr_log(), Path::new("/out/SNR_outfile.dat"));
    }

    #[test]
    fn cli_defaults() {
        let args = Args::try_parse_from(["spectra-normalizer", "J141955.card"]).unwrap();
        assert_eq!(args.boxcar_width, 5);
        assert_eq!(args.reference, "SDSS");
        assert_eq!(args.output_dir, PathBuf::from("."));
        assert!(args.styles.is_none());
    }
}
