use std::fmt::Write as _;
use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

/// Write a synthetic quasar manifest plus three epochs of spectra.
#[derive(Debug, Parser)]
struct Cli {
    /// Output directory.
    #[arg(default_value = "sample_data")]
    dir: PathBuf,

    #[arg(long, default_value_t = 42)]
    seed: u64,
}

const REDSHIFT: f64 = 2.147;

/// Emission lines as rest-frame (centre, sigma, peak relative to continuum).
const LINES: [(f64, f64, f64); 4] = [
    (1215.67, 12.0, 4.0), // Lyα
    (1398.0, 15.0, 0.6),  // SiIV+OIV]
    (1549.06, 14.0, 1.5), // CIV
    (1908.73, 20.0, 0.7), // CIII]
];

/// Line profile: a Gaussian of unit height centred on `centre`.
fn profile(rest: f64, centre: f64, width: f64) -> f64 {
    let d = (rest - centre) / width;
    (-0.5 * d * d).exp()
}

/// SplitMix64 stream with normal deviates from the Marsaglia polar method.
struct NoiseSource {
    state: u64,
    spare: Option<f64>,
}

impl NoiseSource {
    fn new(seed: u64) -> Self {
        NoiseSource { state: seed, spare: None }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_add(0x9e37_79b9_7f4a_7c15);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
        z ^ (z >> 31)
    }

    /// Uniform in [-1, 1).
    fn symmetric(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 52) as f64 - 1.0
    }

    fn normal(&mut self, sigma: f64) -> f64 {
        if let Some(z) = self.spare.take() {
            return sigma * z;
        }
        loop {
            let (u, v) = (self.symmetric(), self.symmetric());
            let s = u * u + v * v;
            if s > 0.0 && s < 1.0 {
                let k = (-2.0 * s.ln() / s).sqrt();
                self.spare = Some(v * k);
                return sigma * u * k;
            }
        }
    }
}

/// One epoch: power-law continuum `level * (λ/1450)^index` with the lines
/// scaled by `line_strength`, sampled on an observed-frame grid.
struct Epoch {
    label: &'static str,
    mjd: f64,
    level: f64,
    index: f64,
    line_strength: f64,
    noise: f64,
    /// Observed-frame coverage and step in Å.
    grid: (f64, f64, f64),
}

fn render(epoch: &Epoch, noise: &mut NoiseSource) -> String {
    let (start, end, step) = epoch.grid;
    let n = ((end - start) / step) as usize;
    let mut out = String::from("# wavelength flux flux_error\n");
    for i in 0..=n {
        let observed = start + i as f64 * step;
        let rest = observed / (1.0 + REDSHIFT);
        let continuum = epoch.level * (rest / 1450.0).powf(epoch.index);
        let lines: f64 = LINES
            .iter()
            .map(|&(centre, width, peak)| peak * epoch.line_strength * profile(rest, centre, width))
            .sum();
        let flux = continuum * (1.0 + lines) + noise.normal(epoch.noise);
        let _ = writeln!(out, "{observed:.3} {flux:.5} {:.5}", epoch.noise);
    }
    out
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut noise = NoiseSource::new(cli.seed);

    let epochs = [
        Epoch { label: "SDSS", mjd: 52368.0, level: 12.0, index: -1.5, line_strength: 1.0, noise: 0.4, grid: (3800.0, 9200.0, 1.5) },
        Epoch { label: "BOSS", mjd: 55652.0, level: 9.0, index: -1.3, line_strength: 1.2, noise: 0.5, grid: (3600.0, 10000.0, 1.5) },
        Epoch { label: "GEM1", mjd: 56781.0, level: 10.5, index: -1.6, line_strength: 0.7, noise: 0.3, grid: (3900.0, 5700.0, 0.8) },
    ];

    fs::create_dir_all(&cli.dir).with_context(|| format!("creating {}", cli.dir.display()))?;

    let mut card = format!("SDSS J141955.28+522741.5\n214.98035 52.46155\n18.92\n{REDSHIFT}\n");
    for epoch in &epochs {
        let file = format!("{}.txt", epoch.label.to_lowercase());
        let path = cli.dir.join(&file);
        fs::write(&path, render(epoch, &mut noise))
            .with_context(|| format!("writing {}", path.display()))?;
        let _ = writeln!(card, "{} {} {file}", epoch.label, epoch.mjd);
    }

    let manifest = cli.dir.join("J141955.card");
    fs::write(&manifest, card).with_context(|| format!("writing {}", manifest.display()))?;

    println!(
        "Wrote {} spectra and {}; try `spectra-normalizer {}`",
        epochs.len(),
        manifest.display(),
        manifest.display()
    );
    Ok(())
}
