use std::io::{BufRead, Write};

use anyhow::{bail, Context, Result};

use crate::color::{ColorMap, StyleConfig};
use crate::config::{Args, OutputPaths};
use crate::data::loader::load_card;
use crate::data::model::SpectrumSet;
use crate::data::scale::{ScaleFactors, REFERENCE_BAND};
use crate::state::Session;
use crate::ui::normalizer::Normalizer;
use crate::ui::prompt::{run_loop, Console};

// ---------------------------------------------------------------------------
// Application wiring
// ---------------------------------------------------------------------------

pub struct App {
    args: Args,
}

impl App {
    pub fn new(args: Args) -> Self {
        App { args }
    }

    /// Load the manifest, scale the spectra and run the normalizer until the
    /// user quits.
    pub fn run<R: BufRead, W: Write>(&self, console: &mut Console<R, W>) -> Result<()> {
        let styles = match &self.args.styles {
            Some(path) => StyleConfig::from_path(path)?,
            None => StyleConfig::default(),
        };
        let (object, spectra) = load_card(&self.args.manifest)?;

        console.rule('-')?;
        console.say(format!(
            "*** {}  RA={} Dec={} g={}  z={}",
            object.name, object.ra, object.dec, object.gmag, object.redshift
        ))?;
        let labels: Vec<&str> = spectra.keys().map(String::as_str).collect();
        console.say(format!("The following spectra have been detected: [{}]", labels.join(", ")))?;

        let reference = choose_reference(&spectra, &self.args.reference, console)?;
        let scale = ScaleFactors::compute(&spectra, &reference);
        console.say(format!("*** scaling raw spectra to match {}", scale.reference()))?;
        console.say(format!("*** scaling using the mean flux value between {REFERENCE_BAND}"))?;
        for label in &scale.uncovered {
            console.say(format!("*** {label} does not cover {REFERENCE_BAND}, left unscaled"))?;
        }

        std::fs::create_dir_all(&self.args.output_dir).with_context(|| {
            format!("creating output directory {}", self.args.output_dir.display())
        })?;
        let paths = OutputPaths::new(&self.args.output_dir, &object.short_id, &self.args.snr_log);
        let colors = ColorMap::new(&styles, spectra.keys().map(String::as_str));

        let session = Session::new(object, spectra, scale, self.args.boxcar_width);
        let mut normalizer = Normalizer::new(session, &paths, &colors);
        normalizer.offer_previous(console)?;
        run_loop(&mut normalizer, console)?;

        log::info!(
            "session ended with {} normalized spectra, parameters {:?}",
            normalizer.session().normalized.len(),
            normalizer.params()
        );
        console.say("Exiting")?;
        Ok(())
    }
}

/// `preferred` when it is loaded, otherwise whatever label the user picks.
fn choose_reference<R: BufRead, W: Write>(
    spectra: &SpectrumSet,
    preferred: &str,
    console: &mut Console<R, W>,
) -> Result<String> {
    if spectra.contains_key(preferred) {
        return Ok(preferred.to_string());
    }
    let labels: Vec<&str> = spectra.keys().map(String::as_str).collect();
    console.say("-----ASIDE:")?;
    console.say(format!("-----No {preferred} spectrum!"))?;
    loop {
        console.say("-----which spectrum would you like to scale to?")?;
        console.say(format!("-----[{}]", labels.join(", ")))?;
        let Some(choice) = console.ask("-----enter spectrum: ")? else {
            bail!("input ended before a reference spectrum was chosen");
        };
        if spectra.contains_key(&choice) {
            return Ok(choice);
        }
        console.say("-----That spectrum is not available, try again")?;
    }
}
