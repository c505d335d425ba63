use std::io::{BufRead, Write};
use std::path::PathBuf;

use anyhow::Result;

use super::plot::{draw_working_plot, Curve, WorkingFigure};
use super::prompt::{
    parse_limits, parse_pair, print_commands, run_loop, CommandSpec, Console, Flow, ParameterLoop,
};
use super::review::PlotReview;
use crate::color::ColorMap;
use crate::config::OutputPaths;
use crate::continuum::{model_for, FunctionFamily};
use crate::data::model::{Interval, WindowEdit};
use crate::data::params::ParamLog;
use crate::data::writer::{append_line, write_normalized};
use crate::normalize;
use crate::state::{Session, SessionParams};

// ---------------------------------------------------------------------------
// Command table
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NormCommand {
    Quit,
    Smooth,
    FuncType,
    XLimits,
    YLimits,
    Rlf,
    SnrRegion,
    Filename,
    Normalize,
    NormList,
}

const NORMALIZER_COMMANDS: &[CommandSpec<NormCommand>] = &[
    CommandSpec { keywords: &["q", "Q"], summary: "save parameters and quit", command: NormCommand::Quit },
    CommandSpec { keywords: &["smooth"], summary: "smooth the continuum [y,n]", command: NormCommand::Smooth },
    CommandSpec { keywords: &["funcType"], summary: "choose from plaw or poly", command: NormCommand::FuncType },
    CommandSpec { keywords: &["xlimits"], summary: "create a new xrange by entering [x1,x2]", command: NormCommand::XLimits },
    CommandSpec { keywords: &["ylimits"], summary: "create a new yrange by entering [y1,y2]", command: NormCommand::YLimits },
    CommandSpec { keywords: &["RLF"], summary: "add/remove RLF windows [x1,x2]", command: NormCommand::Rlf },
    CommandSpec { keywords: &["SNRreg"], summary: "change the region SNR is calculated over", command: NormCommand::SnrRegion },
    CommandSpec { keywords: &["filename"], summary: "change name of image file", command: NormCommand::Filename },
    CommandSpec { keywords: &["normalize"], summary: "execute normalization", command: NormCommand::Normalize },
    CommandSpec { keywords: &["normlist"], summary: "add or remove spectra from the normalization", command: NormCommand::NormList },
];

// ---------------------------------------------------------------------------
// Normalizer
// ---------------------------------------------------------------------------

/// The normalization loop. Owns the session and its parameters for as long
/// as the loop runs.
pub struct Normalizer<'a> {
    session: Session,
    params: SessionParams,
    paths: &'a OutputPaths,
    colors: &'a ColorMap,
    last_figure: Option<PathBuf>,
}

impl<'a> Normalizer<'a> {
    pub fn new(mut session: Session, paths: &'a OutputPaths, colors: &'a ColorMap) -> Self {
        let params = SessionParams::defaults(&session.object, session.labels());
        session.set_smoothing(params.smooth);
        Normalizer {
            session,
            params,
            paths,
            colors,
            last_figure: None,
        }
    }

    pub fn params(&self) -> &SessionParams {
        &self.params
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Offer the latest block of the normalization log, applying it when
    /// accepted. Labels that are not loaded are dropped from its active list.
    pub fn offer_previous<R: BufRead, W: Write>(&mut self, console: &mut Console<R, W>) -> Result<()> {
        let path = self.paths.normalization_log();
        let history = match ParamLog::<SessionParams>::load(&path) {
            Ok(history) => history,
            Err(e) => {
                log::warn!("ignoring normalization log: {e:#}");
                console.say(format!("*** Could not read {}, using default parameters.", path.display()))?;
                return Ok(());
            }
        };
        let Some(previous) = history.latest() else {
            return Ok(());
        };

        console.rule('-')?;
        console.say(format!("*** Detected a normalization parameter file: {}", path.display()))?;
        if console.ask_yes_no("*** Would you like to use it? [y/n]: ")? == Some(true) {
            console.say("*** Reading in previously used parameters...")?;
            let mut params = previous.clone();
            params.active.retain_known(|l| self.session.has_spectrum(l));
            self.session.set_smoothing(params.smooth);
            self.params = params;
            self.print_params(console, "*** ")?;
        } else {
            console.say("*** Using default parameters.")?;
        }
        console.rule('-')?;
        Ok(())
    }

    fn print_params<R: BufRead, W: Write>(&self, console: &mut Console<R, W>, prefix: &str) -> Result<()> {
        let p = &self.params;
        console.say(format!("{prefix}SNRreg={}", p.snr_window))?;
        console.say(format!("{prefix}smooth={}", p.smooth))?;
        console.say(format!("{prefix}funcType={}", p.function))?;
        console.say(format!("{prefix}xlimits={}", p.xlimits))?;
        console.say(format!("{prefix}ylimits={}", p.ylimits))?;
        console.say(format!("{prefix}RLF={}", p.windows))?;
        console.say(format!("{prefix}normlist={}", p.active))?;
        Ok(())
    }

    /// Append the current parameters to the normalization log. A failed
    /// write is reported and the session goes on.
    fn save_params<R: BufRead, W: Write>(&self, console: &mut Console<R, W>) -> Result<()> {
        let path = self.paths.normalization_log();
        console.say(format!("Writing current normalization parameters to: {}", path.display()))?;
        self.print_params(console, "")?;
        if let Err(e) = ParamLog::append(&path, &self.params) {
            log::error!("{e:#}");
            console.say(format!("*** Could not save normalization parameters: {e:#}"))?;
        }
        Ok(())
    }

    fn figure(&self) -> WorkingFigure<'_> {
        let active = || {
            self.params
                .active
                .iter()
                .filter_map(|label| self.session.working.get(label).map(|sp| (label, sp)))
        };
        let spectra = active()
            .map(|(label, sp)| {
                let factor = self.session.scale.factor(label);
                let flux: Vec<f64> = sp.flux.iter().map(|f| f * factor).collect();
                Curve::new(label.as_str(), self.colors.color_for(label), &sp.wavelength, &flux)
            })
            .collect();
        let continua = active()
            .filter_map(|(label, _)| {
                let n = self.session.normalized.get(label)?;
                let factor = self.session.scale.factor(label);
                let continuum: Vec<f64> = n.continuum.iter().map(|c| c * factor).collect();
                Some(Curve::new(
                    label.as_str(),
                    self.colors.color_for(label),
                    &n.spectrum.wavelength,
                    &continuum,
                ))
            })
            .collect();

        WorkingFigure {
            title: &self.session.object.name,
            xlimits: self.params.xlimits,
            ylimits: self.params.ylimits,
            windows: self.params.windows.as_slice(),
            spectra,
            continua,
        }
    }

    /// Fit, divide and write every active spectrum, then hand the results
    /// to the plot review. A malformed spectrum is returned as an error.
    fn normalize<R: BufRead, W: Write>(&mut self, console: &mut Console<R, W>) -> Result<()> {
        self.save_params(console)?;
        console.rule('-')?;
        if self.params.active.is_empty() {
            console.say("*** The normlist is empty, nothing to normalize.")?;
            return Ok(());
        }
        console.say(format!("***Normalizing the following spectra: {}", self.params.active))?;
        console.say("(If all the spectra are not in the list above, it is because")?;
        console.say("you took some out of the normlist)")?;

        let outcome = normalize::run(&self.session, &self.params)?;
        let model = model_for(&self.params.function).ok();
        let frame_factor = self.session.object.frame_factor();
        let mut unwritten = Vec::new();

        for spectrum in &outcome.spectra {
            console.rule('-')?;
            console.say(format!("***Normalizing spectrum: {}", spectrum.label))?;
            match spectrum.snr {
                Some(snr) => console.say(format!("*** SNR in range {} is {snr}", outcome.snr_window))?,
                None => {
                    log::warn!("'{}' has no samples inside {}", spectrum.label, outcome.snr_window);
                    console.say(format!(
                        "*** WARNING no samples of {} in {}, SNR recorded as nan",
                        spectrum.label, outcome.snr_window
                    ))?;
                }
            }
            match &spectrum.result {
                Ok(n) => {
                    console.say(format!("*** Windows used for function fitting: {}", self.params.windows))?;
                    if let Some(model) = &model {
                        console.say(format!("*** Normalizing using a {} fit: {}", model.name(), model.equation()))?;
                    }
                    console.say(format!("*** Solution Found: {} ({} samples)", n.fit, n.fit_samples))?;
                    let path = self.paths.normalized_spectrum(&spectrum.label);
                    match write_normalized(&path, &n.spectrum, frame_factor) {
                        Ok(()) => console.say(format!("*** Wrote {}", path.display()))?,
                        Err(e) => {
                            log::error!("{e:#}");
                            console.say(format!("*** Skipping {}: {e:#}", spectrum.label))?;
                            unwritten.push(spectrum.label.as_str());
                        }
                    }
                }
                Err(e) => {
                    log::warn!("'{}' not normalized: {e}", spectrum.label);
                    console.say(format!("*** Skipping {}: {e}", spectrum.label))?;
                }
            }
        }

        if let Err(e) = append_line(
            self.paths.snr_log(),
            &outcome.snr_line(&self.session.object.short_id),
        ) {
            log::error!("{e:#}");
            console.say(format!("*** Could not record the SNR values: {e:#}"))?;
        }
        let mut normalized = outcome.normalized();
        for label in unwritten {
            normalized.remove(label);
        }
        self.session.normalized = normalized;
        console.rule('-')?;

        if self.session.normalized.is_empty() {
            console.say("*** Nothing was normalized, staying in the normalizer.")?;
            return Ok(());
        }

        let mut review = PlotReview::new(
            &self.session.object,
            &self.session.normalized,
            self.params.windows.clone(),
            self.paths,
            self.colors,
            self.session.boxcar_width(),
        );
        review.offer_previous(console)?;
        run_loop(&mut review, console)?;
        log::debug!("plot review closed with {:?}", review.params());
        print_commands(&*self, console)?;
        Ok(())
    }
}

impl ParameterLoop for Normalizer<'_> {
    type Command = NormCommand;

    fn title(&self) -> &'static str {
        "Normalizer: change the fit parameters, refresh the plot after each change"
    }

    fn commands(&self) -> &'static [CommandSpec<NormCommand>] {
        NORMALIZER_COMMANDS
    }

    fn quit_command(&self) -> NormCommand {
        NormCommand::Quit
    }

    fn render<R: BufRead, W: Write>(&mut self, console: &mut Console<R, W>) -> Result<()> {
        let path = self.paths.figure(&self.params.filename);
        match draw_working_plot(&path, &self.figure()) {
            Ok(()) if self.last_figure.as_ref() != Some(&path) => {
                console.say(format!("*** Plot built, see {}", path.display()))?;
                self.last_figure = Some(path);
            }
            Ok(()) => {}
            Err(e) => {
                log::error!("{e:#}");
                console.say(format!("*** Could not draw the plot: {e:#}"))?;
                console.say("*** Use 'filename' to pick another output name.")?;
                self.last_figure = None;
            }
        }

        for label in self.params.active.iter() {
            let covered = self
                .session
                .original
                .get(label)
                .is_some_and(|sp| sp.covers(self.params.snr_window));
            if !covered {
                console.say(format!(
                    "*** WARNING the SNR region {} is not fully covered by {label}",
                    self.params.snr_window
                ))?;
            }
        }
        Ok(())
    }

    fn execute<R: BufRead, W: Write>(
        &mut self,
        command: NormCommand,
        console: &mut Console<R, W>,
    ) -> Result<Flow> {
        console.rule('-')?;
        match command {
            NormCommand::Smooth => {
                if let Some(smooth) = console.ask_yes_no("Turn on smoothing? [y,n]: ")? {
                    self.params.smooth = smooth;
                    self.session.set_smoothing(smooth);
                }
                console.say(format!("Smoothing: {}", self.params.smooth))?;
            }
            NormCommand::XLimits => {
                if let Some(limits) =
                    console.ask_parsed("Enter new x-axis limits (comma separated): ", parse_limits)?
                {
                    self.params.xlimits = limits;
                    console.say(format!("Reset figure xlimits to: {limits}"))?;
                }
            }
            NormCommand::YLimits => {
                if let Some(limits) =
                    console.ask_parsed("Enter new y-axis limits (comma separated): ", parse_limits)?
                {
                    self.params.ylimits = limits;
                    console.say(format!("Reset figure ylimits to: {limits}"))?;
                }
            }
            NormCommand::SnrRegion => {
                console.say(format!("Current region to calculate SNR over: {}", self.params.snr_window))?;
                if let Some((a, b)) = console
                    .ask_parsed("Enter new region to calculate SNR (comma separated): ", parse_pair)?
                {
                    self.params.snr_window = Interval::ordered(a, b);
                    console.say(format!("Reset SNRreg to: {}", self.params.snr_window))?;
                }
            }
            NormCommand::Rlf => {
                console.say(format!("Current RLF windows: {}", self.params.windows))?;
                console.say("To add OR remove, enter the windows beginning/ending.")?;
                if let Some((a, b)) =
                    console.ask_parsed("Enter a RLF window (comma separated): ", parse_pair)?
                {
                    match self.params.windows.toggle(Interval::ordered(a, b).rounded()) {
                        WindowEdit::Added(w) => console.say(format!("Added: {w}"))?,
                        WindowEdit::Removed(w) => console.say(format!("Removed: {w}"))?,
                        WindowEdit::RemovedLeavingOne(w) => {
                            log::warn!("fit window set reduced to one window");
                            console.say(format!("Removed: {w}"))?;
                            console.say("[WARNING]: Your RLF array now has only one entry.")?;
                            console.say("[WARNING]: You are about to do bad science.")?;
                        }
                        WindowEdit::RefusedLast(_) => {
                            console.say("Sorry, you cannot have an empty RLF array")?
                        }
                    }
                    console.say(format!("New RLF windows: {}", self.params.windows))?;
                }
            }
            NormCommand::NormList => {
                console.say(format!("Current list of spectra to normalize: {}", self.params.active))?;
                console.say("To add OR remove, enter the name.")?;
                if let Some(label) = console.ask("Enter name of spectra: ")? {
                    if self.session.has_spectrum(&label) {
                        self.params.active.toggle(&label);
                    } else {
                        let known: Vec<&str> = self.session.labels().collect();
                        console.say(format!(
                            "'{label}' is not a loaded spectrum (available: {})",
                            known.join(", ")
                        ))?;
                    }
                }
                console.say(format!("New list of spectra to normalize: {}", self.params.active))?;
            }
            NormCommand::FuncType => {
                console.say(format!("Current function: {}", self.params.function))?;
                if let Some(name) = console.ask("Enter function type (plaw or poly): ")? {
                    let function = FunctionFamily::from(name);
                    if let FunctionFamily::Other(name) = &function {
                        log::warn!("continuum function '{name}' is not supported");
                    }
                    self.params.function = function;
                }
                console.say(format!("funcType: {}", self.params.function))?;
            }
            NormCommand::Filename => {
                console.say(format!("Current output filename: {}", self.params.filename))?;
                if let Some(name) = console.ask("Enter a filename (.svg will be added to end): ")? {
                    if !name.is_empty() {
                        self.params.filename = name;
                    }
                }
                console.say(format!("Output filename: {}", self.params.filename))?;
            }
            NormCommand::Normalize => {
                self.normalize(console)?;
                return Ok(Flow::Continue);
            }
            NormCommand::Quit => {
                self.save_params(console)?;
                console.rule('-')?;
                return Ok(Flow::Quit);
            }
        }
        console.rule('-')?;
        Ok(Flow::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::StyleConfig;
    use crate::data::loader::parse_spectrum;
    use crate::data::model::{ObjectInfo, Spectrum, SpectrumSet, WindowSet};
    use crate::data::scale::ScaleFactors;
    use crate::state::{ActiveSet, PlotParams};
    use std::io::Cursor;
    use std::path::Path;

    fn object() -> ObjectInfo {
        ObjectInfo {
            name: "SDSS J000000.00+000000.0".into(),
            short_id: "J000000".into(),
            ra: 0.0,
            dec: 0.0,
            gmag: 18.0,
            redshift: 2.0,
            mjd: [("SDSS".to_string(), 52000.0), ("BOSS".to_string(), 55000.0)]
                .into_iter()
                .collect(),
        }
    }

    fn line_spectrum() -> Spectrum {
        Spectrum::from_samples((0..=600).map(|i| {
            let w = 1200.0 + i as f64;
            (w, 10.0 - 0.002 * w, 0.5)
        }))
    }

    fn session(spectra: SpectrumSet) -> Session {
        let scale = ScaleFactors::compute(&spectra, "SDSS");
        Session::new(object(), spectra, scale, 5)
    }

    fn sdss_only() -> Session {
        let mut spectra = SpectrumSet::new();
        spectra.insert("SDSS".into(), line_spectrum());
        session(spectra)
    }

    fn fixtures(dir: &Path) -> (OutputPaths, ColorMap) {
        (
            OutputPaths::new(dir, "J000000", Path::new("SNR_outfile.dat")),
            ColorMap::new(&StyleConfig::default(), ["SDSS", "BOSS"]),
        )
    }

    fn drive(normalizer: &mut Normalizer, script: &str) -> String {
        let mut console = Console::new(Cursor::new(script.to_string()), Vec::new());
        run_loop(normalizer, &mut console).unwrap();
        String::from_utf8(console.into_output()).unwrap()
    }

    #[test]
    fn removing_down_to_one_window_warns() {
        let dir = tempfile::tempdir().unwrap();
        let (paths, colors) = fixtures(dir.path());
        let mut normalizer = Normalizer::new(sdss_only(), &paths, &colors);

        let out = drive(
            &mut normalizer,
            "RLF\n1700,1750\nRLF\n1320.2, 1299.8\nRLF\n1590,1620\nq\n",
        );
        assert_eq!(
            normalizer.params().windows,
            WindowSet::new(vec![Interval::new(1590.0, 1620.0)]).unwrap()
        );
        assert!(out.contains("You are about to do bad science"));
        assert!(out.contains("Sorry, you cannot have an empty RLF array"));
    }

    #[test]
    fn bad_entries_leave_state_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let (paths, colors) = fixtures(dir.path());
        let mut normalizer = Normalizer::new(sdss_only(), &paths, &colors);
        let before = normalizer.params().clone();

        let out = drive(
            &mut normalizer,
            "xlimits\n1500\nylimits\n40,0\nsmooth\nmaybe\nnormlist\nGEM9\nfrobnicate\nq\n",
        );
        assert_eq!(normalizer.params(), &before);
        assert!(out.contains("'GEM9' is not a loaded spectrum"));
        assert!(out.contains("frobnicate: unknown command"));
    }

    #[test]
    fn non_finite_entries_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let (paths, colors) = fixtures(dir.path());
        let mut normalizer = Normalizer::new(sdss_only(), &paths, &colors);
        let before = normalizer.params().clone();

        let out = drive(
            &mut normalizer,
            "xlimits\n-inf,inf\nylimits\nnan,5\nSNRreg\ninf,1700\nRLF\nnan,1\nq\n",
        );
        assert_eq!(normalizer.params(), &before);
        assert!(out.contains("'-inf' is not a number"));
        assert!(out.contains("'nan' is not a number"));
        assert!(out.contains("'inf' is not a number"));
    }

    #[test]
    fn unwritable_figure_keeps_the_session_alive() {
        let dir = tempfile::tempdir().unwrap();
        let (paths, colors) = fixtures(dir.path());
        let mut normalizer = Normalizer::new(sdss_only(), &paths, &colors);

        let out = drive(
            &mut normalizer,
            "filename\nno_such_dir/fig\nfilename\nfixed\nq\n",
        );
        assert!(out.contains("*** Could not draw the plot"));
        assert!(paths.figure("fixed").exists());
        let history = ParamLog::<SessionParams>::load(&paths.normalization_log()).unwrap();
        assert_eq!(history.history.len(), 1);
        assert_eq!(history.latest().unwrap().filename, "fixed");
    }

    #[test]
    fn unwritable_output_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let (paths, colors) = fixtures(dir.path());
        std::fs::create_dir(paths.normalized_spectrum("SDSS")).unwrap();
        let mut normalizer = Normalizer::new(sdss_only(), &paths, &colors);

        let out = drive(&mut normalizer, "funcType\npoly\nnormalize\nq\n");
        assert!(out.contains("*** Skipping SDSS"));
        assert!(out.contains("Nothing was normalized"));
        assert!(normalizer.session().normalized.is_empty());
        assert!(paths.snr_log().exists());
        let history = ParamLog::<SessionParams>::load(&paths.normalization_log()).unwrap();
        assert_eq!(history.history.len(), 2);
    }

    #[test]
    fn quitting_appends_exactly_one_entry() {
        let dir = tempfile::tempdir().unwrap();
        let (paths, colors) = fixtures(dir.path());
        let mut normalizer = Normalizer::new(sdss_only(), &paths, &colors);
        drive(&mut normalizer, "funcType\npoly\nSNRreg\n1700,1600\nq\n");

        let history = ParamLog::<SessionParams>::load(&paths.normalization_log()).unwrap();
        assert_eq!(history.history.len(), 1);
        let saved = history.latest().unwrap();
        assert_eq!(saved.function, FunctionFamily::Linear);
        assert_eq!(saved.snr_window, Interval::new(1600.0, 1700.0));
        assert!(paths.figure("spectraJ000000").exists());
    }

    #[test]
    fn end_of_input_saves_like_quit() {
        let dir = tempfile::tempdir().unwrap();
        let (paths, colors) = fixtures(dir.path());
        let mut normalizer = Normalizer::new(sdss_only(), &paths, &colors);
        drive(&mut normalizer, "smooth\nn\n");
        assert!(!normalizer.params().smooth);
        assert_eq!(normalizer.session().working, normalizer.session().original);
        let history = ParamLog::<SessionParams>::load(&paths.normalization_log()).unwrap();
        assert_eq!(history.history.len(), 1);
    }

    #[test]
    fn normalize_writes_observed_frame_spectrum_and_snr_line() {
        let dir = tempfile::tempdir().unwrap();
        let (paths, colors) = fixtures(dir.path());
        let mut normalizer = Normalizer::new(sdss_only(), &paths, &colors);

        // RLF reduced to [1300,1320],[1590,1620]; review loop quits at once.
        let out = drive(
            &mut normalizer,
            "funcType\npoly\nRLF\n1700,1750\nnormalize\nq\nq\n",
        );
        assert!(out.contains("*** Solution Found: y = ("));

        let text = std::fs::read_to_string(paths.normalized_spectrum("SDSS")).unwrap();
        let written = parse_spectrum(Cursor::new(text)).unwrap();
        let input = line_spectrum();
        assert_eq!(written.len(), input.len());
        for i in [0, 300, 600] {
            assert!((written.wavelength[i] - input.wavelength[i] * 3.0).abs() < 1e-9);
            assert!((written.flux[i] - 1.0).abs() < 1e-9);
        }

        let snr_log = std::fs::read_to_string(paths.snr_log()).unwrap();
        assert_eq!(snr_log.lines().count(), 1);
        assert!(snr_log.starts_with("J000000 1600 1700 SDSS "));

        let norm_log = ParamLog::<SessionParams>::load(&paths.normalization_log()).unwrap();
        assert_eq!(norm_log.history.len(), 2);
        let plot_log = ParamLog::<PlotParams>::load(&paths.plot_log()).unwrap();
        assert_eq!(plot_log.history.len(), 1);
        assert!(normalizer.session().normalized.contains_key("SDSS"));
    }

    #[test]
    fn unsupported_function_skips_output_but_logs_snr() {
        let dir = tempfile::tempdir().unwrap();
        let (paths, colors) = fixtures(dir.path());
        let mut normalizer = Normalizer::new(sdss_only(), &paths, &colors);

        let out = drive(&mut normalizer, "funcType\ncubic\nnormalize\nq\n");
        assert!(out.contains("*** Skipping SDSS: unsupported continuum function 'cubic'"));
        assert!(out.contains("Nothing was normalized"));
        assert!(!paths.normalized_spectrum("SDSS").exists());
        assert!(paths.snr_log().exists());
    }

    #[test]
    fn malformed_spectrum_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let (paths, colors) = fixtures(dir.path());
        let mut spectra = SpectrumSet::new();
        spectra.insert("SDSS".into(), line_spectrum());
        let mut broken = line_spectrum();
        broken.flux_error.truncate(3);
        spectra.insert("BOSS".into(), broken);
        let mut normalizer = Normalizer::new(session(spectra), &paths, &colors);

        let mut console = Console::new(Cursor::new("normalize\n"), Vec::new());
        let err = run_loop(&mut normalizer, &mut console).unwrap_err();
        assert!(err.to_string().contains("'BOSS'"));
        assert!(!paths.normalized_spectrum("SDSS").exists());
        assert!(!paths.snr_log().exists());
    }

    #[test]
    fn previous_parameters_drop_unknown_labels() {
        let dir = tempfile::tempdir().unwrap();
        let (paths, colors) = fixtures(dir.path());
        let mut saved = SessionParams::defaults(&object(), ["SDSS", "GEM1"]);
        saved.function = FunctionFamily::Linear;
        saved.smooth = false;
        ParamLog::append(&paths.normalization_log(), &saved).unwrap();

        let mut normalizer = Normalizer::new(sdss_only(), &paths, &colors);
        let mut console = Console::new(Cursor::new("yes\n"), Vec::new());
        normalizer.offer_previous(&mut console).unwrap();
        assert_eq!(normalizer.params().function, FunctionFamily::Linear);
        assert_eq!(normalizer.params().active, ActiveSet::new(["SDSS"]));
        assert_eq!(normalizer.session().working, normalizer.session().original);
    }
}
