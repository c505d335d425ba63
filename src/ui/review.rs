use std::collections::BTreeMap;
use std::io::{BufRead, Write};

use anyhow::Result;

use super::plot::{draw_review_plot, Curve, ReviewFigure};
use super::prompt::{parse_float, parse_limits, CommandSpec, Console, Flow, ParameterLoop};
use crate::color::ColorMap;
use crate::config::OutputPaths;
use crate::data::filter::boxcar;
use crate::data::model::{ObjectInfo, WindowSet};
use crate::data::params::ParamLog;
use crate::error::InputError;
use crate::normalize::NormalizedSpectrum;
use crate::state::{ActiveSet, PlotParams};

// ---------------------------------------------------------------------------
// Command table
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewCommand {
    Quit,
    XLimits,
    YLimits,
    Rlf,
    Filename,
    PlotList,
    Annotations,
    LineWidth,
    Smooth,
}

const REVIEW_COMMANDS: &[CommandSpec<ReviewCommand>] = &[
    CommandSpec { keywords: &["q", "Q"], summary: "back to the normalizer", command: ReviewCommand::Quit },
    CommandSpec { keywords: &["xlimits"], summary: "create a new xrange by entering [x1,x2]", command: ReviewCommand::XLimits },
    CommandSpec { keywords: &["ylimits"], summary: "create a new yrange by entering [y1,y2]", command: ReviewCommand::YLimits },
    CommandSpec { keywords: &["RLF"], summary: "turn plotting of the fit windows on/off", command: ReviewCommand::Rlf },
    CommandSpec { keywords: &["filename"], summary: "change name of image file", command: ReviewCommand::Filename },
    CommandSpec { keywords: &["plotlist"], summary: "add or remove spectra from final plot", command: ReviewCommand::PlotList },
    CommandSpec { keywords: &["annotations"], summary: "turn on/off annotations and legend", command: ReviewCommand::Annotations },
    CommandSpec { keywords: &["lw"], summary: "change linewidth for plotted spectra", command: ReviewCommand::LineWidth },
    CommandSpec { keywords: &["smooth"], summary: "smooth the displayed spectra", command: ReviewCommand::Smooth },
];

// ---------------------------------------------------------------------------
// Legend
// ---------------------------------------------------------------------------

/// Legend text per label, ordered by observation date.
///
/// Each entry reads `"<mjd> <label> <dt>"` where `dt` is the rest-frame time
/// since the previous entry, `ΔMJD / (1 + z)`; the first entry has 0.
pub fn legend_entries<'a>(
    object: &ObjectInfo,
    labels: impl IntoIterator<Item = &'a str>,
) -> Vec<(&'a str, String)> {
    let mut dated: Vec<(&str, f64)> = labels
        .into_iter()
        .map(|label| (label, object.mjd_of(label).unwrap_or(f64::NAN)))
        .collect();
    dated.sort_by(|a, b| a.1.total_cmp(&b.1));

    let mut previous: Option<f64> = None;
    dated
        .into_iter()
        .map(|(label, mjd)| {
            let dt = previous.map_or(0.0, |p| (mjd - p) / object.frame_factor());
            previous = Some(mjd);
            (label, format!("{mjd:.2} {label} {dt:.2}"))
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Review loop
// ---------------------------------------------------------------------------

/// Interactive review of normalized spectra. Owns its presentation settings;
/// the normalized data itself is borrowed and never changed.
pub struct PlotReview<'a> {
    object: &'a ObjectInfo,
    normalized: &'a BTreeMap<String, NormalizedSpectrum>,
    /// Flux as drawn, smoothed or not.
    display: BTreeMap<String, Vec<f64>>,
    params: PlotParams,
    paths: &'a OutputPaths,
    colors: &'a ColorMap,
    boxcar_width: usize,
}

impl<'a> PlotReview<'a> {
    pub fn new(
        object: &'a ObjectInfo,
        normalized: &'a BTreeMap<String, NormalizedSpectrum>,
        windows: WindowSet,
        paths: &'a OutputPaths,
        colors: &'a ColorMap,
        boxcar_width: usize,
    ) -> Self {
        let active = ActiveSet::new(normalized.keys().cloned());
        let mut review = PlotReview {
            object,
            normalized,
            display: BTreeMap::new(),
            params: PlotParams::defaults(object, windows, active),
            paths,
            colors,
            boxcar_width,
        };
        review.refresh_display();
        review
    }

    pub fn params(&self) -> &PlotParams {
        &self.params
    }

    fn refresh_display(&mut self) {
        self.display = self
            .normalized
            .iter()
            .map(|(label, n)| {
                let flux = if self.params.smooth {
                    boxcar(&n.spectrum.flux, self.boxcar_width)
                } else {
                    n.spectrum.flux.clone()
                };
                (label.clone(), flux)
            })
            .collect();
    }

    /// Offer the latest block of the plot log, applying it when accepted.
    pub fn offer_previous<R: BufRead, W: Write>(&mut self, console: &mut Console<R, W>) -> Result<()> {
        let path = self.paths.plot_log();
        let history = match ParamLog::<PlotParams>::load(&path) {
            Ok(history) => history,
            Err(e) => {
                log::warn!("ignoring plot log: {e:#}");
                console.say(format!("*** Could not read {}, using default parameters.", path.display()))?;
                return Ok(());
            }
        };
        let Some(previous) = history.latest() else {
            return Ok(());
        };

        console.rule('#')?;
        console.say(format!("*** Detected a plotting parameter file: {}", path.display()))?;
        if console.ask_yes_no("*** Would you like to use it? [y/n]: ")? == Some(true) {
            console.say("*** Reading in previously used parameters")?;
            let mut params = previous.clone();
            params.active.retain_known(|l| self.normalized.contains_key(l));
            self.params = params;
            self.refresh_display();
            self.print_params(console, "*** ")?;
        } else {
            console.say("*** Using default parameters.")?;
        }
        console.rule('#')?;
        Ok(())
    }

    fn print_params<R: BufRead, W: Write>(&self, console: &mut Console<R, W>, prefix: &str) -> Result<()> {
        let p = &self.params;
        console.say(format!("{prefix}xlimits={}", p.xlimits))?;
        console.say(format!("{prefix}ylimits={}", p.ylimits))?;
        console.say(format!("{prefix}RLF={}", p.windows))?;
        console.say(format!("{prefix}annotations={}", p.annotations))?;
        console.say(format!("{prefix}lw={}", p.lw))?;
        Ok(())
    }

    fn figure(&self) -> ReviewFigure<'_> {
        let p = &self.params;
        let plotted = p
            .active
            .iter()
            .map(String::as_str)
            .filter(|l| self.normalized.contains_key(*l));
        let spectra = legend_entries(self.object, plotted)
            .into_iter()
            .filter_map(|(label, text)| {
                let n = self.normalized.get(label)?;
                let flux = self.display.get(label)?;
                Some(Curve::new(text, self.colors.color_for(label), &n.spectrum.wavelength, flux))
            })
            .collect();

        ReviewFigure {
            object_name: &self.object.name,
            redshift: self.object.redshift,
            xlimits: p.xlimits,
            ylimits: p.ylimits,
            windows: p.show_windows.then(|| p.windows.as_slice()),
            annotate: p.annotations,
            line_width: p.lw.round().max(1.0) as u32,
            spectra,
        }
    }
}

impl ParameterLoop for PlotReview<'_> {
    type Command = ReviewCommand;

    fn title(&self) -> &'static str {
        "Normalized Spectra Plotter: adjust the figure, refresh it after each change"
    }

    fn commands(&self) -> &'static [CommandSpec<ReviewCommand>] {
        REVIEW_COMMANDS
    }

    fn quit_command(&self) -> ReviewCommand {
        ReviewCommand::Quit
    }

    fn render<R: BufRead, W: Write>(&mut self, console: &mut Console<R, W>) -> Result<()> {
        let path = self.paths.figure(&self.params.filename);
        if let Err(e) = draw_review_plot(&path, &self.figure()) {
            log::error!("{e:#}");
            console.say(format!("*** Could not draw the plot: {e:#}"))?;
            console.say("*** Use 'filename' to pick another output name.")?;
        }
        Ok(())
    }

    fn execute<R: BufRead, W: Write>(
        &mut self,
        command: ReviewCommand,
        console: &mut Console<R, W>,
    ) -> Result<Flow> {
        console.rule('#')?;
        match command {
            ReviewCommand::Smooth => {
                if let Some(smooth) = console.ask_yes_no("Turn on smoothing? [y,n]: ")? {
                    self.params.smooth = smooth;
                    self.refresh_display();
                }
                console.say(format!("Smoothing: {}", self.params.smooth))?;
            }
            ReviewCommand::LineWidth => {
                console.say(format!("Current linewidth: {}", self.params.lw))?;
                let width = console.ask_parsed("Enter new linewidth (float): ", |reply: &str| -> Result<f64, InputError> {
                    let lw = parse_float(reply)?;
                    if lw > 0.0 {
                        Ok(lw)
                    } else {
                        Err(InputError::NotANumber(reply.to_string()))
                    }
                })?;
                if let Some(lw) = width {
                    self.params.lw = lw;
                    console.say(format!("New linewidth: {lw}"))?;
                }
            }
            ReviewCommand::XLimits => {
                if let Some(limits) =
                    console.ask_parsed("Enter new x-axis limits (comma separated): ", parse_limits)?
                {
                    self.params.xlimits = limits;
                    console.say(format!("Reset figure xlimits to: {limits}"))?;
                }
            }
            ReviewCommand::YLimits => {
                if let Some(limits) =
                    console.ask_parsed("Enter new y-axis limits (comma separated): ", parse_limits)?
                {
                    self.params.ylimits = limits;
                    console.say(format!("Reset figure ylimits to: {limits}"))?;
                }
            }
            ReviewCommand::Annotations => {
                console.say("Annotations: object name, redshift and legend.")?;
                if let Some(on) = console.ask_yes_no("Plot the annotations? [y,n]: ")? {
                    self.params.annotations = on;
                }
                console.say(format!("Plotting all annotations: {}", self.params.annotations))?;
            }
            ReviewCommand::PlotList => {
                console.say(format!("Current list of spectra to plot: {}", self.params.active))?;
                console.say("To add OR remove, enter the name.")?;
                if let Some(label) = console.ask("Enter name of spectra: ")? {
                    if self.normalized.contains_key(&label) {
                        self.params.active.toggle(&label);
                    } else {
                        let known: Vec<&str> = self.normalized.keys().map(String::as_str).collect();
                        console.say(format!(
                            "'{label}' was not normalized in this run (available: {})",
                            known.join(", ")
                        ))?;
                    }
                }
                console.say(format!("New list of spectra to plot: {}", self.params.active))?;
            }
            ReviewCommand::Rlf => {
                if let Some(show) = console.ask_yes_no("Plot the RLF windows? [y,n]: ")? {
                    self.params.show_windows = show;
                }
                console.say(format!(
                    "Plotting relatively line free windows: {}",
                    self.params.show_windows
                ))?;
            }
            ReviewCommand::Filename => {
                console.say(format!("Current output filename: {}", self.params.filename))?;
                if let Some(name) = console.ask("Enter a filename (.svg will be added to end): ")? {
                    if !name.is_empty() {
                        self.params.filename = name;
                    }
                }
                console.say(format!("Output filename: {}", self.params.filename))?;
            }
            ReviewCommand::Quit => {
                let path = self.paths.plot_log();
                console.say("Quitting")?;
                console.say(format!("Writing current plotting parameters to: {}", path.display()))?;
                self.print_params(console, "")?;
                if let Err(e) = ParamLog::append(&path, &self.params) {
                    log::error!("{e:#}");
                    console.say(format!("*** Could not save plotting parameters: {e:#}"))?;
                }
                let figure = self.paths.figure(&self.params.filename);
                console.say(format!("Plotted normalized spectra in: {}", figure.display()))?;
                console.rule('#')?;
                return Ok(Flow::Quit);
            }
        }
        console.rule('#')?;
        Ok(Flow::Continue)
    }
}
