use std::path::Path;

use anyhow::{Context, Result};
use plotters::coord::types::RangedCoordf64;
use plotters::prelude::*;

use crate::data::model::Interval;

const FIGURE_SIZE: (u32, u32) = (1200, 800);
const WINDOW_SHADE: RGBColor = RGBColor(128, 128, 128);

// ---------------------------------------------------------------------------
// Figure content
// ---------------------------------------------------------------------------

/// One line of a figure.
#[derive(Debug, Clone, PartialEq)]
pub struct Curve {
    /// Legend text.
    pub label: String,
    pub color: RGBColor,
    pub points: Vec<(f64, f64)>,
}

impl Curve {
    pub fn new(label: impl Into<String>, color: RGBColor, x: &[f64], y: &[f64]) -> Self {
        Curve {
            label: label.into(),
            color,
            points: x.iter().copied().zip(y.iter().copied()).collect(),
        }
    }

    /// Points whose x lies inside `limits` (bounds included) and whose y is
    /// finite.
    fn visible(&self, limits: Interval) -> Vec<(f64, f64)> {
        self.points
            .iter()
            .copied()
            .filter(|(x, y)| *x >= limits.start && *x <= limits.end && y.is_finite())
            .collect()
    }
}

/// Diagnostic figure of the normalization loop: scaled raw spectra with the
/// continua fitted so far.
#[derive(Debug, Clone)]
pub struct WorkingFigure<'a> {
    pub title: &'a str,
    pub xlimits: Interval,
    pub ylimits: Interval,
    pub windows: &'a [Interval],
    pub spectra: Vec<Curve>,
    /// Drawn dashed, without a legend entry.
    pub continua: Vec<Curve>,
}

/// Comparison figure of the plot review loop.
#[derive(Debug, Clone)]
pub struct ReviewFigure<'a> {
    pub object_name: &'a str,
    pub redshift: f64,
    pub xlimits: Interval,
    pub ylimits: Interval,
    /// Shaded when present.
    pub windows: Option<&'a [Interval]>,
    pub annotate: bool,
    pub line_width: u32,
    /// In legend order.
    pub spectra: Vec<Curve>,
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

type WavelengthChart<'a, 'b> =
    ChartContext<'a, SVGBackend<'b>, Cartesian2d<RangedCoordf64, RangedCoordf64>>;

fn shade_windows(chart: &mut WavelengthChart, windows: &[Interval], ylimits: Interval) -> Result<()> {
    chart
        .draw_series(windows.iter().map(|w| {
            Rectangle::new(
                [(w.start, ylimits.start), (w.end, ylimits.end)],
                WINDOW_SHADE.mix(0.25).filled(),
            )
        }))
        .context("drawing fit windows")?;
    Ok(())
}

/// Render the working plot to `path` (SVG), replacing any previous file.
pub fn draw_working_plot(path: &Path, figure: &WorkingFigure) -> Result<()> {
    let root = SVGBackend::new(path, FIGURE_SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let x = figure.xlimits;
    let y = figure.ylimits;
    let mut chart = ChartBuilder::on(&root)
        .caption(figure.title, ("sans-serif", 22))
        .margin(20)
        .x_label_area_size(45)
        .y_label_area_size(70)
        .build_cartesian_2d(x.start..x.end, y.start..y.end)?;

    chart
        .configure_mesh()
        .disable_mesh()
        .x_desc("Rest Wavelength (Å)")
        .y_desc("Scaled Flux")
        .draw()?;

    shade_windows(&mut chart, figure.windows, y)?;

    for curve in &figure.spectra {
        let color = curve.color;
        chart
            .draw_series(LineSeries::new(curve.visible(x), color.stroke_width(1)))?
            .label(curve.label.as_str())
            .legend(move |(lx, ly)| PathElement::new(vec![(lx, ly), (lx + 20, ly)], color));
    }
    for curve in &figure.continua {
        chart.draw_series(DashedLineSeries::new(
            curve.visible(x),
            8,
            6,
            curve.color.stroke_width(2),
        ))?;
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperRight)
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK.mix(0.4))
        .draw()?;

    root.present()
        .with_context(|| format!("writing {}", path.display()))?;
    log::debug!("rendered {}", path.display());
    Ok(())
}

/// Render the normalized comparison to `path` (SVG). The bottom axis is the
/// rest frame; the top axis shows the same range in the observed frame.
pub fn draw_review_plot(path: &Path, figure: &ReviewFigure) -> Result<()> {
    let root = SVGBackend::new(path, FIGURE_SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let x = figure.xlimits;
    let y = figure.ylimits;
    let observed = x.scaled(1.0 + figure.redshift);
    let mut chart = ChartBuilder::on(&root)
        .margin(20)
        .x_label_area_size(45)
        .top_x_label_area_size(45)
        .y_label_area_size(70)
        .build_cartesian_2d(x.start..x.end, y.start..y.end)?
        .set_secondary_coord(observed.start..observed.end, y.start..y.end);

    chart
        .configure_mesh()
        .disable_mesh()
        .x_desc("Rest Wavelength (Å)")
        .y_desc("Normalized Flux")
        .draw()?;
    chart
        .configure_secondary_axes()
        .x_desc("Observed Wavelength (Å)")
        .draw()?;

    if let Some(windows) = figure.windows {
        shade_windows(&mut chart, windows, y)?;
    }

    chart.draw_series(DashedLineSeries::new(
        [(x.start, 1.0), (x.end, 1.0)],
        10,
        6,
        BLACK.stroke_width(1),
    ))?;

    let width = figure.line_width.max(1);
    for curve in &figure.spectra {
        let color = curve.color;
        chart
            .draw_series(LineSeries::new(curve.visible(x), color.stroke_width(width)))?
            .label(curve.label.as_str())
            .legend(move |(lx, ly)| {
                PathElement::new(vec![(lx, ly), (lx + 20, ly)], color.stroke_width(width))
            });
    }

    if figure.annotate {
        let span = x.end - x.start;
        let text_y = y.start + 0.95 * (y.end - y.start);
        let font = FontDesc::new(FontFamily::SansSerif, 18.0, FontStyle::Normal);
        chart.draw_series([
            Text::new(
                figure.object_name.to_string(),
                (x.start + 0.03 * span, text_y),
                font.color(&BLACK),
            ),
            Text::new(
                format!("z={}", figure.redshift),
                (x.start + 0.80 * span, text_y),
                font.color(&BLACK),
            ),
        ])?;
        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::LowerLeft)
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK.mix(0.4))
            .draw()?;
    }

    root.present()
        .with_context(|| format!("writing {}", path.display()))?;
    log::debug!("rendered {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn curve() -> Curve {
        Curve::new(
            "SDSS",
            RGBColor(0, 0, 0),
            &[1100.0, 1200.0, 1300.0, 1400.0],
            &[1.0, f64::NAN, 1.2, 1.3],
        )
    }

    #[test]
    fn visible_points_respect_limits_and_drop_nan() {
        let pts = curve().visible(Interval::new(1150.0, 1400.0));
        assert_eq!(pts, vec![(1300.0, 1.2), (1400.0, 1.3)]);
    }

    #[test]
    fn working_plot_writes_svg() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("spectraJ000000.svg");
        let windows = [Interval::new(1300.0, 1320.0)];
        let figure = WorkingFigure {
            title: "SDSS J000000.00+000000.0",
            xlimits: Interval::new(1100.0, 1800.0),
            ylimits: Interval::new(0.0, 2.0),
            windows: &windows,
            spectra: vec![curve()],
            continua: vec![curve()],
        };
        draw_working_plot(&path, &figure).unwrap();
        let svg = std::fs::read_to_string(&path).unwrap();
        assert!(svg.contains("<svg"));
        assert!(svg.contains("SDSS"));
    }

    #[test]
    fn review_plot_annotates_redshift() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("normJ000000.svg");
        let figure = ReviewFigure {
            object_name: "SDSS J000000.00+000000.0",
            redshift: 2.0,
            xlimits: Interval::new(1200.0, 1600.0),
            ylimits: Interval::new(0.0, 2.5),
            windows: None,
            annotate: true,
            line_width: 1,
            spectra: vec![curve()],
        };
        draw_review_plot(&path, &figure).unwrap();
        let svg = std::fs::read_to_string(&path).unwrap();
        assert!(svg.contains("z=2"));
    }
}
