use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result};
use palette::{Hsl, IntoColor, Srgb};
use plotters::style::RGBColor;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Color palette generator
// ---------------------------------------------------------------------------

/// Generates `n` visually distinct colours using evenly spaced hues.
pub fn generate_palette(n: usize) -> Vec<RGBColor> {
    if n == 0 {
        return Vec::new();
    }
    (0..n)
        .map(|i| {
            let hue = (i as f32 / n as f32) * 360.0;
            let hsl = Hsl::new(hue, 0.75, 0.45);
            let rgb: Srgb = hsl.into_color();
            RGBColor(
                (rgb.red * 255.0) as u8,
                (rgb.green * 255.0) as u8,
                (rgb.blue * 255.0) as u8,
            )
        })
        .collect()
}

fn parse_hex(hex: &str) -> Result<RGBColor> {
    let rgb = Srgb::<u8>::from_str(hex).with_context(|| format!("'{hex}' is not a #rrggbb color"))?;
    Ok(RGBColor(rgb.red, rgb.green, rgb.blue))
}

// ---------------------------------------------------------------------------
// Style configuration: label → survey tag → colours
// ---------------------------------------------------------------------------

/// Campaign-specific line colours.
///
/// A label maps to a survey tag (its alphabetic prefix, or an explicit
/// alias) and an epoch number (its trailing digits, 1 when absent). The
/// survey's colour list is indexed by epoch, wrapping around.
///
/// ```json
/// { "aliases": { "MMT": "GEM" }, "surveys": { "SDSS": ["#000000", "#b3b3b3"] } }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleConfig {
    #[serde(default)]
    pub aliases: BTreeMap<String, String>,
    pub surveys: BTreeMap<String, Vec<String>>,
}

impl Default for StyleConfig {
    fn default() -> Self {
        let survey = |colors: &[&str]| colors.iter().map(|c| c.to_string()).collect::<Vec<_>>();
        StyleConfig {
            aliases: BTreeMap::new(),
            surveys: BTreeMap::from([
                ("SDSS".to_string(), survey(&["#000000", "#b3b3b3"])),
                ("BOSS".to_string(), survey(&["#ff0000", "#0000ff"])),
                ("GEM".to_string(), survey(&["#00bfbf", "#008000", "#ffa500"])),
            ]),
        }
    }
}

impl StyleConfig {
    /// Read a JSON style file and check every colour parses.
    pub fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading style file {}", path.display()))?;
        let config: StyleConfig = serde_json::from_str(&text)
            .with_context(|| format!("parsing style file {}", path.display()))?;
        for (survey, colors) in &config.surveys {
            for hex in colors {
                parse_hex(hex).with_context(|| format!("survey '{survey}'"))?;
            }
        }
        Ok(config)
    }

    /// Survey tag and 1-based epoch number of a label, e.g. `GEM2` → (`GEM`, 2).
    pub fn survey_of(&self, label: &str) -> (String, usize) {
        let prefix = label.trim_end_matches(|c: char| c.is_ascii_digit());
        let epoch = label[prefix.len()..].parse::<usize>().unwrap_or(1).max(1);
        let tag = self
            .aliases
            .get(label)
            .or_else(|| self.aliases.get(prefix))
            .cloned()
            .unwrap_or_else(|| prefix.to_string());
        (tag, epoch)
    }

    fn configured_color(&self, label: &str) -> Option<RGBColor> {
        let (tag, epoch) = self.survey_of(label);
        let colors = self.surveys.get(&tag).filter(|c| !c.is_empty())?;
        let hex = &colors[(epoch - 1) % colors.len()];
        parse_hex(hex).ok()
    }
}

// ---------------------------------------------------------------------------
// Color mapping: spectrum label → RGBColor
// ---------------------------------------------------------------------------

/// Resolved colour for every label of a session.
#[derive(Debug, Clone)]
pub struct ColorMap {
    mapping: BTreeMap<String, RGBColor>,
    default_color: RGBColor,
}

impl ColorMap {
    /// Configured colours where the style knows the survey, generated
    /// palette colours for the rest.
    pub fn new<'a>(config: &StyleConfig, labels: impl IntoIterator<Item = &'a str>) -> Self {
        let labels: Vec<&str> = labels.into_iter().collect();
        let unstyled: Vec<&str> = labels
            .iter()
            .copied()
            .filter(|l| config.configured_color(l).is_none())
            .collect();
        let mut generated = unstyled.iter().copied().zip(generate_palette(unstyled.len()));

        let mapping = labels
            .iter()
            .map(|&label| {
                let color = config.configured_color(label).or_else(|| {
                    generated
                        .find(|(l, _)| *l == label)
                        .map(|(_, c)| c)
                });
                (label.to_string(), color.unwrap_or(RGBColor(128, 128, 128)))
            })
            .collect();

        ColorMap {
            mapping,
            default_color: RGBColor(128, 128, 128),
        }
    }

    pub fn color_for(&self, label: &str) -> RGBColor {
        self.mapping.get(label).copied().unwrap_or(self.default_color)
    }
}
