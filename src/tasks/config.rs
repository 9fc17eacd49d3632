use anyhow::{Context, Result};
use log::{debug, error};
use serde::Deserialize;
use std::{collections::BTreeMap, fs, path::Path, path::PathBuf};

/// # Description
///
/// Optional overrides for a built-in plot, read from a YAML file passed with
/// `--config`. Every field is optional and only replaces the value it names.
///
/// ```yaml
/// width: 1000
/// height: 600
/// row_limit: 300
/// y_max: 0.5
/// colors:
///   shamir: "#1f77b4"
/// labels:
///   ssms: Krawczyk
/// ```
#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct PlotOverrides {
    /// Figure width in pixels.
    pub width: Option<u32>,
    /// Figure height in pixels.
    pub height: Option<u32>,
    pub font_size: Option<i32>,
    /// Keep only the first N rows of every series.
    pub row_limit: Option<usize>,
    /// Fixed upper x limit, replacing the data-derived one.
    pub x_max: Option<f64>,
    /// Fixed upper y limit, replacing the data-derived one.
    pub y_max: Option<f64>,
    /// Opacity of the standard-deviation bands, in [0, 1].
    pub band_opacity: Option<f64>,
    /// Series color per algorithm key, as `#rrggbb`.
    pub colors: BTreeMap<String, String>,
    /// Legend label per algorithm key.
    pub labels: BTreeMap<String, String>,
    pub output: Option<PathBuf>,
}

impl PlotOverrides {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let overrides: PlotOverrides =
            serde_yaml::from_str(yaml).context("error parsing plot configuration")?;
        overrides.validate()?;

        Ok(overrides)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let yaml = fs::read_to_string(path).with_context(|| {
            format!("error reading plot configuration (path={})", path.display())
        })?;
        debug!("read plot configuration from {}", path.display());

        Self::from_yaml(&yaml)
            .with_context(|| format!("invalid plot configuration (path={})", path.display()))
    }

    fn validate(&self) -> Result<()> {
        if let Some(opacity) = self.band_opacity {
            if !(0.0..=1.0).contains(&opacity) {
                error!("band opacity out of range (band_opacity={opacity})");
                anyhow::bail!("band_opacity must be in [0, 1] (band_opacity={opacity})");
            }
        }

        for (name, value) in [("width", self.width), ("height", self.height)] {
            if value == Some(0) {
                error!("figure {name} must be positive");
                anyhow::bail!("figure {name} must be positive");
            }
        }

        if let Some(font_size) = self.font_size {
            if font_size <= 0 {
                error!("font size must be positive (font_size={font_size})");
                anyhow::bail!("font size must be positive (font_size={font_size})");
            }
        }

        Ok(())
    }
}
