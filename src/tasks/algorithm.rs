use crate::tasks::color::get_color_from_label;
use anyhow::Result;
use log::error;
use plotters::prelude::RGBColor;
use std::{fmt, str::FromStr};

/// Encoding schemes measured by the benchmark harness. The `Display` form is
/// the key used in the `algo` column of the CSV.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Algorithm {
    Shamir,
    Ssms,
    Aes256,
    Rsa,
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Algorithm::Shamir => write!(f, "shamir"),
            Algorithm::Ssms => write!(f, "ssms"),
            Algorithm::Aes256 => write!(f, "aes256"),
            Algorithm::Rsa => write!(f, "rsa"),
        }
    }
}

impl FromStr for Algorithm {
    type Err = anyhow::Error;

    fn from_str(input: &str) -> Result<Algorithm, Self::Err> {
        match input {
            "shamir" => Ok(Algorithm::Shamir),
            "ssms" => Ok(Algorithm::Ssms),
            "aes256" => Ok(Algorithm::Aes256),
            "rsa" => Ok(Algorithm::Rsa),
            _ => {
                error!("unrecognized algorithm (algo={input})");
                anyhow::bail!("unrecognized algorithm (algo={input})");
            }
        }
    }
}

impl Algorithm {
    pub fn iter_variants() -> std::slice::Iter<'static, Algorithm> {
        static VARIANTS: [Algorithm; 4] = [
            Algorithm::Rsa,
            Algorithm::Shamir,
            Algorithm::Ssms,
            Algorithm::Aes256,
        ];
        VARIANTS.iter()
    }

    /// Label shown in chart legends.
    pub fn label(&self) -> &'static str {
        match self {
            Algorithm::Shamir => "Shamir",
            Algorithm::Ssms => "SSMS",
            Algorithm::Aes256 => "AES",
            Algorithm::Rsa => "RSA",
        }
    }

    pub fn get_color(&self) -> Result<RGBColor> {
        match self {
            Algorithm::Rsa => get_color_from_label("tab-blue"),
            Algorithm::Shamir => get_color_from_label("tab-orange"),
            Algorithm::Ssms => get_color_from_label("tab-green"),
            Algorithm::Aes256 => get_color_from_label("tab-red"),
        }
    }
}
