use anyhow::{Context, Result};
use std::{env, path::PathBuf};

pub struct Env {}

impl Env {
    pub const DATA_FILE_NAME: &'static str = "proc_time_randomizer.csv";

    pub fn proj_root() -> Result<PathBuf> {
        env::current_dir().context("ppe-plot: failed to get current directory")
    }

    /// Path of the benchmark CSV when none is given on the command line.
    pub fn default_data_file() -> Result<PathBuf> {
        let mut path = Self::proj_root()?;
        path.push(Self::DATA_FILE_NAME);
        Ok(path)
    }

    pub fn default_output_file(file_name: &str) -> Result<PathBuf> {
        let mut path = Self::proj_root()?;
        path.push(file_name);
        Ok(path)
    }
}
