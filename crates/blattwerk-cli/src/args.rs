// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Command-line arguments and how they turn into a Configuration.

use std::path::PathBuf;

use blattwerk_core::error::Result;
use blattwerk_core::{ClassGroup, Configuration, NamePosition, PhotoScale};
use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Debug, Parser)]
#[command(name = "blattwerk", version)]
#[command(about = "Personalise worksheets with each student's photo and name")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[command(flatten)]
    pub settings: SettingsArgs,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Personalise one worksheet for every student in a folder
    Personalize {
        /// Worksheet (PDF, PNG or JPEG)
        worksheet: PathBuf,
        /// Folder with one photo per student
        #[arg(short, long)]
        students: PathBuf,
        /// Folder for the personalised copies (created if missing)
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Process the Input-/Schüler-/Ausgabe- folders of each class group
    Batch {
        /// Folder containing the group folders
        base_dir: PathBuf,
        /// Groups to process
        #[arg(long, value_delimiter = ',', value_parser = parse_group, default_value = "A,B,C")]
        groups: Vec<ClassGroup>,
    },
    /// Render the worksheet for the first student only
    Preview {
        worksheet: PathBuf,
        #[arg(short, long)]
        students: PathBuf,
        /// Where to keep the preview (default: preview_<file> in the current folder)
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ScaleArg {
    PageRelative,
    Physical,
}

impl From<ScaleArg> for PhotoScale {
    fn from(arg: ScaleArg) -> Self {
        match arg {
            ScaleArg::PageRelative => PhotoScale::PageRelative,
            ScaleArg::Physical => PhotoScale::Physical,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PositionArg {
    BesidePhoto,
    Center,
    Left,
    Right,
}

impl From<PositionArg> for NamePosition {
    fn from(arg: PositionArg) -> Self {
        match arg {
            PositionArg::BesidePhoto => NamePosition::BesidePhoto,
            PositionArg::Center => NamePosition::Center,
            PositionArg::Left => NamePosition::Left,
            PositionArg::Right => NamePosition::Right,
        }
    }
}

/// Settings file plus per-field overrides.
#[derive(Debug, Default, Args)]
pub struct SettingsArgs {
    /// JSON settings file; missing fields take their defaults
    #[arg(long, global = true)]
    pub settings: Option<PathBuf>,

    /// Length of the photo's long side in centimetres
    #[arg(long, global = true)]
    pub photo_size_cm: Option<f32>,

    /// Photo top margin, percent of page height
    #[arg(long, global = true)]
    pub photo_top: Option<f32>,

    /// Photo right margin, percent of page width
    #[arg(long, global = true)]
    pub photo_right: Option<f32>,

    /// Name top margin, percent of page height
    #[arg(long, global = true)]
    pub name_top: Option<f32>,

    /// Do not print the student's name
    #[arg(long, global = true)]
    pub no_name: bool,

    /// Label printed before the name
    #[arg(long, global = true)]
    pub name_prefix: Option<String>,

    /// Where the name goes
    #[arg(long, global = true, value_enum)]
    pub name_position: Option<PositionArg>,

    /// Name font size in points (default: sized from the page height)
    #[arg(long, global = true)]
    pub font_size: Option<f32>,

    /// TrueType font for the name
    #[arg(long, global = true)]
    pub font: Option<PathBuf>,

    #[arg(long, global = true, value_enum)]
    pub photo_scale: Option<ScaleArg>,

    /// Resolution assumed for image worksheets with --photo-scale physical
    #[arg(long, global = true)]
    pub image_dpi: Option<f32>,
}

impl SettingsArgs {
    /// Load the settings file (if any), apply the overrides and validate.
    pub fn resolve(&self) -> Result<Configuration> {
        let mut config = match &self.settings {
            Some(path) => Configuration::load(path)?,
            None => Configuration::default(),
        };

        if let Some(size) = self.photo_size_cm {
            config.photo_size_cm = size;
        }
        if let Some(top) = self.photo_top {
            config.photo_top_margin_percent = top;
        }
        if let Some(right) = self.photo_right {
            config.photo_right_margin_percent = right;
        }
        if let Some(top) = self.name_top {
            config.name_top_margin_percent = top;
        }
        if self.no_name {
            config.add_name = false;
        }
        if let Some(prefix) = &self.name_prefix {
            config.name_prefix = prefix.clone();
        }
        if let Some(position) = self.name_position {
            config.name_position = position.into();
        }
        if let Some(size) = self.font_size {
            config.font_size = Some(size);
        }
        if let Some(font) = &self.font {
            config.font_path = Some(font.clone());
        }
        if let Some(scale) = self.photo_scale {
            config.photo_scale = scale.into();
        }
        if let Some(dpi) = self.image_dpi {
            config.image_dpi = dpi;
        }

        config.validate()?;
        Ok(config)
    }
}

fn parse_group(value: &str) -> std::result::Result<ClassGroup, String> {
    let mut chars = value.trim().chars();
    match (chars.next(), chars.next()) {
        (Some(letter), None) => ClassGroup::from_letter(letter),
        _ => None,
    }
    .ok_or_else(|| format!("unknown group '{value}', expected A, B or C"))
}
