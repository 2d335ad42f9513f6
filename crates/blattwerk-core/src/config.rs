// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Personalisation settings.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::error::{BlattwerkError, Result};

/// Short side of DIN A4 in centimetres.
pub const A4_SHORT_SIDE_CM: f32 = 21.0;

/// PDF points per centimetre (72 pt per inch, 2.54 cm per inch).
pub const POINTS_PER_CM: f32 = 72.0 / 2.54;

/// How physical centimetres are converted into page units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PhotoScale {
    /// Treat the page's short side as the short side of A4 (21 cm).
    #[default]
    PageRelative,
    /// Fixed conversion: 72/2.54 pt per cm for PDFs, `image_dpi` for images.
    Physical,
}

/// Where the name is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NamePosition {
    /// Left of the photo, label prefix included.
    #[default]
    BesidePhoto,
    /// Centred across the page at the name margin.
    Center,
    /// At the left page margin.
    Left,
    /// Right-aligned with the photo, below it.
    Right,
}

impl NamePosition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BesidePhoto => "beside_photo",
            Self::Center => "center",
            Self::Left => "left",
            Self::Right => "right",
        }
    }
}

/// Accepted range for an explicit name font size, in points.
pub const FONT_SIZE_RANGE_PT: std::ops::RangeInclusive<f32> = 6.0..=48.0;

/// Settings for one personalisation run.
///
/// Every field has a default, so a partial settings document always
/// deserialises into a usable record. Call [`Configuration::validate`] before
/// handing it to the personalizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Configuration {
    /// Length of the photo's long side in centimetres.
    pub photo_size_cm: f32,
    /// Photo top edge inset, as a percentage of page height.
    pub photo_top_margin_percent: f32,
    /// Photo right edge inset, as a percentage of page width.
    pub photo_right_margin_percent: f32,
    /// Name text top edge, as a percentage of page height.
    pub name_top_margin_percent: f32,
    /// Whether the student's name is written next to the photo.
    pub add_name: bool,
    /// Label written in front of the name (may be empty). Only used beside
    /// the photo.
    pub name_prefix: String,
    pub name_position: NamePosition,
    /// Name font size in points. `None` sizes the name from the page height.
    pub font_size: Option<f32>,
    /// Display typeface. Missing or broken fonts fall back to Helvetica Bold.
    pub font_path: Option<PathBuf>,
    pub photo_scale: PhotoScale,
    /// Resolution assumed for raster worksheets under [`PhotoScale::Physical`].
    pub image_dpi: f32,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            photo_size_cm: 2.5,
            photo_top_margin_percent: 1.5,
            photo_right_margin_percent: 3.5,
            name_top_margin_percent: 4.0,
            add_name: true,
            name_prefix: "Name: ".to_string(),
            name_position: NamePosition::BesidePhoto,
            font_size: None,
            font_path: Some(PathBuf::from("fonts/Norddruck.ttf")),
            photo_scale: PhotoScale::PageRelative,
            image_dpi: 300.0,
        }
    }
}

impl Configuration {
    /// Check every invariant; the first violation is reported.
    pub fn validate(&self) -> Result<()> {
        if !self.photo_size_cm.is_finite() || self.photo_size_cm <= 0.0 {
            return Err(BlattwerkError::InvalidConfig(format!(
                "photo_size_cm must be greater than 0, got {}",
                self.photo_size_cm
            )));
        }

        let margins = [
            ("photo_top_margin_percent", self.photo_top_margin_percent),
            ("photo_right_margin_percent", self.photo_right_margin_percent),
            ("name_top_margin_percent", self.name_top_margin_percent),
        ];
        for (field, value) in margins {
            if !value.is_finite() || !(0.0..=100.0).contains(&value) {
                return Err(BlattwerkError::InvalidConfig(format!(
                    "{field} must be between 0 and 100, got {value}"
                )));
            }
        }

        if let Some(size) = self.font_size
            && !FONT_SIZE_RANGE_PT.contains(&size)
        {
            return Err(BlattwerkError::InvalidConfig(format!(
                "font_size must be between {} and {} pt, got {}",
                FONT_SIZE_RANGE_PT.start(),
                FONT_SIZE_RANGE_PT.end(),
                size
            )));
        }

        if !self.image_dpi.is_finite() || self.image_dpi <= 0.0 {
            return Err(BlattwerkError::InvalidConfig(format!(
                "image_dpi must be greater than 0, got {}",
                self.image_dpi
            )));
        }

        Ok(())
    }

    /// Parse and validate a JSON settings document.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON settings file.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_json_str(&text)?;
        info!("Settings loaded");
        debug!(?config, "Effective settings");
        Ok(config)
    }

    /// Text drawn for a student. The label prefix only goes with the
    /// beside-photo position.
    pub fn name_text(&self, student_name: &str) -> String {
        match self.name_position {
            NamePosition::BesidePhoto => format!("{}{}", self.name_prefix, student_name),
            _ => student_name.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_valid() {
        let config = Configuration::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.photo_size_cm, 2.5);
        assert_eq!(config.photo_right_margin_percent, 3.5);
        assert!(config.add_name);
    }

    #[test]
    fn partial_json_uses_defaults() {
        let config = Configuration::from_json_str(r#"{ "photo_size_cm": 3.0 }"#).expect("parse");
        assert_eq!(config.photo_size_cm, 3.0);
        assert_eq!(config.photo_top_margin_percent, 1.5);
        assert_eq!(config.photo_scale, PhotoScale::PageRelative);
    }

    #[test]
    fn photo_scale_uses_kebab_case() {
        let config =
            Configuration::from_json_str(r#"{ "photo_scale": "physical" }"#).expect("parse");
        assert_eq!(config.photo_scale, PhotoScale::Physical);
    }

    #[test]
    fn zero_photo_size_is_rejected() {
        let config = Configuration {
            photo_size_cm: 0.0,
            ..Configuration::default()
        };
        let err = config.validate().unwrap_err();
        assert!(matches!(err, BlattwerkError::InvalidConfig(_)));
    }

    #[test]
    fn nan_photo_size_is_rejected() {
        let config = Configuration {
            photo_size_cm: f32::NAN,
            ..Configuration::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn margin_bounds_are_inclusive() {
        let config = Configuration {
            photo_top_margin_percent: 0.0,
            photo_right_margin_percent: 100.0,
            ..Configuration::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn out_of_range_margins_are_rejected() {
        for bad in [-0.1, 100.5, f32::INFINITY] {
            let config = Configuration {
                name_top_margin_percent: bad,
                ..Configuration::default()
            };
            let err = config.validate().unwrap_err();
            assert!(
                err.to_string().contains("name_top_margin_percent"),
                "unexpected message: {err}"
            );
        }
    }

    #[test]
    fn invalid_json_values_fail_validation() {
        let result = Configuration::from_json_str(r#"{ "photo_right_margin_percent": 250 }"#);
        assert!(matches!(result, Err(BlattwerkError::InvalidConfig(_))));
    }

    #[test]
    fn name_position_uses_snake_case() {
        let config = Configuration::from_json_str(
            r#"{ "name_position": "beside_photo", "font_size": 14 }"#,
        )
        .expect("parse");
        assert_eq!(config.name_position, NamePosition::BesidePhoto);
        assert_eq!(config.font_size, Some(14.0));

        let config =
            Configuration::from_json_str(r#"{ "name_position": "center" }"#).expect("parse");
        assert_eq!(config.name_position, NamePosition::Center);
        assert_eq!(config.font_size, None);
    }

    #[test]
    fn prefix_only_beside_photo() {
        let mut config = Configuration::default();
        assert_eq!(config.name_text("anna schmidt"), "Name: anna schmidt");
        for position in [NamePosition::Center, NamePosition::Left, NamePosition::Right] {
            config.name_position = position;
            assert_eq!(config.name_text("anna schmidt"), "anna schmidt");
        }
    }

    #[test]
    fn font_size_outside_range_is_rejected() {
        for bad in [5.5, 48.5, f32::NAN] {
            let config = Configuration {
                font_size: Some(bad),
                ..Configuration::default()
            };
            let err = config.validate().unwrap_err();
            assert!(err.to_string().contains("font_size"), "unexpected message: {err}");
        }
        let config = Configuration {
            font_size: Some(6.0),
            ..Configuration::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn load_reads_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(file, r#"{{ "add_name": false, "name_prefix": "" }}"#).expect("write");
        let config = Configuration::load(file.path()).expect("load");
        assert!(!config.add_name);
        assert_eq!(config.name_text("bob smith"), "bob smith");
    }

    #[test]
    fn load_reports_malformed_json() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(file, "{{ not json").expect("write");
        let result = Configuration::load(file.path());
        assert!(matches!(result, Err(BlattwerkError::Serialization(_))));
    }
}
