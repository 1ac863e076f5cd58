//! Video profiles
//!
//! A profile describes frame geometry and rate. Profiles are owned by the
//! host; services only hold a weak reference to the one they were created with.

use serde::Deserialize;

/// Frame geometry and rate descriptor
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Profile {
    /// Human readable description
    pub description: String,
    /// Frame rate numerator
    pub frame_rate_num: u32,
    /// Frame rate denominator
    pub frame_rate_den: u32,
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
    /// Whether frames are progressive (not interlaced)
    pub progressive: bool,
    /// Sample aspect numerator
    pub sample_aspect_num: u32,
    /// Sample aspect denominator
    pub sample_aspect_den: u32,
    /// Display aspect numerator
    pub display_aspect_num: u32,
    /// Display aspect denominator
    pub display_aspect_den: u32,
    /// Colorspace (ITU-R recommendation number)
    pub colorspace: u32,
}

impl Default for Profile {
    fn default() -> Self {
        Self::dv_pal()
    }
}

impl Profile {
    /// PAL DV, 720x576 at 25 fps
    pub fn dv_pal() -> Self {
        Self {
            description: "PAL 4:3 DV or DVD".to_string(),
            frame_rate_num: 25,
            frame_rate_den: 1,
            width: 720,
            height: 576,
            progressive: false,
            sample_aspect_num: 16,
            sample_aspect_den: 15,
            display_aspect_num: 4,
            display_aspect_den: 3,
            colorspace: 601,
        }
    }

    /// NTSC DV, 720x480 at 29.97 fps
    pub fn dv_ntsc() -> Self {
        Self {
            description: "NTSC 4:3 DV or DVD".to_string(),
            frame_rate_num: 30000,
            frame_rate_den: 1001,
            width: 720,
            height: 480,
            progressive: false,
            sample_aspect_num: 8,
            sample_aspect_den: 9,
            display_aspect_num: 4,
            display_aspect_den: 3,
            colorspace: 601,
        }
    }

    /// Look up a built-in profile by name
    pub fn named(name: &str) -> Option<Self> {
        match name {
            "dv_pal" => Some(Self::dv_pal()),
            "dv_ntsc" => Some(Self::dv_ntsc()),
            _ => None,
        }
    }

    /// Frames per second
    pub fn fps(&self) -> f64 {
        if self.frame_rate_den == 0 {
            return 0.0;
        }
        self.frame_rate_num as f64 / self.frame_rate_den as f64
    }

    /// Sample aspect ratio
    pub fn sar(&self) -> f64 {
        if self.sample_aspect_den == 0 {
            return 1.0;
        }
        self.sample_aspect_num as f64 / self.sample_aspect_den as f64
    }

    /// Display aspect ratio
    pub fn dar(&self) -> f64 {
        if self.display_aspect_den == 0 {
            return 0.0;
        }
        self.display_aspect_num as f64 / self.display_aspect_den as f64
    }
}
