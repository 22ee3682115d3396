//! Coarse human color names for RGB triples
//!
//! Banding on raw channel comparisons with fixed thresholds. This is not a
//! perceptual color-space conversion and is expected to misname edge cases.

use serde::Serialize;
use std::fmt;

use crate::models::Rgb;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorName {
    Black,
    White,
    Gray,
    Red,
    Orange,
    Yellow,
    Brown,
    Green,
    Blue,
    Purple,
    Pink,
    Unknown,
}

impl ColorName {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColorName::Black => "black",
            ColorName::White => "white",
            ColorName::Gray => "gray",
            ColorName::Red => "red",
            ColorName::Orange => "orange",
            ColorName::Yellow => "yellow",
            ColorName::Brown => "brown",
            ColorName::Green => "green",
            ColorName::Blue => "blue",
            ColorName::Purple => "purple",
            ColorName::Pink => "pink",
            ColorName::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ColorName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const DARK_CEILING: i32 = 60;
const LIGHT_FLOOR: i32 = 200;
const ACHROMATIC_SPREAD: i32 = 30;

/// Name the color of an RGB triple
pub fn name_for(rgb: Rgb) -> ColorName {
    let (r, g, b) = (i32::from(rgb.r), i32::from(rgb.g), i32::from(rgb.b));
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);

    if max < DARK_CEILING {
        return ColorName::Black;
    }
    if min > LIGHT_FLOOR {
        return ColorName::White;
    }
    if max - min < ACHROMATIC_SPREAD {
        return ColorName::Gray;
    }

    if r >= g && r >= b {
        // blue close behind red, green trailing: magenta family
        if b * 4 > r * 3 && g < b {
            return if r > LIGHT_FLOOR {
                ColorName::Pink
            } else {
                ColorName::Purple
            };
        }
        if g > 160 && b < 120 && r - g < 60 {
            return ColorName::Yellow;
        }
        if g > 100 && b < 80 {
            return ColorName::Orange;
        }
        if r < 150 {
            return ColorName::Brown;
        }
        return ColorName::Red;
    }

    if g >= b {
        return ColorName::Green;
    }

    if r > 120 && r > g + 40 {
        ColorName::Purple
    } else {
        ColorName::Blue
    }
}
