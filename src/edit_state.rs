//! Immutable per-part color/opacity assignments.
//!
//! An [`EditState`] is a snapshot: every mutation returns a new state and
//! leaves the receiver untouched, which is what lets the history keep plain
//! values instead of diffs.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::parts::PartId;

/// 8-bit RGB triple. Serializes as `[r, g, b]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb(pub [u8; 3]);

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Rgb([r, g, b])
    }

    pub fn r(&self) -> u8 {
        self.0[0]
    }

    pub fn g(&self) -> u8 {
        self.0[1]
    }

    pub fn b(&self) -> u8 {
        self.0[2]
    }

    /// Parse `"r,g,b"` or `"#rrggbb"`.
    pub fn parse(s: &str) -> Option<Rgb> {
        let s = s.trim();
        if let Some(hex) = s.strip_prefix('#') {
            if hex.len() != 6 {
                return None;
            }
            let channel = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
            return Some(Rgb([channel(0)?, channel(2)?, channel(4)?]));
        }
        let parts: Vec<&str> = s.split(',').collect();
        if parts.len() != 3 {
            return None;
        }
        let r = parts[0].trim().parse::<u8>().ok()?;
        let g = parts[1].trim().parse::<u8>().ok()?;
        let b = parts[2].trim().parse::<u8>().ok()?;
        Some(Rgb([r, g, b]))
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.0[0], self.0[1], self.0[2])
    }
}

pub type ColorMap = BTreeMap<PartId, Rgb>;
pub type OpacityMap = BTreeMap<PartId, f32>;

/// Opacity must be a finite value in [0, 1].
pub fn check_opacity(part: PartId, value: f32) -> Result<f32> {
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(Error::InvalidOpacity { part, value })
    }
}

// ============================================================================
// EDIT STATE
// ============================================================================

#[derive(Clone, Debug, Default, PartialEq)]
pub struct EditState {
    colors: ColorMap,
    opacities: OpacityMap,
}

impl EditState {
    /// Build a state from raw maps. Fails with `InvalidOpacity` on the first
    /// opacity outside [0, 1].
    pub fn new(colors: ColorMap, opacities: OpacityMap) -> Result<Self> {
        for (&part, &value) in &opacities {
            check_opacity(part, value)?;
        }
        Ok(Self { colors, opacities })
    }

    /// The fixed default tint table applied on upload and on reset.
    ///
    /// Every labelled part gets a natural tint at opacity 0, so the preview
    /// matches the photo until the user raises an opacity.
    pub fn defaults() -> Self {
        let colors: ColorMap = DEFAULT_TINTS.iter().copied().collect();
        let opacities: OpacityMap = DEFAULT_TINTS.iter().map(|&(id, _)| (id, 0.0)).collect();
        Self { colors, opacities }
    }

    pub fn with_color(&self, part: PartId, color: Rgb) -> EditState {
        let mut colors = self.colors.clone();
        colors.insert(part, color);
        EditState {
            colors,
            opacities: self.opacities.clone(),
        }
    }

    pub fn without_color(&self, part: PartId) -> EditState {
        let mut colors = self.colors.clone();
        colors.remove(&part);
        EditState {
            colors,
            opacities: self.opacities.clone(),
        }
    }

    /// Rejects out-of-range values rather than clamping; `self` is never
    /// modified either way.
    pub fn with_opacity(&self, part: PartId, value: f32) -> Result<EditState> {
        let value = check_opacity(part, value)?;
        let mut opacities = self.opacities.clone();
        opacities.insert(part, value);
        Ok(EditState {
            colors: self.colors.clone(),
            opacities,
        })
    }

    pub fn color(&self, part: PartId) -> Option<Rgb> {
        self.colors.get(&part).copied()
    }

    /// Missing entries read as 0 (no effect).
    pub fn opacity(&self, part: PartId) -> f32 {
        self.opacities.get(&part).copied().unwrap_or(0.0)
    }

    pub fn color_map(&self) -> &ColorMap {
        &self.colors
    }

    pub fn opacity_map(&self) -> &OpacityMap {
        &self.opacities
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty() && self.opacities.is_empty()
    }
}

const DEFAULT_TINTS: &[(PartId, Rgb)] = &[
    (PartId::SKIN, Rgb::new(232, 190, 172)),
    (PartId::LEFT_EYEBROW, Rgb::new(90, 62, 44)),
    (PartId::RIGHT_EYEBROW, Rgb::new(90, 62, 44)),
    (PartId::LEFT_EYE, Rgb::new(70, 110, 160)),
    (PartId::RIGHT_EYE, Rgb::new(70, 110, 160)),
    (PartId::LEFT_EAR, Rgb::new(225, 180, 160)),
    (PartId::RIGHT_EAR, Rgb::new(225, 180, 160)),
    (PartId::NOSE, Rgb::new(228, 184, 165)),
    (PartId::UPPER_LIP, Rgb::new(200, 80, 90)),
    (PartId::LOWER_LIP, Rgb::new(200, 80, 90)),
    (PartId::NECK, Rgb::new(222, 180, 160)),
    (PartId::HAIR, Rgb::new(60, 40, 30)),
];
