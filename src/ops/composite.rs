use rayon::prelude::*;

use crate::canvas::{BaseImage, CompositeFrame, Mask};
use crate::edit_state::EditState;
use crate::error::{Error, Result};
use crate::parts::PartId;

// ============================================================================
// TINT TABLE — per-part blend parameters indexed by mask value
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq)]
struct Tint {
    color: [f32; 3],
    opacity: f32,
}

/// Dense lookup from mask byte to blend parameters, built once per pass.
///
/// A slot is empty when the part has no color or a non-positive opacity;
/// those pixels are copied through untouched.
#[derive(Clone, Debug)]
pub struct TintTable {
    slots: [Option<Tint>; 256],
}

impl TintTable {
    pub fn from_state(state: &EditState) -> Self {
        let mut slots = [None; 256];
        for (&part, rgb) in state.color_map() {
            let Some(index) = part.index() else { continue };
            let opacity = state.opacity(part);
            if opacity <= 0.0 {
                continue;
            }
            slots[index] = Some(Tint {
                color: [rgb.0[0] as f32, rgb.0[1] as f32, rgb.0[2] as f32],
                opacity: opacity.min(1.0),
            });
        }
        Self { slots }
    }

    /// True when no pixel can change, whatever the mask contains.
    pub fn is_identity(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }

    pub fn tints(&self, part: PartId) -> bool {
        part.index().is_some_and(|i| self.slots[i].is_some())
    }

    #[inline]
    fn blend(&self, part: u8, px: &mut [u8]) {
        let Some(tint) = self.slots[part as usize] else { return };
        let keep = 1.0 - tint.opacity;
        for c in 0..3 {
            let v = px[c] as f32 * keep + tint.color[c] * tint.opacity;
            px[c] = v.round().clamp(0.0, 255.0) as u8;
        }
        // alpha (px[3]) passes through
    }
}

// ============================================================================
// COMPOSITE
// ============================================================================

/// Tint every pixel of `base` according to the part id under it in `mask`.
///
/// Straight per-channel blend `base * (1 - a) + color * a`, rounded, alpha
/// untouched. Pixels whose part has no color or zero opacity are copied
/// bit-for-bit. Pure: identical inputs always give identical output.
pub fn composite(base: &BaseImage, mask: &Mask, state: &EditState) -> Result<CompositeFrame> {
    let mut frame = CompositeFrame::new(0, 0);
    composite_into(base, mask, state, &mut frame)?;
    Ok(frame)
}

/// Same as [`composite`], but writes into `out`, reusing its allocation when
/// the size already matches. On error `out` is left as it was.
pub fn composite_into(
    base: &BaseImage,
    mask: &Mask,
    state: &EditState,
    out: &mut CompositeFrame,
) -> Result<()> {
    check_dimensions(base, mask)?;
    let (width, height) = base.dimensions();

    if out.dimensions() != (width, height) {
        *out = CompositeFrame::new(width, height);
    }
    let dst: &mut [u8] = out;
    dst.copy_from_slice(base.image().as_raw());

    let table = TintTable::from_state(state);
    if table.is_identity() || width == 0 || height == 0 {
        return Ok(());
    }

    let row_bytes = width as usize * 4;
    dst.par_chunks_mut(row_bytes)
        .zip(mask.as_raw().par_chunks(width as usize))
        .for_each(|(row, parts)| {
            for (px, &part) in row.chunks_exact_mut(4).zip(parts) {
                table.blend(part, px);
            }
        });
    Ok(())
}

pub fn check_dimensions(base: &BaseImage, mask: &Mask) -> Result<()> {
    if base.dimensions() != mask.dimensions() {
        return Err(Error::DimensionMismatch {
            base: base.dimensions(),
            mask: mask.dimensions(),
        });
    }
    Ok(())
}
