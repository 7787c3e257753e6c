//! Segmentation service boundary.
//!
//! Producing masks is somebody else's job; the core only needs a session id
//! and a decoded [`Mask`] for an uploaded photo. [`MaskDirSegmenter`] serves
//! masks that were computed ahead of time and cached on disk under the
//! content hash of the upload.

use std::path::{Path, PathBuf};

use xxhash_rust::xxh3::xxh3_128;

use crate::canvas::Mask;
use crate::error::{Error, Result};
use crate::io::load_mask_file;

/// What the segmentation service hands back for one upload.
#[derive(Clone, Debug)]
pub struct Segmentation {
    pub session_id: String,
    pub mask: Mask,
}

pub trait Segmenter {
    fn segment(&self, image_bytes: &[u8]) -> Result<Segmentation>;
}

/// Stable session id for an upload: 32 lowercase hex digits of its xxh3-128
/// hash. Uploading the same bytes twice yields the same session.
pub fn content_session_id(image_bytes: &[u8]) -> String {
    format!("{:032x}", xxh3_128(image_bytes))
}

/// File name of a cached mask for the given session.
pub fn mask_file_name(session_id: &str) -> String {
    format!("{}_mask.png", session_id)
}

/// Looks up `{dir}/{session_id}_mask.png` for each upload.
#[derive(Clone, Debug)]
pub struct MaskDirSegmenter {
    dir: PathBuf,
}

impl MaskDirSegmenter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn mask_path(&self, session_id: &str) -> PathBuf {
        self.dir.join(mask_file_name(session_id))
    }
}

impl Segmenter for MaskDirSegmenter {
    fn segment(&self, image_bytes: &[u8]) -> Result<Segmentation> {
        let session_id = content_session_id(image_bytes);
        let path = self.mask_path(&session_id);
        if !path.is_file() {
            crate::log_warn!("No cached mask at {}", path.display());
            return Err(Error::MaskNotFound(session_id));
        }
        let mask = load_mask_file(&path)?;
        crate::log_info!(
            "Mask {} ({}x{}) for session {}",
            path.display(),
            mask.width(),
            mask.height(),
            session_id
        );
        Ok(Segmentation { session_id, mask })
    }
}
