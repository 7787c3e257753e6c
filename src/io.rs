use std::path::{Path, PathBuf};
use std::sync::mpsc;

use image::DynamicImage;

use crate::canvas::{BaseImage, Mask};
use crate::error::{Error, Result};
use crate::ops::composite::check_dimensions;

/// Maximum supported image dimension in pixels (per axis).
/// Prevents memory exhaustion from crafted uploads.
const MAX_IMAGE_DIM: u32 = 16_384;

/// Where an image comes from: an in-memory upload or a file on disk.
#[derive(Clone, Debug)]
pub enum ImageSource {
    Bytes(Vec<u8>),
    Path(PathBuf),
}

impl ImageSource {
    fn read(&self) -> Result<DynamicImage> {
        let img = match self {
            ImageSource::Bytes(bytes) => image::load_from_memory(bytes)?,
            ImageSource::Path(path) => image::open(path)?,
        };
        if img.width() > MAX_IMAGE_DIM || img.height() > MAX_IMAGE_DIM {
            return Err(Error::Decode(format!(
                "image size {}x{} exceeds maximum allowed {}x{}",
                img.width(),
                img.height(),
                MAX_IMAGE_DIM,
                MAX_IMAGE_DIM
            )));
        }
        Ok(img)
    }
}

impl From<Vec<u8>> for ImageSource {
    fn from(bytes: Vec<u8>) -> Self {
        ImageSource::Bytes(bytes)
    }
}

impl From<&Path> for ImageSource {
    fn from(path: &Path) -> Self {
        ImageSource::Path(path.to_path_buf())
    }
}

/// A base photo and its part mask, to be decoded together.
#[derive(Clone, Debug)]
pub struct LoadRequest {
    pub base: ImageSource,
    pub mask: ImageSource,
    /// Resample the base photo to the mask's working resolution when the two
    /// differ. When false, a size difference fails with `DimensionMismatch`.
    pub resample_to_mask: bool,
}

impl LoadRequest {
    pub fn new(base: impl Into<ImageSource>, mask: impl Into<ImageSource>) -> Self {
        Self {
            base: base.into(),
            mask: mask.into(),
            resample_to_mask: true,
        }
    }

    pub fn resample_to_mask(mut self, enabled: bool) -> Self {
        self.resample_to_mask = enabled;
        self
    }
}

/// Fully decoded, dimension-checked inputs, ready for compositing.
#[derive(Clone, Debug)]
pub struct LoadedImage {
    pub base: BaseImage,
    pub mask: Mask,
}

pub fn decode_base(bytes: &[u8]) -> Result<BaseImage> {
    ImageSource::Bytes(bytes.to_vec()).read().map(BaseImage::from_dynamic)
}

pub fn decode_mask(bytes: &[u8]) -> Result<Mask> {
    ImageSource::Bytes(bytes.to_vec())
        .read()
        .map(|img| Mask::from_dynamic(&img))
}

pub fn load_mask_file(path: &Path) -> Result<Mask> {
    ImageSource::Path(path.to_path_buf())
        .read()
        .map(|img| Mask::from_dynamic(&img))
}

// ============================================================================
// SYNCHRONOUS LOADER
// ============================================================================

/// Decode both images on the calling thread.
pub fn load_sync(request: &LoadRequest) -> Result<LoadedImage> {
    let base = request.base.read().map(BaseImage::from_dynamic);
    let mask = request.mask.read().map(|img| Mask::from_dynamic(&img));
    finish(base?, mask?, request.resample_to_mask)
}

fn finish(base: BaseImage, mask: Mask, resample: bool) -> Result<LoadedImage> {
    let base = if resample {
        base.resampled(mask.width(), mask.height())
    } else {
        base
    };
    check_dimensions(&base, &mask)?;
    Ok(LoadedImage { base, mask })
}

// ============================================================================
// BACKGROUND LOADER
// ============================================================================

/// State of a background load as seen by the polling side.
#[derive(Debug)]
pub enum LoadPoll {
    Pending,
    Ready(Result<LoadedImage>),
}

/// Handle to an in-flight decode. Dropping it abandons the load: the worker
/// still finishes, but its result goes nowhere.
#[derive(Debug)]
pub struct PendingLoad {
    receiver: mpsc::Receiver<Result<LoadedImage>>,
}

impl PendingLoad {
    /// Non-blocking check. Returns `Ready` exactly once.
    pub fn poll(&self) -> LoadPoll {
        match self.receiver.try_recv() {
            Ok(result) => LoadPoll::Ready(result),
            Err(mpsc::TryRecvError::Empty) => LoadPoll::Pending,
            Err(mpsc::TryRecvError::Disconnected) => {
                LoadPoll::Ready(Err(Error::Decode("image load worker exited".into())))
            }
        }
    }

    /// Block until the load resolves.
    pub fn wait(self) -> Result<LoadedImage> {
        self.receiver
            .recv()
            .unwrap_or_else(|_| Err(Error::Decode("image load worker exited".into())))
    }
}

/// Decode base and mask on the rayon pool. Both decodes run in parallel and
/// the result is only delivered once both have finished and the dimensions
/// agree, so callers never see a half-loaded pair.
pub fn spawn_load(request: LoadRequest) -> PendingLoad {
    let (sender, receiver) = mpsc::channel();
    rayon::spawn(move || {
        let (base, mask) = rayon::join(
            || request.base.read().map(BaseImage::from_dynamic),
            || request.mask.read().map(|img| Mask::from_dynamic(&img)),
        );
        let result = match (base, mask) {
            (Ok(base), Ok(mask)) => finish(base, mask, request.resample_to_mask),
            (Err(e), _) | (_, Err(e)) => Err(e),
        };
        let _ = sender.send(result);
    });
    PendingLoad { receiver }
}
