//! FaceTint: recolor segmented face regions of a photo.
//!
//! A photo comes with a grayscale part mask (one part id per pixel). Edits
//! assign a color and an opacity to parts; every edit is an immutable
//! [`EditState`] snapshot on a linear [`HistoryStack`], and the preview is
//! recomposited from base, mask and the current snapshot.

pub mod logger;

pub mod canvas;
pub mod cli;
pub mod components;
pub mod edit_state;
pub mod error;
pub mod io;
pub mod ops;
pub mod parts;
pub mod segment;
pub mod session;
pub mod settings;
pub mod store;

pub use canvas::{BaseImage, CompositeFrame, Mask};
pub use components::history::{HistoryEntry, HistoryStack};
pub use edit_state::{ColorMap, EditState, OpacityMap, Rgb};
pub use error::{Error, Result, StoreError};
pub use io::{ImageSource, LoadRequest, LoadedImage};
pub use ops::composite::{composite, composite_into};
pub use parts::{PartGroup, PartId, label_to_id, id_to_label};
pub use segment::{MaskDirSegmenter, Segmentation, Segmenter, content_session_id};
pub use session::{Direction, EditSession, Notice, SaveOutcome, Transition};
pub use settings::Settings;
pub use store::{JsonFileStore, MemoryStore, SessionStore};
