use uuid::Uuid;

use crate::canvas::{BaseImage, CompositeFrame, Mask};
use crate::components::history::HistoryStack;
use crate::edit_state::{EditState, Rgb};
use crate::error::{Error, Result};
use crate::io::{LoadPoll, LoadRequest, LoadedImage, PendingLoad, spawn_load};
use crate::logger::{self, Level};
use crate::ops::composite::{check_dimensions, composite, composite_into};
use crate::parts::{self, PartId};
use crate::store::SessionStore;

// ============================================================================
// OUTCOMES & NOTICES
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Undo,
    Redo,
}

/// Result of an undo/redo request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transition {
    /// The cursor moved and the frame was recomposited.
    Updated,
    /// Nothing to undo/redo; nothing changed.
    Exhausted(Direction),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved,
    /// Both maps were empty, so nothing was written.
    NothingToSave,
}

/// A user-facing message (the editor's log panel).
#[derive(Clone, Debug, PartialEq)]
pub struct Notice {
    pub level: Level,
    pub message: String,
    pub timestamp: String,
}

// ============================================================================
// EDIT SESSION
// ============================================================================

/// Everything that exists only while an image is loaded.
struct Workspace {
    session_id: String,
    base: BaseImage,
    mask: Mask,
    history: HistoryStack,
    /// Snapshot at the history cursor.
    state: EditState,
    frame: CompositeFrame,
}

impl Workspace {
    fn recomposite(&mut self) -> Result<()> {
        composite_into(&self.base, &self.mask, &self.state, &mut self.frame)
    }

    fn commit(&mut self, state: EditState, description: String) -> Result<()> {
        crate::log_info!("[{}] {}", self.session_id, description);
        self.history.push(state.clone(), description);
        self.state = state;
        self.recomposite()
    }
}

enum Phase {
    Empty,
    Ready(Box<Workspace>),
}

struct PendingUpload {
    session_id: String,
    load: PendingLoad,
}

/// One edit context: an uploaded photo, its mask, the edit history and the
/// current preview. Starts `Empty`; loading an image makes it `Ready`.
///
/// Every edit pushes a new snapshot and recomposites the preview, so
/// `frame()` always reflects `state()`.
pub struct EditSession {
    id: Uuid,
    phase: Phase,
    pending: Option<PendingUpload>,
    history_limit: Option<usize>,
    notices: Vec<Notice>,
}

impl Default for EditSession {
    fn default() -> Self {
        Self::new()
    }
}

impl EditSession {
    /// Session with unbounded history.
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            phase: Phase::Empty,
            pending: None,
            history_limit: None,
            notices: Vec::new(),
        }
    }

    /// Session whose history keeps at most `limit` snapshots.
    pub fn with_history_limit(limit: Option<usize>) -> Self {
        Self {
            history_limit: limit,
            ..Self::new()
        }
    }

    /// Process-local identifier of this edit context (not the upload's session id).
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.phase, Phase::Ready(_))
    }

    fn workspace(&self) -> Result<&Workspace> {
        match &self.phase {
            Phase::Ready(ws) => Ok(ws.as_ref()),
            Phase::Empty => Err(Error::NoActiveSession),
        }
    }

    fn workspace_mut(&mut self) -> Result<&mut Workspace> {
        match &mut self.phase {
            Phase::Ready(ws) => Ok(ws.as_mut()),
            Phase::Empty => Err(Error::NoActiveSession),
        }
    }

    // ------------------------------------------------------------------------
    // Loading
    // ------------------------------------------------------------------------

    /// Start editing a new image. Any previous image and its history are
    /// discarded; the history is seeded with the default tint table.
    ///
    /// Fails with `DimensionMismatch` (leaving the session as it was) when
    /// base and mask sizes differ.
    pub fn load_image(&mut self, session_id: impl Into<String>, base: BaseImage, mask: Mask) -> Result<()> {
        check_dimensions(&base, &mask)?;
        let session_id = session_id.into();
        let defaults = EditState::defaults();
        let frame = composite(&base, &mask, &defaults)?;

        let mut history = match self.history_limit {
            Some(limit) => HistoryStack::with_capacity_limit(limit),
            None => HistoryStack::new(),
        };
        history.push(defaults.clone(), "Load image");

        let (w, h) = base.dimensions();
        self.phase = Phase::Ready(Box::new(Workspace {
            session_id: session_id.clone(),
            base,
            mask,
            history,
            state: defaults,
            frame,
        }));
        self.notify(Level::Info, format!("Session ID: {}", session_id));
        self.notify(Level::Info, format!("Loaded image for editing ({}x{})", w, h));
        Ok(())
    }

    pub fn load_decoded(&mut self, session_id: impl Into<String>, loaded: LoadedImage) -> Result<()> {
        self.load_image(session_id, loaded.base, loaded.mask)
    }

    /// Decode a new upload in the background. A load already in flight is
    /// abandoned; the current image stays editable until `poll_upload`
    /// installs the new one.
    pub fn begin_upload(&mut self, session_id: impl Into<String>, request: LoadRequest) {
        if let Some(old) = self.pending.take() {
            crate::log_info!("Upload for {} superseded", old.session_id);
        }
        self.pending = Some(PendingUpload {
            session_id: session_id.into(),
            load: spawn_load(request),
        });
    }

    pub fn has_pending_upload(&self) -> bool {
        self.pending.is_some()
    }

    /// Install the pending upload if it has finished. Returns `Ok(true)` when
    /// a new image was just loaded, `Ok(false)` when nothing is ready yet.
    pub fn poll_upload(&mut self) -> Result<bool> {
        let Some(pending) = &self.pending else { return Ok(false) };
        match pending.load.poll() {
            LoadPoll::Pending => Ok(false),
            LoadPoll::Ready(result) => {
                let Some(pending) = self.pending.take() else { return Ok(false) };
                self.install_upload(pending.session_id, result).map(|_| true)
            }
        }
    }

    /// Block until the pending upload resolves and install it.
    pub fn wait_upload(&mut self) -> Result<()> {
        let Some(pending) = self.pending.take() else { return Ok(()) };
        let result = pending.load.wait();
        self.install_upload(pending.session_id, result)
    }

    fn install_upload(&mut self, session_id: String, result: Result<LoadedImage>) -> Result<()> {
        match result.and_then(|loaded| self.load_decoded(session_id, loaded)) {
            Ok(()) => Ok(()),
            Err(e) => {
                self.notify(Level::Error, format!("Image upload failed: {}", e));
                Err(e)
            }
        }
    }

    /// Drop the image and its history.
    pub fn close(&mut self) {
        self.phase = Phase::Empty;
        self.pending = None;
    }

    // ------------------------------------------------------------------------
    // Edits
    // ------------------------------------------------------------------------

    pub fn apply_color(&mut self, part: PartId, color: Rgb) -> Result<()> {
        let ws = self.workspace_mut()?;
        let next = ws.state.with_color(part, color);
        ws.commit(next, format!("Color {} {}", parts::display_name(part), color))
    }

    /// Remove a part's color so its pixels pass through untouched.
    pub fn clear_color(&mut self, part: PartId) -> Result<()> {
        let ws = self.workspace_mut()?;
        let next = ws.state.without_color(part);
        ws.commit(next, format!("Clear {}", parts::display_name(part)))
    }

    /// Rejects opacities outside [0, 1] with `InvalidOpacity`; history and
    /// preview are untouched in that case.
    pub fn apply_opacity(&mut self, part: PartId, value: f32) -> Result<()> {
        let ws = self.workspace_mut()?;
        let next = ws.state.with_opacity(part, value)?;
        ws.commit(next, format!("Opacity {} {:.2}", parts::display_name(part), value))
    }

    /// Back to the default tint table, as a regular (undoable) edit.
    pub fn reset(&mut self) -> Result<()> {
        self.workspace_mut()?
            .commit(EditState::defaults(), "Reset".to_string())?;
        self.notify(Level::Info, "[Reset] Edits reset");
        Ok(())
    }

    pub fn undo(&mut self) -> Result<Transition> {
        self.step(Direction::Undo)
    }

    pub fn redo(&mut self) -> Result<Transition> {
        self.step(Direction::Redo)
    }

    fn step(&mut self, direction: Direction) -> Result<Transition> {
        let ws = self.workspace_mut()?;
        let next = match direction {
            Direction::Undo => ws.history.undo().cloned(),
            Direction::Redo => ws.history.redo().cloned(),
        };
        let Some(next) = next else {
            let msg = match direction {
                Direction::Undo => "[Undo] Nothing to undo",
                Direction::Redo => "[Redo] Nothing to redo",
            };
            self.notify(Level::Warn, msg);
            return Ok(Transition::Exhausted(direction));
        };
        ws.state = next;
        ws.recomposite()?;
        let msg = match direction {
            Direction::Undo => "Undo",
            Direction::Redo => "Redo",
        };
        self.notify(Level::Info, msg);
        Ok(Transition::Updated)
    }

    // ------------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------------

    /// Persist the current maps under the session id. Refuses (without
    /// error) when there is nothing to save.
    pub fn save(&mut self, store: &mut dyn SessionStore) -> Result<SaveOutcome> {
        let ws = match self.workspace() {
            Ok(ws) => ws,
            Err(e) => {
                self.notify(Level::Warn, "[Save] No session ID; upload an image first");
                return Err(e);
            }
        };
        let state = &ws.state;
        if state.is_empty() {
            self.notify(Level::Warn, "[Save] Nothing to save; make an edit first");
            return Ok(SaveOutcome::NothingToSave);
        }
        let result = store.save(&ws.session_id, state.color_map(), state.opacity_map());
        match result {
            Ok(()) => {
                self.notify(Level::Info, "[Save] Session saved");
                Ok(SaveOutcome::Saved)
            }
            Err(e) => {
                self.notify(Level::Error, format!("[Save] Failed: {}", e));
                Err(e)
            }
        }
    }

    /// Replace the current maps with the saved ones. Counts as an edit, so
    /// it can be undone.
    pub fn load_saved(&mut self, store: &dyn SessionStore) -> Result<()> {
        let session_id = match self.workspace() {
            Ok(ws) => ws.session_id.clone(),
            Err(e) => {
                self.notify(Level::Warn, "[Load] No session ID; upload an image first");
                return Err(e);
            }
        };
        let loaded = store
            .load(&session_id)
            .and_then(|(colors, opacities)| EditState::new(colors, opacities));
        let result = match loaded {
            Ok(state) => self
                .workspace_mut()
                .and_then(|ws| ws.commit(state, "Load session".to_string())),
            Err(e) => Err(e),
        };
        match result {
            Ok(()) => {
                self.notify(Level::Info, "[Load] Session loaded");
                Ok(())
            }
            Err(e) => {
                self.notify(Level::Error, format!("[Load] Could not load session: {}", e));
                Err(e)
            }
        }
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    pub fn session_id(&self) -> Option<&str> {
        self.workspace().ok().map(|ws| ws.session_id.as_str())
    }

    pub fn state(&self) -> Option<&EditState> {
        self.workspace().ok().map(|ws| &ws.state)
    }

    /// The preview for the current state.
    pub fn frame(&self) -> Option<&CompositeFrame> {
        self.workspace().ok().map(|ws| &ws.frame)
    }

    /// A freshly composited frame owned by the caller.
    pub fn render(&self) -> Result<CompositeFrame> {
        let ws = self.workspace()?;
        composite(&ws.base, &ws.mask, &ws.state)
    }

    pub fn history(&self) -> Option<&HistoryStack> {
        self.workspace().ok().map(|ws| &ws.history)
    }

    pub fn base(&self) -> Option<&BaseImage> {
        self.workspace().ok().map(|ws| &ws.base)
    }

    pub fn mask(&self) -> Option<&Mask> {
        self.workspace().ok().map(|ws| &ws.mask)
    }

    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    fn notify(&mut self, level: Level, message: impl Into<String>) {
        let message = message.into();
        logger::write(level, &message);
        self.notices.push(Notice {
            level,
            message,
            timestamp: logger::timestamp(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn ready_session() -> EditSession {
        let mut s = EditSession::new();
        let mask = Mask::from_rows(&[&[1, 1], &[2, 0]]).unwrap();
        s.load_image("sess", BaseImage::filled(2, 2, [200, 200, 200]), mask)
            .unwrap();
        s
    }

    #[test]
    fn empty_session_rejects_edits() {
        let mut s = EditSession::new();
        assert!(matches!(s.apply_color(PartId::SKIN, Rgb::new(0, 0, 0)), Err(Error::NoActiveSession)));
        assert!(matches!(s.apply_opacity(PartId::SKIN, 0.5), Err(Error::NoActiveSession)));
        assert!(matches!(s.undo(), Err(Error::NoActiveSession)));
        assert!(matches!(s.redo(), Err(Error::NoActiveSession)));
        assert!(matches!(s.reset(), Err(Error::NoActiveSession)));
        assert!(matches!(s.render(), Err(Error::NoActiveSession)));
        assert!(s.state().is_none() && s.frame().is_none());
    }

    #[test]
    fn load_seeds_defaults_and_identity_frame() {
        let s = ready_session();
        assert!(s.is_ready());
        assert_eq!(s.state(), Some(&EditState::defaults()));
        assert_eq!(s.history().map(HistoryStack::len), Some(1));
        assert!(s.frame().unwrap().pixels().all(|p| p.0 == [200, 200, 200, 255]));
        assert_eq!(s.session_id(), Some("sess"));
    }

    #[test]
    fn edits_recomposite_the_frame() {
        let mut s = ready_session();
        s.apply_color(PartId::SKIN, Rgb::new(0, 0, 0)).unwrap();
        s.apply_opacity(PartId::SKIN, 0.5).unwrap();
        s.apply_color(PartId::LEFT_EYEBROW, Rgb::new(255, 0, 0)).unwrap();
        s.apply_opacity(PartId::LEFT_EYEBROW, 1.0).unwrap();
        let frame = s.frame().unwrap();
        assert_eq!(frame.get_pixel(0, 0).0, [100, 100, 100, 255]);
        assert_eq!(frame.get_pixel(0, 1).0, [255, 0, 0, 255]);
        assert_eq!(frame.get_pixel(1, 1).0, [200, 200, 200, 255]);
        assert_eq!(&s.render().unwrap(), frame);
    }

    #[test]
    fn clearing_a_color_restores_the_base_pixels() {
        let mut s = ready_session();
        s.apply_color(PartId::SKIN, Rgb::new(0, 0, 0)).unwrap();
        s.apply_opacity(PartId::SKIN, 1.0).unwrap();
        assert_eq!(s.frame().unwrap().get_pixel(0, 0).0, [0, 0, 0, 255]);

        s.clear_color(PartId::SKIN).unwrap();
        assert!(s.state().unwrap().color(PartId::SKIN).is_none());
        assert_eq!(s.frame().unwrap().get_pixel(0, 0).0, [200, 200, 200, 255]);
        assert_eq!(s.history().and_then(HistoryStack::undo_description), Some("Clear skin"));

        s.undo().unwrap();
        assert_eq!(s.frame().unwrap().get_pixel(0, 0).0, [0, 0, 0, 255]);
        assert!(matches!(EditSession::new().clear_color(PartId::SKIN), Err(Error::NoActiveSession)));
    }

    #[test]
    fn invalid_opacity_changes_nothing() {
        let mut s = ready_session();
        let before = s.state().cloned();
        assert!(matches!(s.apply_opacity(PartId::SKIN, 1.2), Err(Error::InvalidOpacity { .. })));
        assert_eq!(s.state().cloned(), before);
        assert_eq!(s.history().map(HistoryStack::len), Some(1));
    }

    #[test]
    fn exhausted_history_is_a_notice_not_an_error() {
        let mut s = ready_session();
        s.take_notices();
        assert_eq!(s.undo().unwrap(), Transition::Exhausted(Direction::Undo));
        assert_eq!(s.redo().unwrap(), Transition::Exhausted(Direction::Redo));
        let notices = s.take_notices();
        assert_eq!(notices.len(), 2);
        assert!(notices.iter().all(|n| n.level == Level::Warn));
    }

    #[test]
    fn reset_is_undoable() {
        let mut s = ready_session();
        s.apply_opacity(PartId::HAIR, 0.8).unwrap();
        let edited = s.state().cloned();
        s.reset().unwrap();
        assert_eq!(s.state(), Some(&EditState::defaults()));
        assert_eq!(s.undo().unwrap(), Transition::Updated);
        assert_eq!(s.state().cloned(), edited);
    }

    #[test]
    fn mismatched_load_keeps_previous_image() {
        let mut s = ready_session();
        s.apply_opacity(PartId::SKIN, 0.4).unwrap();
        let err = s
            .load_image("other", BaseImage::filled(3, 3, [0, 0, 0]), Mask::from_rows(&[&[1]]).unwrap())
            .unwrap_err();
        assert!(matches!(err, Error::DimensionMismatch { .. }));
        assert_eq!(s.session_id(), Some("sess"));
        assert_eq!(s.history().map(HistoryStack::len), Some(2));
    }

    #[test]
    fn new_upload_discards_history() {
        let mut s = ready_session();
        s.apply_opacity(PartId::SKIN, 0.4).unwrap();
        s.load_image("next", BaseImage::filled(1, 1, [9, 9, 9]), Mask::from_rows(&[&[1]]).unwrap())
            .unwrap();
        assert_eq!(s.history().map(HistoryStack::len), Some(1));
        assert_eq!(s.undo().unwrap(), Transition::Exhausted(Direction::Undo));
    }

    #[test]
    fn history_limit_is_applied() {
        let mut s = EditSession::with_history_limit(Some(3));
        s.load_image("x", BaseImage::filled(1, 1, [0, 0, 0]), Mask::from_rows(&[&[1]]).unwrap())
            .unwrap();
        for i in 0..10u8 {
            s.apply_color(PartId::SKIN, Rgb::new(i, i, i)).unwrap();
        }
        assert_eq!(s.history().map(HistoryStack::len), Some(3));
    }

    #[test]
    fn save_refuses_empty_maps() {
        let mut s = EditSession::new();
        let mut store = MemoryStore::new();
        assert!(matches!(s.save(&mut store), Err(Error::NoActiveSession)));

        let mut s = ready_session();
        // replace the defaults with an empty state via a saved empty record
        store.insert_raw("sess", r#"{"session_id": "sess", "color_map": {}, "opacity_map": {}}"#);
        s.load_saved(&store).unwrap();
        assert_eq!(s.save(&mut store).unwrap(), SaveOutcome::NothingToSave);
    }

    #[test]
    fn save_then_load_restores_maps_as_an_edit() {
        let mut s = ready_session();
        let mut store = MemoryStore::new();
        s.apply_color(PartId::SKIN, Rgb::new(1, 2, 3)).unwrap();
        s.apply_opacity(PartId::SKIN, 0.75).unwrap();
        let saved = s.state().cloned().unwrap();
        assert_eq!(s.save(&mut store).unwrap(), SaveOutcome::Saved);

        s.reset().unwrap();
        s.load_saved(&store).unwrap();
        assert_eq!(s.state(), Some(&saved));
        s.undo().unwrap();
        assert_eq!(s.state(), Some(&EditState::defaults()));
    }

    #[test]
    fn load_of_unknown_session_reports_error() {
        let mut s = ready_session();
        let store = MemoryStore::new();
        assert!(s.load_saved(&store).is_err());
        assert_eq!(s.notices().last().map(|n| n.level), Some(Level::Error));
        assert_eq!(s.history().map(HistoryStack::len), Some(1));
    }

    #[test]
    fn close_returns_to_empty() {
        let mut s = ready_session();
        s.close();
        assert!(!s.is_ready());
        assert!(s.session_id().is_none());
    }
}
