use std::io::Cursor;
use std::time::Duration;

use image::{DynamicImage, GrayImage, ImageOutputFormat, Luma, Rgba, RgbaImage};

use facetint::{
    BaseImage, Direction, EditSession, EditState, Error, JsonFileStore, LoadRequest, Mask,
    PartId, Rgb, SaveOutcome, SessionStore, Transition, composite, label_to_id,
};

fn png(img: DynamicImage) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageOutputFormat::Png).unwrap();
    buf.into_inner()
}

fn photo(w: u32, h: u32, v: u8) -> Vec<u8> {
    png(DynamicImage::ImageRgba8(RgbaImage::from_pixel(w, h, Rgba([v, v, v, 255]))))
}

fn mask(w: u32, h: u32, id: u8) -> Vec<u8> {
    png(DynamicImage::ImageLuma8(GrayImage::from_pixel(w, h, Luma([id]))))
}

fn face_session() -> EditSession {
    let mut session = EditSession::new();
    let mask = Mask::from_rows(&[&[1, 1], &[2, 0]]).unwrap();
    session
        .load_image("face", BaseImage::filled(2, 2, [200, 200, 200]), mask)
        .unwrap();
    session
}

#[test]
fn undo_twice_returns_to_first_edit() {
    let mut session = face_session();
    session.apply_color(PartId::SKIN, Rgb::new(255, 0, 0)).unwrap();
    let after_first = session.state().cloned().unwrap();
    session.apply_color(PartId::SKIN, Rgb::new(0, 255, 0)).unwrap();
    session.apply_color(PartId::SKIN, Rgb::new(0, 0, 255)).unwrap();

    assert_eq!(session.undo().unwrap(), Transition::Updated);
    assert_eq!(session.undo().unwrap(), Transition::Updated);
    assert_eq!(session.state(), Some(&after_first));

    // A new edit drops the redo branch.
    session.apply_opacity(PartId::SKIN, 0.5).unwrap();
    assert_eq!(session.redo().unwrap(), Transition::Exhausted(Direction::Redo));
}

#[test]
fn two_by_two_composite() {
    let base = BaseImage::filled(2, 2, [200, 200, 200]);
    let mask = Mask::from_rows(&[&[1, 1], &[2, 0]]).unwrap();
    let state = EditState::default()
        .with_color(label_to_id("skin"), Rgb::new(0, 0, 0))
        .with_opacity(label_to_id("skin"), 0.5)
        .unwrap();
    let frame = composite(&base, &mask, &state).unwrap();
    assert_eq!(frame.get_pixel(0, 0).0, [100, 100, 100, 255]);
    assert_eq!(frame.get_pixel(1, 0).0, [100, 100, 100, 255]);
    assert_eq!(frame.get_pixel(0, 1).0, [200, 200, 200, 255]);
    assert_eq!(frame.get_pixel(1, 1).0, [200, 200, 200, 255]);

    let small = Mask::from_rows(&[&[1]]).unwrap();
    assert!(matches!(
        composite(&base, &small, &state),
        Err(Error::DimensionMismatch { .. })
    ));
}

#[test]
fn background_upload_installs_when_done() {
    let mut session = EditSession::new();
    session.begin_upload("upload", LoadRequest::new(photo(6, 4, 50), mask(3, 2, 1)));
    assert!(session.has_pending_upload());
    session.wait_upload().unwrap();

    assert!(!session.has_pending_upload());
    assert_eq!(session.session_id(), Some("upload"));
    assert_eq!(session.base().map(BaseImage::dimensions), Some((3, 2)));
    assert_eq!(session.state(), Some(&EditState::defaults()));
}

fn poll_until_done(session: &mut EditSession) -> facetint::Result<bool> {
    for _ in 0..2000 {
        match session.poll_upload() {
            Ok(false) => std::thread::sleep(Duration::from_millis(5)),
            done => return done,
        }
    }
    panic!("upload never resolved");
}

#[test]
fn polled_upload_installs_without_blocking() {
    let mut session = EditSession::new();
    assert!(!session.poll_upload().unwrap());

    session.begin_upload("polled", LoadRequest::new(photo(8, 6, 80), mask(4, 3, 17)));
    assert!(poll_until_done(&mut session).unwrap());

    assert!(!session.has_pending_upload());
    assert_eq!(session.session_id(), Some("polled"));
    assert_eq!(session.base().map(BaseImage::dimensions), Some((4, 3)));
    assert_eq!(session.state(), Some(&EditState::defaults()));
    assert_eq!(session.history().map(|h| h.len()), Some(1));
}

#[test]
fn polled_upload_reports_decode_failure() {
    let mut session = face_session();
    session.begin_upload("broken", LoadRequest::new(b"junk".to_vec(), mask(2, 2, 1)));
    assert!(matches!(poll_until_done(&mut session), Err(Error::Decode(_))));
    assert!(!session.has_pending_upload());
    assert_eq!(session.session_id(), Some("face"));
}

#[test]
fn newer_upload_supersedes_pending_one() {
    let mut session = EditSession::new();
    session.begin_upload("first", LoadRequest::new(photo(2, 2, 10), mask(2, 2, 1)));
    session.begin_upload("second", LoadRequest::new(photo(3, 3, 20), mask(3, 3, 1)));
    session.wait_upload().unwrap();
    assert_eq!(session.session_id(), Some("second"));

    // Nothing left to install.
    assert!(!session.poll_upload().unwrap());
    assert_eq!(session.session_id(), Some("second"));
}

#[test]
fn failed_upload_keeps_current_image() {
    let mut session = face_session();
    session.begin_upload("broken", LoadRequest::new(b"junk".to_vec(), mask(2, 2, 1)));
    assert!(session.wait_upload().is_err());
    assert_eq!(session.session_id(), Some("face"));
}

#[test]
fn file_store_round_trip_through_session() {
    let dir = std::env::temp_dir().join(format!("facetint_flow_{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    let mut store = JsonFileStore::new(&dir);

    let mut session = face_session();
    session.apply_color(PartId::HAIR, Rgb::new(64, 32, 16)).unwrap();
    session.apply_opacity(PartId::HAIR, 0.7).unwrap();
    assert_eq!(session.save(&mut store).unwrap(), SaveOutcome::Saved);
    assert!(dir.join("face.json").is_file());

    let (colors, opacities) = store.load("face").unwrap();
    assert_eq!(colors.get(&PartId::HAIR), Some(&Rgb::new(64, 32, 16)));
    assert_eq!(opacities.get(&PartId::HAIR), Some(&0.7));

    let mut restored = face_session();
    restored.load_saved(&store).unwrap();
    assert_eq!(restored.state(), session.state());
    assert_eq!(restored.frame(), session.frame());

    let _ = std::fs::remove_dir_all(&dir);
}
