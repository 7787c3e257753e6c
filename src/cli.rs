// ============================================================================
// FaceTint CLI — headless edit session via command-line arguments
// ============================================================================
//
// Usage examples:
//   facetint --image photo.jpg --mask photo_mask.png --color skin=255,200,180 --opacity skin=0.4
//   facetint -i photo.jpg --masks-dir cache/ --color hair=#402010 --opacity hair=0.7 --save
//   facetint -i photo.jpg --load --clear hair --undo 1
//
// Edits are applied in a fixed order: --load, --color, --clear, --opacity,
// --reset, --undo, then --save. The run ends with a coverage and state summary.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;

use crate::edit_state::{EditState, Rgb};
use crate::io::{LoadRequest, decode_base, load_sync};
use crate::logger;
use crate::parts::{self, PartId};
use crate::segment::{MaskDirSegmenter, Segmenter, content_session_id};
use crate::session::{EditSession, SaveOutcome, Transition};
use crate::settings::Settings;
use crate::store::JsonFileStore;

// ============================================================================
// CLI argument definition (clap Derive)
// ============================================================================

/// FaceTint headless face-part recoloring.
#[derive(Parser, Debug)]
#[command(
    name = "facetint",
    about = "Recolor segmented face parts of a photo",
    long_about = "Load a photo with its part mask, tint parts by color and opacity,\n\
                  and save or restore the edit session.\n\n\
                  Example:\n  \
                  facetint --image photo.jpg --mask mask.png --color skin=255,200,180 --opacity skin=0.4"
)]
pub struct CliArgs {
    /// Photo to edit.
    #[arg(short, long, value_name = "FILE")]
    pub image: PathBuf,

    /// Grayscale part mask for the photo (one part id per pixel).
    #[arg(short, long, value_name = "FILE", conflicts_with = "masks_dir")]
    pub mask: Option<PathBuf>,

    /// Directory of cached `{session_id}_mask.png` files.
    /// Used when --mask is omitted; defaults to the configured masks_dir.
    #[arg(long, value_name = "DIR")]
    pub masks_dir: Option<PathBuf>,

    /// Set a part's color, e.g. `skin=255,200,180` or `hair=#402010`. Repeatable.
    #[arg(short, long, value_name = "PART=COLOR")]
    pub color: Vec<String>,

    /// Remove a part's color, e.g. `hair`. Repeatable.
    #[arg(long, value_name = "PART")]
    pub clear: Vec<String>,

    /// Set a part's opacity in [0, 1], e.g. `skin=0.4`. Repeatable.
    #[arg(short, long, value_name = "PART=0..1")]
    pub opacity: Vec<String>,

    /// Reset to the default tint table after applying edits.
    #[arg(long)]
    pub reset: bool,

    /// Undo this many steps before saving.
    #[arg(long, default_value_t = 0, value_name = "N")]
    pub undo: usize,

    /// Save the resulting maps to the session store.
    #[arg(long)]
    pub save: bool,

    /// Restore previously saved maps before applying edits.
    #[arg(long)]
    pub load: bool,

    /// Session store directory (overrides the configured sessions_dir).
    #[arg(long, value_name = "DIR")]
    pub sessions_dir: Option<PathBuf>,

    /// Write the effective settings (including directory overrides) to the
    /// settings file.
    #[arg(long)]
    pub save_settings: bool,

    /// Mirror log output to stderr.
    #[arg(short, long)]
    pub verbose: bool,
}

// ============================================================================
// Public entry point
// ============================================================================

/// Run the CLI session and return an OS exit code.
/// `0` = every requested step succeeded, `1` = something failed.
pub fn run(args: CliArgs) -> ExitCode {
    logger::set_echo(args.verbose);
    let start = Instant::now();

    let settings = effective_settings(&args, Settings::load());
    if args.save_settings {
        settings.save();
    }
    let result = run_session(&args, &settings);

    if args.verbose {
        println!("done ({:.0}ms)", start.elapsed().as_secs_f64() * 1000.0);
    }
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

// ============================================================================
// Session pipeline
// ============================================================================

fn run_session(args: &CliArgs, settings: &Settings) -> Result<(), String> {
    // Validate edit arguments before touching any file
    let colors = args
        .color
        .iter()
        .map(|a| parse_color_arg(a))
        .collect::<Result<Vec<_>, _>>()?;
    let cleared = args
        .clear
        .iter()
        .map(|a| parse_part(a))
        .collect::<Result<Vec<_>, _>>()?;
    let opacities = args
        .opacity
        .iter()
        .map(|a| parse_opacity_arg(a))
        .collect::<Result<Vec<_>, _>>()?;

    // -- Step 1: Load ----------------------------------------------------
    let bytes = std::fs::read(&args.image)
        .map_err(|e| format!("could not read '{}': {}", args.image.display(), e))?;

    let mut session = EditSession::with_history_limit(settings.history_limit());
    match &args.mask {
        Some(mask_path) => {
            let session_id = content_session_id(&bytes);
            let request = LoadRequest::new(bytes, mask_path.as_path())
                .resample_to_mask(settings.resample_to_mask);
            let loaded = load_sync(&request).map_err(|e| format!("load failed: {}", e))?;
            session
                .load_decoded(session_id, loaded)
                .map_err(|e| format!("load failed: {}", e))?;
        }
        None => {
            let segmentation = MaskDirSegmenter::new(&settings.masks_dir)
                .segment(&bytes)
                .map_err(|e| format!("segmentation failed: {}", e))?;
            let mut base = decode_base(&bytes).map_err(|e| format!("load failed: {}", e))?;
            let (w, h) = segmentation.mask.dimensions();
            if settings.resample_to_mask {
                base = base.resampled(w, h);
            }
            session
                .load_image(segmentation.session_id, base, segmentation.mask)
                .map_err(|e| format!("load failed: {}", e))?;
        }
    }

    let mut store = JsonFileStore::new(&settings.sessions_dir);

    // -- Step 2: Edits ---------------------------------------------------
    if args.load {
        session.load_saved(&store).map_err(|e| e.to_string())?;
    }
    for (part, color) in colors {
        session.apply_color(part, color).map_err(|e| e.to_string())?;
    }
    for part in cleared {
        session.clear_color(part).map_err(|e| e.to_string())?;
    }
    for (part, value) in opacities {
        session.apply_opacity(part, value).map_err(|e| e.to_string())?;
    }
    if args.reset {
        session.reset().map_err(|e| e.to_string())?;
    }
    for _ in 0..args.undo {
        if let Transition::Exhausted(_) = session.undo().map_err(|e| e.to_string())? {
            break;
        }
    }

    // -- Step 3: Save ----------------------------------------------------
    if args.save {
        match session.save(&mut store).map_err(|e| e.to_string())? {
            SaveOutcome::Saved => {
                if let Some(id) = session.session_id() {
                    println!("saved {}", store.dir().join(format!("{}.json", id)).display());
                }
            }
            SaveOutcome::NothingToSave => {}
        }
    }

    for notice in session.take_notices() {
        println!("[{}] {} {}", notice.timestamp, notice.level, notice.message);
    }
    print_summary(&session);
    Ok(())
}

fn print_summary(session: &EditSession) {
    if let Some(mask) = session.mask() {
        let (w, h) = mask.dimensions();
        let total = (u64::from(w) * u64::from(h)).max(1);
        println!("Coverage ({}x{}):", w, h);
        for (part, count) in mask.coverage() {
            println!(
                "  {:<14} {:>6.2}%",
                parts::display_name(part),
                count as f64 * 100.0 / total as f64
            );
        }
    }
    if let Some(state) = session.state() {
        println!("Edits:");
        print_state(state);
    }
    if let Some(history) = session.history() {
        println!(
            "History: {} of {} snapshot(s)",
            history.index().map_or(0, |i| i + 1),
            history.len()
        );
    }
}

fn print_state(state: &EditState) {
    let mut any = false;
    for (&part, &color) in state.color_map() {
        let opacity = state.opacity(part);
        if opacity <= 0.0 {
            continue;
        }
        any = true;
        println!("  {:<14} {} @ {:.2}", parts::display_name(part), color, opacity);
    }
    if !any {
        println!("  (none visible)");
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Stored settings with the command-line directory overrides applied.
fn effective_settings(args: &CliArgs, mut settings: Settings) -> Settings {
    if let Some(dir) = &args.masks_dir {
        settings.masks_dir = dir.clone();
    }
    if let Some(dir) = &args.sessions_dir {
        settings.sessions_dir = dir.clone();
    }
    settings
}

fn parse_part(label: &str) -> Result<PartId, String> {
    let part = parts::label_to_id(label);
    if part.is_unknown() {
        return Err(format!("unknown part '{}'", label.trim()));
    }
    Ok(part)
}

/// Split `part=value` and resolve the part label.
fn parse_assignment(arg: &str) -> Result<(PartId, &str), String> {
    let (label, value) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected PART=VALUE, got '{}'", arg))?;
    Ok((parse_part(label)?, value.trim()))
}

fn parse_color_arg(arg: &str) -> Result<(PartId, Rgb), String> {
    let (part, value) = parse_assignment(arg)?;
    let color = Rgb::parse(value).ok_or_else(|| format!("invalid color '{}'", value))?;
    Ok((part, color))
}

fn parse_opacity_arg(arg: &str) -> Result<(PartId, f32), String> {
    let (part, value) = parse_assignment(arg)?;
    let opacity = value
        .parse::<f32>()
        .map_err(|_| format!("invalid opacity '{}'", value))?;
    Ok((part, opacity))
}
