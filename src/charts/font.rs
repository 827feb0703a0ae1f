//! Font registration for chart text.
//!
//! Captions, axis labels and slice labels are drawn with a TrueType font
//! registered with plotters. Without one the charts are drawn unlabelled.

use plotters::style::{register_font, FontStyle};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Family name the charts ask plotters for.
pub const FONT_FAMILY: &str = "sans-serif";

const FONT_DIRS: &[&str] = &[
    "/usr/share/fonts",
    "/usr/local/share/fonts",
    "/Library/Fonts",
    "/System/Library/Fonts",
    "C:\\Windows\\Fonts",
];

/// Font files tried first, best first.
const PREFERRED: &[&str] = &[
    "DejaVuSans.ttf",
    "LiberationSans-Regular.ttf",
    "NotoSans-Regular.ttf",
    "Arial.ttf",
    "arial.ttf",
];

static INSTALLED: OnceLock<Option<PathBuf>> = OnceLock::new();

/// Register the chart font, from `configured` or else the system font
/// directories. Only the first call has an effect.
///
/// Returns the font in use, if any.
pub fn install(configured: Option<&Path>) -> Option<&'static Path> {
    INSTALLED
        .get_or_init(|| {
            let candidates = match configured {
                Some(path) => vec![path.to_path_buf()],
                None => {
                    let dirs: Vec<&Path> = FONT_DIRS.iter().map(Path::new).collect();
                    fonts_in(&dirs)
                }
            };
            let found = candidates.into_iter().find(|path| register(path));
            if found.is_none() {
                warn!("No usable font found, charts will be drawn without text");
            }
            found
        })
        .as_deref()
}

/// Whether a font was registered and charts can carry text.
pub fn text_available() -> bool {
    matches!(INSTALLED.get(), Some(Some(_)))
}

/// TrueType files under `dirs`, preferred names first, then by path.
pub fn fonts_in(dirs: &[&Path]) -> Vec<PathBuf> {
    let mut fonts: Vec<PathBuf> = dirs
        .iter()
        .filter(|dir| dir.is_dir())
        .flat_map(|dir| {
            WalkDir::new(dir)
                .follow_links(true)
                .into_iter()
                .filter_map(|e| e.ok())
        })
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case("ttf"))
        })
        .collect();

    fonts.sort_by_cached_key(|path| (preference(path), path.clone()));
    debug!("Found {} candidate fonts", fonts.len());
    fonts
}

fn preference(path: &Path) -> usize {
    path.file_name()
        .and_then(|name| name.to_str())
        .and_then(|name| PREFERRED.iter().position(|p| *p == name))
        .unwrap_or(PREFERRED.len())
}

/// Register `path` as the chart font family.
pub(crate) fn register(path: &Path) -> bool {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!("Cannot read font {}: {}", path.display(), e);
            return false;
        }
    };

    // plotters keeps registered fonts for the life of the process
    let bytes: &'static [u8] = Box::leak(bytes.into_boxed_slice());
    match register_font(FONT_FAMILY, FontStyle::Normal, bytes) {
        Ok(()) => {
            info!("Chart font: {}", path.display());
            true
        }
        Err(_) => {
            // plotters' InvalidFont implements neither Debug nor Display
            warn!("Unusable font {}: invalid font data", path.display());
            false
        }
    }
}
