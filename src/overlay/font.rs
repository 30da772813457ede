use std::path::Path;

use fontdb::{Database, Family, Query, Source, Stretch, Style, Weight};
use fontdue::{Font, FontSettings};
use tracing::{debug, info};

use crate::error::{OverlayError, Result};

/// Families tried after the generic sans-serif family, in order
///
/// fontdb maps the generic family to a single fixed name, which is not
/// installed everywhere.
pub const SANS_SERIF_FALLBACKS: &[&str] = &[
    "Helvetica",
    "Arial",
    "DejaVu Sans",
    "Liberation Sans",
    "Noto Sans",
    "Open Sans",
];

/// A font database with every system font directory loaded
pub fn system_font_database() -> Database {
    let mut db = Database::new();
    db.load_system_fonts();
    debug!("Font database holds {} faces", db.len());
    db
}

/// Load the overlay font
///
/// An explicit path wins; otherwise the platform's regular sans-serif face is
/// resolved through the system font database.
pub fn load_font(explicit: Option<&Path>) -> Result<Font> {
    match explicit {
        Some(path) => load_font_file(path),
        None => load_system_font(&system_font_database()),
    }
}

fn load_font_file(path: &Path) -> Result<Font> {
    debug!("Loading overlay font from {:?}", path);
    let bytes = std::fs::read(path).map_err(|_| OverlayError::FontNotFound {
        searched: path.display().to_string(),
    })?;

    let font = Font::from_bytes(bytes, FontSettings::default()).map_err(|e| {
        OverlayError::FontInvalid {
            path: path.display().to_string(),
            reason: e.to_string(),
        }
    })?;

    info!("Overlay font: {}", path.display());
    Ok(font)
}

/// Resolve the regular sans-serif face in `db` and parse it
pub fn load_system_font(db: &Database) -> Result<Font> {
    let mut families = vec![Family::SansSerif];
    families.extend(SANS_SERIF_FALLBACKS.iter().map(|name| Family::Name(*name)));

    let query = Query {
        families: &families,
        weight: Weight::NORMAL,
        stretch: Stretch::Normal,
        style: Style::Normal,
    };

    let id = db
        .query(&query)
        .or_else(|| {
            // Last resort: any upright, proportional face
            db.faces()
                .find(|face| face.style == Style::Normal && !face.monospaced)
                .map(|face| face.id)
        })
        .ok_or_else(|| OverlayError::FontNotFound {
            searched: format!("system font database ({} faces)", db.len()),
        })?;

    let face = db.face(id).ok_or_else(|| OverlayError::FontNotFound {
        searched: "system font database".to_string(),
    })?;
    let origin = match &face.source {
        Source::File(path) | Source::SharedFile(path, _) => path.display().to_string(),
        Source::Binary(_) => "<memory>".to_string(),
    };
    let family = face
        .families
        .first()
        .map(|(name, _)| name.clone())
        .unwrap_or_default();

    let parsed = db
        .with_face_data(id, |data, index| {
            let settings = FontSettings {
                collection_index: index,
                ..FontSettings::default()
            };
            Font::from_bytes(data, settings)
        })
        .ok_or_else(|| OverlayError::FontNotFound {
            searched: origin.clone(),
        })?;

    let font = parsed.map_err(|e| OverlayError::FontInvalid {
        path: origin.clone(),
        reason: e.to_string(),
    })?;

    info!("Overlay font: {} ({})", family, origin);
    Ok(font)
}
