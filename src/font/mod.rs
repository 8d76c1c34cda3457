//! # Font Resolution
//!
//! The rasterizer only draws text with fonts that were registered from raw
//! bytes. [`FontResolver`] loads a font file once per path, registers it under
//! a private family name for both regular and bold styles, and hands out a
//! [`ResolvedFont`] that plotters can build text styles from.

use anyhow::{anyhow, Context};
use log::debug;
use parking_lot::Mutex;
use plotters::style::{register_font, FontDesc, FontFamily, FontStyle};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

static REGISTERED: Mutex<BTreeMap<PathBuf, &'static str>> =
    parking_lot::const_mutex(BTreeMap::new());

/// Typographic points per inch.
pub const POINTS_PER_INCH: f64 = 72.0;

/// A font that has been registered with the rasterizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedFont {
    family: &'static str,
    path: PathBuf,
}

impl ResolvedFont {
    pub fn family(&self) -> &'static str {
        self.family
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Font description of `points` size at the given resolution.
    pub fn desc(&self, points: f64, dpi: u32, style: FontStyle) -> FontDesc<'static> {
        let pixels = points * dpi as f64 / POINTS_PER_INCH;
        FontDesc::new(FontFamily::Name(self.family), pixels, style)
    }
}

pub struct FontResolver;

impl FontResolver {
    /// Loads and registers the font at `path`.
    ///
    /// Repeated calls for the same file return the already registered family
    /// without reading the file again.
    pub fn resolve(path: &Path) -> anyhow::Result<ResolvedFont> {
        let canonical = fs::canonicalize(path)
            .with_context(|| format!("Font file {} is not accessible", path.display()))?;

        let mut registered = REGISTERED.lock();
        if let Some(&family) = registered.get(&canonical) {
            return Ok(ResolvedFont {
                family,
                path: canonical,
            });
        }

        let bytes = fs::read(&canonical)
            .with_context(|| format!("Failed to read font file {}", canonical.display()))?;
        // Registered fonts must outlive every future text style; one leak per
        // distinct font file.
        let bytes: &'static [u8] = Box::leak(bytes.into_boxed_slice());
        let family: &'static str =
            Box::leak(format!("wordvec-plot-font-{}", registered.len()).into_boxed_str());

        for style in [FontStyle::Normal, FontStyle::Bold] {
            register_font(family, style, bytes).map_err(|_| {
                anyhow!("Invalid font file {}", canonical.display())
            })?;
        }

        debug!(
            "Registered font {} as family {}",
            canonical.display(),
            family
        );
        registered.insert(canonical.clone(), family);

        Ok(ResolvedFont {
            family,
            path: canonical,
        })
    }
}
