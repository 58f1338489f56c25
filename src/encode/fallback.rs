use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::foundation::error::DeckreelResult;

/// Parse `#RRGGBB` / `#RRGGBBAA` (case-insensitive, `#` optional) into straight RGBA8.
pub fn parse_hex_rgba(s: &str) -> Option<[u8; 4]> {
    let s = s.trim();
    let s = s.strip_prefix('#').unwrap_or(s);
    if !s.is_ascii() {
        return None;
    }
    let byte = |i: usize| u8::from_str_radix(&s[i..i + 2], 16).ok();
    match s.len() {
        6 => Some([byte(0)?, byte(2)?, byte(4)?, 255]),
        8 => Some([byte(0)?, byte(2)?, byte(4)?, byte(6)?]),
        _ => None,
    }
}

/// Write a solid-colour PNG of `width x height` to `path`.
pub fn write_solid_png_blocking(
    path: &Path,
    width: u32,
    height: u32,
    rgba: [u8; 4],
) -> DeckreelResult<()> {
    ensure_parent_dir(path)?;
    let mut buf = Vec::with_capacity((width as usize) * (height as usize) * 4);
    for _ in 0..(width as usize) * (height as usize) {
        buf.extend_from_slice(&rgba);
    }
    image::save_buffer_with_format(
        path,
        &buf,
        width,
        height,
        image::ColorType::Rgba8,
        image::ImageFormat::Png,
    )
    .with_context(|| format!("write fallback png '{}'", path.display()))?;
    Ok(())
}

/// Async wrapper around [`write_solid_png_blocking`] that keeps PNG encoding off the runtime.
pub async fn write_solid_png(
    path: PathBuf,
    width: u32,
    height: u32,
    rgba: [u8; 4],
) -> DeckreelResult<PathBuf> {
    tokio::task::spawn_blocking(move || -> DeckreelResult<PathBuf> {
        write_solid_png_blocking(&path, width, height, rgba)?;
        Ok(path)
    })
    .await
    .context("fallback png task panicked")?
}

/// Ensure the parent directory of `path` exists.
pub fn ensure_parent_dir(path: &Path) -> DeckreelResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory '{}'", parent.display()))?;
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/encode/fallback.rs"]
mod tests;
