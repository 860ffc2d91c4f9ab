//! Screenshot helpers
//!
//! The CLI only captures whole pages, so element shots are cut out of a
//! full-page capture using the element's document-space rectangle.

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::browser::agent_browser::AgentBrowserPage;
use crate::browser::page::Page;
use crate::core::{PilotError, Result};

/// Element bounds in CSS pixels, relative to the document origin
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct ElementRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    #[serde(default = "default_scale")]
    pub scale: f64,
}

fn default_scale() -> f64 {
    1.0
}

impl ElementRect {
    /// Crop window `(x, y, width, height)` in image pixels, clamped to an
    /// image of `image_width` x `image_height`. `None` when nothing is left.
    pub fn pixel_bounds(
        &self,
        image_width: u32,
        image_height: u32,
    ) -> Option<(u32, u32, u32, u32)> {
        let scale = if self.scale > 0.0 { self.scale } else { 1.0 };
        let left = (self.x * scale).floor().max(0.0) as u32;
        let top = (self.y * scale).floor().max(0.0) as u32;
        let right = ((self.x + self.width) * scale).ceil().max(0.0) as u32;
        let bottom = ((self.y + self.height) * scale).ceil().max(0.0) as u32;

        let right = right.min(image_width);
        let bottom = bottom.min(image_height);
        if left >= right || top >= bottom {
            return None;
        }
        Some((left, top, right - left, bottom - top))
    }
}

/// Create the parent directories of a screenshot target
pub fn ensure_parent_dir(path: &Path) -> Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => Ok(fs::create_dir_all(parent)?),
        _ => Ok(()),
    }
}

fn rect_script(selector: &str) -> Result<String> {
    let selector = serde_json::to_string(selector)?;
    Ok(format!(
        r#"(() => {{
  const el = document.querySelector({selector});
  if (!el) return null;
  el.scrollIntoView({{ block: 'nearest', inline: 'nearest' }});
  const r = el.getBoundingClientRect();
  return {{
    x: r.left + window.scrollX,
    y: r.top + window.scrollY,
    width: r.width,
    height: r.height,
    scale: window.devicePixelRatio || 1
  }};
}})()"#
    ))
}

/// Capture only the element matching `selector` into `target`
pub async fn element_screenshot(
    page: &AgentBrowserPage,
    target: &Path,
    selector: &str,
) -> Result<()> {
    let value = page.evaluate(&rect_script(selector)?).await?;
    let rect: Option<ElementRect> = serde_json::from_value(value)?;
    let rect = rect.ok_or_else(|| PilotError::ElementNotFound(selector.to_string()))?;

    let scratch = tempfile::Builder::new()
        .prefix("webpilot-shot-")
        .suffix(".png")
        .tempfile()?;
    page.full_page_screenshot(scratch.path()).await?;

    let source = scratch.path().to_path_buf();
    let target: PathBuf = target.to_path_buf();
    tokio::task::spawn_blocking(move || crop_to(&source, &target, &rect))
        .await
        .map_err(|e| PilotError::browser(format!("crop task failed: {}", e)))?
}

/// Cut `rect` out of the image at `source` and write it to `target`
pub fn crop_to(source: &Path, target: &Path, rect: &ElementRect) -> Result<()> {
    let image = image::open(source)?;
    let (x, y, width, height) = rect
        .pixel_bounds(image.width(), image.height())
        .ok_or_else(|| PilotError::browser("element has no visible area"))?;
    image.crop_imm(x, y, width, height).save(target)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect(x: f64, y: f64, width: f64, height: f64, scale: f64) -> ElementRect {
        ElementRect {
            x,
            y,
            width,
            height,
            scale,
        }
    }

    #[test]
    fn test_pixel_bounds_scales_and_clamps() {
        assert_eq!(
            rect(10.0, 20.0, 30.0, 40.0, 2.0).pixel_bounds(1000, 1000),
            Some((20, 40, 60, 80))
        );
        assert_eq!(
            rect(90.0, 90.0, 50.0, 50.0, 1.0).pixel_bounds(100, 100),
            Some((90, 90, 10, 10))
        );
        assert_eq!(rect(0.0, 0.0, 0.0, 10.0, 1.0).pixel_bounds(100, 100), None);
        assert_eq!(rect(200.0, 0.0, 10.0, 10.0, 1.0).pixel_bounds(100, 100), None);
    }

    #[test]
    fn test_crop_to_writes_element_region() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("full.png");
        let target = dir.path().join("nested/element.png");

        let mut full = image::RgbaImage::new(64, 48);
        full.put_pixel(10, 10, image::Rgba([255, 0, 0, 255]));
        full.save(&source).unwrap();

        ensure_parent_dir(&target).unwrap();
        crop_to(&source, &target, &rect(10.0, 10.0, 20.0, 5.0, 1.0)).unwrap();

        let cropped = image::open(&target).unwrap().to_rgba8();
        assert_eq!(cropped.dimensions(), (20, 5));
        assert_eq!(cropped.get_pixel(0, 0), &image::Rgba([255, 0, 0, 255]));
    }

    #[test]
    fn test_rect_script_quotes_selector() {
        let script = rect_script("a[title=\"x\"]").unwrap();
        assert!(script.contains(r#"document.querySelector("a[title=\"x\"]")"#));
    }
}
