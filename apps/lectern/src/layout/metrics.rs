//! Height Estimator — predicts the rendered height of slide content before rendering.
//!
//! This is an intentional approximation: the renderer wraps text with real glyph
//! metrics, while the estimator uses a fixed characters-per-line wrap model and
//! per-element constants. The constants are deliberately generous (images in
//! particular reserve a large box) so estimation error biases toward empty space
//! rather than overflow. The splitter's safety margin absorbs the residual error.
//!
//! All heights are in pixels of the renderer's slide content area.

use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::models::slide::ContentBlock;

/// Fixed layout constants used by the estimator, builder and splitter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LayoutMetrics {
    /// Characters that fit on one rendered line before wrapping.
    pub chars_per_line: u32,
    /// Height of one wrapped line of a bullet item.
    pub bullet_height: u32,
    /// Height of a bullet list heading, when present.
    pub heading_height: u32,
    /// Reserved box for an image including its caption.
    pub image_height: u32,
    /// Height of a one-line callout (padding + border + first line).
    pub callout_base_height: u32,
    /// Extra height per callout line beyond the first.
    pub callout_line_height: u32,
    /// Height of one wrapped paragraph line.
    pub paragraph_line_height: u32,
    /// Vertical gap between adjacent blocks.
    pub block_spacing: u32,
    /// Content capacity when the slide shows a subtitle.
    pub capacity_with_subtitle: u32,
    /// Content capacity without a subtitle. Must exceed `capacity_with_subtitle`.
    pub capacity_without_subtitle: u32,
    /// Fraction of capacity the splitter packs to (0.85 = 15% headroom).
    pub safety_margin: f32,
}

impl Default for LayoutMetrics {
    fn default() -> Self {
        Self {
            chars_per_line: 80,
            bullet_height: 48,
            heading_height: 56,
            image_height: 360,
            callout_base_height: 72,
            callout_line_height: 32,
            paragraph_line_height: 40,
            block_spacing: 16,
            capacity_with_subtitle: 460,
            capacity_without_subtitle: 520,
            safety_margin: 0.85,
        }
    }
}

impl LayoutMetrics {
    /// Rejects constant sets the packer cannot reason about.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.chars_per_line == 0 {
            return Err(AppError::Config("chars_per_line must be > 0".to_string()));
        }
        if self.capacity_without_subtitle <= self.capacity_with_subtitle {
            return Err(AppError::Config(format!(
                "capacity without subtitle ({}) must exceed capacity with subtitle ({})",
                self.capacity_without_subtitle, self.capacity_with_subtitle
            )));
        }
        if !(self.safety_margin > 0.0 && self.safety_margin <= 1.0) {
            return Err(AppError::Config(format!(
                "safety_margin must be in (0, 1], got {}",
                self.safety_margin
            )));
        }
        Ok(())
    }

    /// Maximum estimated content height a slide may hold.
    pub fn capacity(&self, has_subtitle: bool) -> u32 {
        if has_subtitle {
            self.capacity_with_subtitle
        } else {
            self.capacity_without_subtitle
        }
    }

    /// Capacity reduced by the safety margin, rounded down.
    pub fn target(&self, has_subtitle: bool) -> u32 {
        (self.capacity(has_subtitle) as f64 * self.safety_margin as f64).floor() as u32
    }

    /// Number of rendered lines a run of text wraps to. Empty text still
    /// reserves one line.
    pub fn wrapped_lines(&self, text: &str) -> u32 {
        let chars = text.chars().count() as u32;
        chars.div_ceil(self.chars_per_line).max(1)
    }

    /// Estimated rendered height of a single block.
    pub fn estimate(&self, block: &ContentBlock) -> u32 {
        match block {
            ContentBlock::BulletList { heading, items } => {
                let heading = if heading.is_some() {
                    self.heading_height
                } else {
                    0
                };
                let body: u32 = items
                    .iter()
                    .map(|item| self.bullet_height * self.wrapped_lines(item))
                    .sum();
                heading + body
            }
            ContentBlock::Image { .. } => self.image_height,
            ContentBlock::Callout { text } => {
                self.callout_base_height
                    + self.callout_line_height * (self.wrapped_lines(text) - 1)
            }
            ContentBlock::Paragraph { text } => {
                self.paragraph_line_height * self.wrapped_lines(text)
            }
        }
    }

    /// Estimated height of a block sequence including inter-block spacing.
    pub fn estimate_slide(&self, blocks: &[ContentBlock]) -> u32 {
        let content: u32 = blocks.iter().map(|b| self.estimate(b)).sum();
        let gaps = blocks.len().saturating_sub(1) as u32;
        content + self.block_spacing * gaps
    }

    /// Height after appending `next` to a slide whose content currently
    /// measures `current` over `count` blocks.
    pub fn height_with(&self, current: u32, count: usize, next: &ContentBlock) -> u32 {
        let gap = if count == 0 { 0 } else { self.block_spacing };
        current + gap + self.estimate(next)
    }
}
