//! Slide Builder — accumulates blocks into one slide at a time without overflowing it.
#![allow(dead_code)]
//!
//! Pagination is driven one block at a time: the caller offers a block with
//! `add`; when the builder answers `Admission::Full`, the caller finishes the
//! current slide, starts the next part and offers the same block again.

use tracing::debug;

use crate::errors::PackError;
use crate::layout::metrics::LayoutMetrics;
use crate::models::slide::{continuation_title, ContentBlock, Density, Slide, SlideWarning};

/// Result of offering a block to the builder.
#[derive(Debug, PartialEq, Eq)]
pub enum Admission {
    Added,
    /// The block would overflow the open slide; ownership goes back to the caller.
    Full(ContentBlock),
}

impl Admission {
    pub fn is_added(&self) -> bool {
        matches!(self, Admission::Added)
    }
}

#[derive(Debug)]
struct OpenSlide {
    title: String,
    subtitle: Option<String>,
    continuation_index: Option<u32>,
    blocks: Vec<ContentBlock>,
    height: u32,
    warnings: Vec<SlideWarning>,
}

/// Stateful single-slide accumulator.
#[derive(Debug)]
pub struct SlideBuilder {
    metrics: LayoutMetrics,
    /// Bound additions by `target` (capacity × safety margin) instead of capacity.
    use_safety_margin: bool,
    open: Option<OpenSlide>,
}

impl SlideBuilder {
    /// Builder that admits blocks up to the full slide capacity.
    pub fn new(metrics: LayoutMetrics) -> Self {
        Self {
            metrics,
            use_safety_margin: false,
            open: None,
        }
    }

    /// Builder that admits blocks only up to the safety-margined target.
    pub fn with_safety_margin(metrics: LayoutMetrics) -> Self {
        Self {
            metrics,
            use_safety_margin: true,
            open: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.open.is_some()
    }

    /// True when no slide is open or the open slide has no blocks yet.
    pub fn is_empty(&self) -> bool {
        self.open.as_ref().map_or(true, |s| s.blocks.is_empty())
    }

    /// Estimated height of the open slide's content (0 when closed).
    pub fn current_height(&self) -> u32 {
        self.open.as_ref().map_or(0, |s| s.height)
    }

    /// Opens a fresh slide.
    pub fn start(&mut self, title: &str, subtitle: Option<&str>) -> Result<(), PackError> {
        self.open_slide(title.to_string(), subtitle.map(str::to_string), None)
    }

    /// Opens part `index` of a slide titled `base_title`. Part 1 keeps the
    /// subtitle; later parts drop it and carry a continuation marker.
    pub fn start_part(
        &mut self,
        base_title: &str,
        subtitle: Option<&str>,
        index: u32,
    ) -> Result<(), PackError> {
        if index <= 1 {
            self.start(base_title, subtitle)
        } else {
            self.open_slide(continuation_title(base_title, index), None, Some(index))
        }
    }

    fn open_slide(
        &mut self,
        title: String,
        subtitle: Option<String>,
        continuation_index: Option<u32>,
    ) -> Result<(), PackError> {
        if self.open.is_some() {
            return Err(PackError::InvalidState("start called while a slide is open"));
        }
        self.open = Some(OpenSlide {
            title,
            subtitle,
            continuation_index,
            blocks: Vec::new(),
            height: 0,
            warnings: Vec::new(),
        });
        Ok(())
    }

    fn limit(&self, has_subtitle: bool) -> u32 {
        if self.use_safety_margin {
            self.metrics.target(has_subtitle)
        } else {
            self.metrics.capacity(has_subtitle)
        }
    }

    /// Whether `block` fits on the open slide. False when no slide is open.
    pub fn can_add(&self, block: &ContentBlock) -> bool {
        match &self.open {
            Some(slide) => {
                let height = self
                    .metrics
                    .height_with(slide.height, slide.blocks.len(), block);
                height <= self.limit(slide.subtitle.is_some())
            }
            None => false,
        }
    }

    /// Appends `block` if it fits; otherwise hands it back untouched.
    pub fn add(&mut self, block: ContentBlock) -> Result<Admission, PackError> {
        if self.open.is_none() {
            return Err(PackError::InvalidState("add called before start"));
        }
        if !self.can_add(&block) {
            return Ok(Admission::Full(block));
        }
        let metrics = self.metrics;
        let slide = self
            .open
            .as_mut()
            .ok_or(PackError::InvalidState("add called before start"))?;
        slide.height = metrics.height_with(slide.height, slide.blocks.len(), &block);
        debug!(kind = block.kind(), height = slide.height, "Block added to slide");
        slide.blocks.push(block);
        Ok(Admission::Added)
    }

    /// Places a block that cannot fit even an empty slide alone on the open,
    /// empty slide. The block is kept whole and the slide carries a warning.
    ///
    /// A block that is taller than a subtitled slide but fits one without a
    /// subtitle makes the slide drop its subtitle.
    pub fn place_atomic(&mut self, block: ContentBlock) -> Result<(), PackError> {
        let estimated_height = self.metrics.estimate(&block);
        let (empty, mut has_subtitle) = match &self.open {
            Some(slide) => (slide.blocks.is_empty(), slide.subtitle.is_some()),
            None => return Err(PackError::InvalidState("place_atomic called before start")),
        };
        if !empty {
            return Err(PackError::InvalidState(
                "place_atomic requires an empty slide",
            ));
        }
        let drop_subtitle = has_subtitle
            && estimated_height > self.metrics.capacity(true)
            && estimated_height <= self.metrics.capacity(false);
        if drop_subtitle {
            has_subtitle = false;
        }
        let target = self.limit(has_subtitle);
        let slide = self
            .open
            .as_mut()
            .ok_or(PackError::InvalidState("place_atomic called before start"))?;
        if drop_subtitle {
            debug!(title = %slide.title, estimated_height, "Dropping subtitle to fit block");
            slide.subtitle = None;
        }
        if estimated_height > target {
            slide.warnings.push(SlideWarning::CapacityExceededByAtomicBlock {
                block_index: 0,
                estimated_height,
                target,
            });
        }
        slide.height = estimated_height;
        slide.blocks.push(block);
        Ok(())
    }

    /// Closes the open slide and returns it.
    pub fn finish(&mut self) -> Result<Slide, PackError> {
        let slide = self
            .open
            .take()
            .ok_or(PackError::InvalidState("finish called with no open slide"))?;
        let density = if slide.height > self.metrics.target(slide.subtitle.is_some()) {
            Density::Dense
        } else {
            Density::Clean
        };
        Ok(Slide {
            title: slide.title,
            subtitle: slide.subtitle,
            blocks: slide.blocks,
            continuation_index: slide.continuation_index,
            density,
            warnings: slide.warnings,
        })
    }
}
