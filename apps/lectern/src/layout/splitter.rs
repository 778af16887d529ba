//! Overflow Splitter — repacks an oversized candidate slide into compliant parts.
#![allow(dead_code)]
//!
//! # Classification
//! - height ≤ target (capacity × 0.85) → `Fit::Clean`, emitted as-is
//! - target < height ≤ capacity         → `Fit::Dense`, emitted as-is, flagged for the renderer
//! - height > capacity                  → `Fit::Overflow`, split
//!
//! # Split rules
//! Blocks are packed greedily in their original order against `target`. A block is
//! never divided: one that exceeds `target` on its own is placed alone and the part
//! carries a `CapacityExceededByAtomicBlock` warning. Parts after the first drop the
//! subtitle and are titled `"<title> (cont. N)"`, N starting at 2. A leading block
//! that only fits without a subtitle makes part 1 drop its subtitle too.

use tracing::{debug, warn};

use crate::errors::PackError;
use crate::layout::builder::{Admission, SlideBuilder};
use crate::layout::metrics::LayoutMetrics;
use crate::models::slide::{ContentBlock, Slide};

// ────────────────────────────────────────────────────────────────────────────
// Types
// ────────────────────────────────────────────────────────────────────────────

/// How a block sequence sits against a slide's capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fit {
    Clean,
    Dense,
    Overflow,
}

/// Slides produced for one candidate, plus the count of parts that still exceed
/// capacity (only possible when a single block is taller than a whole slide).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitOutcome {
    pub slides: Vec<Slide>,
    pub parts_over_capacity: u32,
}

// ────────────────────────────────────────────────────────────────────────────
// Core functions
// ────────────────────────────────────────────────────────────────────────────

/// Classifies a block sequence for a slide with or without a subtitle.
pub fn classify(metrics: &LayoutMetrics, blocks: &[ContentBlock], has_subtitle: bool) -> Fit {
    let height = metrics.estimate_slide(blocks);
    if height > metrics.capacity(has_subtitle) {
        Fit::Overflow
    } else if height > metrics.target(has_subtitle) {
        Fit::Dense
    } else {
        Fit::Clean
    }
}

/// Classifies a finished slide against its own subtitle state.
pub fn classify_slide(metrics: &LayoutMetrics, slide: &Slide) -> Fit {
    classify(metrics, &slide.blocks, slide.has_subtitle())
}

/// Turns a candidate slide into one or more slides that each respect capacity.
///
/// Candidates that already fit (cleanly or densely) come back as a single slide
/// with their blocks untouched.
pub fn split(
    metrics: &LayoutMetrics,
    title: &str,
    subtitle: Option<&str>,
    blocks: Vec<ContentBlock>,
) -> Result<SplitOutcome, PackError> {
    let fit = classify(metrics, &blocks, subtitle.is_some());
    let builder = match fit {
        Fit::Overflow => SlideBuilder::with_safety_margin(*metrics),
        Fit::Clean | Fit::Dense => SlideBuilder::new(*metrics),
    };

    let slides = pack_greedy(builder, title, subtitle, blocks)?;

    let parts_over_capacity = slides
        .iter()
        .filter(|s| metrics.estimate_slide(&s.blocks) > metrics.capacity(s.has_subtitle()))
        .count() as u32;

    if fit == Fit::Overflow {
        debug!(title, parts = slides.len(), "Split overflowing slide");
    }
    if parts_over_capacity > 0 {
        warn!(
            title,
            parts_over_capacity, "Atomic block exceeds slide capacity; kept whole"
        );
    }

    Ok(SplitOutcome {
        slides,
        parts_over_capacity,
    })
}

/// Repacks an already-finished slide, discarding the original.
pub fn repack(metrics: &LayoutMetrics, slide: Slide) -> Result<SplitOutcome, PackError> {
    split(
        metrics,
        &slide.title,
        slide.subtitle.as_deref(),
        slide.blocks,
    )
}

// ────────────────────────────────────────────────────────────────────────────
// Internal helpers
// ────────────────────────────────────────────────────────────────────────────

/// Greedy first-fit in original order. Parts are opened lazily so a trailing
/// atomic block never leaves an empty part behind.
fn pack_greedy(
    mut builder: SlideBuilder,
    title: &str,
    subtitle: Option<&str>,
    blocks: Vec<ContentBlock>,
) -> Result<Vec<Slide>, PackError> {
    let mut slides = Vec::new();
    let mut part = 1u32;

    for block in blocks {
        let mut pending = Some(block);
        while let Some(block) = pending.take() {
            if !builder.is_open() {
                builder.start_part(title, subtitle, part)?;
            }
            match builder.add(block)? {
                Admission::Added => {}
                Admission::Full(block) if builder.is_empty() => {
                    builder.place_atomic(block)?;
                    slides.push(builder.finish()?);
                    part += 1;
                }
                Admission::Full(block) => {
                    slides.push(builder.finish()?);
                    part += 1;
                    pending = Some(block);
                }
            }
        }
    }

    if builder.is_open() {
        slides.push(builder.finish()?);
    }
    if slides.is_empty() {
        builder.start_part(title, subtitle, 1)?;
        slides.push(builder.finish()?);
    }
    Ok(slides)
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::slide::{Density, SlideWarning};

    fn flat_metrics() -> LayoutMetrics {
        LayoutMetrics {
            heading_height: 0,
            block_spacing: 0,
            ..LayoutMetrics::default()
        }
    }

    fn bullets(n: usize, len: usize) -> ContentBlock {
        ContentBlock::BulletList {
            heading: None,
            items: (0..n).map(|i| format!("{i}{}", "x".repeat(len - 1))).collect(),
        }
    }

    fn paragraph(lines: usize) -> ContentBlock {
        ContentBlock::Paragraph {
            text: "p".repeat(lines * 80),
        }
    }

    fn assert_within_capacity(metrics: &LayoutMetrics, slides: &[Slide]) {
        for slide in slides {
            let height = metrics.estimate_slide(&slide.blocks);
            assert!(
                height <= metrics.capacity(slide.has_subtitle()),
                "slide '{}' overflows: {height}",
                slide.title
            );
        }
    }

    // ── classify ────────────────────────────────────────────────────────────

    #[test]
    fn test_seven_bullets_fit_cleanly_without_split() {
        let metrics = flat_metrics();
        let blocks = vec![bullets(7, 40)];
        assert_eq!(classify(&metrics, &blocks, false), Fit::Clean);

        let outcome = split(&metrics, "Ownership", None, blocks.clone()).unwrap();
        assert_eq!(outcome.slides.len(), 1);
        assert_eq!(outcome.slides[0].blocks, blocks);
        assert_eq!(outcome.slides[0].density, Density::Clean);
        assert_eq!(outcome.parts_over_capacity, 0);
    }

    #[test]
    fn test_dense_slide_stays_single_and_flagged() {
        let metrics = flat_metrics();
        // 10 × 48 = 480: above 442 target, within 520 capacity.
        let blocks = vec![bullets(10, 20)];
        assert_eq!(classify(&metrics, &blocks, false), Fit::Dense);

        let outcome = split(&metrics, "Traits", None, blocks.clone()).unwrap();
        assert_eq!(outcome.slides.len(), 1);
        assert_eq!(outcome.slides[0].blocks, blocks);
        assert_eq!(outcome.slides[0].density, Density::Dense);
    }

    #[test]
    fn test_capacity_boundary_is_inclusive() {
        let metrics = LayoutMetrics {
            image_height: 460,
            block_spacing: 0,
            ..LayoutMetrics::default()
        };
        let blocks = vec![ContentBlock::Image { caption: None }];
        assert_eq!(classify(&metrics, &blocks, true), Fit::Dense);
    }

    // ── split ───────────────────────────────────────────────────────────────

    #[test]
    fn test_image_and_bullets_split_into_two_parts() {
        let metrics = flat_metrics();
        let image = ContentBlock::Image {
            caption: Some("Stack vs heap".to_string()),
        };
        let list = bullets(4, 40);
        assert_eq!(
            classify(&metrics, &[image.clone(), list.clone()], true),
            Fit::Overflow
        );

        let outcome = split(
            &metrics,
            "Memory",
            Some("Where values live"),
            vec![image.clone(), list.clone()],
        )
        .unwrap();

        assert_eq!(outcome.slides.len(), 2);
        let first = &outcome.slides[0];
        assert_eq!(first.title, "Memory");
        assert_eq!(first.subtitle.as_deref(), Some("Where values live"));
        assert_eq!(first.blocks, vec![image]);

        let second = &outcome.slides[1];
        assert_eq!(second.title, "Memory (cont. 2)");
        assert_eq!(second.subtitle, None);
        assert_eq!(second.continuation_index, Some(2));
        assert_eq!(second.blocks, vec![list]);
        assert_within_capacity(&metrics, &outcome.slides);
    }

    #[test]
    fn test_split_parts_respect_target() {
        let metrics = LayoutMetrics::default();
        let blocks: Vec<ContentBlock> = (0..12).map(|_| paragraph(2)).collect();

        let outcome = split(&metrics, "Iterators", Some("Lazy adapters"), blocks).unwrap();
        assert!(outcome.slides.len() > 1);
        for slide in &outcome.slides {
            let height = metrics.estimate_slide(&slide.blocks);
            assert!(height <= metrics.target(slide.has_subtitle()));
        }
    }

    #[test]
    fn test_split_preserves_block_sequence() {
        let metrics = LayoutMetrics::default();
        let blocks: Vec<ContentBlock> = vec![
            paragraph(3),
            ContentBlock::Image { caption: None },
            bullets(5, 100),
            ContentBlock::Callout {
                text: "Remember: one owner at a time".to_string(),
            },
            paragraph(1),
            bullets(2, 10),
        ];

        let outcome = split(&metrics, "Recap", Some("Week 1"), blocks.clone()).unwrap();
        let rejoined: Vec<ContentBlock> = outcome
            .slides
            .into_iter()
            .flat_map(|s| s.blocks)
            .collect();
        assert_eq!(rejoined, blocks);
    }

    #[test]
    fn test_split_is_deterministic() {
        let metrics = LayoutMetrics::default();
        let blocks: Vec<ContentBlock> = (1..9).map(|n| bullets(n % 4 + 1, 60)).collect();

        let a = split(&metrics, "Generics", None, blocks.clone()).unwrap();
        let b = split(&metrics, "Generics", None, blocks).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_finished_parts_never_classify_as_overflow() {
        let metrics = LayoutMetrics::default();
        let blocks: Vec<ContentBlock> = (0..20).map(|n| paragraph(n % 3 + 1)).collect();

        let outcome = split(&metrics, "Errors", Some("Result and ?"), blocks).unwrap();
        for slide in &outcome.slides {
            let fit = classify_slide(&metrics, slide);
            assert_ne!(fit, Fit::Overflow);
            // classifying again gives the same answer
            assert_eq!(classify_slide(&metrics, slide), fit);
        }
    }

    #[test]
    fn test_atomic_block_above_target_is_placed_alone_with_warning() {
        let metrics = flat_metrics();
        // 10 × 48 = 480: above the 442 target, still within 520 capacity.
        let tall = bullets(10, 20);
        let blocks = vec![bullets(2, 20), tall.clone(), bullets(1, 20)];

        let outcome = split(&metrics, "Macros", None, blocks).unwrap();
        assert_eq!(outcome.slides.len(), 3);
        assert_eq!(outcome.slides[1].blocks, vec![tall]);
        assert!(matches!(
            outcome.slides[1].warnings.as_slice(),
            [SlideWarning::CapacityExceededByAtomicBlock { target: 442, .. }]
        ));
        assert_eq!(outcome.parts_over_capacity, 0);
        assert_within_capacity(&metrics, &outcome.slides);
    }

    #[test]
    fn test_block_taller_than_capacity_is_reported_not_truncated() {
        let metrics = flat_metrics();
        let huge = bullets(12, 20); // 576 > 520
        let outcome = split(&metrics, "Unsafe", None, vec![huge.clone(), bullets(12, 20)]).unwrap();

        assert_eq!(outcome.slides.len(), 2);
        assert_eq!(outcome.slides[0].blocks, vec![huge]);
        assert_eq!(outcome.parts_over_capacity, 2);
    }

    #[test]
    fn test_leading_block_too_tall_for_subtitle_drops_it() {
        let metrics = flat_metrics();
        // 480: over the 460 subtitled capacity, within 520 without a subtitle.
        let tall = bullets(10, 20);
        let tail = bullets(2, 20);

        let outcome = split(
            &metrics,
            "Closures",
            Some("Capturing"),
            vec![tall.clone(), tail.clone()],
        )
        .unwrap();

        assert_eq!(outcome.slides.len(), 2);
        assert_eq!(outcome.slides[0].title, "Closures");
        assert_eq!(outcome.slides[0].subtitle, None);
        assert_eq!(outcome.slides[0].blocks, vec![tall]);
        assert_eq!(outcome.slides[1].title, "Closures (cont. 2)");
        assert_eq!(outcome.slides[1].blocks, vec![tail]);
        assert_eq!(outcome.parts_over_capacity, 0);
        assert_within_capacity(&metrics, &outcome.slides);
    }

    #[test]
    fn test_empty_candidate_yields_single_empty_slide() {
        let metrics = LayoutMetrics::default();
        let outcome = split(&metrics, "Title only", Some("Sub"), vec![]).unwrap();
        assert_eq!(outcome.slides.len(), 1);
        assert!(outcome.slides[0].blocks.is_empty());
        assert_eq!(outcome.slides[0].subtitle.as_deref(), Some("Sub"));
    }

    #[test]
    fn test_repack_consumes_finished_slide() {
        let metrics = flat_metrics();
        let slide = Slide {
            title: "Pattern matching".to_string(),
            subtitle: Some("match and if let".to_string()),
            blocks: vec![ContentBlock::Image { caption: None }, bullets(4, 40)],
            continuation_index: None,
            density: Density::Clean,
            warnings: vec![],
        };

        let outcome = repack(&metrics, slide).unwrap();
        assert_eq!(outcome.slides.len(), 2);
        assert_eq!(outcome.slides[1].title, "Pattern matching (cont. 2)");
    }
}
