#![allow(dead_code)]

use serde::{Deserialize, Serialize};

/// One atomic unit of slide content.
///
/// Blocks are the packing unit: they are moved between slides whole and are
/// never truncated or re-worded by the packer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    BulletList {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        heading: Option<String>,
        items: Vec<String>,
    },
    Image {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        caption: Option<String>,
    },
    Callout {
        text: String,
    },
    Paragraph {
        text: String,
    },
}

impl ContentBlock {
    /// Short label used in log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            ContentBlock::BulletList { .. } => "bullet_list",
            ContentBlock::Image { .. } => "image",
            ContentBlock::Callout { .. } => "callout",
            ContentBlock::Paragraph { .. } => "paragraph",
        }
    }
}

/// Density classification of a finished slide.
///
/// `Dense` slides are within capacity but above the safety threshold; the
/// renderer may reduce spacing or emphasis for them. The packer never changes
/// block content because of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Density {
    Clean,
    Dense,
}

/// Data-quality warning attached to a slide.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SlideWarning {
    /// A single block is taller than the split target and was placed alone.
    CapacityExceededByAtomicBlock {
        block_index: usize,
        estimated_height: u32,
        target: u32,
    },
}

/// A finished slide. Immutable once returned by `SlideBuilder::finish`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slide {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    pub blocks: Vec<ContentBlock>,
    /// `Some(n)` with n ≥ 2 for continuation parts of an oversized slide.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub continuation_index: Option<u32>,
    pub density: Density,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<SlideWarning>,
}

impl Slide {
    pub fn has_subtitle(&self) -> bool {
        self.subtitle.is_some()
    }

    pub fn is_continuation(&self) -> bool {
        self.continuation_index.is_some_and(|n| n > 1)
    }
}

/// Title used for the n-th part (n ≥ 2) of a slide that had to be split.
pub fn continuation_title(base: &str, index: u32) -> String {
    format!("{base} (cont. {index})")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_block_json_uses_type_tag() {
        let block = ContentBlock::BulletList {
            heading: None,
            items: vec!["Ownership moves values".to_string()],
        };
        let json = serde_json::to_value(&block).unwrap();
        assert_eq!(json["type"], "bullet_list");
        assert!(json.get("heading").is_none());
    }

    #[test]
    fn test_content_block_rejects_unknown_type() {
        let result: Result<ContentBlock, _> =
            serde_json::from_str(r#"{"type": "video", "url": "x"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_continuation_title_format() {
        assert_eq!(continuation_title("Borrowing", 2), "Borrowing (cont. 2)");
    }

    #[test]
    fn test_first_part_is_not_a_continuation() {
        let slide = Slide {
            title: "Traits".to_string(),
            subtitle: Some("Shared behaviour".to_string()),
            blocks: vec![],
            continuation_index: Some(1),
            density: Density::Clean,
            warnings: vec![],
        };
        assert!(!slide.is_continuation());
        assert!(slide.has_subtitle());
    }
}
