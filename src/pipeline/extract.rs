use std::collections::HashMap;

use indexmap::IndexMap;
use regex::Regex;

use crate::docx::source::{BookmarkStart, ParagraphChild, SourceParagraph};
use crate::error::ConvertError;

/// Style name used for paragraphs without a `w:pStyle`.
pub const DEFAULT_STYLE: &str = "Paragraph";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParagraphRecord {
    pub index: usize,
    pub style_name: String,
    pub text: String,
    pub figure_id: Option<String>,
}

impl ParagraphRecord {
    pub fn extract(para: &SourceParagraph, anchors: &FigureAnchors) -> Self {
        let mut text = String::new();
        for child in &para.children {
            match child {
                ParagraphChild::Run(run) => text.extend(run.texts.iter().map(String::as_str)),
                ParagraphChild::Hyperlink(runs) => {
                    for run in runs {
                        text.extend(run.texts.iter().map(String::as_str));
                    }
                }
                ParagraphChild::Other(_) => {}
            }
        }
        ParagraphRecord {
            index: para.index,
            style_name: para
                .style
                .clone()
                .unwrap_or_else(|| DEFAULT_STYLE.to_string()),
            text,
            figure_id: anchors.figure_for(para.index).map(str::to_string),
        }
    }

    /// Text tested against wrap-group triggers.
    pub fn trigger_text(&self) -> &str {
        self.text.trim()
    }
}

/// Paragraph index -> figure id, built from figure-numbering bookmarks.
#[derive(Clone, Debug, Default)]
pub struct FigureAnchors {
    by_paragraph: HashMap<usize, String>,
}

impl FigureAnchors {
    /// Bookmarks named `<prefix><digits>...` yield figure id `<id_prefix><digits>`. When two
    /// bookmarks derive the same id the later one owns it; when one paragraph carries several
    /// ids the first derived id wins.
    pub fn build(
        bookmarks: &[BookmarkStart],
        bookmark_prefix: &str,
        id_prefix: &str,
    ) -> Result<Self, ConvertError> {
        let re = Regex::new(&format!(r"^{}(\d+)", regex::escape(bookmark_prefix))).map_err(|e| {
            ConvertError::config("figures.bookmark_prefix", format!("invalid pattern: {e}"))
        })?;

        let mut by_id: IndexMap<String, usize> = IndexMap::new();
        for bookmark in bookmarks {
            let Some(caps) = re.captures(&bookmark.name) else {
                continue;
            };
            let Some(paragraph) = bookmark.paragraph else {
                continue;
            };
            by_id.insert(format!("{id_prefix}{}", &caps[1]), paragraph);
        }

        let mut by_paragraph: HashMap<usize, String> = HashMap::new();
        for (id, paragraph) in by_id {
            by_paragraph.entry(paragraph).or_insert(id);
        }
        Ok(Self { by_paragraph })
    }

    pub fn figure_for(&self, paragraph: usize) -> Option<&str> {
        self.by_paragraph.get(&paragraph).map(String::as_str)
    }
}
