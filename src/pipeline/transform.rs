use std::borrow::Cow;
use std::collections::BTreeSet;
use std::path::Path;

use anyhow::Context;
use serde::Serialize;

use crate::docx::source::{SourceDocument, SourceParagraph};
use crate::error::ConvertError;
use crate::pipeline::assemble::Assembler;
use crate::pipeline::config::ConvertConfig;
use crate::pipeline::extract::{FigureAnchors, ParagraphRecord};
use crate::pipeline::mapping::StyleRule;
use crate::pipeline::render::render;
use crate::pipeline::restructure::{restructure, BioRelocation};
use crate::pipeline::tree::Element;
use crate::pipeline::wrap::WrapBuffers;
use crate::progress::ConsoleProgress;

#[derive(Clone, Debug, Default, Serialize, PartialEq, Eq)]
pub struct Diagnostics {
    pub paragraphs: usize,
    pub figures: usize,
    pub unmapped_styles: BTreeSet<String>,
    pub started_groups: Vec<String>,
    pub unstarted_groups: Vec<String>,
    pub grouped_references: usize,
    pub warnings: Vec<String>,
}

impl Diagnostics {
    pub fn write_json(&self, path: &Path) -> anyhow::Result<()> {
        let text = serde_json::to_string_pretty(self).context("serialize diagnostics")?;
        std::fs::write(path, text)
            .with_context(|| format!("write diagnostics: {}", path.display()))?;
        Ok(())
    }
}

pub struct Transformed {
    pub root: Element,
    pub diagnostics: Diagnostics,
}

/// Per-document state threaded through the paragraph loop.
pub struct TransformContext<'a> {
    config: &'a ConvertConfig,
    anchors: FigureAnchors,
    wraps: WrapBuffers,
    assembler: Assembler,
    diagnostics: Diagnostics,
}

impl<'a> TransformContext<'a> {
    pub fn new(config: &'a ConvertConfig, doc: &SourceDocument) -> Result<Self, ConvertError> {
        let anchors = FigureAnchors::build(
            &doc.bookmarks,
            &config.figures.bookmark_prefix,
            &config.figures.id_prefix,
        )?;
        Ok(Self {
            config,
            anchors,
            wraps: WrapBuffers::default(),
            assembler: Assembler::new(config.figures.container_tag.as_str()),
            diagnostics: Diagnostics::default(),
        })
    }

    pub fn process(&mut self, para: &SourceParagraph, progress: &ConsoleProgress) {
        let record = ParagraphRecord::extract(para, &self.anchors);
        let rule = match self.config.registry.get(&record.style_name) {
            Some(rule) => Cow::Borrowed(rule),
            None => {
                self.diagnostics
                    .unmapped_styles
                    .insert(record.style_name.clone());
                Cow::Owned(StyleRule::fallback(&record.style_name))
            }
        };
        progress.debug(format!(
            "style={} tag={} wrap={} trigger={} text={:?}",
            record.style_name,
            rule.tag,
            rule.wrap_group.as_deref().unwrap_or("-"),
            rule.trigger_text.as_deref().unwrap_or("-"),
            record.trigger_text()
        ));

        self.diagnostics.paragraphs += 1;
        let rendered = render(&rule, &record.text);
        match rendered.wrap_group.clone() {
            Some(group) => {
                if self.wraps.push(
                    &group,
                    rendered.element,
                    rule.trigger_text.as_deref(),
                    record.trigger_text(),
                ) {
                    progress.debug(format!("wrap group {group} started"));
                }
            }
            None => {
                if record.figure_id.is_some() {
                    self.diagnostics.figures += 1;
                }
                self.assembler.emit(rendered.anchored(record.figure_id));
            }
        }
    }

    pub fn finish(mut self) -> (Element, Diagnostics) {
        for (group, buffer) in self.wraps.iter() {
            if buffer.started {
                self.diagnostics.started_groups.push(group.to_string());
            } else {
                self.diagnostics.unstarted_groups.push(group.to_string());
            }
        }
        (self.assembler.finish(self.wraps), self.diagnostics)
    }
}

/// Runs extraction, rendering, wrap buffering and assembly over every paragraph, then the
/// restructuring pass over the assembled tree.
pub fn transform(
    doc: &SourceDocument,
    config: &ConvertConfig,
    progress: &ConsoleProgress,
) -> Result<Transformed, ConvertError> {
    let mut ctx = TransformContext::new(config, doc)?;
    for para in &doc.paragraphs {
        ctx.process(para, progress);
    }
    let (mut root, mut diagnostics) = ctx.finish();

    if config.restructure.enabled {
        let report = restructure(&mut root, &config.restructure);
        diagnostics.grouped_references = report.grouped_references;
        if let BioRelocation::Skipped(reason) = report.bio {
            diagnostics
                .warnings
                .push(format!("author bio not relocated: {reason}"));
        }
    }

    Ok(Transformed { root, diagnostics })
}
