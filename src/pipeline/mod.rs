pub mod assemble;
pub mod config;
pub mod extract;
pub mod mapping;
pub mod render;
pub mod restructure;
pub mod transform;
pub mod tree;
pub mod wrap;

use std::path::Path;

use anyhow::Context;

use crate::docx::package::DocxPackage;
use crate::docx::source::SourceDocument;
use crate::progress::ConsoleProgress;

pub use config::{init_default_config, ConvertConfig};
pub use transform::{transform, Diagnostics, Transformed};

pub struct ConvertPipeline {
    cfg: ConvertConfig,
    progress: ConsoleProgress,
}

impl ConvertPipeline {
    pub fn new(cfg: ConvertConfig, progress: ConsoleProgress) -> Self {
        Self { cfg, progress }
    }

    pub fn convert_docx(&self, input: &Path, output: &Path) -> anyhow::Result<Diagnostics> {
        self.progress.info(format!("Read DOCX: {}", input.display()));
        let pkg = DocxPackage::read(input)?;
        let out = self.convert_package(&pkg)?;

        let xml = out.root.to_xml_document().context("serialize output")?;
        std::fs::write(output, xml)
            .with_context(|| format!("write output: {}", output.display()))?;

        self.report(&out.diagnostics);
        self.progress
            .info(format!("Done. Output saved to: {}", output.display()));
        Ok(out.diagnostics)
    }

    pub fn convert_package(&self, pkg: &DocxPackage) -> anyhow::Result<Transformed> {
        let entry = pkg.main_document()?;
        let doc = SourceDocument::parse(&entry.name, &entry.data)?;
        self.progress.info(format!(
            "Paragraphs: {} (styles mapped: {})",
            doc.paragraphs.len(),
            self.cfg.registry.len()
        ));
        Ok(transform(&doc, &self.cfg, &self.progress)?)
    }

    fn report(&self, diagnostics: &Diagnostics) {
        if diagnostics.grouped_references > 0 {
            self.progress.info(format!(
                "Grouped {} references",
                diagnostics.grouped_references
            ));
        }
        for warning in &diagnostics.warnings {
            self.progress.warn(warning);
        }
        if !diagnostics.unmapped_styles.is_empty() {
            let names: Vec<&str> = diagnostics
                .unmapped_styles
                .iter()
                .map(String::as_str)
                .collect();
            self.progress
                .warn(format!("Unmapped styles: {}", names.join(", ")));
        }
    }
}
