use crate::docx::xml::{find_attr, parse_xml_part, XmlEvent, XmlPart};
use crate::error::ConvertError;

/// Text of one run, including `w:t` nested below it (text boxes, drawings).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Run {
    pub texts: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ParagraphChild {
    Run(Run),
    Hyperlink(Vec<Run>),
    Other(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceParagraph {
    /// Position of the paragraph's start tag among all `w:p` elements of the part.
    pub index: usize,
    pub style: Option<String>,
    pub children: Vec<ParagraphChild>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BookmarkStart {
    pub name: String,
    /// Enclosing paragraph; `None` for a bookmark placed directly in the body.
    pub paragraph: Option<usize>,
}

#[derive(Clone, Debug, Default)]
pub struct SourceDocument {
    pub paragraphs: Vec<SourceParagraph>,
    pub bookmarks: Vec<BookmarkStart>,
}

impl SourceDocument {
    pub fn parse(part_name: &str, xml_bytes: &[u8]) -> Result<Self, ConvertError> {
        let part = parse_xml_part(part_name, xml_bytes)
            .map_err(|e| ConvertError::source(format!("{part_name} is not well-formed: {e:#}")))?;
        Self::from_part(&part)
    }

    pub fn from_part(part: &XmlPart) -> Result<Self, ConvertError> {
        let mut walker = Walker::default();
        for ev in &part.events {
            match ev {
                XmlEvent::Start { name, attrs } => {
                    walker.open(name, attrs, false);
                    walker.depth += 1;
                }
                XmlEvent::Empty { name, attrs } => walker.open(name, attrs, true),
                XmlEvent::End { .. } => {
                    walker.close();
                    walker.depth = walker.depth.saturating_sub(1);
                }
                XmlEvent::Text { text } => walker.text(text),
            }
        }

        if !walker.saw_body {
            return Err(ConvertError::source(format!("{} has no w:body", part.name)));
        }
        if walker.doc.paragraphs.is_empty() {
            return Err(ConvertError::source(format!(
                "no paragraphs found in {}",
                part.name
            )));
        }
        Ok(walker.doc)
    }
}

// Depths are element-stack lengths: a `w:p` opened with `depth == n` records `n + 1`, and
// its direct children open while `depth == n + 1`.
#[derive(Default)]
struct OpenParagraph {
    index: usize,
    depth: usize,
    ppr_depth: Option<usize>,
    hyperlink_depth: Option<usize>,
    run_depth: Option<usize>,
    text_depth: Option<usize>,
}

#[derive(Default)]
struct Walker {
    doc: SourceDocument,
    depth: usize,
    open: Vec<OpenParagraph>,
    saw_body: bool,
}

impl Walker {
    fn open(&mut self, name: &str, attrs: &[(String, String)], empty: bool) {
        let here = self.depth;
        match name {
            "w:body" => {
                self.saw_body = true;
                return;
            }
            "w:p" => {
                let index = self.doc.paragraphs.len();
                self.doc.paragraphs.push(SourceParagraph {
                    index,
                    style: None,
                    children: Vec::new(),
                });
                if !empty {
                    self.open.push(OpenParagraph {
                        index,
                        depth: here + 1,
                        ..Default::default()
                    });
                }
                return;
            }
            "w:bookmarkStart" => {
                let bookmark_name = find_attr(attrs, "w:name").unwrap_or_default().to_string();
                self.doc.bookmarks.push(BookmarkStart {
                    name: bookmark_name,
                    paragraph: self.open.last().map(|p| p.index),
                });
                return;
            }
            "w:t" if !empty => self.open_text(here),
            _ => {}
        }

        let Some(p) = self.open.last_mut() else {
            return;
        };
        let para = &mut self.doc.paragraphs[p.index];

        if here == p.depth {
            match name {
                "w:pPr" => {
                    if !empty {
                        p.ppr_depth = Some(here + 1);
                    }
                }
                "w:hyperlink" => {
                    para.children.push(ParagraphChild::Hyperlink(Vec::new()));
                    if !empty {
                        p.hyperlink_depth = Some(here + 1);
                    }
                }
                "w:r" => {
                    para.children.push(ParagraphChild::Run(Run::default()));
                    if !empty {
                        p.run_depth = Some(here + 1);
                    }
                }
                other => para.children.push(ParagraphChild::Other(other.to_string())),
            }
            return;
        }

        match name {
            "w:pStyle" if p.ppr_depth == Some(here) => {
                if let Some(val) = find_attr(attrs, "w:val") {
                    let val = val.trim();
                    if !val.is_empty() {
                        para.style = Some(val.to_string());
                    }
                }
            }
            "w:r" if p.run_depth.is_none() && p.hyperlink_depth.is_some_and(|d| here >= d) => {
                if let Some(ParagraphChild::Hyperlink(runs)) = para.children.last_mut() {
                    runs.push(Run::default());
                    if !empty {
                        p.run_depth = Some(here + 1);
                    }
                }
            }
            _ => {}
        }
    }

    // A `w:t` counts for every open paragraph whose run encloses it, so a text box inside a
    // run contributes to the outer run as well as to its own paragraph.
    fn open_text(&mut self, here: usize) {
        for p in &mut self.open {
            if p.text_depth.is_some() || !p.run_depth.is_some_and(|d| here >= d) {
                continue;
            }
            if let Some(run) = current_run(&mut self.doc.paragraphs[p.index]) {
                run.texts.push(String::new());
                p.text_depth = Some(here + 1);
            }
        }
    }

    fn close(&mut self) {
        let depth = self.depth;
        if self.open.last().is_some_and(|p| p.depth == depth) {
            self.open.pop();
            return;
        }
        for p in &mut self.open {
            for slot in [
                &mut p.ppr_depth,
                &mut p.hyperlink_depth,
                &mut p.run_depth,
                &mut p.text_depth,
            ] {
                if *slot == Some(depth) {
                    *slot = None;
                }
            }
        }
    }

    fn text(&mut self, text: &str) {
        for p in &self.open {
            if p.text_depth.is_none() {
                continue;
            }
            let para = &mut self.doc.paragraphs[p.index];
            if let Some(slot) = current_run(para).and_then(|run| run.texts.last_mut()) {
                slot.push_str(text);
            }
        }
    }
}

fn current_run(para: &mut SourceParagraph) -> Option<&mut Run> {
    match para.children.last_mut()? {
        ParagraphChild::Run(run) => Some(run),
        ParagraphChild::Hyperlink(runs) => runs.last_mut(),
        ParagraphChild::Other(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::{ParagraphChild, SourceDocument};
    use crate::error::ConvertError;

    fn body(inner: &str) -> String {
        format!(
            r#"<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{inner}</w:body></w:document>"#
        )
    }

    #[test]
    fn collects_style_runs_and_hyperlinks() {
        let xml = body(
            r#"<w:p><w:pPr><w:pStyle w:val="Reference"/></w:pPr><w:r><w:t xml:space="preserve">See </w:t></w:r><w:hyperlink r:id="rId4"><w:r><w:t>example</w:t></w:r><w:r><w:t>.org</w:t></w:r></w:hyperlink><w:proofErr w:type="spellStart"/></w:p><w:p/>"#,
        );
        let doc = SourceDocument::parse("word/document.xml", xml.as_bytes()).expect("parse");

        assert_eq!(doc.paragraphs.len(), 2);
        let first = &doc.paragraphs[0];
        assert_eq!(first.style.as_deref(), Some("Reference"));
        assert_eq!(first.children.len(), 3);
        match &first.children[1] {
            ParagraphChild::Hyperlink(runs) => {
                assert_eq!(runs.len(), 2);
                assert_eq!(runs[1].texts, [".org"]);
            }
            other => panic!("unexpected child: {other:?}"),
        }
        assert_eq!(
            first.children[2],
            ParagraphChild::Other("w:proofErr".to_string())
        );
        assert_eq!(doc.paragraphs[1].style, None);
        assert!(doc.paragraphs[1].children.is_empty());
    }

    #[test]
    fn bookmarks_anchor_only_their_enclosing_paragraph() {
        let xml = body(
            r#"<w:p><w:bookmarkStart w:id="0" w:name="HueD_Fig1"/><w:r><w:t>a</w:t></w:r></w:p><w:bookmarkStart w:id="1" w:name="HueD_Fig2"/><w:p><w:r><w:t>b</w:t></w:r></w:p>"#,
        );
        let doc = SourceDocument::parse("word/document.xml", xml.as_bytes()).expect("parse");

        assert_eq!(doc.bookmarks.len(), 2);
        assert_eq!(doc.bookmarks[0].name, "HueD_Fig1");
        assert_eq!(doc.bookmarks[0].paragraph, Some(0));
        assert_eq!(doc.bookmarks[1].paragraph, None);
    }

    #[test]
    fn text_box_text_counts_for_outer_run_and_its_own_paragraph() {
        let xml = body(
            r#"<w:p><w:r><w:t>outer</w:t><w:drawing><w:txbxContent><w:p><w:r><w:t>inner</w:t></w:r></w:p></w:txbxContent></w:drawing><w:t>!</w:t></w:r></w:p>"#,
        );
        let doc = SourceDocument::parse("word/document.xml", xml.as_bytes()).expect("parse");

        assert_eq!(doc.paragraphs.len(), 2);
        match &doc.paragraphs[0].children[0] {
            ParagraphChild::Run(run) => assert_eq!(run.texts.concat(), "outerinner!"),
            other => panic!("unexpected child: {other:?}"),
        }
        match &doc.paragraphs[1].children[0] {
            ParagraphChild::Run(run) => assert_eq!(run.texts.concat(), "inner"),
            other => panic!("unexpected child: {other:?}"),
        }
    }

    #[test]
    fn missing_structure_is_a_source_error() {
        let err = SourceDocument::parse("word/document.xml", b"<w:document/>").unwrap_err();
        assert!(matches!(err, ConvertError::SourceFormat(_)));

        let err = SourceDocument::parse("word/document.xml", body("").as_bytes()).unwrap_err();
        assert_eq!(
            err,
            ConvertError::source("no paragraphs found in word/document.xml")
        );
    }
}
