use std::io::Write;

use anyhow::Context;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

/// Output tree node. Text is stored unescaped; attribute values are stored raw.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Element {
    pub tag: String,
    pub attributes: Vec<(String, String)>,
    pub text: String,
    pub children: Vec<Element>,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Element {
            tag: tag.into(),
            ..Default::default()
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((name.into(), value.into()));
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_children(mut self, children: impl IntoIterator<Item = Element>) -> Self {
        self.children.extend(children);
        self
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Pre-order search including `self`; `self` has the empty path.
    pub fn find_path(&self, pred: impl Fn(&Element) -> bool) -> Option<Vec<usize>> {
        fn walk(el: &Element, pred: &dyn Fn(&Element) -> bool, path: &mut Vec<usize>) -> bool {
            if pred(el) {
                return true;
            }
            for (i, child) in el.children.iter().enumerate() {
                path.push(i);
                if walk(child, pred, path) {
                    return true;
                }
                path.pop();
            }
            false
        }

        let mut path = Vec::new();
        walk(self, &pred, &mut path).then_some(path)
    }

    pub fn at_mut(&mut self, path: &[usize]) -> Option<&mut Element> {
        path.iter()
            .try_fold(self, |el, &i| el.children.get_mut(i))
    }

    /// Detaches the node at `path`. The root (empty path) cannot be detached.
    pub fn remove_at(&mut self, path: &[usize]) -> Option<Element> {
        let (&last, parent) = path.split_last()?;
        let parent = self.at_mut(parent)?;
        (last < parent.children.len()).then(|| parent.children.remove(last))
    }

    /// Inserts `el` so that it ends up at `path`; the parent must exist.
    pub fn insert_at(&mut self, path: &[usize], el: Element) -> bool {
        let Some((&last, parent)) = path.split_last() else {
            return false;
        };
        match self.at_mut(parent) {
            Some(parent) if last <= parent.children.len() => {
                parent.children.insert(last, el);
                true
            }
            _ => false,
        }
    }

    pub fn to_xml_fragment(&self) -> anyhow::Result<String> {
        let mut writer = Writer::new(Vec::new());
        write_element(&mut writer, self)?;
        String::from_utf8(writer.into_inner()).context("output is utf-8")
    }

    /// Serializes as a standalone document with an XML declaration and indentation.
    pub fn to_xml_document(&self) -> anyhow::Result<String> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
            .context("write decl")?;
        write_element(&mut writer, self)?;
        let mut out = writer.into_inner();
        out.push(b'\n');
        String::from_utf8(out).context("output is utf-8")
    }
}

fn write_element<W: Write>(writer: &mut Writer<W>, el: &Element) -> anyhow::Result<()> {
    let mut content = el.tag.clone();
    for (k, v) in &el.attributes {
        // A raw value holding `"` can only have come from a single-quoted attribute.
        let q = if v.contains('"') { '\'' } else { '"' };
        content.push_str(&format!(" {k}={q}{v}{q}"));
    }
    let start = BytesStart::from_content(content, el.tag.len());

    if el.text.is_empty() && el.children.is_empty() {
        writer
            .write_event(Event::Empty(start))
            .with_context(|| format!("write <{}/>", el.tag))?;
        return Ok(());
    }
    writer
        .write_event(Event::Start(start))
        .with_context(|| format!("write <{}>", el.tag))?;
    if !el.text.is_empty() {
        writer
            .write_event(Event::Text(BytesText::new(&el.text)))
            .with_context(|| format!("write text of <{}>", el.tag))?;
    }
    for child in &el.children {
        write_element(writer, child)?;
    }
    writer
        .write_event(Event::End(BytesEnd::new(el.tag.as_str())))
        .with_context(|| format!("write </{}>", el.tag))?;
    Ok(())
}
