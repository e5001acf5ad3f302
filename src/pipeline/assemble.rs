use crate::pipeline::render::RenderedElement;
use crate::pipeline::tree::Element;
use crate::pipeline::wrap::WrapBuffers;

pub const ROOT_TAG: &str = "document";

/// Main output sequence in document order.
pub struct Assembler {
    container_tag: String,
    main: Vec<Element>,
}

impl Assembler {
    pub fn new(container_tag: impl Into<String>) -> Self {
        Self {
            container_tag: container_tag.into(),
            main: Vec::new(),
        }
    }

    pub fn emit(&mut self, rendered: RenderedElement) {
        let element = match rendered.figure_id {
            Some(id) => Element::new(self.container_tag.as_str())
                .with_attribute("id", id)
                .with_child(rendered.element),
            None => rendered.element,
        };
        self.main.push(element);
    }

    pub fn finish(self, wraps: WrapBuffers) -> Element {
        Element::new(ROOT_TAG)
            .with_children(self.main)
            .with_children(wraps.finish())
    }
}
