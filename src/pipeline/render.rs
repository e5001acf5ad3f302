use crate::pipeline::mapping::StyleRule;
use crate::pipeline::tree::Element;

/// One rendered paragraph plus the routing information the assembler needs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderedElement {
    pub element: Element,
    pub wrap_group: Option<String>,
    pub figure_id: Option<String>,
}

impl RenderedElement {
    pub fn anchored(mut self, figure_id: Option<String>) -> Self {
        self.figure_id = figure_id;
        self
    }
}

pub fn render(rule: &StyleRule, text: &str) -> RenderedElement {
    let mut element = Element::new(rule.tag.as_str());
    element.attributes = rule.attributes.clone();
    match &rule.child_tag {
        Some(child) => element.children.push(Element::new(child.as_str()).with_text(text)),
        None => element.text = text.to_string(),
    }
    RenderedElement {
        element,
        wrap_group: rule.wrap_group.clone(),
        figure_id: None,
    }
}

#[cfg(test)]
mod tests {
    use super::render;
    use crate::pipeline::mapping::StyleRule;

    #[test]
    fn renders_outer_tag_with_raw_attributes() {
        let rule = StyleRule::parse("Reference", r#"ref|style="REF""#).expect("rule");
        let out = render(&rule, "Doe & Roe <2020>");
        assert_eq!(
            out.element.to_xml_fragment().expect("xml"),
            r#"<ref style="REF">Doe &amp; Roe &lt;2020&gt;</ref>"#
        );
        assert_eq!(out.wrap_group, None);
    }

    #[test]
    fn renders_child_wrapper_and_keeps_wrap_group() {
        let rule = StyleRule::parse("Bio", "BIO-p|child=p|wrap=BIO").expect("rule");
        let out = render(&rule, " untrimmed ");
        assert_eq!(
            out.element.to_xml_fragment().expect("xml"),
            "<BIO-p><p> untrimmed </p></BIO-p>"
        );
        assert_eq!(out.wrap_group.as_deref(), Some("BIO"));
    }

    #[test]
    fn single_quoted_attribute_stays_well_formed() {
        let rule = StyleRule::parse("Quote", r#"title|data-x='say "hi"'"#).expect("rule");
        let out = render(&rule, "t");
        assert_eq!(
            out.element.to_xml_fragment().expect("xml"),
            r#"<title data-x='say "hi"'>t</title>"#
        );
    }

    #[test]
    fn rendering_is_deterministic() {
        let rule = StyleRule::parse("Heading", r#"title|style="EH""#).expect("rule");
        let a = render(&rule, "REFERENCES").element.to_xml_fragment().expect("xml");
        let b = render(&rule, "REFERENCES").element.to_xml_fragment().expect("xml");
        assert_eq!(a, b);
    }

    #[test]
    fn empty_text_renders_empty_element() {
        let rule = StyleRule::fallback("Body Text");
        assert_eq!(render(&rule, "").element.to_xml_fragment().expect("xml"), "<BodyText/>");
    }
}
