use indexmap::IndexMap;

use crate::pipeline::tree::Element;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WrapGroupBuffer {
    pub elements: Vec<Element>,
    /// Never reverts once set; the trigger element then sits at index 0.
    pub started: bool,
}

impl WrapGroupBuffer {
    fn push(&mut self, element: Element, triggered: bool) -> bool {
        if triggered && !self.started {
            self.elements.insert(0, element);
            self.started = true;
            return true;
        }
        self.elements.push(element);
        false
    }
}

/// Wrap buffers keyed by group name, in first-seen order.
#[derive(Clone, Debug, Default)]
pub struct WrapBuffers {
    groups: IndexMap<String, WrapGroupBuffer>,
}

impl WrapBuffers {
    /// Buffers `element` under `group`. Returns true when this element started the group.
    pub fn push(
        &mut self,
        group: &str,
        element: Element,
        trigger: Option<&str>,
        trimmed_text: &str,
    ) -> bool {
        let triggered = trigger.is_some_and(|t| trimmed_text.contains(t));
        self.groups
            .entry(group.to_string())
            .or_default()
            .push(element, triggered)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &WrapGroupBuffer)> {
        self.groups.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Started groups become one `<group>` element; unstarted groups degrade to their
    /// elements in buffer order.
    pub fn finish(self) -> Vec<Element> {
        let mut out = Vec::new();
        for (group, buffer) in self.groups {
            if buffer.started {
                out.push(Element::new(group).with_children(buffer.elements));
            } else {
                out.extend(buffer.elements);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::WrapBuffers;
    use crate::pipeline::tree::Element;

    fn p(text: &str) -> Element {
        Element::new("p").with_text(text)
    }

    #[test]
    fn trigger_leads_the_block_even_when_late() {
        let mut wraps = WrapBuffers::default();
        assert!(!wraps.push("BIO", p("one"), None, "one"));
        assert!(!wraps.push("BIO", p("two"), None, "two"));
        assert!(wraps.push("BIO", p("Author bio"), Some("Author bio"), "Author bio"));
        assert!(!wraps.push("BIO", p("three"), None, "three"));

        let out = wraps.finish();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].tag, "BIO");
        let texts: Vec<&str> = out[0].children.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, ["Author bio", "one", "two", "three"]);
    }

    #[test]
    fn only_first_trigger_starts_the_group() {
        let mut wraps = WrapBuffers::default();
        wraps.push("BIO", p("x"), None, "x");
        assert!(wraps.push("BIO", p("Author bio 1"), Some("Author bio"), "Author bio 1"));
        assert!(!wraps.push("BIO", p("Author bio 2"), Some("Author bio"), "Author bio 2"));

        let (_, buffer) = wraps.iter().next().expect("buffer");
        let texts: Vec<&str> = buffer.elements.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, ["Author bio 1", "x", "Author bio 2"]);
    }

    #[test]
    fn unstarted_group_degrades_to_plain_elements() {
        let mut wraps = WrapBuffers::default();
        wraps.push("NOTES", p("a"), Some("Notes"), "a");
        wraps.push("NOTES", p("b"), None, "b");

        let out = wraps.finish();
        assert_eq!(out, vec![p("a"), p("b")]);
        assert!(out.iter().all(|el| el.tag != "NOTES"));
    }

    #[test]
    fn groups_finish_in_first_seen_order() {
        let mut wraps = WrapBuffers::default();
        wraps.push("B", p("b"), Some("b"), "b");
        wraps.push("A", p("a"), Some("a"), "a");
        wraps.push("B", p("b2"), None, "b2");

        let tags: Vec<String> = wraps.finish().into_iter().map(|el| el.tag).collect();
        assert_eq!(tags, ["B", "A"]);
    }
}
