use serde::Deserialize;

use crate::pipeline::tree::Element;

/// Tag and text markers the two rewrites look for.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RestructureRules {
    pub enabled: bool,
    pub heading_tag: String,
    pub style_attribute: String,
    pub heading_style: String,
    pub references_heading: String,
    pub reference_tag: String,
    pub reference_style: String,
    pub list_tag: String,
    pub bio_heading: String,
    pub bio_tag: String,
}

impl Default for RestructureRules {
    fn default() -> Self {
        Self {
            enabled: true,
            heading_tag: "title".to_string(),
            style_attribute: "style".to_string(),
            heading_style: "EH".to_string(),
            references_heading: "REFERENCES".to_string(),
            reference_tag: "ref".to_string(),
            reference_style: "REF".to_string(),
            list_tag: "ref-list".to_string(),
            bio_heading: "Author bio".to_string(),
            bio_tag: "BIO".to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BioRelocation {
    Moved,
    Skipped(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RestructureReport {
    pub grouped_references: usize,
    pub bio: BioRelocation,
}

pub fn restructure(root: &mut Element, rules: &RestructureRules) -> RestructureReport {
    let grouped_references = group_references(root, rules);
    let bio = relocate_biography(root, rules);
    RestructureReport {
        grouped_references,
        bio,
    }
}

/// Moves the run of reference elements directly after the references heading into a
/// single list element. Returns how many references were moved.
pub fn group_references(root: &mut Element, rules: &RestructureRules) -> usize {
    let references_heading = rules.references_heading.trim().to_uppercase();
    let is_heading = |el: &Element| {
        el.tag == rules.heading_tag
            && el.attribute(&rules.style_attribute) == Some(rules.heading_style.as_str())
            && el.text.trim().to_uppercase() == references_heading
    };
    let is_reference = |el: &Element| {
        el.tag == rules.reference_tag
            && el.attribute(&rules.style_attribute) == Some(rules.reference_style.as_str())
    };

    let Some(path) = root.find_path(is_heading) else {
        return 0;
    };
    let Some((&idx, parent_path)) = path.split_last() else {
        return 0;
    };
    let Some(parent) = root.at_mut(parent_path) else {
        return 0;
    };

    let start = idx + 1;
    let count = parent.children[start..]
        .iter()
        .take_while(|el| is_reference(el))
        .count();
    if count == 0 {
        return 0;
    }
    let refs: Vec<Element> = parent.children.drain(start..start + count).collect();
    parent
        .children
        .insert(start, Element::new(rules.list_tag.as_str()).with_children(refs));
    count
}

/// Detaches the biography heading and block and reinserts them, in that order, right
/// after the reference list.
pub fn relocate_biography(root: &mut Element, rules: &RestructureRules) -> BioRelocation {
    let refs_title =
        root.find_path(|el| el.tag == rules.heading_tag && el.text == rules.references_heading);
    let ref_list = root.find_path(|el| el.tag == rules.list_tag);
    let bio_title =
        root.find_path(|el| el.tag == rules.heading_tag && el.text == rules.bio_heading);
    let bio_block = root.find_path(|el| el.tag == rules.bio_tag);

    let missing: Vec<&str> = [
        (refs_title.is_none(), "references heading"),
        (ref_list.is_none(), "reference list"),
        (bio_title.is_none(), "bio heading"),
        (bio_block.is_none(), "bio block"),
    ]
    .into_iter()
    .filter_map(|(absent, what)| absent.then_some(what))
    .collect();
    let (Some(_), Some(mut list), Some(title), Some(mut block)) =
        (refs_title, ref_list, bio_title, bio_block)
    else {
        return BioRelocation::Skipped(format!("missing {}", missing.join(", ")));
    };

    // The heading may sit inside the block; any other nesting cannot be untangled.
    if list.is_empty()
        || block.is_empty()
        || block.starts_with(&title)
        || list.starts_with(&title)
        || list.starts_with(&block)
    {
        return BioRelocation::Skipped(format!(
            "{} and {} overlap with {}",
            rules.bio_heading, rules.bio_tag, rules.list_tag
        ));
    }

    let Some(title_el) = root.remove_at(&title) else {
        return BioRelocation::Skipped(format!("cannot detach {}", rules.bio_heading));
    };
    shift_after_removal(&title, &mut block);
    shift_after_removal(&title, &mut list);
    let Some(block_el) = root.remove_at(&block) else {
        root.insert_at(&title, title_el);
        return BioRelocation::Skipped(format!("cannot detach {}", rules.bio_tag));
    };
    shift_after_removal(&block, &mut list);

    if let Some(last) = list.last_mut() {
        *last += 1;
    }
    root.insert_at(&list, title_el);
    if let Some(last) = list.last_mut() {
        *last += 1;
    }
    root.insert_at(&list, block_el);
    BioRelocation::Moved
}

// `other` must not lie inside the removed subtree.
fn shift_after_removal(removed: &[usize], other: &mut [usize]) {
    let Some((&idx, parent)) = removed.split_last() else {
        return;
    };
    let depth = parent.len();
    if other.len() > depth && other[..depth] == *parent && other[depth] > idx {
        other[depth] -= 1;
    }
}

#[cfg(test)]
mod tests {
    use super::{
        group_references, relocate_biography, restructure, BioRelocation, RestructureRules,
    };
    use crate::pipeline::tree::Element;

    fn heading(text: &str) -> Element {
        Element::new("title")
            .with_attribute("style", "EH")
            .with_text(text)
    }

    fn reference(text: &str) -> Element {
        Element::new("ref")
            .with_attribute("style", "REF")
            .with_text(text)
    }

    fn tags(el: &Element) -> Vec<&str> {
        el.children.iter().map(|c| c.tag.as_str()).collect()
    }

    fn document(children: Vec<Element>) -> Element {
        Element::new("document").with_children(children)
    }

    #[test]
    fn groups_contiguous_references_only() {
        let rules = RestructureRules::default();
        let mut root = document(vec![
            Element::new("p").with_text("intro"),
            heading("REFERENCES"),
            reference("A"),
            reference("B"),
            reference("C"),
            Element::new("p").with_text("after"),
            reference("D"),
        ]);

        assert_eq!(group_references(&mut root, &rules), 3);
        assert_eq!(tags(&root), ["p", "title", "ref-list", "p", "ref"]);
        let list = &root.children[2];
        let texts: Vec<&str> = list.children.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, ["A", "B", "C"]);
    }

    #[test]
    fn heading_match_ignores_case_and_padding_but_needs_style() {
        let rules = RestructureRules::default();
        let mut root = document(vec![heading("  References "), reference("A")]);
        assert_eq!(group_references(&mut root, &rules), 1);

        let mut unstyled = document(vec![
            Element::new("title").with_text("REFERENCES"),
            reference("A"),
        ]);
        assert_eq!(group_references(&mut unstyled, &rules), 0);
        assert_eq!(tags(&unstyled), ["title", "ref"]);
    }

    #[test]
    fn configured_heading_matches_non_ascii_case() {
        let rules = RestructureRules {
            references_heading: "LITERATÜR".to_string(),
            ..Default::default()
        };
        let mut root = document(vec![heading("Literatür"), reference("A")]);
        assert_eq!(group_references(&mut root, &rules), 1);
        assert_eq!(tags(&root), ["title", "ref-list"]);
    }

    #[test]
    fn references_with_other_style_are_not_grouped() {
        let rules = RestructureRules::default();
        let mut root = document(vec![
            heading("REFERENCES"),
            Element::new("ref").with_attribute("style", "OTHER").with_text("x"),
            reference("A"),
        ]);
        assert_eq!(group_references(&mut root, &rules), 0);
        assert_eq!(tags(&root), ["title", "ref", "ref"]);
    }

    #[test]
    fn grouping_works_below_the_root() {
        let rules = RestructureRules::default();
        let mut root = document(vec![Element::new("BACK").with_children([
            heading("REFERENCES"),
            reference("A"),
        ])]);
        assert_eq!(group_references(&mut root, &rules), 1);
        assert_eq!(tags(&root.children[0]), ["title", "ref-list"]);
    }

    #[test]
    fn moves_bio_after_reference_list() {
        let rules = RestructureRules::default();
        let mut root = document(vec![
            heading("Author bio"),
            Element::new("BIO").with_child(Element::new("p").with_text("Jane")),
            Element::new("p").with_text("body"),
            heading("REFERENCES"),
            reference("A"),
            reference("B"),
            Element::new("p").with_text("tail"),
        ]);

        let report = restructure(&mut root, &rules);
        assert_eq!(report.grouped_references, 2);
        assert_eq!(report.bio, BioRelocation::Moved);
        assert_eq!(tags(&root), ["p", "title", "ref-list", "title", "BIO", "p"]);
        assert_eq!(root.children[3].text, "Author bio");
    }

    #[test]
    fn pulls_heading_out_of_the_bio_block() {
        let rules = RestructureRules::default();
        let mut root = document(vec![
            heading("REFERENCES"),
            reference("A"),
            Element::new("BIO").with_children([
                heading("Author bio"),
                Element::new("p").with_text("Jane"),
            ]),
        ]);

        restructure(&mut root, &rules);
        assert_eq!(tags(&root), ["title", "ref-list", "title", "BIO"]);
        assert_eq!(tags(&root.children[3]), ["p"]);
    }

    #[test]
    fn missing_bio_block_leaves_tree_unchanged() {
        let rules = RestructureRules::default();
        let mut root = document(vec![
            heading("Author bio"),
            heading("REFERENCES"),
            Element::new("ref-list").with_child(reference("A")),
        ]);
        let before = root.clone();

        let outcome = relocate_biography(&mut root, &rules);
        assert_eq!(outcome, BioRelocation::Skipped("missing bio block".to_string()));
        assert_eq!(root, before);
    }

    #[test]
    fn restructuring_twice_equals_once() {
        let rules = RestructureRules::default();
        let mut root = document(vec![
            heading("Author bio"),
            Element::new("BIO").with_text("Jane"),
            heading("REFERENCES"),
            reference("A"),
            Element::new("p").with_text("tail"),
        ]);

        restructure(&mut root, &rules);
        let once = root.clone();
        restructure(&mut root, &rules);
        assert_eq!(root, once);
    }
}
