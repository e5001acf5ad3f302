use indexmap::IndexMap;
use once_cell::sync::Lazy;
use quick_xml::events::BytesStart;
use regex::Regex;

use crate::error::ConvertError;

static XML_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9._:-]*$").expect("xml name"));

/// How one paragraph style becomes an output element.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StyleRule {
    pub tag: String,
    /// Raw `(name, value)` pairs, written back unescaped.
    pub attributes: Vec<(String, String)>,
    pub child_tag: Option<String>,
    pub wrap_group: Option<String>,
    /// A rule with `wrap_group` but no trigger never starts its group.
    pub trigger_text: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum RuleToken<'a> {
    Child(&'a str),
    Wrap(&'a str),
    IncludeText(&'a str),
    Attribute(&'a str),
}

impl<'a> RuleToken<'a> {
    fn classify(token: &'a str) -> Self {
        if let Some((key, value)) = token.split_once('=') {
            let value = value.trim();
            match key.trim() {
                "child" => return RuleToken::Child(value),
                "wrap" => return RuleToken::Wrap(value),
                "include_text" => return RuleToken::IncludeText(strip_quote_pair(value)),
                _ => {}
            }
        }
        RuleToken::Attribute(token)
    }
}

fn strip_quote_pair(value: &str) -> &str {
    for q in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(q) && value.ends_with(q) {
            return &value[1..value.len() - 1];
        }
    }
    value
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

impl StyleRule {
    /// Parses the tokens of one mapping entry: a tag token followed by keyed options
    /// and attribute text.
    pub fn from_tokens<'a, I>(style: &str, tokens: I) -> Result<Self, ConvertError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut tokens = tokens.into_iter().map(str::trim);
        let tag = tokens.next().unwrap_or_default();
        if tag.is_empty() {
            return Err(ConvertError::config(style, "missing tag token"));
        }
        check_name(style, "tag", tag)?;

        let mut rule = StyleRule {
            tag: tag.to_string(),
            ..Default::default()
        };
        let mut attribute_text: Vec<&str> = Vec::new();
        for token in tokens.filter(|t| !t.is_empty()) {
            match RuleToken::classify(token) {
                RuleToken::Child(v) => rule.child_tag = non_empty(v),
                RuleToken::Wrap(v) => rule.wrap_group = non_empty(v),
                RuleToken::IncludeText(v) => rule.trigger_text = non_empty(v),
                RuleToken::Attribute(text) => attribute_text.push(text),
            }
        }
        if let Some(child) = &rule.child_tag {
            check_name(style, "child", child)?;
        }
        if let Some(group) = &rule.wrap_group {
            check_name(style, "wrap", group)?;
        }
        rule.attributes = parse_attribute_text(style, &attribute_text.join(" "))?;
        Ok(rule)
    }

    pub fn parse(style: &str, definition: &str) -> Result<Self, ConvertError> {
        Self::from_tokens(style, definition.split('|'))
    }

    /// Rule synthesised for a style with no mapping entry.
    pub fn fallback(style: &str) -> Self {
        StyleRule {
            tag: fallback_tag(style),
            ..Default::default()
        }
    }
}

/// Style name with every non-alphanumeric character stripped. Names that strip to nothing
/// become `Paragraph`; a leading digit gets a `_` prefix so the tag stays a valid XML name.
pub fn fallback_tag(style: &str) -> String {
    let tag: String = style.chars().filter(|c| c.is_ascii_alphanumeric()).collect();
    match tag.chars().next() {
        None => crate::pipeline::extract::DEFAULT_STYLE.to_string(),
        Some(c) if c.is_ascii_digit() => format!("_{tag}"),
        Some(_) => tag,
    }
}

fn check_name(style: &str, what: &str, name: &str) -> Result<(), ConvertError> {
    if XML_NAME_RE.is_match(name) {
        Ok(())
    } else {
        Err(ConvertError::config(
            style,
            format!("{what} `{name}` is not a valid element name"),
        ))
    }
}

fn parse_attribute_text(style: &str, text: &str) -> Result<Vec<(String, String)>, ConvertError> {
    if text.is_empty() {
        return Ok(Vec::new());
    }
    let probe = format!("x {text}");
    let start = BytesStart::from_content(probe.as_str(), 1);
    let mut attrs = Vec::new();
    for a in start.attributes() {
        let a = a.map_err(|e| ConvertError::config(style, format!("attribute text `{text}`: {e}")))?;
        attrs.push((
            String::from_utf8_lossy(a.key.as_ref()).into_owned(),
            String::from_utf8_lossy(a.value.as_ref()).into_owned(),
        ));
    }
    Ok(attrs)
}

/// Style name -> rule lookup, built once before any paragraph is processed.
#[derive(Clone, Debug, Default)]
pub struct StyleRegistry {
    rules: IndexMap<String, StyleRule>,
}

impl StyleRegistry {
    /// Builds the registry from `(style, definition)` entries in configuration order.
    pub fn load<I, K, V>(entries: I) -> Result<Self, ConvertError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut registry = StyleRegistry::default();
        for (style, definition) in entries {
            let rule = StyleRule::parse(style.as_ref(), definition.as_ref())?;
            registry.insert(style.as_ref(), rule)?;
        }
        Ok(registry)
    }

    pub fn insert(&mut self, style: &str, rule: StyleRule) -> Result<(), ConvertError> {
        if self.rules.contains_key(style) {
            return Err(ConvertError::config(style, "duplicate style entry"));
        }
        self.rules.insert(style.to_string(), rule);
        Ok(())
    }

    pub fn get(&self, style: &str) -> Option<&StyleRule> {
        self.rules.get(style)
    }

    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &StyleRule)> {
        self.rules.iter().map(|(k, v)| (k.as_str(), v))
    }
}
