use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;

use crate::error::ConvertError;
use crate::pipeline::mapping::{StyleRegistry, StyleRule};
use crate::pipeline::restructure::RestructureRules;

pub const DEFAULT_STYLE_MAP_TOML: &str = "style_map.toml";
pub const DEFAULT_STYLE_MAP_INI: &str = "style_map.ini";

const STYLE_MAPPING_SECTION: &str = "style_mapping";

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct FigureSettings {
    /// Bookmarks named `<bookmark_prefix><digits>` anchor a figure.
    pub bookmark_prefix: String,
    pub container_tag: String,
    pub id_prefix: String,
}

impl Default for FigureSettings {
    fn default() -> Self {
        Self {
            bookmark_prefix: "HueD_Fig".to_string(),
            container_tag: "fig".to_string(),
            id_prefix: "F".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
struct ConfigFile {
    #[serde(default)]
    style_mapping: toml::Table,
    #[serde(default)]
    figures: FigureSettings,
    #[serde(default)]
    restructure: RestructureRules,
}

#[derive(Clone, Debug, Default)]
pub struct ConvertConfig {
    pub registry: StyleRegistry,
    pub figures: FigureSettings,
    pub restructure: RestructureRules,
}

impl ConvertConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConvertError> {
        let file: ConfigFile = toml::from_str(text)
            .map_err(|e| ConvertError::config(STYLE_MAPPING_SECTION, e.message().to_string()))?;

        let mut registry = StyleRegistry::default();
        for (style, value) in &file.style_mapping {
            let rule = match value {
                toml::Value::String(definition) => StyleRule::parse(style, definition)?,
                toml::Value::Array(items) => {
                    let mut tokens = Vec::with_capacity(items.len());
                    for item in items {
                        let token = item.as_str().ok_or_else(|| {
                            ConvertError::config(style.as_str(), "token list must hold strings")
                        })?;
                        tokens.push(token);
                    }
                    StyleRule::from_tokens(style, tokens)?
                }
                other => {
                    return Err(ConvertError::config(
                        style.as_str(),
                        format!("expected string or array, found {}", other.type_str()),
                    ))
                }
            };
            registry.insert(style, rule)?;
        }

        Ok(Self {
            registry,
            figures: file.figures,
            restructure: file.restructure,
        })
    }

    /// Legacy `configparser`-style file: only the `[style_mapping]` section is read.
    pub fn from_ini_str(text: &str) -> Result<Self, ConvertError> {
        let entries = parse_ini_style_mapping(text)?;
        Ok(Self {
            registry: StyleRegistry::load(entries)?,
            ..Default::default()
        })
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read style map: {}", path.display()))?;
        let is_ini = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("ini"));
        let cfg = if is_ini {
            Self::from_ini_str(&text)
        } else {
            Self::from_toml_str(&text)
        };
        cfg.with_context(|| format!("load style map: {}", path.display()))
    }
}

fn parse_ini_style_mapping(text: &str) -> Result<Vec<(String, String)>, ConvertError> {
    let ini_err = |line: usize, reason: &str| {
        ConvertError::config(STYLE_MAPPING_SECTION, format!("line {line}: {reason}"))
    };

    let mut sections: HashSet<String> = HashSet::new();
    let mut in_mapping = false;
    let mut keys: HashSet<String> = HashSet::new();
    let mut entries: Vec<(String, String)> = Vec::new();
    let mut last_entry_open = false;

    for (n, raw) in text.lines().enumerate() {
        let line_no = n + 1;
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            if line.is_empty() {
                last_entry_open = false;
            }
            continue;
        }
        if raw.starts_with([' ', '\t']) && last_entry_open {
            if in_mapping {
                if let Some((_, value)) = entries.last_mut() {
                    value.push('\n');
                    value.push_str(line);
                }
            }
            continue;
        }
        if let Some(rest) = line.strip_prefix('[') {
            let name = rest
                .strip_suffix(']')
                .ok_or_else(|| ini_err(line_no, "unterminated section header"))?
                .trim();
            if !sections.insert(name.to_string()) {
                return Err(ini_err(line_no, &format!("duplicate section [{name}]")));
            }
            in_mapping = name == STYLE_MAPPING_SECTION;
            last_entry_open = false;
            continue;
        }

        let pos = line
            .find(['=', ':'])
            .ok_or_else(|| ini_err(line_no, "expected `style = definition`"))?;
        let key = line[..pos].trim();
        let value = line[pos + 1..].trim();
        last_entry_open = true;
        if !in_mapping {
            continue;
        }
        if !keys.insert(key.to_string()) {
            return Err(ConvertError::config(key, "duplicate style entry"));
        }
        entries.push((key.to_string(), value.to_string()));
    }

    if !sections.contains(STYLE_MAPPING_SECTION) {
        return Err(ConvertError::config(
            STYLE_MAPPING_SECTION,
            "no [style_mapping] section",
        ));
    }
    Ok(entries)
}

pub fn find_file_upwards(start_dir: &Path, filename: &str, max_levels: usize) -> Option<PathBuf> {
    let mut dir = start_dir;
    for _ in 0..=max_levels {
        let candidate = dir.join(filename);
        if candidate.exists() {
            return Some(candidate);
        }
        dir = dir.parent()?;
    }
    None
}

/// Looks for `style_map.toml`, then `style_map.ini`, upwards from the working directory
/// and from `workdir`.
pub fn find_default_style_map(workdir: &Path) -> Option<PathBuf> {
    let cwd = std::env::current_dir().ok();
    for filename in [DEFAULT_STYLE_MAP_TOML, DEFAULT_STYLE_MAP_INI] {
        if let Some(p) = cwd.as_deref().and_then(|d| find_file_upwards(d, filename, 8)) {
            return Some(p);
        }
        if let Some(p) = find_file_upwards(workdir, filename, 8) {
            return Some(p);
        }
    }
    None
}

pub fn init_default_config(dir: &Path, force: bool) -> anyhow::Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("create config dir: {}", dir.display()))?;
    let cfg_path = dir.join(DEFAULT_STYLE_MAP_TOML);
    if cfg_path.exists() && !force {
        return Ok(cfg_path);
    }
    std::fs::write(&cfg_path, DEFAULT_CONFIG_TEXT)
        .with_context(|| format!("write style map: {}", cfg_path.display()))?;
    Ok(cfg_path)
}

pub const DEFAULT_CONFIG_TEXT: &str = r#"# Paragraph style -> output element.
#
# Each entry is `tag|token|token...` (or an array of tokens):
#   child=TAG            wrap the text in an inner <TAG>
#   wrap=GROUP           buffer the element into a <GROUP> block emitted after the body
#   include_text="TEXT"  paragraph text that starts the GROUP block (it is placed first)
#   anything else        attribute text copied into the opening tag, e.g. style="EH"
#
# Styles without an entry become a tag named after the style, alphanumerics only.
[style_mapping]
Heading = 'title|style="EH"'
Reference = 'ref|style="REF"'
AuthorBioHeading = 'title|style="EH"|wrap=BIO|include_text="Author bio"'
AuthorBio = 'p|wrap=BIO'

[figures]
bookmark_prefix = "HueD_Fig"
container_tag = "fig"
id_prefix = "F"

[restructure]
enabled = true
heading_tag = "title"
style_attribute = "style"
heading_style = "EH"
references_heading = "REFERENCES"
reference_tag = "ref"
reference_style = "REF"
list_tag = "ref-list"
bio_heading = "Author bio"
bio_tag = "BIO"
"#;
