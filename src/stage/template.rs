// src/stage/template.rs

//! Shell command templates with `{placeholder}` substitution.

use std::path::Path;
use std::sync::OnceLock;

use regex::{Captures, Regex};

/// Placeholders a command template may reference.
pub const PLACEHOLDERS: [&str; 4] = ["input", "output", "source_root", "output_root"];

fn placeholder_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{([A-Za-z_]+)\}").expect("placeholder regex is valid"))
}

/// A validated command template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandTemplate {
    raw: String,
}

/// Values substituted into a template. Paths are shell-quoted on render.
#[derive(Debug, Clone, Copy)]
pub struct TemplateVars<'a> {
    pub input: &'a Path,
    pub output: &'a Path,
    pub source_root: &'a Path,
    pub output_root: &'a Path,
}

impl CommandTemplate {
    /// Check that every placeholder is known and that the command writes to
    /// `{output}`.
    pub fn parse(raw: &str) -> Result<Self, String> {
        let mut has_output = false;
        for caps in placeholder_re().captures_iter(raw) {
            let name = &caps[1];
            if !PLACEHOLDERS.contains(&name) {
                return Err(format!(
                    "unknown placeholder {{{name}}} in command `{raw}` (expected one of {})",
                    PLACEHOLDERS
                        .iter()
                        .map(|p| format!("{{{p}}}"))
                        .collect::<Vec<_>>()
                        .join(", ")
                ));
            }
            has_output |= name == "output";
        }

        if !has_output {
            return Err(format!("command `{raw}` never references {{output}}"));
        }

        Ok(Self {
            raw: raw.to_string(),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn render(&self, vars: &TemplateVars<'_>) -> String {
        placeholder_re()
            .replace_all(&self.raw, |caps: &Captures<'_>| {
                let path = match &caps[1] {
                    "input" => vars.input,
                    "output" => vars.output,
                    "source_root" => vars.source_root,
                    "output_root" => vars.output_root,
                    // `parse` rejected anything else.
                    _ => return caps[0].to_string(),
                };
                shell_quote(&path.to_string_lossy())
            })
            .into_owned()
    }
}

#[cfg(not(windows))]
fn shell_quote(value: &str) -> String {
    let safe = value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || "/._-+=:,@".contains(c));
    if safe && !value.is_empty() {
        value.to_string()
    } else {
        format!("'{}'", value.replace('\'', r"'\''"))
    }
}

#[cfg(windows)]
fn shell_quote(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\\\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars<'a>(input: &'a Path, output: &'a Path) -> TemplateVars<'a> {
        TemplateVars {
            input,
            output,
            source_root: Path::new("src"),
            output_root: Path::new("dist"),
        }
    }

    #[test]
    fn rejects_unknown_placeholders() {
        let err = CommandTemplate::parse("sass {input} {out}").unwrap_err();
        assert!(err.contains("{out}"), "{err}");
    }

    #[test]
    fn requires_output_placeholder() {
        assert!(CommandTemplate::parse("sass {input}").is_err());
        assert!(CommandTemplate::parse("sass {input} {output}").is_ok());
    }

    #[test]
    fn renders_all_placeholders() {
        let t = CommandTemplate::parse("purge --content {output_root} {input} -o {output}").unwrap();
        let rendered = t.render(&vars(
            Path::new("src/styles/main.sass"),
            Path::new("dist/styles/.main.min.css.assetflow-tmp"),
        ));
        assert_eq!(
            rendered,
            "purge --content dist src/styles/main.sass -o dist/styles/.main.min.css.assetflow-tmp"
        );
    }

    #[cfg(not(windows))]
    #[test]
    fn quotes_paths_with_spaces_and_quotes() {
        let t = CommandTemplate::parse("cp {input} {output}").unwrap();
        let rendered = t.render(&vars(Path::new("src/my file.png"), Path::new("dist/it's.png")));
        assert_eq!(rendered, r"cp 'src/my file.png' 'dist/it'\''s.png'");
    }
}
