// src/config/defaults.rs

//! Built-in path table and transform rules.
//!
//! These reproduce the conventional `src/` -> `dist/` layout:
//!
//! | class   | source                                        | dest            |
//! |---------|-----------------------------------------------|-----------------|
//! | markup  | `src/*.html`                                  | `dist/`         |
//! | styles  | `src/styles/main.sass`                        | `dist/styles/`  |
//! | scripts | `src/scripts/main.js`                         | `dist/scripts/` |
//! | images  | `src/images/**/*.{png,jpg,jpeg,gif,svg,webp}` | `dist/images/`  |
//! | fonts   | `src/fonts/**/*.{ttf,woff2}`                  | `dist/fonts/`   |
//!
//! The default styles rule only compiles and minifies. Unused-rule
//! elimination needs a tool that scans the built pages, which is why markup
//! always runs before styles. To enable it, chain the scan onto the command
//! and point it at `{output_root}`:
//!
//! ```toml
//! [[stage.styles.rule]]
//! extensions = ["sass", "scss"]
//! cmd = "sass --no-source-map {input} {output} && purgecss --css {output} --content {output_root}/'**/*.html' --stdout | jq -r '.[0].css' > {output}.purged && mv {output}.purged {output}"
//! extension = "css"
//! suffix = ".min"
//! ```
//!
//! Placeholders are shell-quoted on render, so the glob part is quoted
//! separately to reach `purgecss` unexpanded.

use std::path::PathBuf;

use crate::config::model::{PathSpecConfig, RuleConfig, StageConfig};
use crate::types::AssetClass;

pub fn path_spec(class: AssetClass) -> PathSpecConfig {
    let (source, dest, watch) = match class {
        AssetClass::Markup => ("src/*.html", "dist/", "src/**/*.html"),
        AssetClass::Styles => (
            "src/styles/main.sass",
            "dist/styles/",
            "src/styles/**/*.sass",
        ),
        AssetClass::Scripts => (
            "src/scripts/main.js",
            "dist/scripts/",
            "src/scripts/**/*.js",
        ),
        AssetClass::Images => (
            "src/images/**/*.{png,jpg,jpeg,gif,svg,webp}",
            "dist/images/",
            "src/images/**/*.{png,jpg,jpeg,gif,svg,webp}",
        ),
        AssetClass::Fonts => (
            "src/fonts/**/*.{ttf,woff2}",
            "dist/fonts/",
            "src/fonts/**/*.{ttf,woff2}",
        ),
    };

    PathSpecConfig {
        source: source.to_string(),
        dest: PathBuf::from(dest),
        watch: watch.to_string(),
    }
}

pub fn stage(class: AssetClass) -> StageConfig {
    let rules = match class {
        // File inclusion is left to whatever command the project configures.
        AssetClass::Markup => vec![],
        AssetClass::Styles => vec![RuleConfig {
            extensions: exts(&["sass", "scss"]),
            cmd: Some("sass --no-source-map --style=compressed {input} {output}".to_string()),
            dev_cmd: Some("sass --embed-source-map --style=expanded {input} {output}".to_string()),
            extension: Some("css".to_string()),
            suffix: ".min".to_string(),
        }],
        AssetClass::Scripts => vec![RuleConfig {
            extensions: exts(&["js"]),
            cmd: Some("esbuild {input} --bundle --minify --outfile={output}".to_string()),
            dev_cmd: Some("esbuild {input} --bundle --sourcemap=inline --outfile={output}".to_string()),
            extension: None,
            suffix: ".min".to_string(),
        }],
        AssetClass::Images => vec![RuleConfig {
            extensions: exts(&["png", "jpg", "jpeg"]),
            cmd: Some("cwebp -quiet -q 90 {input} -o {output}".to_string()),
            dev_cmd: None,
            extension: Some("webp".to_string()),
            suffix: String::new(),
        }],
        AssetClass::Fonts => vec![RuleConfig {
            extensions: exts(&["ttf"]),
            cmd: Some("ttf2woff2 < {input} > {output}".to_string()),
            dev_cmd: None,
            extension: Some("woff2".to_string()),
            suffix: String::new(),
        }],
    };

    StageConfig {
        incremental: None,
        rules,
    }
}

fn exts(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}
