// tests/config_loading.rs

use std::path::Path;

use assetflow::config::{load_and_validate, resolve};
use assetflow::errors::AssetflowError;
use assetflow::types::AssetClass;
use assetflow_test_utils::write_file;

#[test]
fn explicit_missing_config_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope.toml");

    let err = resolve(Some(missing.to_str().unwrap())).unwrap_err();
    assert!(matches!(err, AssetflowError::IoError(_)), "{err}");
}

#[test]
fn project_dir_is_the_config_files_directory() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(
        dir.path(),
        "site/Assetflow.toml",
        r#"
[project]
output_root = "public"

[paths.markup]
source = "pages/*.html"
dest = "public/"
watch = "pages/**/*.html"

[paths.styles]
source = "src/styles/main.sass"
dest = "public/styles/"
watch = "src/styles/**/*.sass"

[paths.scripts]
source = "src/scripts/main.js"
dest = "public/scripts/"
watch = "src/scripts/**/*.js"

[paths.images]
source = "src/images/**/*.png"
dest = "public/images/"
watch = "src/images/**/*.png"

[paths.fonts]
source = "src/fonts/**/*.woff2"
dest = "public/fonts/"
watch = "src/fonts/**/*.woff2"
"#,
    );

    let cfg = load_and_validate(&path).unwrap();
    let layout = cfg.layout();

    assert_eq!(cfg.project_dir(), dir.path().join("site"));
    assert_eq!(layout.output_root, dir.path().join("site/public"));
    assert_eq!(layout.source_root, dir.path().join("site/src"));
    assert_eq!(cfg.paths().get(AssetClass::Markup).source(), "pages/*.html");
    assert_eq!(cfg.paths().get(AssetClass::Markup).base(), Path::new("pages"));
}

#[test]
fn stage_tables_replace_defaults_per_class() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(
        dir.path(),
        "Assetflow.toml",
        r#"
[stage.styles]
incremental = true

[[stage.styles.rule]]
extensions = ["scss"]
cmd = "grass {input} {output}"
extension = "css"
"#,
    );

    let cfg = load_and_validate(&path).unwrap();

    let styles = cfg.stage(AssetClass::Styles);
    assert!(styles.effective_incremental(AssetClass::Styles));
    assert_eq!(styles.rules.len(), 1);
    assert_eq!(styles.rules[0].cmd.as_deref(), Some("grass {input} {output}"));
    assert_eq!(styles.rules[0].suffix, "");

    // Untouched classes keep their built-in rules.
    let scripts = cfg.stage(AssetClass::Scripts);
    assert_eq!(scripts.rules[0].suffix, ".min");
    assert!(!scripts.effective_incremental(AssetClass::Scripts));
}

#[test]
fn invalid_glob_is_a_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(
        dir.path(),
        "Assetflow.toml",
        r#"
[paths.images]
source = "src/images/[.png"
dest = "dist/images/"
watch = "src/images/**/*"
"#,
    );

    let err = load_and_validate(&path).unwrap_err();
    assert!(matches!(err, AssetflowError::ConfigError(_)), "{err}");
    assert!(err.to_string().contains("[paths.images]"), "{err}");
}

#[test]
fn unknown_placeholder_is_rejected_at_load_time() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(
        dir.path(),
        "Assetflow.toml",
        r#"
[[stage.fonts.rule]]
cmd = "ttf2woff2 {source} {output}"
"#,
    );

    let err = load_and_validate(&path).unwrap_err();
    assert!(err.to_string().contains("{source}"), "{err}");
}

#[test]
fn output_root_inside_source_root_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(
        dir.path(),
        "Assetflow.toml",
        "[project]\nsource_root = \"site\"\noutput_root = \"site/build\"\n",
    );

    let err = load_and_validate(&path).unwrap_err();
    assert!(err.to_string().contains("must not alias"), "{err}");
}
