use pbix_doc::config::Config;

#[test]
fn parse_example_config() {
    let raw = include_str!("../pbix-doc.example.toml");
    let cfg: Config = toml::from_str(raw).expect("parse TOML");
    assert!(!cfg.paths.out_dir.is_empty());
    assert_eq!(cfg.global.skip_pages, vec!["Template".to_string()]);
    assert_eq!(cfg.vocabulary.roles.len(), 24);
    assert_eq!(cfg.rendering.parens.len(), cfg.definitions.paren_palette_len);
}

#[test]
fn omitted_keys_fall_back_to_defaults() {
    let cfg: Config = toml::from_str(
        r#"
[vocabulary]
decorative_types = ["shape"]

[export]
timeout_seconds = 10
"#,
    )
    .expect("parse TOML");
    assert_eq!(cfg.vocabulary.decorative_types, vec!["shape".to_string()]);
    assert!(cfg.vocabulary.visual_types.iter().any(|v| v == "barChart"));
    assert!(cfg.vocabulary.known_functions.iter().any(|f| f == "CALCULATE"));
    assert_eq!(cfg.export.timeout_seconds, 10);
    assert_eq!(cfg.export.poll_interval_ms, 100);
    assert_eq!(cfg.definitions.description_tag, "////");
}

#[test]
fn role_labels_keep_configured_order() {
    let cfg = Config::default();
    let first = &cfg.vocabulary.roles[0];
    assert_eq!(first.projection, "Tooltips");
    let category = cfg
        .vocabulary
        .roles
        .iter()
        .find(|r| r.projection == "Category")
        .expect("category role");
    assert_eq!(category.label, "Categoricals");
}
