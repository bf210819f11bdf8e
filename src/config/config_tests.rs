use super::*;
use std::io::Write;

#[test]
fn builtin_configuration_loads() {
    let cfg = AsicConfig::builtin().unwrap();
    assert_eq!(cfg.extensions.len(), 12);
    assert_eq!(cfg.kinds.len(), 16);
    let order: Vec<&str> = cfg.kinds.all_kinds().iter().map(|k| k.as_str()).collect();
    assert_eq!(&order[..6], &["adem", "aenc", "balcttos", "dspcttos", "pep", "pme"]);
    assert_eq!(order.last(), Some(&"fronteras"));
}

#[test]
fn file_sources_override_builtin() {
    let dir = tempfile::tempdir().unwrap();
    let ext_path = dir.path().join("ext.jsonl");
    let mut f = std::fs::File::create(&ext_path).unwrap();
    writeln!(f, "{{\"asic_extension\": \".tx2\", \"normalized_version\": \"001\", \"order\": 1}}").unwrap();
    writeln!(f).unwrap();
    writeln!(f, "{{\"asic_extension\": \".txf\", \"normalized_version\": \"003\", \"order\": 2}}").unwrap();
    drop(f);

    let sources = ConfigSources { extension_map: Some(ext_path), file_config: None };
    let cfg = AsicConfig::load(&sources).unwrap();
    assert_eq!(cfg.extensions.len(), 2);
    assert!(cfg.extensions.lookup(".txr").is_err());
}

#[test]
fn malformed_line_reports_position() {
    let text = "{\"asic_extension\": \".tx2\", \"normalized_version\": \"001\", \"order\": 1}\nnot json\n";
    let err = ExtensionRegistry::from_jsonl("broken.jsonl", text, &ValidationRules::default()).unwrap_err();
    match err {
        AsicError::Config { source_name, line, .. } => {
            assert_eq!(source_name, "broken.jsonl");
            assert_eq!(line, 2);
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn missing_file_is_config_fault() {
    let sources = ConfigSources { extension_map: Some("/nonexistent/asic/ext.jsonl".into()), file_config: None };
    let err = AsicConfig::load(&sources).unwrap_err();
    assert!(err.is_config_fault());
}

#[test]
fn agent_rule_is_replaceable() {
    let rules = ValidationRules::default();
    assert_eq!(rules.agent("ENBC").unwrap(), "enbc");
    assert_eq!(rules.agent("epm").unwrap(), "epm");
    assert!(rules.agent("toolong").is_err());

    let strict = ValidationRules::new(r"^[0-9]{3}$", r"^[a-z]{4}$").unwrap();
    assert!(strict.agent("epm").is_err());
    assert!(!strict.normalized_version.is_match("-001"));
}
