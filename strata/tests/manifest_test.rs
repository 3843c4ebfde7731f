//! Controllers and engine settings loaded from JSON

use std::io::Write;
use strata::{
    CommandSpec, ControllerSpec, Engine, EngineConfig, Error, Invocation, SetupError,
};

const MANIFEST: &str = r#"[
    {"label": "base", "help": "manifest application"},
    {
        "label": "deploy",
        "stacked_type": "nested",
        "default_command": "status",
        "arguments": [
            {"flags": ["-e", "--env"], "options": {"choices": ["dev", "prod"], "default": "dev"}},
            {"flags": ["--dry-run"], "options": {"action": "store_true"}}
        ]
    }
]"#;

fn deploy_commands() -> Vec<CommandSpec<String>> {
    vec![
        CommandSpec::new("status", |inv: &Invocation| {
            format!("status env={}", inv.get_str("env").unwrap_or("-"))
        }),
        CommandSpec::new("run", |inv: &Invocation| {
            format!(
                "run env={} dry_run={}",
                inv.get_str("env").unwrap_or("-"),
                inv.flag("dry_run")
            )
        }),
    ]
}

fn engine_from(specs: Vec<ControllerSpec>, config: EngineConfig) -> Result<Engine<String>, Error> {
    let mut builder = Engine::builder(config);
    for spec in specs {
        let commands = if spec.label == "deploy" {
            deploy_commands()
        } else {
            Vec::new()
        };
        builder = builder.register_spec(spec, commands)?;
    }
    builder.setup()
}

#[test]
fn test_manifest_controllers_dispatch() {
    let specs: Vec<ControllerSpec> = serde_json::from_str(MANIFEST).unwrap();
    assert_eq!(specs[1].stacked_on.as_deref(), Some("base"));

    let engine = engine_from(specs, EngineConfig::new("app").sentinel_salt("test")).unwrap();
    assert_eq!(engine.dispatch(["deploy"]).unwrap(), "status env=dev");
    assert_eq!(
        engine
            .dispatch(["deploy", "-e", "prod", "run", "--dry-run"])
            .unwrap(),
        "run env=prod dry_run=true"
    );
}

#[test]
fn test_manifest_choice_violation_is_usage_error() {
    let specs: Vec<ControllerSpec> = serde_json::from_str(MANIFEST).unwrap();
    let engine = engine_from(specs, EngineConfig::new("app").sentinel_salt("test")).unwrap();

    let err = engine.dispatch(["deploy", "--env", "staging"]).unwrap_err();
    assert!(err.is_user_error());
    assert_eq!(err.exit_code(), 2);
}

#[test]
fn test_manifest_bogus_stacked_type() {
    let specs: Vec<ControllerSpec> = serde_json::from_str(
        r#"[{"label": "base"}, {"label": "odd", "stacked_type": "bogus"}]"#,
    )
    .unwrap();

    let err = engine_from(specs, EngineConfig::default()).err().unwrap();
    assert!(matches!(
        err,
        Error::Setup(SetupError::InvalidStackedType { ref label, .. }) if label == "odd"
    ));
}

#[test]
fn test_config_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{"program": "deployer", "version": "1.2.3", "root_label": "main", "sentinel_salt": "x"}}"#
    )
    .unwrap();

    let config = EngineConfig::from_path(file.path()).unwrap();
    let specs = vec![ControllerSpec::new("main").unstacked()];
    let engine = engine_from(specs, config).unwrap();

    assert_eq!(engine.resolved_order().root().label, "main");
    let err = engine.dispatch(["--version"]).unwrap_err();
    assert_eq!(err.exit_code(), 0);
    assert!(err.to_string().contains("1.2.3"));
}
