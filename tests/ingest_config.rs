// tests/ingest_config.rs
use horizons_jobs::config::{
    AggregatorConfig, ENV_BROWSER, ENV_CONFIG_PATH, ENV_METRICS_TEXTFILE, ENV_OUTPUT_PATH,
    ENV_PARALLEL, ENV_SOURCES,
};
use horizons_jobs::SourceId;
use std::path::PathBuf;
use std::{env, fs};

const ALL_ENV: &[&str] = &[
    ENV_CONFIG_PATH,
    ENV_OUTPUT_PATH,
    ENV_SOURCES,
    ENV_PARALLEL,
    ENV_BROWSER,
    ENV_METRICS_TEXTFILE,
];

fn clear_env() {
    for k in ALL_ENV {
        env::remove_var(k);
    }
}

#[test]
fn load_from_explicit_toml_and_json() {
    let dir = tempfile::tempdir().unwrap();

    let p_toml = dir.path().join("aggregator.toml");
    fs::write(
        &p_toml,
        r#"
sources = ["wtamu", " YHMC "]
timeout_secs = 60
"#,
    )
    .unwrap();
    let cfg = AggregatorConfig::load_from(&p_toml).unwrap();
    assert_eq!(cfg.sources, vec!["wtamu".to_string(), "yhmc".to_string()]);
    assert_eq!(cfg.timeout_secs, 60);
    assert_eq!(cfg.max_pages, 10);

    let p_json = dir.path().join("aggregator.json");
    fs::write(&p_json, r#"{"max_pages": 2, "metrics_textfile": "m.prom"}"#).unwrap();
    let cfg = AggregatorConfig::load_from(&p_json).unwrap();
    assert_eq!(cfg.max_pages, 2);
    assert_eq!(cfg.metrics_textfile, Some(PathBuf::from("m.prom")));

    assert!(AggregatorConfig::load_from(&dir.path().join("missing.toml")).is_err());
}

#[serial_test::serial]
#[test]
fn default_uses_env_then_fallbacks() {
    // isolate from the repo's own config/
    let old = env::current_dir().unwrap();
    let tmp = tempfile::tempdir().unwrap();
    env::set_current_dir(tmp.path()).unwrap();
    clear_env();

    // nothing on disk: built-in defaults
    let cfg = AggregatorConfig::load_default().unwrap();
    assert_eq!(cfg, AggregatorConfig::default());

    // json fallback
    let cfg_dir = tmp.path().join("config");
    fs::create_dir_all(&cfg_dir).unwrap();
    fs::write(cfg_dir.join("aggregator.json"), r#"{"max_pages": 7}"#).unwrap();
    assert_eq!(AggregatorConfig::load_default().unwrap().max_pages, 7);

    // toml wins over json
    fs::write(cfg_dir.join("aggregator.toml"), "max_pages = 5\n").unwrap();
    assert_eq!(AggregatorConfig::load_default().unwrap().max_pages, 5);

    // explicit path wins over both
    let p_env = tmp.path().join("custom.toml");
    fs::write(&p_env, "max_pages = 3\n").unwrap();
    env::set_var(ENV_CONFIG_PATH, p_env.display().to_string());
    assert_eq!(AggregatorConfig::load_default().unwrap().max_pages, 3);

    // a path that does not exist is an error, not a silent default
    env::set_var(ENV_CONFIG_PATH, tmp.path().join("nope.toml").display().to_string());
    assert!(AggregatorConfig::load_default().is_err());

    clear_env();
    env::set_current_dir(&old).unwrap();
}

#[serial_test::serial]
#[test]
fn env_overrides_file_values() {
    let old = env::current_dir().unwrap();
    let tmp = tempfile::tempdir().unwrap();
    env::set_current_dir(tmp.path()).unwrap();
    clear_env();

    env::set_var(ENV_OUTPUT_PATH, " out/jobs.json ");
    env::set_var(ENV_SOURCES, "fmc, ,Disco");
    env::set_var(ENV_PARALLEL, "yes");
    env::set_var(ENV_BROWSER, "off");
    env::set_var(ENV_METRICS_TEXTFILE, "metrics/jobs.prom");

    let cfg = AggregatorConfig::load_default().unwrap();
    assert_eq!(cfg.output_path, PathBuf::from("out/jobs.json"));
    assert_eq!(cfg.sources, vec!["disco".to_string(), "fmc".to_string()]);
    assert!(cfg.parallel);
    assert!(!cfg.browser);
    assert_eq!(cfg.metrics_textfile, Some(PathBuf::from("metrics/jobs.prom")));

    // unrecognised booleans leave the value alone
    env::set_var(ENV_BROWSER, "maybe");
    assert!(AggregatorConfig::load_default().unwrap().browser);

    clear_env();
    env::set_current_dir(&old).unwrap();
}

#[test]
fn enabled_sources_follow_run_order_and_browser_flag() {
    let cfg = AggregatorConfig {
        sources: vec!["wtamu".into(), "yhmc".into(), "bogus".into(), "sage-oil-vac".into()],
        browser: false,
        ..Default::default()
    };
    // wtamu needs a browser; sage falls back to plain HTTP so it stays
    let ids = SourceId::from_config(&cfg);
    assert_eq!(ids, vec![SourceId::Yhmc, SourceId::SageOilVac]);

    let all = SourceId::from_config(&AggregatorConfig::default());
    assert_eq!(all, SourceId::ALL.to_vec());
}
