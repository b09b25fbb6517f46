use lighthouse_batch::config::Config;

#[test]
fn parse_example_config() {
    let raw = include_str!("../lighthouse-batch.example.toml");
    let cfg: Config = toml::from_str(raw).expect("parse TOML");
    assert!(!cfg.paths.results_dir.is_empty());
    assert_eq!(cfg.auditor.executable, "lighthouse");
    assert_eq!((cfg.auditor.window_width, cfg.auditor.window_height), (1920, 1080));
    assert_eq!(cfg.security.secret_bytes, 24);
}

#[test]
fn missing_sections_fall_back_to_defaults() {
    let cfg: Config = toml::from_str("[server]\nhost = \"0.0.0.0\"\nport = 8080\n").expect("parse TOML");
    assert_eq!(cfg.server.port, 8080);
    assert_eq!(cfg.paths.results_dir, "lighthouse_results");
    assert_eq!(cfg.auditor.locale, "ko");
    assert_eq!(cfg.auditor.timeout_seconds, 0);
    assert!(!cfg.naming.use_utc);
}
