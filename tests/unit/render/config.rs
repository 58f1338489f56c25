use super::*;

#[test]
fn defaults() {
    let cfg = ManagerConfig::default();
    assert_eq!(cfg.max_concurrent_jobs, 3);
    assert_eq!(cfg.min_output_bytes, 1024);
    assert!(!cfg.cleanup_on_finish);
    assert_eq!(cfg.output_dir(), cfg.work_root.join("out"));
    assert!(cfg.validate().is_ok());
}

#[test]
fn partial_json_fills_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("manager.json");
    std::fs::write(
        &path,
        r#"{"workRoot":"/srv/deckreel","maxConcurrentJobs":1,"outputDir":"/srv/out"}"#,
    )
    .unwrap();
    let cfg = ManagerConfig::from_json_file(&path).unwrap();
    assert_eq!(cfg.work_root, PathBuf::from("/srv/deckreel"));
    assert_eq!(cfg.max_concurrent_jobs, 1);
    assert_eq!(cfg.output_dir(), PathBuf::from("/srv/out"));
    assert_eq!(cfg.fallback_rgba, [24, 24, 32, 255]);
}

#[test]
fn zero_concurrency_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("manager.json");
    std::fs::write(&path, r#"{"maxConcurrentJobs":0}"#).unwrap();
    let err = ManagerConfig::from_json_file(&path).unwrap_err();
    assert!(err.to_string().contains("maxConcurrentJobs"));
}

#[test]
fn missing_file_is_reported() {
    let err = ManagerConfig::from_json_file(Path::new("/no/such/manager.json")).unwrap_err();
    assert!(err.to_string().contains("manager config"));
}
