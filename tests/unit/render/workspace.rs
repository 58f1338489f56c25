use super::*;

#[tokio::test]
async fn create_and_remove_tree() {
    let dir = tempfile::tempdir().unwrap();
    let id = JobId::generate();
    let ws = JobWorkspace::new(dir.path(), id).unwrap();
    assert_eq!(ws.root(), dir.path().join(id.to_string()));

    ws.create().await.unwrap();
    assert!(ws.rasters_dir().is_dir());
    assert!(ws.frames_dir().is_dir());
    assert!(ws.audio_dir().is_dir());

    assert!(ws.remove().await.unwrap());
    assert!(!ws.root().exists());
    assert!(!ws.remove().await.unwrap());
}

#[test]
fn file_names() {
    let ws = JobWorkspace::new(Path::new("/w"), JobId::generate()).unwrap();
    assert!(ws.frame_path(FrameIndex(42)).ends_with("frames/frame_000042.png"));
    assert!(ws.raster_path(3, "slide 1/a").ends_with("rasters/unit_0003_slide_1_a.png"));
    assert!(ws.raster_path(0, "").ends_with("rasters/unit_0000_unit.png"));
    assert!(ws.audio_path().ends_with("audio/stem.wav"));
}

#[test]
fn artifact_path_uses_format_extension() {
    let id = JobId::generate();
    let p = output_path(Path::new("/out"), id, OutputFormat::Webm);
    assert_eq!(p, PathBuf::from(format!("/out/{id}.webm")));
}

#[test]
fn relative_roots_are_made_absolute() {
    let ws = JobWorkspace::new(Path::new("relative/root"), JobId::generate()).unwrap();
    assert!(ws.root().is_absolute());
}
