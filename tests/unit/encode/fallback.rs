use super::*;

#[test]
fn parses_hex_colours() {
    assert_eq!(parse_hex_rgba("#ff8000"), Some([255, 128, 0, 255]));
    assert_eq!(parse_hex_rgba("0000ff80"), Some([0, 0, 255, 128]));
    assert_eq!(parse_hex_rgba(" #FFFFFF "), Some([255, 255, 255, 255]));
    assert_eq!(parse_hex_rgba("#fff"), None);
    assert_eq!(parse_hex_rgba("#gg0000"), None);
    assert_eq!(parse_hex_rgba("images/bg.png"), None);
}

#[test]
fn writes_png_with_requested_size() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("solid.png");
    write_solid_png_blocking(&path, 8, 6, [10, 20, 30, 255]).unwrap();
    let bytes = std::fs::read(&path).unwrap();
    assert_eq!(&bytes[1..4], b"PNG");
    // IHDR width/height, big endian.
    assert_eq!(u32::from_be_bytes([bytes[16], bytes[17], bytes[18], bytes[19]]), 8);
    assert_eq!(u32::from_be_bytes([bytes[20], bytes[21], bytes[22], bytes[23]]), 6);
}

#[tokio::test]
async fn async_writer_returns_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("a.png");
    let out = write_solid_png(path.clone(), 2, 2, [0, 0, 0, 255]).await.unwrap();
    assert_eq!(out, path);
    assert!(out.exists());
}
