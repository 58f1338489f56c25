use super::*;
use crate::timeline::effect::{EffectInstance, EffectKind};
use crate::timeline::model::{ElementStyle, UnitElement};

fn unit(id: &str, duration: f64, elements: Vec<UnitElement>) -> ContentUnit {
    ContentUnit {
        id: id.to_owned(),
        duration,
        background: None,
        voice_over: None,
        elements,
    }
}

fn element(kind: ElementKind, content: &str) -> UnitElement {
    UnitElement {
        id: None,
        kind,
        content: content.to_owned(),
        style: ElementStyle::default(),
        position: None,
        effects: Vec::new(),
    }
}

#[test]
fn two_units_sum_and_one_transition() {
    let tl = compose(&[unit("a", 15.0, Vec::new()), unit("b", 20.0, Vec::new())]).unwrap();
    assert_eq!(tl.total_duration, 35.0);
    assert_eq!(tl.transitions.len(), 1);
    assert_eq!(tl.transitions[0].at, 15.0);
    assert_eq!(tl.transitions[0].duration, 1.0);

    let videos: Vec<_> = tl.tracks_of(TrackKind::Video).collect();
    assert_eq!(videos.len(), 2);
    assert_eq!((videos[1].start_time, videos[1].duration), (15.0, 20.0));
    assert!(tl.validate().is_ok());
}

#[test]
fn total_duration_matches_sum_for_awkward_durations() {
    let durations = [0.1, 0.2, 0.3, 1.7, 2.9, 0.05];
    let units: Vec<_> = durations
        .iter()
        .enumerate()
        .map(|(i, &d)| unit(&format!("u{i}"), d, Vec::new()))
        .collect();
    let tl = compose(&units).unwrap();
    let mut sum = 0.0;
    for d in durations {
        sum += d;
    }
    assert_eq!(tl.total_duration, sum);
    assert_eq!(tl.transitions.len(), durations.len() - 1);
}

#[test]
fn empty_input_gives_empty_timeline() {
    let tl = compose(&[]).unwrap();
    assert_eq!(tl.total_duration, 0.0);
    assert!(tl.tracks.is_empty());
    assert!(tl.transitions.is_empty());
}

#[test]
fn text_track_is_inset_and_faded() {
    let tl = compose(&[
        unit("a", 4.0, Vec::new()),
        unit("b", 6.0, vec![element(ElementKind::Text, "Title")]),
    ])
    .unwrap();
    let text: Vec<_> = tl.tracks_of(TrackKind::Text).collect();
    assert_eq!(text.len(), 1);
    let t = text[0];
    assert_eq!(t.start_time, 4.5);
    assert_eq!(t.duration, 5.0);
    assert_eq!(t.end_time(), 9.5);
    assert_eq!(t.effects.len(), 2);
    assert_eq!(t.effects[0], Effect::fade_in(4.5, 0.5));
    assert_eq!(t.effects[1], Effect::fade_out(9.0, 0.5));
    assert_eq!(t.unit_id(), "b");
    assert_eq!(t.id, "b:b-el0:text");
}

#[test]
fn short_units_skip_text_and_short_text_clamps_fades() {
    let tl = compose(&[
        unit("short", 0.8, vec![element(ElementKind::Text, "gone")]),
        unit("exact", 1.0, vec![element(ElementKind::Text, "gone too")]),
        unit("tiny", 1.4, vec![element(ElementKind::Text, "brief")]),
    ])
    .unwrap();
    let text: Vec<_> = tl.tracks_of(TrackKind::Text).collect();
    assert_eq!(text.len(), 1);
    let t = text[0];
    assert!((t.duration - 0.4).abs() < 1e-12);
    assert!(t.effects.iter().all(|e| e.duration <= t.duration));
    assert_eq!(tl.tracks_of(TrackKind::Video).count(), 3);
}

#[test]
fn images_shapes_and_voice_over() {
    let mut image = element(ElementKind::Image, "assets/logo.png");
    image.id = Some("logo".to_owned());
    image.effects.push(EffectInstance {
        kind: "zoom".to_owned(),
        params: serde_json::json!({"factor": 1.2}),
    });
    let mut u = unit(
        "a",
        5.0,
        vec![image, element(ElementKind::Shape, "rect")],
    );
    u.voice_over = Some("voice/a.mp3".into());
    let tl = compose(&[u]).unwrap();

    let images: Vec<_> = tl.tracks_of(TrackKind::Image).collect();
    assert_eq!(images.len(), 1);
    assert_eq!((images[0].start_time, images[0].duration), (0.0, 5.0));
    assert_eq!(images[0].effects[0].kind, EffectKind::Zoom { factor: 1.2 });

    let TrackContent::Unit { elements, .. } = &tl.tracks[0].content else {
        panic!("first track should be the unit");
    };
    assert_eq!(elements.len(), 1);
    assert_eq!(elements[0].kind, ElementKind::Shape);

    let audio: Vec<_> = tl.tracks_of(TrackKind::Audio).collect();
    assert_eq!(audio.len(), 1);
    assert_eq!(audio[0].id, "a:audio");

    assert_eq!(tl.active_overlays(2.0).count(), 1);
}

#[test]
fn rejects_bad_duration_and_unknown_effects() {
    assert!(compose(&[unit("z", 0.0, Vec::new())]).is_err());
    assert!(compose(&[unit("n", f64::NAN, Vec::new())]).is_err());

    let mut el = element(ElementKind::Text, "x");
    el.effects.push(EffectInstance {
        kind: "sparkle".to_owned(),
        params: serde_json::Value::Null,
    });
    let err = compose(&[unit("a", 5.0, vec![el])]).unwrap_err();
    assert!(err.to_string().contains("sparkle"));
}
