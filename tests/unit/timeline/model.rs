use super::*;
use crate::timeline::effect::Effect;

fn text_track(start: f64, duration: f64, effects: Vec<Effect>) -> TimelineTrack {
    TimelineTrack {
        id: "u:t:text".to_owned(),
        kind: TrackKind::Text,
        start_time: start,
        duration,
        content: TrackContent::Text {
            unit_id: "u".to_owned(),
            element_id: "t".to_owned(),
            text: "hello".to_owned(),
            style: ElementStyle::default(),
        },
        effects,
        position: None,
    }
}

#[test]
fn opacity_folds_fades() {
    let tr = text_track(
        0.5,
        4.0,
        vec![Effect::fade_in(0.5, 0.5), Effect::fade_out(4.0, 0.5)],
    );
    assert_eq!(tr.opacity_at(0.5), 0.0);
    assert!((tr.opacity_at(0.75) - 0.5).abs() < 1e-12);
    assert_eq!(tr.opacity_at(2.0), 1.0);
    assert!((tr.opacity_at(4.25) - 0.5).abs() < 1e-12);
    assert_eq!(tr.opacity_at(4.5), 0.0);
}

#[test]
fn transform_accumulates_geometric_effects() {
    let tr = text_track(
        0.0,
        2.0,
        vec![
            Effect {
                start_time: 0.0,
                duration: 2.0,
                kind: EffectKind::Zoom { factor: 2.0 },
            },
            Effect {
                start_time: 0.0,
                duration: 2.0,
                kind: EffectKind::Pan { dx: 10.0, dy: 20.0 },
            },
        ],
    );
    let mid = tr.transform_at(1.0);
    assert_eq!(mid.scale, 1.5);
    assert_eq!(mid.offset, Vec2::new(5.0, 10.0));
    assert!(tr.transform_at(0.0).is_identity());
}

#[test]
fn active_is_half_open() {
    let tr = text_track(1.0, 2.0, Vec::new());
    assert!(!tr.is_active_at(0.99));
    assert!(tr.is_active_at(1.0));
    assert!(!tr.is_active_at(3.0));
}

#[test]
fn position_clips_to_canvas() {
    let p = Position {
        x: -10.0,
        y: 10.0,
        width: 50.0,
        height: 20.0,
    };
    let r = p.clip_to_canvas(100, 100).unwrap();
    assert_eq!((r.x0, r.y0, r.x1, r.y1), (0.0, 10.0, 40.0, 30.0));
    let off = Position {
        x: 200.0,
        y: 0.0,
        width: 5.0,
        height: 5.0,
    };
    assert!(off.clip_to_canvas(100, 100).is_none());
}

#[test]
fn validate_rejects_track_past_end() {
    let mut tl = RenderTimeline {
        total_duration: 2.0,
        tracks: vec![text_track(0.5, 1.0, Vec::new())],
        transitions: Vec::new(),
    };
    assert!(tl.validate().is_ok());
    tl.tracks[0].duration = 5.0;
    assert!(tl.validate().is_err());
}

#[test]
fn element_json_uses_type_field() {
    let el: UnitElement = serde_json::from_str(
        r##"{"type":"text","content":"Hi","style":{"fontSize":32,"color":"#fff"}}"##,
    )
    .unwrap();
    assert_eq!(el.kind, ElementKind::Text);
    assert_eq!(el.style.font_size, Some(32.0));
    assert!(el.effects.is_empty());
}
