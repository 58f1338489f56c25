use super::*;

fn store_with_track() -> (TrackStore, TrackId) {
    let mut store = TrackStore::new();
    let id = store.create_track("slide-1", AnimatedProperty::Opacity);
    (store, id)
}

#[test]
fn add_keeps_keyframes_sorted() {
    let (mut store, id) = store_with_track();
    store.add_keyframe(&id, 10.0, 100.0, Easing::Linear).unwrap();
    store.add_keyframe(&id, 0.0, 0.0, Easing::Linear).unwrap();
    store.add_keyframe(&id, 5.0, 20.0, Easing::Linear).unwrap();
    let times: Vec<f64> = store.track(&id).unwrap().keyframes.iter().map(|k| k.time).collect();
    assert_eq!(times, vec![0.0, 5.0, 10.0]);
    assert_eq!(store.value_at(&id, 2.5).unwrap(), 10.0);
}

#[test]
fn duplicate_time_is_rejected_and_track_unchanged() {
    let (mut store, id) = store_with_track();
    store.add_keyframe(&id, 5.0, 1.0, Easing::Linear).unwrap();
    let err = store.add_keyframe(&id, 5.0, 2.0, Easing::EaseIn).unwrap_err();
    assert!(matches!(err, DeckreelError::DuplicateTime { time, .. } if time == 5.0));
    assert_eq!(store.track(&id).unwrap().keyframes.len(), 1);
    assert_eq!(store.value_at(&id, 5.0).unwrap(), 1.0);
}

#[test]
fn update_moving_onto_existing_time_is_rejected() {
    let (mut store, id) = store_with_track();
    store.add_keyframe(&id, 1.0, 1.0, Easing::Linear).unwrap();
    let k2 = store.add_keyframe(&id, 2.0, 2.0, Easing::Linear).unwrap();
    let patch = KeyframePatch {
        time: Some(1.0),
        ..KeyframePatch::default()
    };
    assert!(matches!(
        store.update_keyframe(&id, &k2, patch),
        Err(DeckreelError::DuplicateTime { .. })
    ));
    assert_eq!(store.track(&id).unwrap().keyframes[1].time, 2.0);
}

#[test]
fn update_resorts_on_time_change() {
    let (mut store, id) = store_with_track();
    let k0 = store.add_keyframe(&id, 0.0, 0.0, Easing::Linear).unwrap();
    store.add_keyframe(&id, 4.0, 40.0, Easing::Linear).unwrap();
    store
        .update_keyframe(
            &id,
            &k0,
            KeyframePatch {
                time: Some(8.0),
                value: Some(80.0),
                easing: Some(Easing::Back),
                interpolation: None,
            },
        )
        .unwrap();
    let track = store.track(&id).unwrap();
    assert_eq!(track.keyframes[0].time, 4.0);
    assert_eq!(track.keyframes[1].id, k0);
    assert_eq!(track.keyframes[1].easing, Easing::Back);
    assert!(track.validate().is_ok());

    // Updating a keyframe to its own time is not a collision.
    store
        .update_keyframe(
            &id,
            &k0,
            KeyframePatch {
                time: Some(8.0),
                ..KeyframePatch::default()
            },
        )
        .unwrap();
}

#[test]
fn remove_missing_keyframe_is_not_found() {
    let (mut store, id) = store_with_track();
    let missing = KeyframeId::from("nope");
    assert!(matches!(
        store.remove_keyframe(&id, &missing),
        Err(DeckreelError::NotFound(_))
    ));
    assert!(matches!(
        store.value_at(&TrackId::from("ghost"), 0.0),
        Err(DeckreelError::NotFound(_))
    ));
}

#[test]
fn removing_last_keyframe_leaves_empty_curve() {
    let (mut store, id) = store_with_track();
    let k = store.add_keyframe(&id, 3.0, 7.0, Easing::Linear).unwrap();
    store.remove_keyframe(&id, &k).unwrap();
    assert!(matches!(store.value_at(&id, 3.0), Err(DeckreelError::EmptyCurve)));
    store.add_keyframe(&id, 3.0, 7.0, Easing::Linear).unwrap();
    assert_eq!(store.value_at(&id, 0.0).unwrap(), 7.0);
}

#[test]
fn remove_then_add_restores_values() {
    let (mut store, id) = store_with_track();
    store.add_keyframe(&id, 0.0, 0.0, Easing::EaseInOut).unwrap();
    let mid = store.add_keyframe(&id, 2.0, 60.0, Easing::Elastic).unwrap();
    store.add_keyframe(&id, 5.0, 10.0, Easing::Linear).unwrap();

    let times: Vec<f64> = (0..=50).map(|i| f64::from(i) * 0.12).collect();
    let before: Vec<f64> = times.iter().map(|&t| store.value_at(&id, t).unwrap()).collect();

    let removed = store.remove_keyframe(&id, &mid).unwrap();
    store
        .add_keyframe(&id, removed.time, removed.value, removed.easing)
        .unwrap();
    let after: Vec<f64> = times.iter().map(|&t| store.value_at(&id, t).unwrap()).collect();
    assert_eq!(before, after);
}

#[test]
fn remove_then_restore_keeps_non_linear_interpolation() {
    let (mut store, id) = store_with_track();
    store.add_keyframe(&id, 0.0, 0.0, Easing::Linear).unwrap();
    let mid = store
        .add_keyframe_with(&id, 2.0, 60.0, Easing::EaseIn, Interpolation::Step)
        .unwrap();
    store
        .add_keyframe_with(&id, 5.0, 10.0, Easing::Linear, Interpolation::Bezier)
        .unwrap();

    let times: Vec<f64> = (0..=50).map(|i| f64::from(i) * 0.12).collect();
    let before: Vec<f64> = times.iter().map(|&t| store.value_at(&id, t).unwrap()).collect();
    assert_eq!(store.value_at(&id, 3.0).unwrap(), 60.0, "step holds until the next key");

    let removed = store.remove_keyframe(&id, &mid).unwrap();
    store.restore_keyframe(&id, removed.clone()).unwrap();
    let after: Vec<f64> = times.iter().map(|&t| store.value_at(&id, t).unwrap()).collect();
    assert_eq!(before, after);
    assert_eq!(store.track(&id).unwrap().keyframes[1], removed);

    // Re-adding with the same interpolation restores the values too.
    store.remove_keyframe(&id, &mid).unwrap();
    store
        .add_keyframe_with(&id, removed.time, removed.value, removed.easing, removed.interpolation)
        .unwrap();
    let again: Vec<f64> = times.iter().map(|&t| store.value_at(&id, t).unwrap()).collect();
    assert_eq!(before, again);
}

#[test]
fn restore_rejects_time_collisions() {
    let (mut store, id) = store_with_track();
    let k = store.add_keyframe(&id, 1.0, 5.0, Easing::Linear).unwrap();
    let removed = store.remove_keyframe(&id, &k).unwrap();
    store.add_keyframe(&id, 1.0, 9.0, Easing::Linear).unwrap();
    assert!(matches!(
        store.restore_keyframe(&id, removed),
        Err(DeckreelError::DuplicateTime { time, .. }) if time == 1.0
    ));
    assert_eq!(store.value_at(&id, 1.0).unwrap(), 9.0);
}

#[test]
fn paste_shifts_copied_keyframes_to_target_time() {
    let mut store = TrackStore::new();
    let src = store.create_track("a", AnimatedProperty::Opacity);
    let dst = store.create_track("b", AnimatedProperty::Opacity);
    let k1 = store.add_keyframe(&src, 1.0, 10.0, Easing::EaseOut).unwrap();
    store.add_keyframe(&src, 2.0, 99.0, Easing::Linear).unwrap();
    let k3 = store
        .add_keyframe_with(&src, 3.0, 30.0, Easing::Linear, Interpolation::Step)
        .unwrap();

    let copied = store.copy_keyframes(&src, &[k3.clone(), k1.clone()]).unwrap();
    assert_eq!(copied.len(), 2);
    assert_eq!(copied[0].id, k1, "copies come back in track order");

    store.add_keyframe(&dst, 0.0, 0.0, Easing::Linear).unwrap();
    let ids = store.paste_keyframes(&dst, &copied, 5.0).unwrap();
    assert_eq!(ids.len(), 2);
    assert!(!ids.contains(&k1) && !ids.contains(&k3));

    let track = store.track(&dst).unwrap();
    let times: Vec<f64> = track.keyframes.iter().map(|k| k.time).collect();
    assert_eq!(times, vec![0.0, 5.0, 7.0]);
    assert_eq!(track.keyframes[1].easing, Easing::EaseOut);
    assert_eq!(track.keyframes[2].interpolation, Interpolation::Step);
    assert_eq!(store.value_at(&dst, 7.5).unwrap(), 30.0);
}

#[test]
fn paste_collision_leaves_track_unchanged() {
    let (mut store, id) = store_with_track();
    let a = store.add_keyframe(&id, 0.0, 0.0, Easing::Linear).unwrap();
    let b = store.add_keyframe(&id, 1.0, 10.0, Easing::Linear).unwrap();
    store.add_keyframe(&id, 4.0, 40.0, Easing::Linear).unwrap();
    let copied = store.copy_keyframes(&id, &[a, b]).unwrap();
    let before = store.snapshot();

    // Lands on 3.0 and 4.0; 4.0 is taken.
    assert!(matches!(
        store.paste_keyframes(&id, &copied, 3.0),
        Err(DeckreelError::DuplicateTime { time, .. }) if time == 4.0
    ));
    assert_eq!(store.snapshot(), before);

    assert!(store.paste_keyframes(&id, &copied, -1.0).is_err());
    assert_eq!(store.paste_keyframes(&id, &[], 2.0).unwrap(), Vec::<KeyframeId>::new());
    assert!(matches!(
        store.copy_keyframes(&id, &[KeyframeId::from("nope")]),
        Err(DeckreelError::NotFound(_))
    ));
}

#[test]
fn optimize_drops_collinear_keyframes_only() {
    let (mut store, id) = store_with_track();
    store.add_keyframe(&id, 0.0, 0.0, Easing::Linear).unwrap();
    store.add_keyframe(&id, 1.0, 10.0, Easing::Linear).unwrap();
    store.add_keyframe(&id, 2.0, 20.0, Easing::Linear).unwrap();
    store.add_keyframe(&id, 3.0, 30.0, Easing::Linear).unwrap();
    store.add_keyframe(&id, 4.0, 0.0, Easing::Linear).unwrap();

    let times: Vec<f64> = (0..=40).map(|i| f64::from(i) * 0.1).collect();
    let before: Vec<f64> = times.iter().map(|&t| store.value_at(&id, t).unwrap()).collect();

    assert_eq!(store.optimize_track(&id, 1e-3).unwrap(), 2);
    let kept: Vec<f64> = store.track(&id).unwrap().keyframes.iter().map(|k| k.time).collect();
    assert_eq!(kept, vec![0.0, 3.0, 4.0]);

    for (t, v) in times.iter().zip(&before) {
        assert!((store.value_at(&id, *t).unwrap() - v).abs() < 1e-9, "t={t}");
    }
    assert_eq!(store.optimize_track(&id, 1e-3).unwrap(), 0);
}

#[test]
fn optimize_keeps_eased_and_off_line_keyframes() {
    let (mut store, id) = store_with_track();
    store.add_keyframe(&id, 0.0, 0.0, Easing::Linear).unwrap();
    store.add_keyframe(&id, 1.0, 10.0, Easing::EaseIn).unwrap();
    store.add_keyframe(&id, 2.0, 20.0, Easing::Linear).unwrap();
    store.add_keyframe(&id, 3.0, 30.5, Easing::Linear).unwrap();
    store.add_keyframe(&id, 4.0, 40.0, Easing::Linear).unwrap();
    assert_eq!(store.optimize_track(&id, 1e-3).unwrap(), 0);

    // A looser tolerance absorbs the 0.5 bump.
    assert_eq!(store.optimize_track(&id, 0.5).unwrap(), 1);

    store.set_locked(&id, true).unwrap();
    assert!(matches!(
        store.optimize_track(&id, 1.0),
        Err(DeckreelError::TrackLocked(_))
    ));
    assert!(store.optimize_track(&TrackId::from("ghost"), 1.0).is_err());
}

#[test]
fn locked_tracks_reject_mutation() {
    let (mut store, id) = store_with_track();
    let k = store.add_keyframe(&id, 0.0, 1.0, Easing::Linear).unwrap();
    store.set_locked(&id, true).unwrap();
    assert!(matches!(
        store.add_keyframe(&id, 1.0, 1.0, Easing::Linear),
        Err(DeckreelError::TrackLocked(_))
    ));
    assert!(matches!(
        store.remove_keyframe(&id, &k),
        Err(DeckreelError::TrackLocked(_))
    ));
    assert_eq!(store.value_at(&id, 0.0).unwrap(), 1.0);
}

#[test]
fn negative_or_nan_times_are_rejected() {
    let (mut store, id) = store_with_track();
    assert!(store.add_keyframe(&id, -1.0, 0.0, Easing::Linear).is_err());
    assert!(store.add_keyframe(&id, f64::NAN, 0.0, Easing::Linear).is_err());
    assert!(store.track(&id).unwrap().keyframes.is_empty());
}

#[test]
fn values_at_skips_hidden_and_empty_tracks() {
    let mut store = TrackStore::new();
    let opacity = store.create_track("el", AnimatedProperty::Opacity);
    let scale = store.create_track("el", AnimatedProperty::Scale);
    let _empty = store.create_track("el", AnimatedProperty::Rotation);
    let other = store.create_track("other", AnimatedProperty::Volume);
    store.add_keyframe(&opacity, 0.0, 50.0, Easing::Linear).unwrap();
    store.add_keyframe(&scale, 0.0, 2.0, Easing::Linear).unwrap();
    store.add_keyframe(&other, 0.0, 10.0, Easing::Linear).unwrap();
    store.set_visible(&scale, false).unwrap();

    let values = store.values_at("el", 1.0).unwrap();
    assert_eq!(values.len(), 1);
    assert_eq!(values[&AnimatedProperty::Opacity], 50.0);
}

#[test]
fn snapshot_round_trips_through_json() {
    let (mut store, id) = store_with_track();
    store.add_keyframe(&id, 0.0, 0.0, Easing::Bounce).unwrap();
    store
        .add_keyframe_with(&id, 1.0, 1.0, Easing::Linear, Interpolation::Step)
        .unwrap();
    let json = serde_json::to_string(&store.snapshot()).unwrap();
    let tracks: Vec<AnimationTrack> = serde_json::from_str(&json).unwrap();
    let restored = TrackStore::from_tracks(tracks).unwrap();
    assert_eq!(restored.snapshot(), store.snapshot());
}

#[test]
fn from_tracks_rejects_duplicate_times() {
    let mut track = AnimationTrack::new("el", AnimatedProperty::Scale);
    track.keyframes.push(Keyframe::new(1.0, 1.0, Easing::Linear));
    track.keyframes.push(Keyframe::new(1.0, 2.0, Easing::Linear));
    assert!(matches!(
        TrackStore::from_tracks([track]),
        Err(DeckreelError::DuplicateTime { .. })
    ));
}

#[test]
fn remove_element_drops_all_bound_tracks() {
    let mut store = TrackStore::new();
    store.create_track("a", AnimatedProperty::Opacity);
    store.create_track("a", AnimatedProperty::Scale);
    store.create_track("b", AnimatedProperty::Scale);
    assert_eq!(store.remove_element("a"), 2);
    assert_eq!(store.len(), 1);
}

#[test]
fn sample_track_delegates_to_curve() {
    let (mut store, id) = store_with_track();
    store.add_keyframe(&id, 0.0, 0.0, Easing::Linear).unwrap();
    store.add_keyframe(&id, 10.0, 100.0, Easing::Linear).unwrap();
    let pts = store.sample_track(&id, 0.0, 10.0, 10).unwrap();
    assert_eq!(pts.len(), 11);
    assert_eq!(pts[5], (5.0, 50.0));
}
