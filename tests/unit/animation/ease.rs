use super::*;

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-12
}

#[test]
fn endpoints_are_exact_for_every_easing() {
    for ease in Easing::ALL {
        assert_eq!(ease.apply(0.0), 0.0, "{ease:?} at 0");
        assert_eq!(ease.apply(1.0), 1.0, "{ease:?} at 1");
    }
}

#[test]
fn back_settles_exactly_past_the_end() {
    assert_eq!(Easing::Back.apply(1.0), 1.0);
    assert_eq!(Easing::Back.apply(3.0), 1.0);
    assert!(Easing::Back.apply(0.999) < 1.0);
}

#[test]
fn quadratic_formulas_match() {
    assert!(approx(Easing::EaseIn.apply(0.5), 0.25));
    assert!(approx(Easing::EaseOut.apply(0.5), 0.75));
    assert!(approx(Easing::EaseInOut.apply(0.25), 0.125));
    assert!(approx(Easing::EaseInOut.apply(0.75), 0.875));
}

#[test]
fn overshoot_formulas_match() {
    let t = 0.3;
    let bounce = 1.0 - (1.0 - t) * (1.0 - t) * (7.0 * std::f64::consts::PI * t).cos();
    assert!(approx(Easing::Bounce.apply(t), bounce));

    let elastic = -(2f64.powf(10.0 * (t - 1.0))) * ((t - 1.1) * 5.0 * std::f64::consts::PI).sin();
    assert!(approx(Easing::Elastic.apply(t), elastic));

    assert!(approx(Easing::Back.apply(0.5), 2.7 * 0.125 - 1.7 * 0.25));
    assert!(Easing::Back.apply(0.3) < 0.0, "back pulls below zero early");
}

#[test]
fn input_is_clamped() {
    assert_eq!(Easing::Linear.apply(-1.0), 0.0);
    assert_eq!(Easing::Linear.apply(2.0), 1.0);
}

#[test]
fn wire_names_are_kebab_case() {
    assert_eq!(
        serde_json::to_string(&Easing::EaseInOut).unwrap(),
        "\"ease-in-out\""
    );
    let e: Easing = serde_json::from_str("\"bounce\"").unwrap();
    assert_eq!(e, Easing::Bounce);
}

#[test]
fn interpolation_shapes() {
    assert_eq!(Interpolation::Linear.shape(0.3), Some(0.3));
    assert_eq!(Interpolation::Step.shape(0.3), None);
    let b = Interpolation::Bezier.shape(0.5).unwrap();
    assert!(approx(b, 0.5));
    assert_eq!(Interpolation::Bezier.shape(0.0), Some(0.0));
    assert_eq!(Interpolation::Bezier.shape(1.0), Some(1.0));
}
