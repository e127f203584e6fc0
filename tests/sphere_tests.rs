use approx::assert_abs_diff_eq;
use bdk_bsp::box_::FBox;
use bdk_bsp::math::FVector;
use bdk_bsp::sphere::FSphere;

#[test]
fn sphere_new_test() {
    let sphere = FSphere::new();
    assert_eq!(sphere.origin, FVector::new(0.0, 0.0, 0.0));
    assert_eq!(sphere.radius, 0.0);
}

#[test]
fn sphere_new_from_origin_and_radius_test() {
    let origin = FVector::new(1.0, 2.0, 3.0);
    let radius = 4.0;
    let sphere = FSphere::new_from_origin_and_radius(&origin, radius);
    assert_eq!(sphere.origin, origin);
    assert_eq!(sphere.radius, radius);
}

#[test]
fn sphere_new_from_points_test() {
    let points = vec![
        FVector::new(1.0, 2.0, 3.0),
        FVector::new(4.0, 5.0, 6.0),
        FVector::new(7.0, 8.0, 9.0)
    ];
    let sphere = FSphere::new_from_points(&points);
    assert_eq!(sphere.origin, FVector::new(4.0, 5.0, 6.0));
    // (4,5,6) -> (7,8,9) = sqrt(27) = 5.196152, padded by 1.001.
    assert_abs_diff_eq!(sphere.radius, 5.201349, epsilon = 1e-4);
}

#[test]
fn sphere_from_box_test() {
    let box_ = FBox::new_from_min_max(FVector::new(-1.0, -1.0, -1.0), FVector::new(1.0, 1.0, 1.0));
    let sphere = FSphere::from(&box_);
    assert_eq!(sphere.origin, FVector::new(0.0, 0.0, 0.0));
    assert_abs_diff_eq!(sphere.radius, 3.0f32.sqrt() * 1.001, epsilon = 1e-4);
}

#[test]
fn sphere_from_invalid_box_test() {
    assert_eq!(FSphere::from(&FBox::new()), FSphere::new());
}
