use bdk_bsp::box_::FBox;
use bdk_bsp::math::FVector;

#[test]
fn box_new_test() {
    let box_ = FBox::new();
    assert_eq!(box_.min, FVector::new(0.0, 0.0, 0.0));
    assert_eq!(box_.max, FVector::new(0.0, 0.0, 0.0));
    assert!(!box_.is_valid);
}

#[test]
fn box_new_from_points_test() {
    let points = vec![
        FVector::new(1.0, 2.0, 3.0),
        FVector::new(4.0, 5.0, 6.0),
        FVector::new(7.0, 8.0, 9.0)
    ];
    let box_ = FBox::new_from_points(&points);
    assert_eq!(box_.min, FVector::new(1.0, 2.0, 3.0));
    assert_eq!(box_.max, FVector::new(7.0, 8.0, 9.0));
    assert!(box_.is_valid);
}

#[test]
fn box_new_from_no_points_test() {
    let box_ = FBox::new_from_points(&[]);
    assert!(!box_.is_valid);
}

#[test]
fn box_new_from_min_max_test() {
    let min = FVector::new(1.0, 2.0, 3.0);
    let max = FVector::new(4.0, 5.0, 6.0);
    let box_ = FBox::new_from_min_max(min, max);
    assert_eq!(box_.min, min);
    assert_eq!(box_.max, max);
    assert!(box_.is_valid);
}

#[test]
fn box_center_test() {
    let box_ = FBox::new_from_min_max(FVector::new(1.0, 2.0, 3.0), FVector::new(4.0, 5.0, 6.0));
    assert_eq!(box_.center(), FVector::new(2.5, 3.5, 4.5));
}

#[test]
fn box_extent_test() {
    let box_ = FBox::new_from_min_max(FVector::new(1.0, 2.0, 3.0), FVector::new(4.0, 5.0, 6.0));
    assert_eq!(box_.extent(), FVector::new(1.5, 1.5, 1.5));
}

#[test]
fn box_add_point_grows_test() {
    let mut box_ = FBox::new();
    box_.add_point(&FVector::new(1.0, -1.0, 0.0));
    assert_eq!(box_, FBox::new_from_min_max(FVector::new(1.0, -1.0, 0.0), FVector::new(1.0, -1.0, 0.0)));

    box_.add_point(&FVector::new(-2.0, 3.0, 0.5));
    assert_eq!(box_.min, FVector::new(-2.0, -1.0, 0.0));
    assert_eq!(box_.max, FVector::new(1.0, 3.0, 0.5));

    // A point already inside leaves the box alone.
    box_.add_point(&FVector::new(0.0, 0.0, 0.25));
    assert_eq!(box_.min, FVector::new(-2.0, -1.0, 0.0));
    assert_eq!(box_.max, FVector::new(1.0, 3.0, 0.5));
}
