mod common;

use std::str::FromStr;

use approx::assert_abs_diff_eq;
use bdk_bsp::box_::FBox;
use bdk_bsp::brush::ABrush;
use bdk_bsp::bsp::{bsp_build, EPolyNodeFilter};
use bdk_bsp::config::BuildOptions;
use bdk_bsp::csg::{bsp_brush_csg, bsp_filter_fpoly, csg_rebuild, ECsgOper, ULevel};
use bdk_bsp::error::{BspError, BuildReport};
use bdk_bsp::fpoly::{EPolyFlags, FPoly};
use bdk_bsp::math::FVector;
use bdk_bsp::model::{EModelState, UModel};
use cgmath::InnerSpace;

use common::{create_cube_polys, init_logger, total_area};

/// An empty world with a valid tree.  Brush-style worlds are empty space
/// until something is added; level-style worlds are solid.
fn create_world(is_root_outside: bool) -> UModel {
    let mut world = UModel::new();
    world.is_root_outside = is_root_outside;
    bsp_build(&mut world, &BuildOptions::default());
    world
}

fn create_cube_brush(origin: FVector, size: f32, csg_operation: ECsgOper) -> ABrush {
    ABrush::new_from_polys(&create_cube_polys(FVector::new(0.0, 0.0, 0.0), size), csg_operation)
        .with_location(origin)
}

fn centroid(poly: &FPoly) -> FVector {
    poly.vertices.iter().fold(FVector::new(0.0, 0.0, 0.0), |sum, v| sum + v) / poly.vertices.len() as f32
}

fn apply(world: &mut UModel, brush: &ABrush) -> BuildReport {
    bsp_brush_csg(brush, world, brush.poly_flags, brush.csg_operation, &BuildOptions::default())
        .expect("world has a tree")
        .report
}

#[test]
fn csg_oper_from_str_test() {
    assert_eq!(ECsgOper::from_str("ADD"), Ok(ECsgOper::Add));
    assert_eq!(ECsgOper::from_str("SUBTRACT"), Ok(ECsgOper::Subtract));
    assert_eq!(ECsgOper::from_str("INTERSECT"), Ok(ECsgOper::Intersect));
    assert_eq!(ECsgOper::from_str("DEINTERSECT"), Ok(ECsgOper::Deintersect));
    assert_eq!("add".parse::<ECsgOper>(), Err(BspError::UnknownCsgOperation("add".to_string())));
}

#[test]
fn bsp_brush_csg_requires_tree_test() {
    let mut world = UModel::new();
    let brush = create_cube_brush(FVector::new(0.0, 0.0, 0.0), 1.0, ECsgOper::Add);

    let result = bsp_brush_csg(&brush, &mut world, EPolyFlags::empty(), ECsgOper::Add, &BuildOptions::default());

    assert_eq!(result, Err(BspError::TreeRequired { state: EModelState::PolysOnly }));
    assert!(world.nodes.is_empty());
    assert!(world.surfaces.is_empty());
}

#[test]
fn bsp_filter_fpoly_classifies_fragments_test() {
    let mut model = UModel::new_from_polys(&create_cube_polys(FVector::new(0.0, 0.0, 0.0), 1.0));
    bsp_build(&mut model, &BuildOptions::default());
    // A strip through the middle of the cube, poking out on both sides.
    let strip = FPoly::from_vertices(&[
        FVector::new(-2.0, -0.25, 0.0),
        FVector::new(2.0, -0.25, 0.0),
        FVector::new(2.0, 0.25, 0.0),
        FVector::new(-2.0, 0.25, 0.0),
    ]);
    let mut report = BuildReport::new();
    let mut fragments: Vec<(f32, EPolyNodeFilter)> = Vec::new();

    bsp_filter_fpoly(
        &mut |_, _, _, fragment, filter, _| fragments.push((fragment.area(), filter)),
        &mut model,
        &mut report,
        strip,
    );

    let area_of = |wanted: EPolyNodeFilter| fragments.iter()
        .filter(|(_, filter)| *filter == wanted)
        .map(|(area, _)| area)
        .sum::<f32>();
    assert_eq!(fragments.len(), 3);
    assert_abs_diff_eq!(area_of(EPolyNodeFilter::Inside), 0.5, epsilon = 1e-4);
    assert_abs_diff_eq!(area_of(EPolyNodeFilter::Outside), 1.5, epsilon = 1e-4);
    assert!(report.is_clean());
}

#[test]
fn bsp_filter_fpoly_empty_tree_test() {
    let mut model = UModel::new();
    model.is_root_outside = false;
    let mut report = BuildReport::new();
    let mut filters = Vec::new();

    bsp_filter_fpoly(
        &mut |_, _, node_index, _, filter, _| filters.push((node_index, filter)),
        &mut model,
        &mut report,
        create_cube_polys(FVector::new(0.0, 0.0, 0.0), 1.0).remove(0),
    );

    assert_eq!(filters, vec![(None, EPolyNodeFilter::Inside)]);
}

#[test]
fn bsp_brush_csg_add_to_empty_world_test() {
    init_logger();
    let mut world = create_world(true);

    let report = apply(&mut world, &create_cube_brush(FVector::new(0.0, 0.0, 0.0), 10.0, ECsgOper::Add));

    assert!(report.is_clean());
    assert!(world.is_tree_valid());
    assert_eq!(world.nodes.len(), 6);
    assert_eq!(world.surfaces.len(), 6);
    assert_eq!(world.polys().len(), 6);
    assert_abs_diff_eq!(total_area(world.polys()), 600.0, epsilon = 1e-2);
    assert_eq!(world.bounding_box, FBox::new_from_min_max(FVector::new(-5.0, -5.0, -5.0), FVector::new(5.0, 5.0, 5.0)));
    // Each face remembers which brush poly it came from.
    let mut brush_poly_indices = world.surfaces.iter()
        .map(|surf| surf.brush_polygon_index.expect("brush poly"))
        .collect::<Vec<usize>>();
    brush_poly_indices.sort();
    assert_eq!(brush_poly_indices, vec![0, 1, 2, 3, 4, 5]);
}

/// Carving a 2-unit cavity out of a 10-unit cube.
#[test]
fn bsp_brush_csg_subtract_cavity_test() {
    init_logger();

    // Arrange
    let mut world = create_world(true);
    apply(&mut world, &create_cube_brush(FVector::new(0.0, 0.0, 0.0), 10.0, ECsgOper::Add));

    // Act
    let report = apply(&mut world, &create_cube_brush(FVector::new(0.0, 0.0, 0.0), 2.0, ECsgOper::Subtract));

    // Assert
    assert!(report.is_clean());
    assert_eq!(world.polys().len(), 12);
    assert_abs_diff_eq!(total_area(world.polys()), 624.0, epsilon = 1e-2);

    for poly in world.polys() {
        for vertex in &poly.vertices {
            let extent = vertex.x.abs().max(vertex.y.abs()).max(vertex.z.abs());
            assert!(extent >= 1.0 - 1e-3, "vertex {:?} is inside the cavity", vertex);
        }
        let center = centroid(poly);
        if center.magnitude() < 2.0 {
            // Cavity walls face into the cavity.
            assert!(poly.normal.dot(center) < 0.0);
        } else {
            assert!(poly.normal.dot(center) > 0.0);
        }
    }
}

#[test]
fn bsp_brush_csg_add_sub_unit_brush_test() {
    let mut world = create_world(true);

    let report = apply(&mut world, &create_cube_brush(FVector::new(0.0, 0.0, 0.0), 0.2, ECsgOper::Add));

    assert!(report.is_clean());
    assert_eq!(world.nodes.len(), 6);
    assert_eq!(world.polys().len(), 6);
    assert_abs_diff_eq!(total_area(world.polys()), 0.24, epsilon = 1e-5);
}

/// The cavity walls are a fifth of a unit apart and must not be mistaken
/// for one plane.
#[test]
fn bsp_brush_csg_subtract_sub_unit_cavity_test() {
    let mut world = create_world(true);
    apply(&mut world, &create_cube_brush(FVector::new(0.0, 0.0, 0.0), 1.0, ECsgOper::Add));

    let report = apply(&mut world, &create_cube_brush(FVector::new(0.0, 0.0, 0.0), 0.2, ECsgOper::Subtract));

    assert!(report.is_clean());
    assert_eq!(world.polys().len(), 12);
    assert_abs_diff_eq!(total_area(world.polys()), 6.24, epsilon = 1e-4);
    for poly in world.polys() {
        for vertex in &poly.vertices {
            let extent = vertex.x.abs().max(vertex.y.abs()).max(vertex.z.abs());
            assert!(extent >= 0.1 - 1e-4, "vertex {:?} is inside the cavity", vertex);
        }
    }
}

#[test]
fn bsp_brush_csg_subtract_undoes_add_test() {
    init_logger();
    let mut world = create_world(true);
    apply(&mut world, &create_cube_brush(FVector::new(0.0, 0.0, 0.0), 10.0, ECsgOper::Add));
    let area = total_area(world.polys());
    let bounding_box = world.bounding_box;

    apply(&mut world, &create_cube_brush(FVector::new(20.0, 0.0, 0.0), 2.0, ECsgOper::Add));
    assert_eq!(world.polys().len(), 12);
    assert_abs_diff_eq!(total_area(world.polys()), area + 24.0, epsilon = 1e-2);

    apply(&mut world, &create_cube_brush(FVector::new(20.0, 0.0, 0.0), 2.0, ECsgOper::Subtract));

    assert_eq!(world.polys().len(), 6);
    assert_abs_diff_eq!(total_area(world.polys()), area, epsilon = 1e-2);
    assert_eq!(world.bounding_box, bounding_box);
}

#[test]
fn bsp_brush_csg_fast_mode_test() {
    let mut world = create_world(false);
    let brush = create_cube_brush(FVector::new(0.0, 0.0, 0.0), 10.0, ECsgOper::Subtract);

    let output = bsp_brush_csg(&brush, &mut world, EPolyFlags::empty(), ECsgOper::Subtract, &BuildOptions::interactive())
        .expect("world has a tree");

    assert!(output.polys.is_empty());
    assert_eq!(world.polys().len(), 6);
    assert_abs_diff_eq!(total_area(world.polys()), 600.0, epsilon = 1e-2);
}

#[test]
fn bsp_brush_csg_subtract_strips_semisolid_test() {
    let mut world = create_world(false);
    let brush = create_cube_brush(FVector::new(0.0, 0.0, 0.0), 4.0, ECsgOper::Subtract);

    bsp_brush_csg(&brush, &mut world, EPolyFlags::Semisolid | EPolyFlags::Masked, ECsgOper::Subtract, &BuildOptions::default())
        .expect("world has a tree");

    assert_eq!(world.surfaces.len(), 6);
    for surf in &world.surfaces {
        assert!(!surf.poly_flags.contains(EPolyFlags::Semisolid));
        assert!(surf.poly_flags.contains(EPolyFlags::Masked));
    }
}

#[test]
fn bsp_brush_csg_add_semisolid_test() {
    let mut world = create_world(true);
    apply(&mut world, &create_cube_brush(FVector::new(0.0, 0.0, 0.0), 10.0, ECsgOper::Add));

    let brush = create_cube_brush(FVector::new(20.0, 0.0, 0.0), 2.0, ECsgOper::Add).with_poly_flags(EPolyFlags::Semisolid);
    apply(&mut world, &brush);

    let semisolid_polys = world.polys().iter()
        .filter(|poly| poly.poly_flags.contains(EPolyFlags::Semisolid))
        .cloned()
        .collect::<Vec<FPoly>>();
    assert_eq!(semisolid_polys.len(), 6);
    assert_abs_diff_eq!(total_area(&semisolid_polys), 24.0, epsilon = 1e-3);
}

/// World: a 10-unit cube.  Brush: a 4-unit cube straddling its +x face.
fn create_overlap() -> (UModel, ABrush) {
    let mut world = create_world(true);
    apply(&mut world, &create_cube_brush(FVector::new(0.0, 0.0, 0.0), 10.0, ECsgOper::Add));
    let brush = create_cube_brush(FVector::new(5.0, 0.0, 0.0), 4.0, ECsgOper::Intersect);
    (world, brush)
}

#[test]
fn bsp_brush_csg_intersect_test() {
    init_logger();
    let (mut world, brush) = create_overlap();
    let world_before = world.clone();

    let output = bsp_brush_csg(&brush, &mut world, EPolyFlags::empty(), ECsgOper::Intersect, &BuildOptions::default())
        .expect("world has a tree");

    // The overlap is a 2x4x4 box, returned in brush space.
    assert_abs_diff_eq!(total_area(&output.polys), 64.0, epsilon = 1e-2);
    let bound = FBox::new_from_points(&output.polys.iter().flat_map(|poly| poly.vertices.iter().copied()).collect::<Vec<FVector>>());
    assert_abs_diff_eq!(bound.min.x, -2.0, epsilon = 1e-3);
    assert_abs_diff_eq!(bound.max.x, 0.0, epsilon = 1e-3);
    assert_abs_diff_eq!(bound.max.y, 2.0, epsilon = 1e-3);
    for (i, poly) in output.polys.iter().enumerate() {
        assert_eq!(poly.brush_poly_index, Some(i));
        assert!(poly.link.expect("linked") <= i);
    }
    // The world is left alone.
    assert_eq!(world, world_before);
}

#[test]
fn bsp_brush_csg_deintersect_test() {
    let (mut world, brush) = create_overlap();

    let output = bsp_brush_csg(&brush, &mut world, EPolyFlags::empty(), ECsgOper::Deintersect, &BuildOptions::default())
        .expect("world has a tree");

    // Every surface of both solids bounds the symmetric difference.
    assert_abs_diff_eq!(total_area(&output.polys), 96.0 + 600.0, epsilon = 1e-1);
}

#[test]
fn csg_rebuild_room_test() {
    init_logger();
    let mut level = ULevel::new(vec![
        create_cube_brush(FVector::new(0.0, 0.0, 0.0), 10.0, ECsgOper::Subtract),
    ]);

    let report = csg_rebuild(&mut level, &BuildOptions::default()).expect("rebuild");

    assert!(report.is_clean());
    assert!(!level.model.is_root_outside);
    assert!(level.model.is_tree_valid());
    assert_eq!(level.model.polys().len(), 6);
    // The room's walls face inwards.
    for poly in level.model.polys() {
        assert!(poly.normal.dot(centroid(poly)) < 0.0);
    }
}

#[test]
fn csg_rebuild_with_detail_brush_test() {
    init_logger();
    let mut level = ULevel::new(vec![
        create_cube_brush(FVector::new(0.0, 0.0, 0.0), 10.0, ECsgOper::Subtract),
        create_cube_brush(FVector::new(0.0, 0.0, 0.0), 2.0, ECsgOper::Add).with_poly_flags(EPolyFlags::Semisolid),
    ]);

    csg_rebuild(&mut level, &BuildOptions::default()).expect("rebuild");

    let polys = level.model.polys();
    assert_abs_diff_eq!(total_area(polys), 624.0, epsilon = 1e-2);
    let detail_area = polys.iter()
        .filter(|poly| poly.poly_flags.contains(EPolyFlags::Semisolid))
        .map(|poly| poly.area())
        .sum::<f32>();
    assert_abs_diff_eq!(detail_area, 24.0, epsilon = 1e-3);
}

#[test]
fn csg_rebuild_is_repeatable_test() {
    let mut level = ULevel::new(vec![
        create_cube_brush(FVector::new(0.0, 0.0, 0.0), 10.0, ECsgOper::Subtract),
        create_cube_brush(FVector::new(0.0, 0.0, 0.0), 2.0, ECsgOper::Add),
    ]);

    csg_rebuild(&mut level, &BuildOptions::default()).expect("rebuild");
    let first = level.model.clone();
    csg_rebuild(&mut level, &BuildOptions::default()).expect("rebuild");

    assert_eq!(level.model, first);
    assert_abs_diff_eq!(total_area(level.model.polys()), 624.0, epsilon = 1e-2);
}
