use std::str::FromStr;
use log::{debug, info};

use crate::brush::ABrush;
use crate::bsp::{bsp_add_node, bsp_build, bsp_build_bounds, bsp_build_fpolys, bsp_cleanup, bsp_merge_coplanars, bsp_node_to_fpoly, bsp_refresh};
use crate::bsp::{ENodePlace, EPolyNodeFilter};
use crate::config::{BuildOptions, DEFAULT_PORTAL_BIAS, REPARTITION_BALANCE};
use crate::error::{BspError, BuildReport, EBuildErrorKind};
use crate::fpoly::{EPolyFlags, ESplitType, FPoly, FPOLY_VERTEX_THRESHOLD};
use crate::model::{EBspNodeFlags, UModel};
use crate::sphere::FSphere;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ECsgOper {
    Add,
    Subtract,
    Intersect,
    Deintersect,
}

impl FromStr for ECsgOper {
    type Err = BspError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ADD" => Ok(ECsgOper::Add),
            "SUBTRACT" => Ok(ECsgOper::Subtract),
            "INTERSECT" => Ok(ECsgOper::Intersect),
            "DEINTERSECT" => Ok(ECsgOper::Deintersect),
            _ => Err(BspError::UnknownCsgOperation(s.to_string())),
        }
    }
}

/// Callback receiving each polygon fragment that reaches a leaf of the tree
/// being filtered through: the model, the running report, the node the
/// fragment hangs from (`None` for an empty tree), the fragment, its
/// classification and where a node for it would be placed.
pub type BspFilterFunc<'a> = dyn FnMut(&mut UModel, &mut BuildReport, Option<u32>, &mut FPoly, EPolyNodeFilter, ENodePlace) + 'a;

/// Bookkeeping for polys that are filtered through a node's front and then
/// through its back, to classify coplanar CSG properly.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
struct FCoplanarInfo {
    original_node: Option<u32>,
    back_node_index: Option<u32>,
    is_processing_back: bool,
    is_back_node_outside: bool,
    front_leaf_outside: bool,
}

/// Pending step of a filter walk.
enum FilterWork {
    /// Classify the poly against a node's plane.
    Descend { node_index: u32, ed_poly: FPoly, coplanar_info: FCoplanarInfo, outside: bool },
    /// Follow a node's front or back child, or stop at a leaf if there is none.
    /// The child is looked up when the item is popped.
    Child { parent_index: u32, place: ENodePlace, ed_poly: FPoly, coplanar_info: FCoplanarInfo, outside: bool },
    /// The poly reached a leaf.
    Leaf { node_index: u32, place: ENodePlace, ed_poly: FPoly, coplanar_info: FCoplanarInfo, outside: bool },
}

/// Filter an EdPoly through the Bsp, calling `filter_func` for all chunks
/// that fall into leaves.  Filters starting at root.
pub fn bsp_filter_fpoly(filter_func: &mut BspFilterFunc<'_>, model: &mut UModel, report: &mut BuildReport, mut ed_poly: FPoly) {
    if model.nodes.is_empty() {
        // If Bsp is empty, process at root.
        let filter = if model.is_root_outside { EPolyNodeFilter::Outside } else { EPolyNodeFilter::Inside };
        filter_func(model, report, None, &mut ed_poly, filter, ENodePlace::Root);
        return;
    }

    let mut stack = vec![FilterWork::Descend {
        node_index: 0,
        ed_poly,
        coplanar_info: FCoplanarInfo::default(),
        outside: model.is_root_outside,
    }];

    while let Some(work) = stack.pop() {
        match work {
            FilterWork::Descend { node_index, ed_poly, coplanar_info, outside } => {
                filter_ed_poly(model, report, &mut stack, node_index, ed_poly, coplanar_info, outside);
            }
            FilterWork::Child { parent_index, place, ed_poly, coplanar_info, outside } => {
                let parent = model.node(parent_index);
                let child = match place {
                    ENodePlace::Front => parent.front_node_index,
                    _ => parent.back_node_index,
                };
                stack.push(match child {
                    Some(node_index) => FilterWork::Descend { node_index, ed_poly, coplanar_info, outside },
                    None => FilterWork::Leaf { node_index: parent_index, place, ed_poly, coplanar_info, outside },
                });
            }
            FilterWork::Leaf { node_index, place, mut ed_poly, mut coplanar_info, mut outside } => {
                let Some(original_node) = coplanar_info.original_node else {
                    // Processing regular, non-coplanar polygons.
                    let filter = if outside { EPolyNodeFilter::Outside } else { EPolyNodeFilter::Inside };
                    filter_func(model, report, Some(node_index), &mut ed_poly, filter, place);
                    continue;
                };

                if !coplanar_info.is_processing_back {
                    coplanar_info.front_leaf_outside = outside;
                    match coplanar_info.back_node_index {
                        // Back tree is empty.
                        None => outside = coplanar_info.is_back_node_outside,
                        Some(back_node_index) => {
                            // Filter through the back; the leaf it lands in finishes the job.
                            coplanar_info.is_processing_back = true;
                            stack.push(FilterWork::Descend {
                                node_index: back_node_index,
                                ed_poly,
                                coplanar_info,
                                outside: coplanar_info.is_back_node_outside,
                            });
                            continue;
                        }
                    }
                }

                // Finished filtering polygon through tree in back of parent coplanar.
                let filter = match (outside, coplanar_info.front_leaf_outside) {
                    (false, false) => EPolyNodeFilter::CoplanarInside,
                    (true, true) => EPolyNodeFilter::CoplanarOutside,
                    (false, true) => EPolyNodeFilter::CospatialFacingOut,
                    (true, false) => EPolyNodeFilter::CospatialFacingIn,
                };
                filter_func(model, report, Some(original_node), &mut ed_poly, filter, ENodePlace::Plane);
            }
        }
    }
}

/// Classify one poly against one node and queue what follows.
fn filter_ed_poly(
    model: &UModel,
    report: &mut BuildReport,
    stack: &mut Vec<FilterWork>,
    node_index: u32,
    mut ed_poly: FPoly,
    mut coplanar_info: FCoplanarInfo,
    outside: bool,
) {
    if ed_poly.vertices.len() > FPOLY_VERTEX_THRESHOLD {
        // Split EdPoly in half to prevent vertices from overflowing.
        if let Some(temp) = ed_poly.split_in_half() {
            stack.push(FilterWork::Descend { node_index, ed_poly, coplanar_info, outside });
            stack.push(FilterWork::Descend { node_index, ed_poly: temp, coplanar_info, outside });
            return;
        }
    }

    let node = model.node(node_index);
    let plane = node.plane;

    let split = match ed_poly.split_with_plane_report(plane.base(), plane.normal(), false, report) {
        ESplitType::Coplanar if coplanar_info.original_node.is_some() => {
            // A polygon barely outside the coplanar threshold was split into one
            // barely inside it.  Treat it as front.
            report.push_error(EBuildErrorKind::OutOfPlaceCoplanar);
            ESplitType::Front
        }
        split => split,
    };

    match split {
        ESplitType::Front => stack.push(FilterWork::Child {
            parent_index: node_index,
            place: ENodePlace::Front,
            ed_poly,
            coplanar_info,
            outside: node.is_child_outside(true, outside),
        }),
        ESplitType::Back => stack.push(FilterWork::Child {
            parent_index: node_index,
            place: ENodePlace::Back,
            ed_poly,
            coplanar_info,
            outside: node.is_child_outside(false, outside),
        }),
        ESplitType::Split(front_polys, back_polys) => {
            // Back pieces are resolved after the front pieces are done.
            let back_outside = node.is_child_outside(false, outside);
            let front_outside = node.is_child_outside(true, outside);
            for back_poly in back_polys {
                stack.push(FilterWork::Child {
                    parent_index: node_index,
                    place: ENodePlace::Back,
                    ed_poly: back_poly,
                    coplanar_info,
                    outside: back_outside,
                });
            }
            for front_poly in front_polys {
                stack.push(FilterWork::Child {
                    parent_index: node_index,
                    place: ENodePlace::Front,
                    ed_poly: front_poly,
                    coplanar_info,
                    outside: front_outside,
                });
            }
        }
        ESplitType::Coplanar => {
            coplanar_info.original_node = Some(node_index);
            coplanar_info.back_node_index = None;
            coplanar_info.is_processing_back = false;
            coplanar_info.is_back_node_outside = outside;
            let mut new_front_outside = outside;

            // See whether the node's front or back points to the side of the tree
            // in front of this polygon.
            let is_csg = node.is_csg();
            let (our_front, our_back) = if ed_poly.faces_same_way(&node.plane.normal()) {
                if is_csg {
                    coplanar_info.is_back_node_outside = false;
                    new_front_outside = true;
                }
                (node.front_node_index, node.back_node_index)
            } else {
                if is_csg {
                    coplanar_info.is_back_node_outside = true;
                    new_front_outside = false;
                }
                (node.back_node_index, node.front_node_index)
            };

            match (our_front, our_back) {
                (None, None) => {
                    coplanar_info.is_processing_back = true;
                    coplanar_info.front_leaf_outside = new_front_outside;
                    stack.push(FilterWork::Leaf {
                        node_index,
                        place: ENodePlace::Plane,
                        ed_poly,
                        coplanar_info,
                        outside: coplanar_info.is_back_node_outside,
                    });
                }
                (None, Some(back_node_index)) => {
                    // Back but no front.
                    coplanar_info.is_processing_back = true;
                    coplanar_info.back_node_index = our_back;
                    coplanar_info.front_leaf_outside = new_front_outside;
                    stack.push(FilterWork::Descend {
                        node_index: back_node_index,
                        ed_poly,
                        coplanar_info,
                        outside: coplanar_info.is_back_node_outside,
                    });
                }
                (Some(front_node_index), _) => {
                    // Process the front now; the back is remembered for the front leaf.
                    coplanar_info.back_node_index = our_back;
                    stack.push(FilterWork::Descend {
                        node_index: front_node_index,
                        ed_poly,
                        coplanar_info,
                        outside: new_front_outside,
                    });
                }
            }
        }
    }
}

/// Add a brush fragment to the world, sharing one surface per brush face.
fn add_brush_fragment(model: &mut UModel, report: &mut BuildReport, node_index: Option<u32>, node_place: ENodePlace, ed_poly: &mut FPoly, surface: &mut Option<usize>) {
    ed_poly.link = *surface;
    let new_node_index = bsp_add_node(model, node_index, node_place, EBspNodeFlags::IsNew, ed_poly, report);
    *surface = Some(model.node(new_node_index).surface_index as usize);
}

/// Keep a fragment for the output brush, dropping it if it has degenerated.
fn emit_fragment(output: &mut Vec<FPoly>, report: &mut BuildReport, ed_poly: &FPoly, reverse: bool) {
    let mut poly = ed_poly.clone();
    if poly.fix() < 3 {
        report.drop_fragment(EBuildErrorKind::DegenerateFragment);
        return;
    }
    if reverse {
        poly.reverse();
    }
    output.push(poly);
}

fn add_brush_to_world_func(model: &mut UModel, report: &mut BuildReport, node_index: Option<u32>, ed_poly: &mut FPoly, filter: EPolyNodeFilter, node_place: ENodePlace, surface: &mut Option<usize>) {
    match filter {
        EPolyNodeFilter::Outside | EPolyNodeFilter::CoplanarOutside => {
            add_brush_fragment(model, report, node_index, node_place, ed_poly, surface);
        }
        EPolyNodeFilter::CospatialFacingOut if !ed_poly.poly_flags.contains(EPolyFlags::Semisolid) => {
            add_brush_fragment(model, report, node_index, node_place, ed_poly, surface);
        }
        _ => {}
    }
}

fn subtract_brush_from_world_func(model: &mut UModel, report: &mut BuildReport, node_index: Option<u32>, ed_poly: &mut FPoly, filter: EPolyNodeFilter, node_place: ENodePlace, surface: &mut Option<usize>) {
    match filter {
        EPolyNodeFilter::Inside | EPolyNodeFilter::CoplanarInside => {
            ed_poly.reverse();
            add_brush_fragment(model, report, node_index, node_place, ed_poly, surface); // Add to Bsp back
            ed_poly.reverse();
        }
        _ => {}
    }
}

fn intersect_brush_with_world_func(output: &mut Vec<FPoly>, report: &mut BuildReport, ed_poly: &FPoly, filter: EPolyNodeFilter) {
    match filter {
        EPolyNodeFilter::Inside | EPolyNodeFilter::CoplanarInside | EPolyNodeFilter::CospatialFacingOut => {
            emit_fragment(output, report, ed_poly, false);
        }
        _ => {}
    }
}

fn deintersect_brush_with_world_func(output: &mut Vec<FPoly>, report: &mut BuildReport, ed_poly: &FPoly, filter: EPolyNodeFilter) {
    match filter {
        EPolyNodeFilter::Outside | EPolyNodeFilter::CoplanarOutside => {
            emit_fragment(output, report, ed_poly, false);
        }
        EPolyNodeFilter::Inside | EPolyNodeFilter::CoplanarInside => {
            emit_fragment(output, report, ed_poly, true);
        }
        _ => {}
    }
}

fn intersect_world_with_brush_func(output: &mut Vec<FPoly>, report: &mut BuildReport, ed_poly: &FPoly, filter: EPolyNodeFilter) {
    match filter {
        EPolyNodeFilter::Inside | EPolyNodeFilter::CoplanarInside | EPolyNodeFilter::CospatialFacingOut => {
            emit_fragment(output, report, ed_poly, false);
        }
        _ => {}
    }
}

fn deintersect_world_with_brush_func(output: &mut Vec<FPoly>, report: &mut BuildReport, ed_poly: &FPoly, filter: EPolyNodeFilter) {
    match filter {
        EPolyNodeFilter::Inside | EPolyNodeFilter::CoplanarInside | EPolyNodeFilter::CospatialFacingOut => {
            emit_fragment(output, report, ed_poly, true);
        }
        EPolyNodeFilter::Outside | EPolyNodeFilter::CoplanarOutside => {
            emit_fragment(output, report, ed_poly, false);
        }
        _ => {}
    }
}

/// Whether a world fragment survives an Add or Subtract as-is.
fn is_world_fragment_kept(csg_operation: ECsgOper, filter: EPolyNodeFilter) -> bool {
    match filter {
        EPolyNodeFilter::Outside | EPolyNodeFilter::CoplanarOutside => true,
        EPolyNodeFilter::CospatialFacingIn => csg_operation == ECsgOper::Subtract,
        _ => false,
    }
}

/// Apply the brush-tree classification of one world node for Add and
/// Subtract.  Cut fragments that survive are added as coplanars of the node;
/// if any part was buried the original node is discarded, otherwise the
/// fragments are rolled back and the node is left alone.
fn add_world_to_brush(world: &mut UModel, report: &mut BuildReport, node_index: u32, csg_operation: ECsgOper, fragments: &[(FPoly, EPolyNodeFilter)]) {
    // Find last coplanar in chain.
    let mut last_coplanar = node_index;
    while let Some(plane_index) = world.node(last_coplanar).plane_index {
        last_coplanar = plane_index;
    }

    let node_count = world.nodes.len();
    let vertex_count = world.vertices.len();
    let point_count = world.points.len();
    let vector_count = world.vectors.len();
    let mut discarded = 0usize;

    for (fragment, filter) in fragments {
        if is_world_fragment_kept(csg_operation, *filter) {
            // Only affect the world poly if it has been cut.
            if fragment.poly_flags.contains(EPolyFlags::EdCut) {
                bsp_add_node(world, Some(last_coplanar), ENodePlace::Plane, EBspNodeFlags::IsNew, fragment, report);
            }
        } else {
            discarded += 1;
        }
    }

    if discarded == 0 {
        // Get rid of all the fragments we added.
        world.node_mut(last_coplanar).plane_index = None;
        world.nodes.truncate(node_count);
        world.vertices.truncate(vertex_count);
        world.points.truncate(point_count);
        world.vectors.truncate(vector_count);
        let surface_index = world.node(node_index).surface_index as usize;
        world.surfaces[surface_index].node_indices.retain(|&index| (index as usize) < node_count);
    } else {
        // Tag original world poly for deletion; has been deleted or replaced by partial fragments.
        world.node_mut(node_index).vertex_count = 0;
    }
}

/// Filter all relevant world polys through the brush tree.  Nodes whose plane
/// misses `bounding_sphere` only have the relevant side visited.
fn filter_world_through_brush(
    world: &mut UModel,
    brush: &mut UModel,
    csg_operation: ECsgOper,
    bounding_sphere: Option<&FSphere>,
    report: &mut BuildReport,
    output: &mut Vec<FPoly>,
) {
    if world.nodes.is_empty() {
        return;
    }

    let mut stack = vec![0u32];
    while let Some(node_index) = stack.pop() {
        let node = world.node(node_index);

        // Skip new nodes and their coplanars, which are guaranteed new.
        if node.node_flags.contains(EBspNodeFlags::IsNew) {
            continue;
        }

        // Sphere reject.
        let (do_front, do_back) = match bounding_sphere {
            Some(sphere) => {
                let distance = node.plane.plane_dot(sphere.origin);
                (distance >= -sphere.radius, distance <= sphere.radius)
            }
            None => (true, true),
        };

        // Process only polys that aren't empty.
        if do_front && do_back && node.vertex_count > 0 {
            let ed_poly = bsp_node_to_fpoly(world, node_index);

            let mut fragments: Vec<(FPoly, EPolyNodeFilter)> = Vec::new();
            bsp_filter_fpoly(
                &mut |_, _, _, fragment, filter, _| fragments.push((fragment.clone(), filter)),
                brush,
                report,
                ed_poly,
            );

            match csg_operation {
                // Add and subtract work the same in this step.
                ECsgOper::Add | ECsgOper::Subtract => {
                    add_world_to_brush(world, report, node_index, csg_operation, &fragments);
                }
                ECsgOper::Intersect => {
                    for (fragment, filter) in &fragments {
                        intersect_world_with_brush_func(output, report, fragment, *filter);
                    }
                }
                ECsgOper::Deintersect => {
                    for (fragment, filter) in &fragments {
                        deintersect_world_with_brush_func(output, report, fragment, *filter);
                    }
                }
            }
        }

        // Visit the front, then the back, then the rest of the coplanar chain.
        let node = world.node(node_index);
        stack.extend(node.plane_index);
        if do_back {
            stack.extend(node.back_node_index);
        }
        if do_front {
            stack.extend(node.front_node_index);
        }
    }
}

/// Link the polys in `polys[range]` that share a link id, pointing each at
/// the first poly of its group.
fn link_polys(polys: &mut [FPoly], range: std::ops::Range<usize>) {
    for i in range.clone() {
        let group = (range.start..i).find(|&j| polys[j].link == polys[i].link);
        polys[i].link = Some(group.unwrap_or(i));
    }
}

/// Result of a CSG operation.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CsgOutput {
    /// The brush produced by Intersect and Deintersect, in brush space.
    /// Empty for Add and Subtract, which modify the world instead.
    pub polys: Vec<FPoly>,
    pub report: BuildReport,
}

/// Perform any CSG operation between the brush and the world.
///
/// The world must have a valid tree.  Add and Subtract extend it in place and
/// regenerate its poly list; Intersect and Deintersect leave it untouched and
/// return the resulting brush.
pub fn bsp_brush_csg(brush: &ABrush, world: &mut UModel, poly_flags: EPolyFlags, csg_operation: ECsgOper, options: &BuildOptions) -> Result<CsgOutput, BspError> {
    if !world.is_tree_valid() {
        return Err(BspError::TreeRequired { state: world.state() });
    }

    let mut report = BuildReport::new();
    let mut output: Vec<FPoly> = Vec::new();

    // Non-solid and semisolid stuff can only be added.
    let not_poly_flags = match csg_operation {
        ECsgOper::Add => EPolyFlags::empty(),
        _ => EPolyFlags::Semisolid | EPolyFlags::NotSolid,
    };

    // Build the brush's coordinate system and find orientation of scale
    // transform (if negative, transform will reverse the clockness
    // of the EdPoly points and invert the normal).
    let (coords, uncoords, orientation) = brush.build_coords();

    // Transform original brush polys into same coordinate system as world
    // so Bsp filtering operations make sense.
    let brush_poly_count = brush.model.polys().len();
    let mut brush_polys: Vec<FPoly> = Vec::with_capacity(brush_poly_count);
    for (poly_index, poly) in brush.model.polys().iter().enumerate() {
        if poly.vertices.len() < 3 {
            report.drop_fragment(EBuildErrorKind::TooFewVertices);
            continue;
        }
        let mut dest_ed_poly = poly.clone();

        // Set its backward brush link.
        dest_ed_poly.brush_poly_index = Some(poly_index);

        // Update its flags.
        dest_ed_poly.poly_flags = (dest_ed_poly.poly_flags | poly_flags) & !not_poly_flags;

        // Set its internal link.
        dest_ed_poly.link = match dest_ed_poly.link {
            Some(link) if link < brush_poly_count => Some(link),
            _ => Some(poly_index),
        };

        dest_ed_poly.transform(&coords, &brush.pre_pivot, &brush.location, orientation);
        brush_polys.push(dest_ed_poly);
    }

    // Pass the brush polys through the world Bsp.
    let mut group_surfaces: Vec<Option<usize>> = vec![None; brush_poly_count];
    for brush_poly in &brush_polys {
        let mut ed_poly = brush_poly.clone();
        // Mark the polygon as non-cut so that it won't be harmed unless it must be split.
        ed_poly.poly_flags.remove(EPolyFlags::EdCut);

        match csg_operation {
            ECsgOper::Add | ECsgOper::Subtract => {
                let group = ed_poly.link.unwrap_or(0);
                let filter_func = if csg_operation == ECsgOper::Add { add_brush_to_world_func } else { subtract_brush_from_world_func };
                bsp_filter_fpoly(
                    &mut |model, report, node_index, ed_poly, filter, node_place| {
                        filter_func(model, report, node_index, ed_poly, filter, node_place, &mut group_surfaces[group])
                    },
                    world,
                    &mut report,
                    ed_poly,
                );
            }
            ECsgOper::Intersect | ECsgOper::Deintersect => {
                let filter_func = if csg_operation == ECsgOper::Intersect { intersect_brush_with_world_func } else { deintersect_brush_with_world_func };
                bsp_filter_fpoly(
                    &mut |_, report, _, ed_poly, filter, _| filter_func(&mut output, report, ed_poly, filter),
                    world,
                    &mut report,
                    ed_poly,
                );
            }
        }
    }
    let brush_fragment_count = output.len();

    if !world.nodes.is_empty() && !poly_flags.intersects(EPolyFlags::NotSolid | EPolyFlags::Semisolid) {
        // Quickly build a Bsp for the brush, tending to minimize splits rather than balance
        // the tree.  We only need the cutting planes, though the entire Bsp struct (polys and
        // all) is built.
        let mut brush_tree = UModel::new_from_polys(&brush_polys);
        brush_tree.is_root_outside = true;
        report.merge(bsp_build(&mut brush_tree, &BuildOptions::lame()));

        // The symmetric difference needs every world poly, not just the nearby ones.
        let bounding_sphere = brush_tree.bounding_sphere;
        let bounding_sphere = match csg_operation {
            ECsgOper::Deintersect => None,
            _ => Some(&bounding_sphere),
        };
        filter_world_through_brush(world, &mut brush_tree, csg_operation, bounding_sphere, &mut report, &mut output);
    }

    match csg_operation {
        ECsgOper::Intersect | ECsgOper::Deintersect => {
            // Link polys obtained from the original brush, then those obtained from the world.
            let output_count = output.len();
            link_polys(&mut output, 0..brush_fragment_count);
            link_polys(&mut output, brush_fragment_count..output_count);

            // Detransform the obtained brush back into its original coordinate system.
            for (i, dest_ed_poly) in output.iter_mut().enumerate() {
                dest_ed_poly.transform(&uncoords, &brush.location, &brush.pre_pivot, orientation);
                dest_ed_poly.fix();
                dest_ed_poly.brush_poly_index = Some(i);
            }
        }
        ECsgOper::Add | ECsgOper::Subtract => {
            // Clean up nodes, reset node flags.
            bsp_cleanup(world);

            if !options.fast_mode {
                bsp_refresh(world);
                bsp_build_bounds(world);
            }

            bsp_build_fpolys(world, true);

            if !options.fast_mode {
                bsp_merge_coplanars(world, false, false);
            }
        }
    }

    debug!("bsp_brush_csg {:?}: world has {} nodes, {} surfaces; {} output polys",
        csg_operation, world.nodes.len(), world.surfaces.len(), output.len());

    Ok(CsgOutput { polys: output, report })
}

/// A level: the world model and the brushes it is built from, in order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ULevel {
    pub model: UModel,
    pub brushes: Vec<ABrush>,
}

impl ULevel {
    pub fn new(brushes: Vec<ABrush>) -> Self {
        ULevel {
            model: UModel::new(),
            brushes,
        }
    }
}

/// Detail brushes are semisolid additions that don't take part in the
/// structural Bsp.
fn is_detail_brush(brush: &ABrush) -> bool {
    brush.poly_flags.contains(EPolyFlags::Semisolid)
        && brush.csg_operation == ECsgOper::Add
        && !brush.poly_flags.contains(EPolyFlags::Portal)
}

/// Rebuild the level's world model from its brushes.
pub fn csg_rebuild(level: &mut ULevel, options: &BuildOptions) -> Result<BuildReport, BspError> {
    let options = options.sanitized();
    let csg_options = BuildOptions { fast_mode: true, ..options };
    let mut report = BuildReport::new();
    let world = &mut level.model;

    // Empty the model out.  Levels are solid until something is subtracted.
    world.empty_model(true, true);
    world.is_root_outside = false;
    report.merge(bsp_build(world, &options));

    // Compose all structural brushes and portals.
    for brush in level.brushes.iter().filter(|brush| !is_detail_brush(brush)) {
        if brush.model.polys().is_empty() {
            continue;
        }
        // Treat portals as solids for cutting.
        let mut poly_flags = brush.poly_flags;
        if poly_flags.contains(EPolyFlags::Portal) {
            poly_flags = (poly_flags & !EPolyFlags::Semisolid) | EPolyFlags::NotSolid;
        }
        let output = bsp_brush_csg(brush, world, poly_flags, brush.csg_operation, &csg_options)?;
        report.merge(output.report);
    }

    // Repartition the structural Bsp.
    bsp_build_fpolys(world, true);
    bsp_merge_coplanars(world, false, false);
    let repartition_options = BuildOptions::new(options.quality, REPARTITION_BALANCE, DEFAULT_PORTAL_BIAS);
    report.merge(bsp_build(world, &repartition_options));

    // Add detail brushes.
    for brush in level.brushes.iter().filter(|brush| is_detail_brush(brush)) {
        let output = bsp_brush_csg(brush, world, brush.poly_flags, brush.csg_operation, &csg_options)?;
        report.merge(output.report);
    }

    // Build bounding volumes.
    bsp_refresh(world);
    bsp_build_bounds(world);
    bsp_build_fpolys(world, true);
    bsp_merge_coplanars(world, false, false);

    info!("csg_rebuild: {} brushes -> {} nodes, {} surfaces, {} polys, {} errors",
        level.brushes.len(), world.nodes.len(), world.surfaces.len(), world.polys().len(), report.errors.len());

    Ok(report)
}
