use cgmath::InnerSpace;
use arrayvec::ArrayVec;
use log::debug;

use crate::box_::FBox;
use crate::config::{BuildOptions, EBspOptimization};
use crate::error::{BspError, BuildReport, EBuildErrorKind};
use crate::math::{points_are_near, points_are_same, point_plane_distance, FPlane, FVector, THRESH_VECTORS_ARE_NEAR};
use crate::fpoly::{EPolyFlags, ESplitType, FPoly, RemoveColinearsResult, FPOLY_MAX_VERTICES, FPOLY_VERTEX_THRESHOLD};
use crate::model::{EBspNodeFlags, EModelState, FBspNode, FBspSurf, FVert, UModel, BSP_NODE_MAX_NODE_VERTICES};
use crate::sphere::FSphere;


/// Possible positions of a child Bsp node relative to its parent (for `bsp_add_node`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ENodePlace {
    /// Node is in back of parent              -> `nodes[parent].back_node_index`.
    Back,
    /// Node is in front of parent             -> `nodes[parent].front_node_index`.
    Front,
    /// Node is coplanar with parent           -> `nodes[parent].plane_index`.
    Plane,
    /// Node is the Bsp root and has no parent -> `nodes[0]`.
    Root,
}

/// Status of filtered polygons:
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EPolyNodeFilter {
    /// Leaf is an exterior leaf (visible to viewers).
    Outside,
    /// Leaf is an interior leaf (non-visible, hidden behind backface).
    Inside,
    /// Poly is coplanar and in the exterior (visible to viewers).
    CoplanarOutside,
    /// Poly is coplanar and inside (invisible to viewers).
    CoplanarInside,
    /// Poly is coplanar, cospatial, and facing in.
    CospatialFacingIn,
    /// Poly is coplanar, cospatial, and facing out.
    CospatialFacingOut,
}

/// Split cost of cutting through a zone portal.
const PORTAL_SPLIT_COST: i32 = 16;

/// Find the best splitting polygon within a pool of polygons, and return its
/// index.  Returns `None` only if the pool is empty.
pub fn find_best_split(polys: &[FPoly], optimization: EBspOptimization, balance: u8, portal_bias: u8) -> Option<usize> {
    if polys.is_empty() {
        return None;
    }

    let step = match optimization {
        // Take the first one.
        EBspOptimization::Lame => return Some(0),
        // Do about 20 nodes.
        EBspOptimization::Good => 1.max(polys.len() / 20),
        // Do lots of nodes.
        EBspOptimization::Optimal => 1,
    };

    let balance = f32::from(balance.min(100));
    let portal_bias = f32::from(portal_bias.min(100)) / 100.0;

    let is_add_last = |poly: &FPoly| {
        poly.poly_flags.intersects(EPolyFlags::AddLast) && !poly.poly_flags.contains(EPolyFlags::Portal)
    };

    // Semisolids and non-solids go last unless there is nothing else.
    let all_semi_solids = polys.iter().all(is_add_last);

    // Index, score, and whether the candidate is a favored portal.
    let mut best: Option<(usize, f32, bool)> = None;

    for i in (0..polys.len()).step_by(step) {
        // Look for a usable candidate within this stride.
        let Some(poly_index) = (i..(i + step).min(polys.len()))
            .find(|&index| all_semi_solids || !is_add_last(&polys[index])) else {
            continue;
        };
        let poly = &polys[poly_index];
        let Some(plane_base) = poly.vertices.first() else {
            continue;
        };

        let mut splits = 0i32;
        let mut front = 0i32;
        let mut back = 0i32;

        for j in (0..polys.len()).step_by(step) {
            if j == poly_index {
                continue;
            }
            let other_poly = &polys[j];
            match other_poly.split_with_plane_fast(plane_base, &poly.normal) {
                ESplitType::Coplanar => {}
                ESplitType::Front => front += 1,
                ESplitType::Back => back += 1,
                ESplitType::Split(_, _) => {
                    // Disfavor splitting polys that are zone portals.
                    splits += if other_poly.poly_flags.contains(EPolyFlags::Portal) { PORTAL_SPLIT_COST } else { 1 };
                }
            }
        }

        // Minimize cuts vs. balance the tree.
        let split_cost = (100.0 - balance) * splits as f32;
        let mut score = split_cost + balance * (front - back).abs() as f32;

        let favored_portal = portal_bias > 0.0 && poly.poly_flags.contains(EPolyFlags::Portal);
        if favored_portal {
            // Any bias lets a portal make up `balance`.  The rest of the bonus
            // ranges from 0.0 to 1.0 (portals cut everything) of its split cost.
            score -= balance + portal_bias * split_cost;
        }

        match best {
            // A favored portal takes a tie from anything else.
            Some((_, best_score, best_favored)) if score > best_score || (score == best_score && (best_favored || !favored_portal)) => {}
            _ => best = Some((poly_index, score, favored_portal)),
        }
    }

    Some(best.map_or(0, |(index, _, _)| index))
}

/// Add a new surface for an editor polygon and return its index.
fn bsp_add_surface(model: &mut UModel, ed_poly: &FPoly) -> u32 {
    let plane_base = ed_poly.vertices.first().copied().unwrap_or(ed_poly.base);
    let surf = FBspSurf {
        base_point_index: model.bsp_add_point(ed_poly.base, true),
        normal_index: model.bsp_add_vector(ed_poly.normal, true),
        texture_u_index: model.bsp_add_vector(ed_poly.texture_u, false),
        texture_v_index: model.bsp_add_vector(ed_poly.texture_v, false),
        material: ed_poly.material,
        poly_flags: ed_poly.poly_flags & !EPolyFlags::NoAddToBSP,
        light_map_scale: ed_poly.light_map_scale,
        brush_polygon_index: ed_poly.brush_poly_index,
        node_indices: Vec::new(),
        plane: FPlane::new_from_origin_and_normal(&plane_base, &ed_poly.normal),
    };
    model.surfaces.push(surf);
    (model.surfaces.len() - 1) as u32
}

/// Add an editor polygon to the Bsp, and also stick a reference to it in its
/// surface's node list.
///
/// `ed_poly.link` names an existing surface to share; `None` (or a stale index)
/// creates a new one.  The polygon's ring can never exceed
/// [`BSP_NODE_MAX_NODE_VERTICES`], so one node always suffices.
///
/// Returns: index of the newly-created node.
pub fn bsp_add_node(
    model: &mut UModel,
    mut parent_node_index: Option<u32>,
    node_place: ENodePlace,
    mut node_flags: EBspNodeFlags,
    ed_poly: &FPoly,
    report: &mut BuildReport,
) -> u32 {
    if node_place == ENodePlace::Plane {
        // Make sure coplanars are added at the end of the coplanar list so that
        // we don't insert IsNew nodes with non IsNew coplanar children.
        while let Some(plane_index) = parent_node_index.and_then(|index| model.node(index).plane_index) {
            parent_node_index = Some(plane_index);
        }
    }

    let surface_index = match ed_poly.link {
        Some(link) if link < model.surfaces.len() => link as u32,
        _ => bsp_add_surface(model, ed_poly),
    };

    // Set node flags.
    let surface_flags = model.surfaces[surface_index as usize].poly_flags;
    if surface_flags.contains(EPolyFlags::NotSolid) {
        node_flags |= EBspNodeFlags::NotCsg;
    }
    if surface_flags.intersects(EPolyFlags::Invisible | EPolyFlags::Portal) {
        node_flags |= EBspNodeFlags::NotVisBlocking;
    }
    if surface_flags.contains(EPolyFlags::Masked) {
        node_flags |= EBspNodeFlags::ShootThrough;
    }

    // Add all points to point table, merging nearly-overlapping polygon points
    // with other points in the poly to prevent criscrossing vertices from
    // being generated.  This runs before the node joins the tree so the
    // nearest-vertex search always sees a clean Bsp.
    let mut points: ArrayVec<FVector, BSP_NODE_MAX_NODE_VERTICES> = ArrayVec::new();
    let mut vertex_indices: ArrayVec<u32, BSP_NODE_MAX_NODE_VERTICES> = ArrayVec::new();
    for ed_poly_vertex in &ed_poly.vertices {
        let vertex_index = model.bsp_add_point(*ed_poly_vertex, false);
        if vertex_indices.last() != Some(&vertex_index) {
            points.push(*ed_poly_vertex);
            vertex_indices.push(vertex_index);
        }
    }
    if vertex_indices.len() >= 2 && vertex_indices.first() == vertex_indices.last() {
        vertex_indices.pop();
        points.pop();
    }
    if vertex_indices.len() < 3 {
        report.push_error(EBuildErrorKind::InfinitesimalPolygon);
        vertex_indices.clear();
    }

    let plane_base = ed_poly.vertices.first().copied().unwrap_or(ed_poly.base);
    let node_index = model.nodes.len() as u32;
    model.nodes.push(FBspNode {
        plane: FPlane::new_from_origin_and_normal(&plane_base, &ed_poly.normal),
        vertex_pool_index: model.vertices.len() as u32,
        surface_index,
        vertex_count: vertex_indices.len() as u32,
        node_flags,
        // Calculate a bounding sphere for this node.
        exclusive_sphere_bound: FSphere::new_from_points(points.as_slice()),
        ..FBspNode::new()
    });
    model.vertices.extend(vertex_indices.iter().map(|&vertex_index| FVert { vertex_index }));
    model.surfaces[surface_index as usize].node_indices.push(node_index);

    // Link parent to this node.
    match (node_place, parent_node_index) {
        (ENodePlace::Front, Some(parent)) => model.node_mut(parent).front_node_index = Some(node_index),
        (ENodePlace::Back, Some(parent)) => model.node_mut(parent).back_node_index = Some(node_index),
        (ENodePlace::Plane, Some(parent)) => model.node_mut(parent).plane_index = Some(node_index),
        _ => debug_assert_eq!(node_index, 0, "only the first node may be added without a parent"),
    }

    node_index
}

/// True if a coplanar polygon can share the given surface: same facing,
/// flags, material and texture basis.
pub fn surfaces_match(model: &UModel, surf: &FBspSurf, poly: &FPoly) -> bool {
    surf.poly_flags == (poly.poly_flags & !EPolyFlags::NoAddToBSP)
        && surf.material == poly.material
        && points_are_near(&model.vectors[surf.normal_index as usize], &poly.normal, THRESH_VECTORS_ARE_NEAR)
        && points_are_near(&model.vectors[surf.texture_u_index as usize], &poly.texture_u, THRESH_VECTORS_ARE_NEAR)
        && points_are_near(&model.vectors[surf.texture_v_index as usize], &poly.texture_v, THRESH_VECTORS_ARE_NEAR)
}

/// Find a surface in a node's coplanar chain that `poly` can share.
fn find_chain_surface(model: &UModel, node_index: u32, poly: &FPoly) -> Option<usize> {
    let mut next = Some(node_index);
    while let Some(index) = next {
        let node = model.node(index);
        let surf_index = node.surface_index as usize;
        if surfaces_match(model, &model.surfaces[surf_index], poly) {
            return Some(surf_index);
        }
        next = node.plane_index;
    }
    None
}

/// Push a split fragment, halving it first if another cut could overflow it.
fn push_fragment(list: &mut Vec<FPoly>, mut poly: FPoly) {
    if poly.vertices.len() >= FPOLY_VERTEX_THRESHOLD {
        if let Some(other_half) = poly.split_in_half() {
            list.push(other_half);
        }
    }
    list.push(poly);
}

/// One pending partition: a poly list and where its subtree hangs.
struct SplitWork {
    parent: Option<u32>,
    place: ENodePlace,
    polys: Vec<FPoly>,
}

/// Build a Bsp tree from the model's poly list, replacing any existing
/// tree.  The poly list itself is not modified.
pub fn bsp_build(model: &mut UModel, options: &BuildOptions) -> BuildReport {
    let options = options.sanitized();
    let mut report = BuildReport::new();

    model.empty_model(true, false);

    let mut polys: Vec<FPoly> = Vec::with_capacity(model.polys.len());
    for poly in &model.polys {
        if poly.vertices.is_empty() {
            continue;
        }
        if poly.vertices.len() < 3 {
            report.drop_fragment(EBuildErrorKind::TooFewVertices);
            continue;
        }
        let mut poly = poly.clone();
        poly.link = None;
        if poly.vertices.len() > FPOLY_VERTEX_THRESHOLD {
            if let Some(other_half) = poly.split_in_half() {
                polys.push(other_half);
            }
        }
        polys.push(poly);
    }

    let mut stack = vec![SplitWork { parent: None, place: ENodePlace::Root, polys }];

    while let Some(SplitWork { parent, place, mut polys }) = stack.pop() {
        let Some(split_index) = find_best_split(&polys, options.quality, options.balance, options.portal_bias) else {
            continue;
        };
        let split_poly = polys.remove(split_index);
        let plane_base = split_poly.vertices[0];
        let plane_normal = split_poly.normal;

        // Add the splitter with a fresh surface.
        let node_index = bsp_add_node(model, parent, place, EBspNodeFlags::empty(), &split_poly, &mut report);

        let mut front_list = Vec::new();
        let mut back_list = Vec::new();

        for mut poly in polys {
            match poly.split_with_plane_report(plane_base, plane_normal, false, &mut report) {
                ESplitType::Coplanar => {
                    poly.link = find_chain_surface(model, node_index, &poly);
                    bsp_add_node(model, Some(node_index), ENodePlace::Plane, EBspNodeFlags::empty(), &poly, &mut report);
                }
                ESplitType::Front => front_list.push(poly),
                ESplitType::Back => back_list.push(poly),
                ESplitType::Split(front_polys, back_polys) => {
                    front_polys.into_iter().for_each(|fragment| push_fragment(&mut front_list, fragment));
                    back_polys.into_iter().for_each(|fragment| push_fragment(&mut back_list, fragment));
                }
            }
        }

        // Front pops first.
        if !back_list.is_empty() {
            stack.push(SplitWork { parent: Some(node_index), place: ENodePlace::Back, polys: back_list });
        }
        if !front_list.is_empty() {
            stack.push(SplitWork { parent: Some(node_index), place: ENodePlace::Front, polys: front_list });
        }
    }

    model.set_tree_valid();
    bsp_build_bounds(model);

    debug!("bsp_build: {} polys -> {} nodes, {} surfaces, {} points",
        model.polys.len(), model.nodes.len(), model.surfaces.len(), model.points.len());

    report
}

/// Mutable references to two distinct elements, `a < b`.
fn pair_mut<T>(items: &mut [T], a: usize, b: usize) -> (&mut T, &mut T) {
    debug_assert!(a < b);
    let (head, tail) = items.split_at_mut(b);
    (&mut head[a], &mut tail[0])
}

/// Trys to merge two polygons.  If they can be merged, replaces Poly1 and emptys Poly2
/// and returns true.  Otherwise, returns false.
pub fn try_to_merge(poly1: &mut FPoly, poly2: &mut FPoly) -> bool {
    // Vertex count reasonable?
    if poly1.vertices.len() + poly2.vertices.len() > FPOLY_MAX_VERTICES {
        return false
    }

    // Find one overlapping point.
    let matching_indices = (0..poly1.vertices.len()).find_map(|start1| {
        (0..poly2.vertices.len())
            .find(|&start2| points_are_same(&poly1.vertices[start1], &poly2.vertices[start2]))
            .map(|start2| (start1, start2))
    });

    let Some((start1, start2)) = matching_indices else {
        return false
    };

    // Wrap around trying to merge.
    let mut end1 = start1;
    let mut end2 = start2;
    let mut test1 = (start1 + 1) % poly1.vertices.len();
    let mut test2 = if start2 == 0 { poly2.vertices.len() - 1 } else { start2 - 1 };

    if points_are_same(&poly1.vertices[test1], &poly2.vertices[test2]) {
        end1 = test1;
    } else {
        test1 = if start1 == 0 { poly1.vertices.len() - 1 } else { start1 - 1 };
        test2 = (start2 + 1) % poly2.vertices.len();

        if points_are_same(&poly1.vertices[test1], &poly2.vertices[test2]) {
            end2 = test2;
        } else {
            return false
        }
    }

    // Build a new edpoly containing both polygons merged.
    let mut new_poly = poly1.clone();
    new_poly.vertices.clear();
    let mut vertex = end1;

    for _ in 0..poly1.vertices.len() {
        new_poly.vertices.push(poly1.vertices[vertex]);
        vertex = (vertex + 1) % poly1.vertices.len();
    }

    vertex = end2;

    for _ in 0..poly2.vertices.len() - 2 {
        vertex = (vertex + 1) % poly2.vertices.len();
        new_poly.vertices.push(poly2.vertices[vertex]);
    }

    // Remove colinear vertices and check convexity.
    match new_poly.remove_colinears() {
        RemoveColinearsResult::Convex if new_poly.vertices.len() <= BSP_NODE_MAX_NODE_VERTICES => {
            *poly1 = new_poly;
            poly2.vertices.clear();
            true
        }
        _ => false
    }
}

/// Merge all polygons in coplanar list that can be merged convexly.
///
/// - Assumes that all the polygons in the list are coplanar and that
///   `poly_indices` is ascending.
/// - Returns the number of polygons merged away.
pub fn merge_coplanars(polys: &mut [FPoly], poly_indices: &[usize]) -> usize {
    let mut merged_count: usize = 0;
    let mut merge_again = true;
    while merge_again {
        merge_again = false;
        for i in 0..poly_indices.len() {
            if polys[poly_indices[i]].vertices.is_empty() {
                // Polygon has already been merged away.
                continue
            }
            for j in i + 1..poly_indices.len() {
                let (poly1, poly2) = pair_mut(polys, poly_indices[i], poly_indices[j]);
                if poly2.vertices.is_empty() {
                    continue
                }
                if try_to_merge(poly1, poly2) {
                    debug!("Merged polygons {} into {}", poly_indices[j], poly_indices[i]);
                    merged_count += 1;
                    merge_again = true;
                }
            }
        }
    }
    merged_count
}

/// Merge all coplanar EdPolys in a model.  Polys are grouped by link, so
/// only polys of one surface or brush face are ever merged.  Preserves
/// (though reorders) links when `remap_links` is set.
///
/// Returns the number of polys removed.
pub fn bsp_merge_coplanars(model: &mut UModel, remap_links: bool, merge_disparate_textures: bool) -> usize {
    let polys = &mut model.polys;
    let original_num = polys.len();

    // Mark all polys as unprocessed.
    polys.iter_mut().for_each(|poly| poly.poly_flags.remove(EPolyFlags::EdProcessed));

    // Find matching coplanars and merge them.
    let mut poly_list: Vec<usize> = Vec::new();
    let mut set_count = 0;

    for i in 0..polys.len() {
        if polys[i].vertices.is_empty() || polys[i].poly_flags.contains(EPolyFlags::EdProcessed) {
            continue;
        }
        polys[i].poly_flags |= EPolyFlags::EdProcessed;

        poly_list.clear();
        poly_list.push(i);

        for j in i + 1..polys.len() {
            let (ed_poly, other_poly) = pair_mut(polys, i, j);
            if other_poly.vertices.is_empty() || other_poly.link != ed_poly.link {
                continue;
            }
            let distance = point_plane_distance(&other_poly.vertices[0], &ed_poly.vertices[0], &ed_poly.normal);
            let is_coplanar = distance > -0.001 && distance < 0.001 && other_poly.normal.dot(ed_poly.normal) > 0.9999;
            let is_same_texture = merge_disparate_textures || (
                points_are_near(&other_poly.texture_u, &ed_poly.texture_u, THRESH_VECTORS_ARE_NEAR) &&
                points_are_near(&other_poly.texture_v, &ed_poly.texture_v, THRESH_VECTORS_ARE_NEAR)
            );
            if is_coplanar && is_same_texture {
                other_poly.poly_flags |= EPolyFlags::EdProcessed;
                poly_list.push(j);
            }
        }

        if poly_list.len() > 1 {
            merge_coplanars(polys, &poly_list);
            set_count += 1;
        }
    }

    debug!("Found {} coplanar sets in {}", set_count, original_num);

    // Get rid of empty EdPolys while remapping links.
    let mut remap: Vec<Option<usize>> = vec![None; polys.len()];
    let mut j = 0;
    for i in 0..polys.len() {
        if !polys[i].vertices.is_empty() {
            remap[i] = Some(j);
            polys.swap(i, j);
            j += 1;
        }
    }
    polys.truncate(j);

    for poly in polys.iter_mut() {
        poly.poly_flags.remove(EPolyFlags::EdProcessed);
        if remap_links {
            poly.link = poly.link.and_then(|link| remap.get(link).copied().flatten());
        }
    }

    debug!("bsp_merge_coplanars reduced {}->{}", original_num, polys.len());

    original_num - polys.len()
}

/// Validate a brush: recompute each poly's plane, drop degenerate polys,
/// and group matching coplanars into link sets.  Optionally merges each set.
pub fn bsp_validate_brush(model: &mut UModel, force_validate: bool, merge: bool) -> Result<BuildReport, BspError> {
    if model.state() != EModelState::PolysOnly {
        return Err(BspError::PolysOnlyRequired);
    }

    let mut report = BuildReport::new();

    model.polys.retain_mut(|poly| {
        if poly.fix() < 3 {
            report.drop_fragment(EBuildErrorKind::TooFewVertices);
            return false;
        }
        if let Err(error) = poly.calc_normal() {
            report.drop_fragment(error);
            return false;
        }
        poly.base = poly.vertices[0];
        true
    });

    if force_validate || !model.linked {
        model.linked = true;
        let polys = &mut model.polys;
        for (i, poly) in polys.iter_mut().enumerate() {
            poly.link = Some(i);
        }

        for i in 0..polys.len() {
            if polys[i].link != Some(i) {
                continue;
            }
            for j in i + 1..polys.len() {
                let (ed_poly, other_poly) = pair_mut(polys, i, j);
                if other_poly.link == Some(j)
                    && other_poly.material == ed_poly.material
                    && other_poly.texture_u == ed_poly.texture_u
                    && other_poly.texture_v == ed_poly.texture_v
                    && other_poly.poly_flags == ed_poly.poly_flags
                    && other_poly.normal.dot(ed_poly.normal) > 0.9999
                {
                    let distance = point_plane_distance(&other_poly.vertices[0], &ed_poly.vertices[0], &ed_poly.normal);
                    if distance > -0.001 && distance < 0.001 {
                        other_poly.link = Some(i);
                    }
                }
            }
        }
    }

    if merge {
        bsp_merge_coplanars(model, true, false);
    }

    // Build bounds.
    model.build_bound();

    Ok(report)
}

/// Break every link group so that each poly forms its own group.
pub fn bsp_unlink_polys(model: &mut UModel) -> Result<(), BspError> {
    if model.state() != EModelState::PolysOnly {
        return Err(BspError::PolysOnlyRequired);
    }
    model.linked = true;
    for (i, poly) in model.polys.iter_mut().enumerate() {
        poly.link = Some(i);
    }
    Ok(())
}

/// Convert a Bsp node to an EdPoly carrying its surface's properties.  The
/// link is the node's surface index.  A discarded node yields an empty ring.
pub fn bsp_node_to_fpoly(model: &UModel, node_index: u32) -> FPoly {
    let node = model.node(node_index);
    let surf = &model.surfaces[node.surface_index as usize];

    let mut ed_poly = FPoly::new();
    ed_poly.base = model.points[surf.base_point_index as usize];
    ed_poly.normal = model.vectors[surf.normal_index as usize];
    ed_poly.texture_u = model.vectors[surf.texture_u_index as usize];
    ed_poly.texture_v = model.vectors[surf.texture_v_index as usize];
    ed_poly.poly_flags = surf.poly_flags & !EPolyFlags::NoAddToBSP;
    ed_poly.material = surf.material;
    ed_poly.brush_poly_index = surf.brush_polygon_index;
    ed_poly.light_map_scale = surf.light_map_scale;
    ed_poly.link = Some(node.surface_index as usize);
    ed_poly.vertices.extend(model.node_points(node_index));
    ed_poly
}

/// Regenerate the model's poly list from its tree, in node, front, back,
/// plane order.  With `surf_links` unset the polys are left unlinked.
pub fn bsp_build_fpolys(model: &mut UModel, surf_links: bool) {
    let mut polys = Vec::new();

    if !model.nodes.is_empty() {
        let mut stack = vec![0u32];
        while let Some(node_index) = stack.pop() {
            let mut ed_poly = bsp_node_to_fpoly(model, node_index);
            if ed_poly.vertices.len() >= 3 {
                if !surf_links {
                    ed_poly.link = None;
                }
                polys.push(ed_poly);
            }
            let node = model.node(node_index);
            stack.extend(node.plane_index);
            stack.extend(node.back_node_index);
            stack.extend(node.front_node_index);
        }
    }

    model.polys = polys;
    model.linked = surf_links;
}

/// Clear the transient flags a CSG operation leaves on nodes.
pub fn bsp_cleanup(model: &mut UModel) {
    for node in &mut model.nodes {
        node.node_flags.remove(EBspNodeFlags::IsNew);
    }
}

/// Compact the point and vector tables, removing entries no node or
/// surface references.
pub fn bsp_refresh(model: &mut UModel) {
    let mut point_used = vec![false; model.points.len()];
    let mut vector_used = vec![false; model.vectors.len()];

    for node in &model.nodes {
        let start = node.vertex_pool_index as usize;
        for vert in &model.vertices[start..start + node.vertex_count as usize] {
            point_used[vert.vertex_index as usize] = true;
        }
    }
    for surf in &model.surfaces {
        point_used[surf.base_point_index as usize] = true;
        vector_used[surf.normal_index as usize] = true;
        vector_used[surf.texture_u_index as usize] = true;
        vector_used[surf.texture_v_index as usize] = true;
    }

    let point_remap = compact(&mut model.points, &point_used);
    let vector_remap = compact(&mut model.vectors, &vector_used);

    for node in &model.nodes {
        let start = node.vertex_pool_index as usize;
        for vert in &mut model.vertices[start..start + node.vertex_count as usize] {
            vert.vertex_index = point_remap[vert.vertex_index as usize];
        }
    }
    for surf in &mut model.surfaces {
        surf.base_point_index = point_remap[surf.base_point_index as usize];
        surf.normal_index = vector_remap[surf.normal_index as usize];
        surf.texture_u_index = vector_remap[surf.texture_u_index as usize];
        surf.texture_v_index = vector_remap[surf.texture_v_index as usize];
    }
}

/// Keep the used entries of a table in order and return the old -> new index map.
/// Unused entries map to 0 and must not be looked up.
fn compact(table: &mut Vec<FVector>, used: &[bool]) -> Vec<u32> {
    let mut remap = vec![0u32; table.len()];
    let mut j = 0usize;
    for i in 0..table.len() {
        if used[i] {
            remap[i] = j as u32;
            table[j] = table[i];
            j += 1;
        }
    }
    table.truncate(j);
    remap
}

/// The bounding box of every node polygon in a subtree, coplanars included.
pub fn bsp_node_bound(model: &UModel, node_index: u32) -> FBox {
    let mut bound = FBox::new();
    let mut stack = vec![node_index];
    while let Some(index) = stack.pop() {
        for point in model.node_points(index) {
            bound.add_point(&point);
        }
        let node = model.node(index);
        stack.extend(node.front_node_index);
        stack.extend(node.back_node_index);
        stack.extend(node.plane_index);
    }
    bound
}

/// Rebuild each node's bounding sphere and the model's bounds from the tree.
/// A model without nodes is bounded by its poly list.
pub fn bsp_build_bounds(model: &mut UModel) {
    if model.nodes.is_empty() {
        model.build_bound();
        return;
    }

    for index in 0..model.nodes.len() as u32 {
        let points: ArrayVec<FVector, BSP_NODE_MAX_NODE_VERTICES> = model.node_points(index).collect();
        model.node_mut(index).exclusive_sphere_bound = FSphere::new_from_points(&points);
    }

    model.bounding_box = bsp_node_bound(model, 0);
    model.bounding_sphere = FSphere::from(&model.bounding_box);
}
