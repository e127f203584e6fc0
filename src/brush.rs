use cgmath::InnerSpace;

use crate::bsp::{bsp_build, bsp_unlink_polys};
use crate::config::{BuildOptions, EBspOptimization, DEFAULT_BALANCE, DEFAULT_PORTAL_BIAS};
use crate::coords::FModelCoords;
use crate::csg::{bsp_brush_csg, ECsgOper};
use crate::error::{BspError, BuildReport};
use crate::fpoly::{EPolyFlags, FPoly};
use crate::math::{find_best_axis_vectors, FPlane, FVector, HALF_WORLD_MAX, WORLD_MAX};
use crate::model::UModel;

/// A placed brush: a polygon model in brush-local space, where it sits in
/// the world, and how it combines with the world.
#[derive(Clone, Debug, PartialEq)]
pub struct ABrush {
    pub model: UModel,
    pub location: FVector,
    pub pre_pivot: FVector,
    pub scale: FVector,
    pub csg_operation: ECsgOper,
    pub poly_flags: EPolyFlags,
}

impl ABrush {
    pub fn new(model: UModel, csg_operation: ECsgOper) -> Self {
        ABrush {
            model,
            location: FVector::new(0.0, 0.0, 0.0),
            pre_pivot: FVector::new(0.0, 0.0, 0.0),
            scale: FVector::new(1.0, 1.0, 1.0),
            csg_operation,
            poly_flags: EPolyFlags::empty(),
        }
    }

    pub fn new_from_polys(polys: &[FPoly], csg_operation: ECsgOper) -> Self {
        ABrush::new(UModel::new_from_polys(polys), csg_operation)
    }

    pub fn with_location(self, location: FVector) -> Self {
        ABrush { location, ..self }
    }

    pub fn with_poly_flags(self, poly_flags: EPolyFlags) -> Self {
        ABrush { poly_flags, ..self }
    }

    /// Build the brush's coordinate system, its inverse, and the orientation
    /// of the scale (negative if it mirrors).
    pub fn build_coords(&self) -> (FModelCoords, FModelCoords, f32) {
        let coords = FModelCoords::new_from_scale(&self.scale);
        let uncoords = coords.inverse();
        let orientation = (self.scale.x * self.scale.y * self.scale.z).signum();
        (coords, uncoords, orientation)
    }
}

/// Build a huge square polygon lying in the plane, facing along its normal.
pub fn build_infinite_fpoly(plane: &FPlane) -> FPoly {
    let normal = plane.normal();
    let (axis1, axis2) = find_best_axis_vectors(&normal);
    let base = normal * plane.w;

    let mut ed_poly = FPoly::new();
    ed_poly.normal = normal;
    ed_poly.base = base;
    ed_poly.vertices.push(base + axis1 * HALF_WORLD_MAX + axis2 * HALF_WORLD_MAX);
    ed_poly.vertices.push(base - axis1 * HALF_WORLD_MAX + axis2 * HALF_WORLD_MAX);
    ed_poly.vertices.push(base - axis1 * HALF_WORLD_MAX - axis2 * HALF_WORLD_MAX);
    ed_poly.vertices.push(base + axis1 * HALF_WORLD_MAX - axis2 * HALF_WORLD_MAX);
    ed_poly
}

/// Build a six-sided slab brush covering everything behind the plane, out
/// to the edge of the world.
pub fn build_giant_brush(plane: &FPlane) -> ABrush {
    let mut front = build_infinite_fpoly(plane);
    // Wind the ring so it agrees with the normal, like any other brush face.
    front.vertices.reverse();
    let depth = plane.normal() * -WORLD_MAX;

    let mut polys = Vec::with_capacity(6);

    let mut back = front.clone();
    back.vertices.iter_mut().for_each(|vertex| *vertex += depth);
    back.reverse();
    back.base = back.vertices[0];

    let count = front.vertices.len();
    for i in 0..count {
        let j = (i + 1) % count;
        let mut side = FPoly::from_vertices(&[
            front.vertices[j],
            front.vertices[i],
            front.vertices[i] + depth,
            front.vertices[j] + depth,
        ]);
        // Side walls face away from the slab's axis.
        let edge_center = (front.vertices[i] + front.vertices[j]) * 0.5;
        if side.normal.dot(edge_center - front.base) < 0.0 {
            side.reverse();
        }
        polys.push(side);
    }
    polys.push(front);
    polys.push(back);

    for (i, poly) in polys.iter_mut().enumerate() {
        poly.link = Some(i);
    }

    ABrush::new_from_polys(&polys, ECsgOper::Intersect)
}

/// Clip a brush against a plane, keeping the part behind it.  The brush is
/// `None` if too little of it is left to form a solid.  The report collects
/// problems from building the brush tree, the intersection, and fixing up
/// the clipped polys.
pub fn clip_brush_against_plane(plane: &FPlane, brush: &ABrush, options: &BuildOptions) -> Result<(Option<ABrush>, BuildReport), BspError> {
    // Build a tree for the brush so the slab can be intersected with it.
    let mut brush_model = brush.model.clone();
    brush_model.invalidate_tree();
    brush_model.is_root_outside = true;
    let build_options = BuildOptions {
        fast_mode: options.fast_mode,
        ..BuildOptions::new(EBspOptimization::Optimal, DEFAULT_BALANCE, DEFAULT_PORTAL_BIAS)
    };
    let mut report = bsp_build(&mut brush_model, &build_options);

    let giant_brush = build_giant_brush(plane);
    let output = bsp_brush_csg(&giant_brush, &mut brush_model, EPolyFlags::empty(), ECsgOper::Intersect, &build_options)?;
    report.merge(output.report);

    if output.polys.len() < 4 {
        return Ok((None, report));
    }

    let mut clipped_model = UModel::new();
    clipped_model.polys = output.polys;
    clipped_model.polys.retain_mut(|poly| match poly.finalize() {
        Ok(()) => true,
        Err(kind) => {
            report.drop_fragment(kind);
            false
        }
    });
    if clipped_model.polys.len() < 4 {
        return Ok((None, report));
    }
    bsp_unlink_polys(&mut clipped_model)?;
    clipped_model.build_bound();

    Ok((Some(ABrush { model: clipped_model, ..brush.clone() }), report))
}
