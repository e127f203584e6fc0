use cgmath::InnerSpace;
use arrayvec::ArrayVec;
use bitflags::bitflags;
use crate::coords::FModelCoords;
use crate::error::{BspError, BuildReport, EBuildErrorKind};
use crate::math::{points_are_same, FVector, FLOAT_NORMAL_THRESH, SMALL_NUMBER};
use crate::math::{point_plane_distance, line_plane_intersection, points_are_near, safe_normal};
use crate::math::{THRESH_SPLIT_POLY_PRECISELY, THRESH_SPLIT_POLY_WITH_PLANE, THRESH_ZERO_NORM_SQUARED};

/// Maximum vertices an FPoly may have.
pub const FPOLY_MAX_VERTICES: usize = 16;
/// Polys with at least this many vertices are split in half before they are
/// partitioned or filtered further.
pub const FPOLY_VERTEX_THRESHOLD: usize = FPOLY_MAX_VERTICES - 2;

/// Room for a fragment ring while a full poly is being cut.  Each input
/// vertex adds at most two vertices to a side.
const SPLIT_RING_CAPACITY: usize = 2 * FPOLY_MAX_VERTICES;

type SplitRing = ArrayVec<FVector, SPLIT_RING_CAPACITY>;

/// The pieces on one side of a split.  Usually one poly; a side with more
/// vertices than an FPoly can hold is fanned into several.
pub type FPolyFragments = ArrayVec<FPoly, 3>;

/// Flags describing effects and properties of a Bsp polygon.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct EPolyFlags(u32);

bitflags! {
    impl EPolyFlags : u32 {
        // Regular in-game flags.
        /// Poly is invisible.
        const Invisible     = 0x00000001;
        /// Poly should be drawn masked.
        const Masked        = 0x00000002;
        /// Poly is transparent.
        const Translucent   = 0x00000004;
        /// Poly is not solid, doesn't block.
        const NotSolid      = 0x00000008;
        /// Poly should be drawn environment mapped.
        const Environment   = 0x00000010;
        /// Poly is semi-solid = collision solid, Csg nonsolid.
        const Semisolid     = 0x00000020;
        /// Modulation transparency.
        const Modulated     = 0x00000040;
        /// Poly looks exactly like backdrop.
        const FakeBackdrop  = 0x00000080;
        /// Poly is visible from both sides.
        const TwoSided      = 0x00000100;
        /// Don't smooth textures.
        const NoSmooth      = 0x00000800;
        /// Honor texture alpha.
        const AlphaTexture  = 0x00001000;
        /// Flat surface.
        const Flat          = 0x00004000;
        /// Don't merge poly's nodes before lighting when rendering.
        const NoMerge       = 0x00010000;
        /// Don't test Z buffer
        const NoZTest       = 0x00020000;
        /// Additive blending.
        const Additive      = 0x00040000;
        /// Only speciallit lights apply to this poly.
        const SpecialLit    = 0x00100000;
        /// Render as wireframe
        const Wireframe     = 0x00200000;
        /// Unlit.
        const Unlit         = 0x00400000;
        /// Portal between zones.
        const Portal        = 0x04000000;
        /// Antiportal
        const AntiPortal    = 0x08000000;
        /// Mirrored BSP surface.
        const Mirrored      = 0x20000000;

        // Editor flags.
        /// Editor: Poly is remembered.
        const Memorized     = 0x01000000;
        /// Editor: Poly is selected.
        const Selected      = 0x02000000;

        // Internal.
        /// FPoly was already processed by a merge pass.
        const EdProcessed   = 0x40000000;
        /// FPoly has been split by SplitPolyWithPlane.
        const EdCut         = 0x80000000;

        // Combinations.
        /// Polys that go last in the splitter search.
        const AddLast       = Self::Semisolid.bits() | Self::NotSolid.bits();
        /// Transient editor flags that never reach a Bsp surface.
        const NoAddToBSP    = Self::EdCut.bits() | Self::EdProcessed.bits() | Self::Selected.bits() | Self::Memorized.bits();
    }
}

/// Poly flag names as they appear in exported brush data.
static POLY_FLAGS: phf::Map<&'static str, u32> = phf::phf_map! {
    "INVISIBLE" => 0x00000001,
    "MASKED" => 0x00000002,
    "TRANSLUCENT" => 0x00000004,
    "NOT_SOLID" => 0x00000008,
    "ENVIRONMENT" => 0x00000010,
    "SEMISOLID" => 0x00000020,
    "MODULATED" => 0x00000040,
    "FAKE_BACKDROP" => 0x00000080,
    "TWO_SIDED" => 0x00000100,
    "NO_SMOOTH" => 0x00000800,
    "ALPHA_TEXTURE" => 0x00001000,
    "FLAT" => 0x00004000,
    "NO_MERGE" => 0x00010000,
    "NO_Z_TEST" => 0x00020000,
    "ADDITIVE" => 0x00040000,
    "SPECIAL_LIT" => 0x00100000,
    "WIREFRAME" => 0x00200000,
    "UNLIT" => 0x00400000,
    "PORTAL" => 0x04000000,
    "ANTI_PORTAL" => 0x08000000,
    "MIRRORED" => 0x20000000,
};

/// Drop consecutive duplicate points from a closed ring.  A ring left with
/// fewer than three points is cleared.
fn remove_duplicate_points<const N: usize>(ring: &mut ArrayVec<FVector, N>) -> usize {
    if ring.is_empty() {
        return 0;
    }

    let mut prev = ring.len() - 1;
    let mut j = 0usize;
    for i in 0..ring.len() {
        if !points_are_same(&ring[i], &ring[prev]) {
            if j != i {
                ring[j] = ring[i];
            }
            prev = j;
            j += 1;
        }
    }

    if j >= 3 {
        ring.truncate(j);
    } else {
        ring.clear();
    }

    ring.len()
}

/// Parse SCREAMING_SNAKE_CASE flag names into poly flags.
pub fn poly_flags_from_names<I, S>(names: I) -> Result<EPolyFlags, BspError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut flags = EPolyFlags::empty();
    for name in names {
        let name = name.as_ref();
        match POLY_FLAGS.get(name) {
            Some(bits) => flags |= EPolyFlags::from_bits_retain(*bits),
            None => return Err(BspError::UnknownPolyFlag(name.to_string())),
        }
    }
    Ok(flags)
}

/// Results from FPoly.SplitWithPlane, describing the result of splitting
/// an arbitrary FPoly with an arbitrary plane.
#[derive(Debug, PartialEq)]
pub enum ESplitType
{
    /// Poly wasn't split, but is coplanar with plane
    Coplanar,
    /// Poly wasn't split, but is entirely in front of plane
    Front,
    /// Poly wasn't split, but is entirely in back of plane
    Back,
    /// Poly was split into new editor polygons, front pieces then back pieces
    Split(FPolyFragments, FPolyFragments),
}

#[derive(Clone, Debug, PartialEq)]
pub enum RemoveColinearsResult {
    Convex,
    Concave,
    Collapsed
}

/// A general-purpose polygon used by the editor.  An FPoly is free-standing
/// and exists independently of any particular level, unlike the polys
/// associated with Bsp nodes which live in the model's pools.  FPolys are
/// what the builder partitions and what CSG filters through a tree.
#[derive(Clone, Debug, PartialEq)]
pub struct FPoly {
    /// Base point of polygon.
    pub base: FVector,
    /// Normal of polygon.
    pub normal: FVector,
    /// Texture U vector.
    pub texture_u: FVector,
    /// Texture V vector.
    pub texture_v: FVector,
    /// Actual vertices.
    pub vertices: ArrayVec<FVector, FPOLY_MAX_VERTICES>,
    /// FPoly & Bsp poly bit flags (PF_).
    pub poly_flags: EPolyFlags,
    /// Link group in a brush, or the Bsp surface index while filtering.
    /// `None` asks for a fresh surface.
    pub link: Option<usize>,
    /// Index of editor solid's polygon this originated from.
    pub brush_poly_index: Option<usize>,
    /// Material id, if any.
    pub material: Option<u32>,
    /// The number of units/lightmap texel on this surface.
    pub light_map_scale: f32
}

#[derive(Clone, Copy, PartialEq)]
enum ESplitPlaneStatus {
    Front,
    Back,
    Either
}

impl Default for FPoly {
    fn default() -> Self {
        Self::new()
    }
}

impl FPoly {

    /// Build a poly from a vertex ring and compute its normal and base. A
    /// ring with more than [`FPOLY_MAX_VERTICES`] vertices is truncated.
    pub fn from_vertices(vertices: &[FVector]) -> Self {
        let mut fpoly = FPoly::new();
        let count = vertices.len().min(FPOLY_MAX_VERTICES);
        fpoly.vertices.extend(vertices[..count].iter().copied());
        if let Some(first) = fpoly.vertices.first() {
            fpoly.base = *first;
        }
        _ = fpoly.calc_normal();
        fpoly
    }

    /// Initialize everything in an editor polygon structure to defaults.
    pub fn new() -> FPoly {
        FPoly {
            base: FVector { x: 0.0, y: 0.0, z: 0.0 },
            normal: FVector { x: 0.0, y: 0.0, z: 0.0 },
            texture_u: FVector { x: 0.0, y: 0.0, z: 0.0 },
            texture_v: FVector { x: 0.0, y: 0.0, z: 0.0 },
            vertices: ArrayVec::new(),
            poly_flags: EPolyFlags::empty(),
            link: None,
            brush_poly_index: None,
            material: None,
            light_map_scale: 32.0
        }
    }

    /// A copy of this poly's attributes with an empty vertex ring.
    fn empty_copy(&self) -> FPoly {
        FPoly { vertices: ArrayVec::new(), ..self.clone() }
    }

    /// A cut piece carrying this poly's attributes.
    fn cut_fragment(&self, vertices: impl Iterator<Item = FVector>) -> FPoly {
        let mut fragment = self.empty_copy();
        fragment.vertices.extend(vertices);
        fragment.poly_flags |= EPolyFlags::EdCut;
        fragment
    }

    /// Turn a cut ring into polys.  A ring too long for one FPoly is fanned
    /// out from its first vertex into evenly sized convex pieces.
    fn fragments_from_ring(&self, ring: &[FVector]) -> FPolyFragments {
        let mut fragments = FPolyFragments::new();
        if ring.len() <= FPOLY_MAX_VERTICES {
            fragments.push(self.cut_fragment(ring.iter().copied()));
            return fragments;
        }

        let triangle_count = ring.len() - 2;
        let piece_count = triangle_count.div_ceil(FPOLY_MAX_VERTICES - 2);
        let triangles_per_piece = triangle_count.div_ceil(piece_count);
        for first in (0..triangle_count).step_by(triangles_per_piece) {
            let last = (first + triangles_per_piece).min(triangle_count);
            let vertices = std::iter::once(ring[0]).chain(ring[first + 1..=last + 1].iter().copied());
            fragments.push(self.cut_fragment(vertices));
        }
        fragments
    }

    /// Reverse an FPoly by reversing the normal and reversing the order of its vertices.
    pub fn reverse(&mut self) {
        self.normal *= -1.0;
        self.vertices.reverse()
    }

    /// Fix up an editor poly by deleting vertices that are identical. Sets
    /// vertex count to zero if it collapses.  Returns number of vertices, 0 or >=3.
    pub fn fix(&mut self) -> usize {
        remove_duplicate_points(&mut self.vertices)
    }

    /// Twice the area of the (convex) polygon.
    pub fn area2(&self) -> f32 {
        if self.vertices.len() < 3 {
            return 0.0;
        }
        let mut area = 0.0;
        let mut side1 = self.vertices[1] - self.vertices[0];
        for i in 2..self.vertices.len() {
            let side2 = self.vertices[i] - self.vertices[0];
            area += side1.cross(side2).magnitude();
            side1 = side2;
        }
        area
    }

    #[inline]
    pub fn area(&self) -> f32 {
        self.area2() / 2.0
    }

    /// True if this poly's normal points the same way as `normal`.
    pub fn faces_same_way(&self, normal: &FVector) -> bool {
        self.normal.dot(*normal) >= 0.0
    }

    /// Largest signed distance from any vertex to the plane.
    fn max_plane_distance(&self, plane_base: &FVector, plane_normal: &FVector) -> f32 {
        self.vertices.iter()
            .map(|vertex| point_plane_distance(vertex, plane_base, plane_normal))
            .fold(f32::MIN, f32::max)
    }

    /// Split with plane. Meant to be numerically stable.
    pub fn split_with_plane(&self, plane_base: FVector, plane_normal: FVector, very_precise: bool) -> ESplitType {
        self.split_with_plane_checked(plane_base, plane_normal, very_precise).0
    }

    /// Like [`FPoly::split_with_plane`], but records a sliver fragment
    /// that had to be thrown away in `report`.
    pub fn split_with_plane_report(&self, plane_base: FVector, plane_normal: FVector, very_precise: bool, report: &mut BuildReport) -> ESplitType {
        let (split_type, dropped_sliver) = self.split_with_plane_checked(plane_base, plane_normal, very_precise);
        if dropped_sliver {
            report.drop_fragment(EBuildErrorKind::DegenerateFragment);
        }
        split_type
    }

    /// Returns the classification and whether a sliver fragment was dropped.
    fn split_with_plane_checked(&self, plane_base: FVector, plane_normal: FVector, very_precise: bool) -> (ESplitType, bool) {
        let threshold = if very_precise {
            THRESH_SPLIT_POLY_PRECISELY
        } else {
            THRESH_SPLIT_POLY_WITH_PLANE
        };

        // Find the minimum and maximum signed distance from every vertex to
        // the plane, remembering the side of the last vertex clear of it.
        let mut status_previous = ESplitPlaneStatus::Either;
        let mut distance_max = f32::MIN;
        let mut distance_min = f32::MAX;

        for vertex in &self.vertices {
            let distance = point_plane_distance(vertex, &plane_base, &plane_normal);
            distance_max = distance.max(distance_max);
            distance_min = distance.min(distance_min);
            if distance > threshold {
                status_previous = ESplitPlaneStatus::Front
            } else if distance < -threshold {
                status_previous = ESplitPlaneStatus::Back
            }
        }

        if distance_max < threshold && distance_min > -threshold {
            return (ESplitType::Coplanar, false);
        } else if distance_max < threshold {
            return (ESplitType::Back, false);
        } else if distance_min > -threshold {
            return (ESplitType::Front, false);
        }

        // A full ring gains up to two vertices on a side, so the rings are
        // gathered first and only then turned into polys.
        let mut front_ring = SplitRing::new();
        let mut back_ring = SplitRing::new();

        let mut j = self.vertices.len() - 1; // Previous vertex; have status_previous already.
        let mut distance_previous = point_plane_distance(&self.vertices[j], &plane_base, &plane_normal);

        for i in 0..self.vertices.len() {
            let distance = point_plane_distance(&self.vertices[i], &plane_base, &plane_normal);

            let status = if distance > threshold {
                ESplitPlaneStatus::Front
            } else if distance < -threshold {
                ESplitPlaneStatus::Back
            } else {
                status_previous
            };

            if status != status_previous {
                // Crossing.  Either Front-to-Back or Back-To-Front.
                // Intersection point is naturally on both front and back polys.
                if distance >= -threshold && distance < threshold {
                    // This point lies on plane.
                    front_ring.push(self.vertices[i]);
                    back_ring.push(self.vertices[i]);
                } else if distance_previous >= -threshold && distance_previous < threshold {
                    // Previous point lies on plane.
                    if status == ESplitPlaneStatus::Front {
                        front_ring.push(self.vertices[j]);
                        front_ring.push(self.vertices[i]);
                    } else {
                        back_ring.push(self.vertices[j]);
                        back_ring.push(self.vertices[i]);
                    }
                } else {
                    // Intersection point is in between.
                    let intersection = line_plane_intersection(&self.vertices[j], &self.vertices[i], &plane_base, &plane_normal);

                    if status_previous == ESplitPlaneStatus::Front {
                        front_ring.push(intersection);
                        back_ring.push(intersection);
                        back_ring.push(self.vertices[i]);
                    } else {
                        back_ring.push(intersection);
                        front_ring.push(intersection);
                        front_ring.push(self.vertices[i]);
                    }
                }
            } else if status == ESplitPlaneStatus::Front {
                front_ring.push(self.vertices[i]);
            } else {
                back_ring.push(self.vertices[i]);
            }

            j = i;
            status_previous = status;
            distance_previous = distance;
        }

        // Handle possibility of sliver polys due to precision errors.
        if remove_duplicate_points(&mut front_ring) < 3 {
            (ESplitType::Back, true)
        } else if remove_duplicate_points(&mut back_ring) < 3 {
            (ESplitType::Front, true)
        } else {
            (ESplitType::Split(self.fragments_from_ring(&front_ring), self.fragments_from_ring(&back_ring)), false)
        }
    }

    /// Split with plane quickly, without snapping vertices to the plane.
    /// Results are always valid. May return sliver polys.
    pub fn split_with_plane_fast(&self, plane_base: &FVector, plane_normal: &FVector) -> ESplitType {
        let mut vertex_statuses = [ESplitPlaneStatus::Front; FPOLY_MAX_VERTICES];
        let mut front = false;
        let mut back = false;

        for (i, vertex) in self.vertices.iter().enumerate() {
            let distance = point_plane_distance(vertex, plane_base, plane_normal);
            if distance >= 0.0 {
                vertex_statuses[i] = ESplitPlaneStatus::Front;
                if distance > THRESH_SPLIT_POLY_WITH_PLANE {
                    front = true;
                }
            } else {
                vertex_statuses[i] = ESplitPlaneStatus::Back;
                if distance < -THRESH_SPLIT_POLY_WITH_PLANE {
                    back = true;
                }
            }
        }

        if !front {
            return if back { ESplitType::Back } else { ESplitType::Coplanar };
        }
        if !back {
            return ESplitType::Front;
        }

        let mut front_ring = SplitRing::new();
        let mut back_ring = SplitRing::new();

        let mut w = self.vertices.len() - 1;
        let mut prev_status = vertex_statuses[w];

        for v in 0..self.vertices.len() {
            let status = vertex_statuses[v];
            if status != prev_status {
                // Crossing.
                let intersection = line_plane_intersection(&self.vertices[w], &self.vertices[v], plane_base, plane_normal);
                front_ring.push(intersection);
                back_ring.push(intersection);
                if prev_status == ESplitPlaneStatus::Front {
                    back_ring.push(self.vertices[v]);
                } else {
                    front_ring.push(self.vertices[v]);
                }
            } else if status == ESplitPlaneStatus::Front {
                front_ring.push(self.vertices[v]);
            } else {
                back_ring.push(self.vertices[v]);
            }

            prev_status = status;
            w = v;
        }

        ESplitType::Split(self.fragments_from_ring(&front_ring), self.fragments_from_ring(&back_ring))
    }

    /// Split an FPoly in half. `self` keeps the first half and the second
    /// half is returned.
    pub fn split_in_half(&mut self) -> Option<FPoly> {
        if self.vertices.len() <= 3 {
            return None;
        }

        let m = self.vertices.len() / 2;
        let mut other_half = self.clone();

        self.vertices.truncate(m + 1);
        other_half.vertices.drain(0..m);
        other_half.vertices.push(self.vertices[0]);

        self.poly_flags |= EPolyFlags::EdCut;
        other_half.poly_flags |= EPolyFlags::EdCut;

        Some(other_half)
    }

    /// Compute normal of an FPoly.  Works even if FPoly has 180-degree-angled sides (which
    /// are often created during T-joint elimination).  Leaves the normal zeroed and
    /// returns an error if the polygon has no area.
    pub fn calc_normal(&mut self) -> Result<FVector, EBuildErrorKind> {
        self.normal = FVector::new(0.0, 0.0, 0.0);
        for i in 2..self.vertices.len() {
            self.normal += (self.vertices[i - 1] - self.vertices[0]).cross(self.vertices[i] - self.vertices[0]);
        }
        if self.normal.magnitude2() < THRESH_ZERO_NORM_SQUARED {
            self.normal = FVector::new(0.0, 0.0, 0.0);
            return Err(EBuildErrorKind::ZeroAreaNormal);
        }
        self.normal = self.normal.normalize();
        Ok(self.normal)
    }

    /// Remove colinear vertices and check convexity.
    pub fn remove_colinears(&mut self) -> RemoveColinearsResult {
        let mut side_plane_normals: ArrayVec<FVector, FPOLY_MAX_VERTICES> = ArrayVec::new();
        let mut i = 0;

        // Add as many side plane normals as there are vertices.
        for _ in 0..self.vertices.len() {
            side_plane_normals.push(FVector::new(0.0, 0.0, 0.0));
        }

        while i < self.vertices.len() {
            let j = if i == 0 { self.vertices.len() - 1 } else { i - 1 };

            // Create cutting plane perpendicular to both this side and the polygon's normal.
            let side = self.vertices[i] - self.vertices[j];
            let side_plane_normal = side.cross(self.normal);

            if side_plane_normal.dot(side_plane_normal) < SMALL_NUMBER {
                // Eliminate these nearly identical points.
                self.vertices.remove(i);
                side_plane_normals.truncate(self.vertices.len());
                if self.vertices.len() < 3 {
                    // Collapsed.
                    self.vertices.clear();
                    return RemoveColinearsResult::Collapsed;
                }
                if i > 0 {
                    i -= 1;
                    continue;
                }
            } else {
                side_plane_normals[i] = side_plane_normal.normalize();
            }

            i += 1;
        }

        i = 0;

        while i < self.vertices.len() {
            let j = (i + 1) % self.vertices.len();
            if points_are_near(&side_plane_normals[i], &side_plane_normals[j], FLOAT_NORMAL_THRESH) {
                // Eliminate colinear points.
                self.vertices.remove(i);
                side_plane_normals.remove(i);
                if self.vertices.len() < 3 {
                    // Collapsed.
                    self.vertices.clear();
                    return RemoveColinearsResult::Collapsed;
                }
                if i > 0 {
                    i -= 1;
                    continue;
                }
            } else if self.max_plane_distance(&self.vertices[i], &side_plane_normals[i]) >= THRESH_SPLIT_POLY_WITH_PLANE {
                // Some vertex pokes out past this side.
                return RemoveColinearsResult::Concave;
            }

            i += 1;
        }

        RemoveColinearsResult::Convex
    }

    /// Fix up the poly after it has been authored: drop duplicate points,
    /// compute a missing normal, and generate a texture basis if none is set.
    pub fn finalize(&mut self) -> Result<(), EBuildErrorKind> {
        self.fix();

        if self.vertices.len() < 3 {
            return Err(EBuildErrorKind::TooFewVertices);
        }

        if self.normal == FVector::new(0.0, 0.0, 0.0) {
            self.calc_normal()?;
        }
        self.base = self.vertices[0];

        // If texture U and V coordinates weren't specified, generate them.
        if self.texture_u == FVector::new(0.0, 0.0, 0.0) && self.texture_v == FVector::new(0.0, 0.0, 0.0) {
            for i in 1..self.vertices.len() {
                self.texture_u = safe_normal((self.vertices[0] - self.vertices[i]).cross(self.normal));
                self.texture_v = safe_normal(self.normal.cross(self.texture_u));
                if self.texture_u.magnitude2() != 0.0 && self.texture_v.magnitude2() != 0.0 {
                    break;
                }
            }
        }

        Ok(())
    }

    /// Transform an editor polygon with a coordinate system, a pre-transformation
    /// subtraction, and a post-transformation addition.
    pub fn transform(&mut self, coords: &FModelCoords, pre_subtract: &FVector, post_add: &FVector, orientation: f32) -> &mut Self {
        self.texture_u = coords.contravariant.transform_vector(&self.texture_u);
        self.texture_v = coords.contravariant.transform_vector(&self.texture_v);
        self.base = coords.covariant.transform_vector(&(self.base - pre_subtract)) + post_add;
        self.vertices.iter_mut().for_each(|vertex| {
            *vertex = coords.covariant.transform_vector(&(*vertex - pre_subtract)) + post_add;
        });
        // Flip vertex order if orientation is negative.
        if orientation < 0.0 {
            self.vertices.reverse();
        }
        // Transform normal.  Since the transformation coordinate system is
        // orthogonal but not orthonormal, it has to be renormalized here.
        self.normal = coords.contravariant.transform_vector(&self.normal).normalize();
        self
    }

}
