use bitflags::bitflags;
use cgmath::MetricSpace;
use crate::fpoly::{EPolyFlags, FPoly};
use crate::math::{FPlane, FVector};
use crate::sphere::FSphere;
use crate::box_::FBox;
use crate::math::{THRESH_POINTS_ARE_SAME, THRESH_POINTS_ARE_NEAR, THRESH_NORMALS_ARE_SAME, THRESH_VECTORS_ARE_NEAR};

/// Flags associated with a Bsp node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EBspNodeFlags(u16);

bitflags! {
    impl EBspNodeFlags : u16 {
        /// Node is not a Csg splitter, i.e. is a transparent poly.
        const NotCsg                    = 0x0001;
        /// Can shoot through (for projectile solid ops).
        const ShootThrough              = 0x0002;
        /// Node does not block visibility, i.e. is an invisible collision hull.
        const NotVisBlocking            = 0x0004;
        /// Editor: Node was newly-added.
        const IsNew                     = 0x0020;
    }
}

/// Which of the model's representations can be trusted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EModelState {
    /// Only the flat polygon list is current; the tree is stale or absent.
    PolysOnly,
    /// The tree pools were built from (or kept in step with) the polygon list.
    TreeValid,
}

/// One Bsp polygon.  Lists all of the properties associated with the
/// polygon's plane.  Does not include a point list; the actual points
/// are stored along with Bsp nodes, since several nodes which lie in the
/// same plane may reference the same poly.
#[derive(Clone, Debug, PartialEq)]
pub struct FBspSurf {
    pub material: Option<u32>,
    pub poly_flags: EPolyFlags,
    pub base_point_index: u32,
    pub normal_index: u32,
    pub texture_u_index: u32,
    pub texture_v_index: u32,
    pub brush_polygon_index: Option<usize>,
    /// Nodes holding fragments of this surface.
    pub node_indices: Vec<u32>,
    pub plane: FPlane,
    pub light_map_scale: f32
}

impl Default for FBspSurf {
    fn default() -> Self {
        FBspSurf {
            material: None,
            poly_flags: EPolyFlags::empty(),
            base_point_index: 0,
            normal_index: 0,
            texture_u_index: 0,
            texture_v_index: 0,
            brush_polygon_index: None,
            node_indices: Vec::new(),
            plane: FPlane::new(),
            light_map_scale: 0.0
        }
    }
}

/// Max vertices in a Bsp node, pre clipping.
pub const BSP_NODE_MAX_NODE_VERTICES: usize = 16;

/// FBspNode defines one node in the Bsp, including the front and back
/// links and the polygon data itself.  A node may have 0 or 3 to MAX_NODE_VERTICES
/// vertices. If the node has zero vertices, it's only used for splitting and
/// doesn't contain a polygon (this happens when CSG discards a world poly).
///
/// If `plane_index` is `None`, a node has no coplanars.  Otherwise it is the
/// next coplanar polygon in the Bsp.  Nodes that are plane children can only
/// have plane children themselves, not fronts or backs.
#[derive(Clone, Debug, PartialEq)]
pub struct FBspNode {
    /// Plane the node falls into (X, Y, Z, W).
    pub plane: FPlane,
    /// Index of first vertex in vertex pool.
    pub vertex_pool_index: u32,
    /// Index to surface information.
    pub surface_index: u32,

    /// Index to node in back  (opposite direction as Normal).
    pub back_node_index: Option<u32>,
    /// Index to node in front (in direction of Normal).
    pub front_node_index: Option<u32>,
    /// Index to next coplanar poly in coplanar list.
    pub plane_index: Option<u32>,

    /// Bounding sphere excluding child nodes.
    pub exclusive_sphere_bound: FSphere,

    /// Number of vertices in node.
    pub vertex_count: u32,
    /// Node flags.
    pub node_flags: EBspNodeFlags,
}

impl Default for FBspNode {
    fn default() -> Self {
        Self::new()
    }
}

impl FBspNode {

    pub fn new() -> FBspNode {
        FBspNode {
            plane: FPlane::new(),
            vertex_pool_index: 0,
            surface_index: 0,
            back_node_index: None,
            front_node_index: None,
            plane_index: None,
            exclusive_sphere_bound: FSphere::default(),
            vertex_count: 0,
            node_flags: EBspNodeFlags::empty(),
        }
    }

    /// True if this node takes part in solid/empty classification.
    pub fn is_csg(&self) -> bool {
        self.vertex_count > 0 && !self.node_flags.intersects(EBspNodeFlags::IsNew | EBspNodeFlags::NotCsg)
    }

    /// Whether the given child side (`is_front`) of this node is outside,
    /// given whether the node itself sits in an outside region.
    pub fn is_child_outside(&self, is_front: bool, outside: bool) -> bool {
        if is_front {
            outside || self.is_csg()
        } else {
            outside && !self.is_csg()
        }
    }
}

/// One vertex associated with a Bsp node's polygon, as an index into the
/// model's points table.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FVert {
    pub vertex_index: u32,
}

/// A brush or level model: a flat polygon list plus the Bsp pools built from it.
#[derive(Clone, Debug, PartialEq)]
pub struct UModel {
    pub vertices: Vec<FVert>,
    pub points: Vec<FVector>,
    pub vectors: Vec<FVector>,
    pub nodes: Vec<FBspNode>,
    pub surfaces: Vec<FBspSurf>,
    pub(crate) polys: Vec<FPoly>,
    pub bounding_sphere: FSphere,
    pub bounding_box: FBox,

    /// Polys have been grouped into link sets by validation.
    pub linked: bool,
    /// Whether space outside every node is empty (brushes) or solid (levels).
    pub is_root_outside: bool,
    state: EModelState,
}

impl Default for UModel {
    fn default() -> Self {
        Self::new()
    }
}

impl UModel {
    pub fn new() -> UModel {
        UModel {
            vertices: Vec::new(),
            points: Vec::new(),
            vectors: Vec::new(),
            nodes: Vec::new(),
            surfaces: Vec::new(),
            polys: Vec::new(),
            bounding_sphere: FSphere::default(),
            bounding_box: FBox::default(),
            linked: false,
            is_root_outside: true,
            state: EModelState::PolysOnly,
        }
    }

    pub fn new_from_polys(polys: &[FPoly]) -> UModel {
        let mut model = UModel::new();
        model.polys.extend_from_slice(polys);
        model.build_bound();
        model
    }

    pub fn state(&self) -> EModelState {
        self.state
    }

    pub fn is_tree_valid(&self) -> bool {
        self.state == EModelState::TreeValid
    }

    /// Mark the tree as current. Only the builder and CSG call this.
    pub(crate) fn set_tree_valid(&mut self) {
        self.state = EModelState::TreeValid;
    }

    /// Mark the tree stale; the poly list becomes the source of truth.
    pub fn invalidate_tree(&mut self) {
        self.state = EModelState::PolysOnly;
    }

    pub fn polys(&self) -> &[FPoly] {
        &self.polys
    }

    /// Mutable access to the poly list. Editing polys invalidates the tree.
    pub fn polys_mut(&mut self) -> &mut Vec<FPoly> {
        self.invalidate_tree();
        &mut self.polys
    }

    pub fn node(&self, index: u32) -> &FBspNode {
        &self.nodes[index as usize]
    }

    pub fn node_mut(&mut self, index: u32) -> &mut FBspNode {
        &mut self.nodes[index as usize]
    }

    /// The points of a node's polygon, in ring order.
    pub fn node_points(&self, index: u32) -> impl Iterator<Item = FVector> + '_ {
        let node = self.node(index);
        let start = node.vertex_pool_index as usize;
        self.vertices[start..start + node.vertex_count as usize]
            .iter()
            .map(move |vert| self.points[vert.vertex_index as usize])
    }

    /// Empty the contents of a model.
    pub fn empty_model(&mut self, empty_surface_info: bool, empty_polys: bool) {
        self.nodes.clear();
        self.vertices.clear();

        if empty_surface_info {
            self.vectors.clear();
            self.points.clear();
            self.surfaces.clear();
        }

        if empty_polys {
            self.polys.clear();
        }

        self.invalidate_tree();
    }

    /// Build the model's bounds from its poly list.
    pub fn build_bound(&mut self) {
        self.bounding_box = FBox::default();
        for poly in &self.polys {
            self.bounding_box.add_points(&poly.vertices);
        }
        self.bounding_sphere = FSphere::from(&self.bounding_box);
    }

    /// Find the Bsp node vertex nearest to a point, within `min_radius`.
    /// Returns the distance and the point index.
    pub fn find_nearest_vertex(&self, source_point: FVector, min_radius: f32) -> Option<(f32, u32)> {
        if self.nodes.is_empty() {
            return None;
        }

        let mut min_radius = min_radius;
        let mut nearest = None;
        let mut stack = vec![0u32];

        while let Some(node_index) = stack.pop() {
            let node = self.node(node_index);
            let plane_distance = node.plane.plane_dot(source_point);

            if plane_distance > -min_radius && plane_distance <= min_radius {
                // Check this node's poly's vertices, through all coplanars.
                let mut coplanar_index = Some(node_index);
                while let Some(index) = coplanar_index {
                    let node = self.node(index);
                    let start = node.vertex_pool_index as usize;
                    for vert in &self.vertices[start..start + node.vertex_count as usize] {
                        let vertex = &self.points[vert.vertex_index as usize];
                        let distance = source_point.distance(*vertex);
                        if distance < min_radius {
                            min_radius = distance;
                            nearest = Some((distance, vert.vertex_index));
                        }
                    }
                    coplanar_index = node.plane_index;
                }
            }

            // Front is searched first, so it goes on the stack last.
            if plane_distance <= min_radius {
                stack.extend(node.back_node_index);
            }
            if plane_distance >= -min_radius {
                stack.extend(node.front_node_index);
            }
        }

        nearest
    }

    /// Add a new point to the model, merging near-duplicates, and return its index.
    pub fn bsp_add_point(&mut self, v: FVector, exact: bool) -> u32 {
        let thresh = if exact { THRESH_POINTS_ARE_SAME } else { THRESH_POINTS_ARE_NEAR };

        // Try to find a match quickly from the Bsp. This finds all potential matches
        // except for any dissociated from nodes/surfaces during a rebuild.
        match self.find_nearest_vertex(v, thresh) {
            Some((distance, vertex_index)) if distance <= thresh => vertex_index,
            _ => add_thing(&mut self.points, v, thresh, true),
        }
    }

    /// Add a new vector to the model, merging near-duplicates, and return its index.
    pub fn bsp_add_vector(&mut self, v: FVector, is_normal: bool) -> u32 {
        add_thing(&mut self.vectors, v,
            if is_normal { THRESH_NORMALS_ARE_SAME } else { THRESH_VECTORS_ARE_NEAR },
            true)
    }
}


/// Add a new vector to a table (optionally reusing a near-identical entry)
/// and return its index.
fn add_thing(vectors: &mut Vec<FVector>, v: FVector, threshold: f32, check: bool) -> u32 {
    if check {
        let found = vectors.iter().position(|table_vector| {
            (v.x - table_vector.x).abs() < threshold
                && (v.y - table_vector.y).abs() < threshold
                && (v.z - table_vector.z).abs() < threshold
        });
        if let Some(i) = found {
            return i as u32;
        }
    }
    vectors.push(v);
    (vectors.len() - 1) as u32
}
