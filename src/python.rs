use std::collections::HashSet;
use std::str::FromStr;

use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;

use crate::brush::ABrush;
use crate::config::{BuildOptions, EBspOptimization};
use crate::csg::{ECsgOper, ULevel};
use crate::error::{self, BspError};
use crate::fpoly::{poly_flags_from_names, FPoly};
use crate::math::FVector;
use crate::model::{FBspNode, FBspSurf, FVert, UModel};

impl From<BspError> for PyErr {
    fn from(error: BspError) -> Self {
        PyValueError::new_err(error.to_string())
    }
}

fn to_tuple(v: &FVector) -> (f32, f32, f32) {
    (v.x, v.y, v.z)
}

#[pyclass]
#[derive(Clone, Debug)]
struct Poly {
    #[pyo3(get)]
    vertices: Vec<(f32, f32, f32)>,
}

#[pymethods]
impl Poly {
    #[new]
    fn new(vertices: Vec<(f32, f32, f32)>) -> Self {
        Poly { vertices }
    }
}

impl From<&Poly> for FPoly {
    fn from(poly: &Poly) -> Self {
        let vertices: Vec<FVector> = poly.vertices.iter().map(|(x, y, z)| FVector::new(*x, *y, *z)).collect();
        FPoly::from_vertices(&vertices)
    }
}

impl From<&FPoly> for Poly {
    fn from(poly: &FPoly) -> Self {
        Poly { vertices: poly.vertices.iter().map(to_tuple).collect() }
    }
}

#[pyclass]
struct Brush {
    polys: Vec<Poly>,
    poly_flags: HashSet<String>,
    csg_operation: String,
    location: (f32, f32, f32),
}

#[pymethods]
impl Brush {
    #[new]
    #[pyo3(signature = (polys, poly_flags, csg_operation, location=(0.0, 0.0, 0.0)))]
    fn new(polys: Vec<PyRef<Poly>>, poly_flags: HashSet<String>, csg_operation: &str, location: (f32, f32, f32)) -> PyResult<Self> {
        // Reject bad input here rather than halfway through a rebuild.
        ECsgOper::from_str(csg_operation)?;
        poly_flags_from_names(&poly_flags)?;

        let polys: Vec<Poly> = polys.iter().map(|poly| (**poly).clone()).collect();
        Ok(Brush { polys, poly_flags, csg_operation: csg_operation.to_string(), location })
    }
}

impl TryFrom<&Brush> for ABrush {
    type Error = BspError;

    fn try_from(brush: &Brush) -> Result<Self, Self::Error> {
        let polys: Vec<FPoly> = brush.polys.iter().map(FPoly::from).collect();
        let (x, y, z) = brush.location;
        Ok(ABrush::new_from_polys(&polys, ECsgOper::from_str(&brush.csg_operation)?)
            .with_location(FVector::new(x, y, z))
            .with_poly_flags(poly_flags_from_names(&brush.poly_flags)?))
    }
}

#[pyclass]
#[derive(Clone, Debug)]
struct BspSurface {
    #[pyo3(get)]
    pub poly_flags: u32,
    #[pyo3(get)]
    pub normal: (f32, f32, f32),
    #[pyo3(get)]
    pub brush_polygon_index: Option<usize>,
    #[pyo3(get)]
    pub node_indices: Vec<u32>,
}

impl BspSurface {
    fn new(model: &UModel, surface: &FBspSurf) -> Self {
        BspSurface {
            poly_flags: surface.poly_flags.bits(),
            normal: to_tuple(&model.vectors[surface.normal_index as usize]),
            brush_polygon_index: surface.brush_polygon_index,
            node_indices: surface.node_indices.clone(),
        }
    }
}

#[pyclass]
#[derive(Clone, Copy, Debug)]
struct Vertex {
    #[pyo3(get)]
    pub vertex_index: u32,
}

impl From<&FVert> for Vertex {
    fn from(vert: &FVert) -> Self {
        Vertex { vertex_index: vert.vertex_index }
    }
}

#[pyclass]
#[derive(Clone, Copy, Debug)]
struct BspNode {
    #[pyo3(get)]
    pub vertex_pool_index: u32,
    #[pyo3(get)]
    pub vertex_count: u32,
    #[pyo3(get)]
    pub surface_index: u32,
    #[pyo3(get)]
    pub front_node_index: Option<u32>,
    #[pyo3(get)]
    pub back_node_index: Option<u32>,
    #[pyo3(get)]
    pub plane_index: Option<u32>,
}

impl From<&FBspNode> for BspNode {
    fn from(node: &FBspNode) -> Self {
        BspNode {
            vertex_pool_index: node.vertex_pool_index,
            vertex_count: node.vertex_count,
            surface_index: node.surface_index,
            front_node_index: node.front_node_index,
            back_node_index: node.back_node_index,
            plane_index: node.plane_index,
        }
    }
}

#[pyclass]
#[derive(Clone, Debug)]
struct BuildReport {
    /// Recoverable geometry problems hit while building.
    #[pyo3(get)]
    pub errors: Vec<String>,
    #[pyo3(get)]
    pub dropped_fragment_count: u32,
}

impl From<&error::BuildReport> for BuildReport {
    fn from(report: &error::BuildReport) -> Self {
        BuildReport {
            errors: report.errors.iter().map(|error| error.to_string()).collect(),
            dropped_fragment_count: report.dropped_fragment_count,
        }
    }
}

#[pyclass]
struct Model {
    #[pyo3(get)]
    pub points: Vec<(f32, f32, f32)>,
    #[pyo3(get)]
    pub nodes: Vec<BspNode>,
    #[pyo3(get)]
    pub surfaces: Vec<BspSurface>,
    #[pyo3(get)]
    pub vertices: Vec<Vertex>,
    #[pyo3(get)]
    pub polys: Vec<Poly>,
    #[pyo3(get)]
    pub report: BuildReport,
}

impl Model {
    fn new(model: &UModel, report: &error::BuildReport) -> Self {
        Model {
            points: model.points.iter().map(to_tuple).collect(),
            nodes: model.nodes.iter().map(BspNode::from).collect(),
            surfaces: model.surfaces.iter().map(|surface| BspSurface::new(model, surface)).collect(),
            vertices: model.vertices.iter().map(Vertex::from).collect(),
            polys: model.polys().iter().map(Poly::from).collect(),
            report: BuildReport::from(report),
        }
    }
}

fn parse_quality(quality: &str) -> PyResult<EBspOptimization> {
    match quality {
        "LAME" => Ok(EBspOptimization::Lame),
        "GOOD" => Ok(EBspOptimization::Good),
        "OPTIMAL" => Ok(EBspOptimization::Optimal),
        _ => Err(PyValueError::new_err(format!("unknown BSP optimization: {}", quality))),
    }
}

/// Rebuild level geometry from an ordered list of brushes.
#[pyfunction]
#[pyo3(signature = (brushes, quality="OPTIMAL", balance=15, portal_bias=70))]
fn csg_rebuild(brushes: Vec<PyRef<Brush>>, quality: &str, balance: u8, portal_bias: u8) -> PyResult<Model> {
    let options = BuildOptions::new(parse_quality(quality)?, balance, portal_bias);

    let brushes = brushes.iter()
        .map(|brush| ABrush::try_from(&**brush))
        .collect::<Result<Vec<ABrush>, BspError>>()?;

    let mut level = ULevel::new(brushes);
    let report = crate::csg::csg_rebuild(&mut level, &options)?;

    Ok(Model::new(&level.model, &report))
}

#[pymodule]
fn bdk_bsp(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<Poly>()?;
    m.add_class::<Brush>()?;
    m.add_class::<Model>()?;
    m.add_class::<Vertex>()?;
    m.add_class::<BspSurface>()?;
    m.add_class::<BspNode>()?;
    m.add_class::<BuildReport>()?;
    m.add_function(wrap_pyfunction!(csg_rebuild, m)?)?;
    Ok(())
}
