#![allow(dead_code)]

use bdk_bsp::fpoly::{EPolyFlags, FPoly};
use bdk_bsp::math::FVector;

/// Route `log` output through the test harness.
pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Create the six faces of an axis-aligned cube, normals pointing outwards.
pub fn create_cube_polys(origin: FVector, size: f32) -> Vec<FPoly> {
    create_cube_polys_with_poly_flags(origin, size, EPolyFlags::empty())
}

pub fn create_cube_polys_with_poly_flags(origin: FVector, size: f32, poly_flags: EPolyFlags) -> Vec<FPoly> {
    let h = size / 2.0;
    // Bit 0 picks +x, bit 1 picks +y, bit 2 picks +z.
    let vertices = (0..8)
        .map(|i| origin + FVector::new(
            if i & 1 != 0 { h } else { -h },
            if i & 2 != 0 { h } else { -h },
            if i & 4 != 0 { h } else { -h },
        ))
        .collect::<Vec<FVector>>();

    let poly_vertex_indices: [[usize; 4]; 6] = [
        [0, 2, 3, 1],   // -z
        [4, 5, 7, 6],   // +z
        [0, 1, 5, 4],   // -y
        [2, 6, 7, 3],   // +y
        [0, 4, 6, 2],   // -x
        [1, 3, 7, 5],   // +x
    ];

    poly_vertex_indices.iter().map(|indices| {
        let mut poly = FPoly::from_vertices(&indices.iter().map(|i| vertices[*i]).collect::<Vec<FVector>>());
        poly.poly_flags = poly_flags;
        poly
    }).collect()
}

/// A `width` x `height` grid of unit squares in the z=0 plane, facing +z.
pub fn create_quad_grid(width: usize, height: usize) -> Vec<FPoly> {
    let mut polys: Vec<FPoly> = Vec::new();
    for y in 0..height {
        for x in 0..width {
            polys.push(FPoly::from_vertices(&[
                FVector::new(x as f32, y as f32, 0.0),
                FVector::new((x + 1) as f32, y as f32, 0.0),
                FVector::new((x + 1) as f32, (y + 1) as f32, 0.0),
                FVector::new(x as f32, (y + 1) as f32, 0.0),
            ]));
        }
    }
    polys
}

/// A square of side `size` in the plane z = `z`, with its low corner at (x, y).
pub fn create_square(x: f32, y: f32, z: f32, size: f32) -> FPoly {
    FPoly::from_vertices(&[
        FVector::new(x, y, z),
        FVector::new(x + size, y, z),
        FVector::new(x + size, y + size, z),
        FVector::new(x, y + size, z),
    ])
}

pub fn total_area(polys: &[FPoly]) -> f32 {
    polys.iter().map(|poly| poly.area()).sum()
}
