//! Basic procedural mesh generation routines.
use crate::mesh::SurfaceMesh;
use crate::Real;
use nalgebra::{convert, Point3, Vector3};

pub fn create_unit_square_uniform_tri_mesh_3d<T>(cells_per_dim: usize) -> SurfaceMesh<T>
where
    T: Real,
{
    create_rectangular_uniform_tri_mesh_3d(T::one(), 1, 1, cells_per_dim, &Point3::origin())
}

/// Generates a uniform triangulation of an axis-aligned rectangle in the `z = 0` plane given a
/// unit length, dimensions as multipliers of the unit length and the number of cells per unit
/// length.
///
/// Each square cell is split into two triangles along its diagonal. All triangles are oriented
/// so that their normals point in the positive z direction. Vertex `(i, j)` of the grid has
/// index `j * (num_cells_x + 1) + i` and position `origin + (i * h, j * h, 0)`.
pub fn create_rectangular_uniform_tri_mesh_3d<T>(
    unit_length: T,
    units_x: usize,
    units_y: usize,
    cells_per_unit: usize,
    origin: &Point3<T>,
) -> SurfaceMesh<T>
where
    T: Real,
{
    if cells_per_unit == 0 || units_x == 0 || units_y == 0 {
        return SurfaceMesh {
            vertices: Vec::new(),
            faces: Vec::new(),
        };
    }

    let cell_size = unit_length / convert::<_, T>(cells_per_unit as f64);
    let num_cells_x = units_x * cells_per_unit;
    let num_cells_y = units_y * cells_per_unit;
    let num_vertices_x = num_cells_x + 1;
    let num_vertices_y = num_cells_y + 1;

    let to_global_vertex_index = |i, j| num_vertices_x * j + i;

    let mut vertices = Vec::with_capacity(num_vertices_x * num_vertices_y);
    for j in 0..num_vertices_y {
        for i in 0..num_vertices_x {
            let i_as_t: T = convert(i as f64);
            let j_as_t: T = convert(j as f64);
            vertices.push(origin + Vector3::new(i_as_t, j_as_t, T::zero()) * cell_size);
        }
    }

    let mut faces = Vec::with_capacity(2 * num_cells_x * num_cells_y);
    for j in 0..num_cells_y {
        for i in 0..num_cells_x {
            let v00 = to_global_vertex_index(i, j);
            let v10 = to_global_vertex_index(i + 1, j);
            let v11 = to_global_vertex_index(i + 1, j + 1);
            let v01 = to_global_vertex_index(i, j + 1);
            faces.push([v00, v10, v11]);
            faces.push([v00, v11, v01]);
        }
    }

    SurfaceMesh { vertices, faces }
}

/// Generates an open cylinder around the z axis, with its base in the `z = 0` plane.
///
/// The cylinder has `cells_around` vertices on each of its `cells_along + 1` rings. The
/// triangles are oriented so that their normals point away from the axis.
///
/// # Panics
///
/// Panics if `cells_around < 3` or `cells_along == 0`.
pub fn create_cylinder_tri_mesh_3d<T>(radius: T, height: T, cells_around: usize, cells_along: usize) -> SurfaceMesh<T>
where
    T: Real,
{
    assert!(cells_around >= 3, "A cylinder needs at least three cells around its axis.");
    assert!(cells_along > 0, "A cylinder needs at least one cell along its axis.");

    let to_global_vertex_index = |i: usize, j: usize| cells_around * j + (i % cells_around);

    let mut vertices = Vec::with_capacity(cells_around * (cells_along + 1));
    for j in 0..=cells_along {
        let z = height * convert::<_, T>(j as f64 / cells_along as f64);
        for i in 0..cells_around {
            let theta = T::two_pi() * convert::<_, T>(i as f64 / cells_around as f64);
            vertices.push(Point3::new(radius * theta.cos(), radius * theta.sin(), z));
        }
    }

    let mut faces = Vec::with_capacity(2 * cells_around * cells_along);
    for j in 0..cells_along {
        for i in 0..cells_around {
            let a = to_global_vertex_index(i, j);
            let b = to_global_vertex_index(i + 1, j);
            let c = to_global_vertex_index(i + 1, j + 1);
            let d = to_global_vertex_index(i, j + 1);
            faces.push([a, b, c]);
            faces.push([a, c, d]);
        }
    }

    SurfaceMesh { vertices, faces }
}
