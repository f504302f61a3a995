use crate::field::DisplacementField;
use crate::mesh::procedural::{create_cylinder_tri_mesh_3d, create_rectangular_uniform_tri_mesh_3d};
use crate::mesh::SurfaceMesh;
use ::proptest::prelude::*;
use nalgebra::{Point3, Vector3};

pub use crate::geometry::proptest::{point3, vector3};

/// Planar rectangular grids of varying size and resolution, lying in the `z = 0` plane.
pub fn rectangular_grid_mesh() -> impl Strategy<Value = SurfaceMesh<f64>> {
    let unit_length = 0.5..2.0;
    let units = 1usize..=3;
    let cells_per_unit = 1usize..=3;
    (unit_length, units.clone(), units, cells_per_unit, point3()).prop_map(
        |(unit_length, units_x, units_y, cells_per_unit, origin)| {
            let origin = Point3::new(origin.x, origin.y, 0.0);
            create_rectangular_uniform_tri_mesh_3d(unit_length, units_x, units_y, cells_per_unit, &origin)
        },
    )
}

/// Open cylinders around the z axis of varying radius, height and resolution.
pub fn cylinder_mesh() -> impl Strategy<Value = SurfaceMesh<f64>> {
    (0.5..2.0, 0.5..2.0, 3usize..=10, 1usize..=4).prop_map(|(radius, height, cells_around, cells_along)| {
        create_cylinder_tri_mesh_3d(radius, height, cells_around, cells_along)
    })
}

/// Arbitrary displacement fields on the given mesh.
pub fn displacement_field(mesh: &SurfaceMesh<f64>) -> impl Strategy<Value = DisplacementField<f64>> {
    let range = -1.0..1.0;
    prop::collection::vec([range.clone(), range.clone(), range], mesh.num_vertices())
        .prop_map(|vectors| DisplacementField::from_displacements(vectors.into_iter().map(Vector3::from).collect()))
}
