use crate::unit_square_two_triangles;
use akvf::field::{rigid_motion_field, DisplacementField};
use akvf::gradient::build_gradient;
use akvf::killing::assemble_killing_operator;
use akvf::mesh::procedural::create_unit_square_uniform_tri_mesh_3d;
use akvf::proptest::{cylinder_mesh, rectangular_grid_mesh, vector3};
use matrixcompare::{assert_matrix_eq, assert_scalar_eq};
use nalgebra::{DMatrix, Vector3};
use proptest::prelude::*;
use std::f64::consts::SQRT_2;

#[test]
fn killing_operator_block_layout() {
    let gradient = build_gradient(&unit_square_two_triangles()).unwrap();
    let killing = assemble_killing_operator(&gradient);
    let (m, n) = (2, 4);
    assert_eq!(killing.num_faces(), m);
    assert_eq!(killing.num_vertices(), n);

    let p = DMatrix::from(killing.matrix());
    assert_eq!(p.shape(), (6 * m, 3 * n));

    let gx = DMatrix::from(gradient.gx());
    let gy = DMatrix::from(gradient.gy());
    let gz = DMatrix::from(gradient.gz());

    let mut expected = DMatrix::zeros(6 * m, 3 * n);
    let mut set_block = |row_block: usize, col_block: usize, block: DMatrix<f64>| {
        expected
            .view_mut((row_block * m, col_block * n), (m, n))
            .copy_from(&block);
    };
    set_block(0, 0, &gx * 2.0);
    set_block(1, 1, &gy * 2.0);
    set_block(2, 2, &gz * 2.0);
    set_block(3, 0, &gy * SQRT_2);
    set_block(3, 1, &gx * SQRT_2);
    set_block(4, 0, &gz * SQRT_2);
    set_block(4, 2, &gx * SQRT_2);
    set_block(5, 1, &gz * SQRT_2);
    set_block(5, 2, &gy * SQRT_2);

    assert_matrix_eq!(p, expected, comp = abs, tol = 1e-14);
}

#[test]
fn killing_energy_of_uniform_stretch() {
    let mesh = create_unit_square_uniform_tri_mesh_3d(3);
    let killing = assemble_killing_operator(&build_gradient(&mesh).unwrap());

    // u = (s x, 0, 0) has J_xx = s on every face, which gives (2 s)^2 per face
    let s = 0.3;
    let field = DisplacementField::from_displacements(
        mesh.vertices()
            .iter()
            .map(|p| Vector3::new(s * p.x, 0.0, 0.0))
            .collect(),
    );
    let expected_energy = 4.0 * s * s * mesh.num_faces() as f64;
    assert_scalar_eq!(killing.energy(&field), expected_energy, comp = abs, tol = 1e-12);
}

#[test]
fn killing_energy_of_out_of_plane_rotation() {
    // The gradient operator only captures tangential derivatives, so a rotation about an
    // in-plane axis is not in the null space of P. For u = w e_x × p = (0, -w z, w y) on a
    // mesh in the z = 0 plane, only row block 5 is non-zero with value sqrt(2) w per face.
    let mesh = create_unit_square_uniform_tri_mesh_3d(2);
    let killing = assemble_killing_operator(&build_gradient(&mesh).unwrap());

    let w = 0.5;
    let field = rigid_motion_field(mesh.vertices(), &Vector3::zeros(), &Vector3::new(w, 0.0, 0.0));
    let expected_energy = 2.0 * w * w * mesh.num_faces() as f64;
    assert_scalar_eq!(killing.energy(&field), expected_energy, comp = abs, tol = 1e-12);
}

#[test]
fn killing_apply_matches_matrix_product() {
    let mesh = unit_square_two_triangles();
    let killing = assemble_killing_operator(&build_gradient(&mesh).unwrap());
    let field = DisplacementField::from_displacements(vec![
        Vector3::new(1.0, 0.0, 0.5),
        Vector3::new(-1.0, 2.0, 0.0),
        Vector3::new(0.0, 0.5, 1.0),
        Vector3::new(0.25, -0.5, 3.0),
    ]);

    let px = killing.apply(&field);
    let expected = DMatrix::from(killing.matrix()) * field.flatten();
    assert_matrix_eq!(px, expected, comp = abs, tol = 1e-12);
    assert_scalar_eq!(killing.energy(&field), expected.norm_squared(), comp = abs, tol = 1e-12);
}

proptest! {
    #[test]
    fn translations_have_zero_killing_energy(mesh in cylinder_mesh(), t in vector3()) {
        let killing = assemble_killing_operator(&build_gradient(&mesh).unwrap());
        let field = rigid_motion_field(mesh.vertices(), &t, &Vector3::zeros());
        prop_assert!(killing.energy(&field) <= 1e-16);
    }

    #[test]
    fn in_plane_rigid_motions_have_zero_killing_energy(
        mesh in rectangular_grid_mesh(),
        t in vector3(),
        w in -2.0 .. 2.0f64,
    ) {
        let killing = assemble_killing_operator(&build_gradient(&mesh).unwrap());
        let field = rigid_motion_field(mesh.vertices(), &t, &Vector3::new(0.0, 0.0, w));
        prop_assert!(killing.energy(&field) <= 1e-16);
    }
}
