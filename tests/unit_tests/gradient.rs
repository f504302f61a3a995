use crate::unit_square_two_triangles;
use akvf::error::{AkvfError, InvalidMeshKind};
use akvf::gradient::{build_gradient, build_gradient_with_tolerance};
use akvf::mesh::procedural::create_cylinder_tri_mesh_3d;
use akvf::mesh::SurfaceMesh;
use akvf::proptest::{rectangular_grid_mesh, vector3};
use matrixcompare::assert_matrix_eq;
use nalgebra::{DMatrix, DVector, Vector3};
use proptest::prelude::*;

#[test]
fn gradient_single_right_triangle() {
    let mesh = SurfaceMesh::try_from_raw(&[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]], &[[0, 1, 2]]).unwrap();
    let gradient = build_gradient(&mesh).unwrap();
    assert_eq!(gradient.num_faces(), 1);
    assert_eq!(gradient.num_vertices(), 3);

    // phi_0 = 1 - x - y, phi_1 = x, phi_2 = y
    let gx = DMatrix::from(gradient.gx());
    let gy = DMatrix::from(gradient.gy());
    let gz = DMatrix::from(gradient.gz());
    assert_matrix_eq!(gx, DMatrix::from_row_slice(1, 3, &[-1.0, 1.0, 0.0]), comp = abs, tol = 1e-14);
    assert_matrix_eq!(gy, DMatrix::from_row_slice(1, 3, &[-1.0, 0.0, 1.0]), comp = abs, tol = 1e-14);
    assert_matrix_eq!(gz, DMatrix::zeros(1, 3), comp = abs, tol = 1e-14);
}

#[test]
fn gradient_unit_square() {
    let gradient = build_gradient(&unit_square_two_triangles()).unwrap();

    // Face 0 = (0, 1, 2): phi_0 = 1 - x, phi_1 = x - y, phi_2 = y
    // Face 1 = (0, 2, 3): phi_0 = 1 - y, phi_2 = x, phi_3 = y - x
    #[rustfmt::skip]
    let gx_expected = DMatrix::from_row_slice(2, 4, &[
        -1.0, 1.0, 0.0, 0.0,
        0.0, 0.0, 1.0, -1.0,
    ]);
    #[rustfmt::skip]
    let gy_expected = DMatrix::from_row_slice(2, 4, &[
        0.0, -1.0, 1.0, 0.0,
        -1.0, 0.0, 0.0, 1.0,
    ]);
    assert_matrix_eq!(DMatrix::from(gradient.gx()), gx_expected, comp = abs, tol = 1e-14);
    assert_matrix_eq!(DMatrix::from(gradient.gy()), gy_expected, comp = abs, tol = 1e-14);
    assert_matrix_eq!(DMatrix::from(gradient.gz()), DMatrix::zeros(2, 4), comp = abs, tol = 1e-14);
}

#[test]
fn gradient_stacked_operator() {
    let gradient = build_gradient(&unit_square_two_triangles()).unwrap();
    let stacked = DMatrix::from(&gradient.to_stacked());
    assert_eq!(stacked.shape(), (6, 4));

    for axis in 0..3 {
        let component = DMatrix::from(gradient.component(axis));
        assert_matrix_eq!(stacked.rows(2 * axis, 2), component, comp = abs, tol = 0.0);
    }
}

#[test]
fn gradient_rejects_degenerate_face() {
    let mesh = SurfaceMesh::try_from_raw(
        &[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [2.0, 0.0, 0.0]],
        &[[0, 1, 2], [0, 1, 3]],
    )
    .unwrap();
    let result = build_gradient(&mesh);
    assert!(matches!(
        result,
        Err(AkvfError::InvalidMesh(InvalidMeshKind::DegenerateFace { face: 1 }))
    ));
}

#[test]
fn gradient_tolerance_rejects_slivers() {
    // A very flat but non-degenerate triangle
    let mesh = SurfaceMesh::try_from_raw(&[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.5, 1e-6, 0.0]], &[[0, 1, 2]]).unwrap();
    assert!(build_gradient(&mesh).is_ok());
    assert!(matches!(
        build_gradient_with_tolerance(&mesh, 1e-3),
        Err(AkvfError::InvalidMesh(InvalidMeshKind::DegenerateFace { face: 0 }))
    ));
}

#[test]
fn gradient_cylinder_height_function() {
    let mesh = create_cylinder_tri_mesh_3d(1.5, 2.0, 10, 3);
    let gradient = build_gradient(&mesh).unwrap();

    // Every face contains a vertical edge, so the gradient of the height is exactly the z axis
    let heights = DVector::from_iterator(mesh.num_vertices(), mesh.vertices().iter().map(|p| p.z));
    for face_gradient in gradient.apply(&heights) {
        assert_matrix_eq!(face_gradient, Vector3::new(0.0, 0.0, 1.0), comp = abs, tol = 1e-12);
    }

    // Gradients of constant functions vanish
    let ones = DVector::repeat(mesh.num_vertices(), 1.0);
    for face_gradient in gradient.apply(&ones) {
        assert_matrix_eq!(face_gradient, Vector3::zeros(), comp = abs, tol = 1e-12);
    }
}

#[test]
fn gradient_of_empty_mesh() {
    let mesh = SurfaceMesh::<f64>::try_from_raw(&[], &[]).unwrap();
    let gradient = build_gradient(&mesh).unwrap();
    assert_eq!(gradient.num_faces(), 0);
    assert_eq!(gradient.num_vertices(), 0);
    assert!(gradient.apply(&DVector::zeros(0)).is_empty());
}

proptest! {
    #[test]
    fn gradient_reproduces_linear_functions_on_planar_grids(
        mesh in rectangular_grid_mesh(),
        a in vector3(),
        c in -10.0 .. 10.0f64,
    ) {
        let gradient = build_gradient(&mesh).unwrap();
        let values = DVector::from_iterator(
            mesh.num_vertices(),
            mesh.vertices().iter().map(|p| a.dot(&p.coords) + c),
        );

        // Only the tangential part of the gradient is seen by the operator
        let expected = Vector3::new(a.x, a.y, 0.0);
        for face_gradient in gradient.apply(&values) {
            prop_assert!((face_gradient - expected).norm() <= 1e-9 * (1.0 + a.norm()));
        }
    }
}
