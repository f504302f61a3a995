use akvf::field::{block_major_index, flatten_vectors, rigid_motion_field, unflatten_vectors, DisplacementField};
use akvf::mesh::procedural::create_unit_square_uniform_tri_mesh_3d;
use akvf::proptest::{cylinder_mesh, displacement_field};
use matrixcompare::assert_matrix_eq;
use nalgebra::{DVector, Point3, Vector3};
use proptest::prelude::*;

#[test]
fn flatten_is_column_block_major() {
    let vectors = vec![
        Vector3::new(1.0, 2.0, 3.0),
        Vector3::new(4.0, 5.0, 6.0),
        Vector3::new(7.0, 8.0, 9.0),
    ];
    let flattened = flatten_vectors(&vectors);
    let expected = DVector::from_column_slice(&[1.0, 4.0, 7.0, 2.0, 5.0, 8.0, 3.0, 6.0, 9.0]);
    assert_eq!(flattened, expected);

    for (i, v) in vectors.iter().enumerate() {
        for axis in 0..3 {
            assert_eq!(flattened[block_major_index(axis, i, 3)], v[axis]);
        }
    }

    assert_eq!(unflatten_vectors(&flattened), vectors);
}

#[test]
fn displacement_field_round_trip_with_rotation_field() {
    let mesh = create_unit_square_uniform_tri_mesh_3d(4);
    let field = rigid_motion_field(
        mesh.vertices(),
        &Vector3::new(1.0, -2.0, 0.5),
        &Vector3::new(0.0, 0.0, 0.75),
    );
    assert_eq!(field.num_vertices(), mesh.num_vertices());

    let flattened = field.flatten();
    assert_eq!(flattened.len(), 3 * mesh.num_vertices());
    assert_eq!(DisplacementField::from_flattened(&flattened), field);
}

#[test]
#[should_panic]
fn displacement_field_from_flattened_requires_multiple_of_three() {
    DisplacementField::from_flattened(&DVector::<f64>::zeros(7));
}

#[test]
fn rigid_motion_field_values() {
    let positions = [Point3::new(1.0, 0.0, 0.0), Point3::new(0.0, 2.0, 0.0), Point3::new(0.0, 0.0, 3.0)];
    let field = rigid_motion_field(&positions, &Vector3::new(1.0, 1.0, 1.0), &Vector3::new(0.0, 0.0, 1.0));
    let expected = [
        Vector3::new(1.0, 2.0, 1.0),
        Vector3::new(-1.0, 1.0, 1.0),
        Vector3::new(1.0, 1.0, 1.0),
    ];
    for (u, u_expected) in field.displacements().iter().zip(&expected) {
        assert_matrix_eq!(*u, *u_expected, comp = abs, tol = 1e-14);
    }
}

#[test]
fn displacement_field_displace_and_max_norm() {
    let positions = [Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 1.0, 1.0)];
    let field = DisplacementField::from_displacements(vec![Vector3::new(3.0, 4.0, 0.0), Vector3::new(0.0, 0.0, -1.0)]);
    let displaced = field.displace(&positions);
    assert_eq!(displaced, vec![Point3::new(3.0, 4.0, 0.0), Point3::new(1.0, 1.0, 0.0)]);
    assert_eq!(field.max_norm(), 5.0);
    assert_eq!(DisplacementField::<f64>::zeros(3).max_norm(), 0.0);
}

proptest! {
    #[test]
    fn flatten_unflatten_round_trip(field in cylinder_mesh().prop_flat_map(|mesh| displacement_field(&mesh))) {
        let flattened = field.flatten();
        prop_assert_eq!(flattened.len(), 3 * field.num_vertices());
        prop_assert_eq!(DisplacementField::from_flattened(&flattened), field);
    }
}
