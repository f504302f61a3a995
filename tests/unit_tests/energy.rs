use crate::unit_square_two_triangles;
use akvf::energy::face_energy;
use akvf::field::DisplacementField;
use akvf::gradient::build_gradient;
use akvf::killing::assemble_killing_operator;
use akvf::proptest::{cylinder_mesh, displacement_field};
use matrixcompare::assert_scalar_eq;
use nalgebra::Vector3;
use proptest::prelude::*;

#[test]
fn face_energy_unit_square() {
    let mesh = unit_square_two_triangles();
    let killing = assemble_killing_operator(&build_gradient(&mesh).unwrap());

    // Shear u = (y, 0, 0): J_xy = 1 everywhere, so only row block 3 is non-zero with value sqrt(2)
    let field = DisplacementField::from_displacements(mesh.vertices().iter().map(|p| Vector3::new(p.y, 0.0, 0.0)).collect());
    let energies = face_energy(&killing, &field);
    assert_eq!(energies.len(), 2);
    assert_scalar_eq!(energies[0], 2.0, comp = abs, tol = 1e-12);
    assert_scalar_eq!(energies[1], 2.0, comp = abs, tol = 1e-12);
}

#[test]
fn face_energy_of_zero_field_is_zero() {
    let mesh = unit_square_two_triangles();
    let killing = assemble_killing_operator(&build_gradient(&mesh).unwrap());
    let energies = face_energy(&killing, &DisplacementField::zeros(4));
    assert_eq!(energies, vec![0.0, 0.0]);
}

#[test]
#[should_panic]
fn face_energy_requires_matching_field() {
    let mesh = unit_square_two_triangles();
    let killing = assemble_killing_operator(&build_gradient(&mesh).unwrap());
    face_energy(&killing, &DisplacementField::zeros(3));
}

proptest! {
    #[test]
    fn face_energy_is_idempotent_and_sums_to_total_energy(
        (mesh, field) in cylinder_mesh().prop_flat_map(|mesh| {
            let field = displacement_field(&mesh);
            (Just(mesh), field)
        })
    ) {
        let killing = assemble_killing_operator(&build_gradient(&mesh).unwrap());
        let energies = face_energy(&killing, &field);
        prop_assert_eq!(energies.len(), mesh.num_faces());
        prop_assert!(energies.iter().all(|&e| e >= 0.0));

        // Repeated evaluation is bit-identical
        prop_assert_eq!(&face_energy(&killing, &field), &energies);

        let total: f64 = energies.iter().sum();
        let expected = killing.energy(&field);
        prop_assert!((total - expected).abs() <= 1e-10 * (1.0 + expected));
    }
}
