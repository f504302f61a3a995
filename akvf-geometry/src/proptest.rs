use crate::Triangle3d;
use nalgebra::{Point3, Vector3};
use proptest::prelude::*;

pub fn point3() -> impl Strategy<Value = Point3<f64>> {
    // Pick a reasonably small range to pick coordinates from,
    // otherwise we can easily get floating point numbers that are
    // so ridiculously large as to break anything we might want to do with them
    let range = -10.0..10.0;
    [range.clone(), range.clone(), range.clone()].prop_map(|[x, y, z]| Point3::new(x, y, z))
}

pub fn vector3() -> impl Strategy<Value = Vector3<f64>> {
    point3().prop_map(|p| p.coords)
}

impl Arbitrary for Triangle3d<f64> {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_args: Self::Parameters) -> Self::Strategy {
        [point3(), point3(), point3()]
            .prop_map(Triangle3d)
            .boxed()
    }
}

/// A strategy for triangles whose quality (see [`Triangle3d::quality`]) is bounded
/// away from zero, so that hat function gradients are well conditioned.
pub fn nondegenerate_triangle3d_strategy_f64() -> impl Strategy<Value = Triangle3d<f64>> {
    any::<Triangle3d<f64>>().prop_filter("triangle must not be close to degenerate", |triangle| {
        triangle.quality() > 0.05
    })
}
