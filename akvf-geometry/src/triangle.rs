use nalgebra::{Point3, RealField, Scalar, Vector3};
use numeric_literals::replace_float_literals;
use serde::{Deserialize, Serialize};

/// A triangle in three dimensions, consisting of three vertices.
///
/// The winding order `a -> b -> c` determines the direction of the normal through the
/// right-hand rule.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound(
    serialize = "Point3<T>: Serialize",
    deserialize = "Point3<T>: Deserialize<'de>"
))]
pub struct Triangle3d<T: Scalar>(pub [Point3<T>; 3]);

impl<T: Scalar> Triangle3d<T> {
    pub fn from_vertices(vertices: [Point3<T>; 3]) -> Self {
        Self(vertices)
    }

    pub fn vertices(&self) -> &[Point3<T>; 3] {
        &self.0
    }

    pub fn swap_vertices(&mut self, i: usize, j: usize) {
        self.0.swap(i, j);
    }
}

impl<T: RealField> Triangle3d<T> {
    #[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T."))]
    pub fn centroid(&self) -> Point3<T> {
        let [a, b, c] = &self.0;
        Point3::from((&a.coords + &b.coords + &c.coords) / 3.0)
    }

    /// Returns an array of vectors corresponding to the three sides of the triangle.
    ///
    /// Side `i` connects vertex `i` to vertex `(i + 1) % 3`.
    pub fn sides(&self) -> [Vector3<T>; 3] {
        let [a, b, c] = &self.0;
        [b - a, c - b, a - c]
    }

    /// Returns a vector normal to the triangle. The vector is *not* normalized.
    ///
    /// Its length is twice the area of the triangle.
    pub fn normal_dir(&self) -> Vector3<T> {
        let [a, b, c] = &self.0;
        let ab = b - a;
        let ac = c - a;
        ab.cross(&ac)
    }

    pub fn normal(&self) -> Vector3<T> {
        self.normal_dir().normalize()
    }

    #[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T."))]
    pub fn area(&self) -> T {
        0.5 * self.normal_dir().norm()
    }

    pub fn longest_side_squared(&self) -> T {
        self.sides()
            .iter()
            .map(|side| side.norm_squared())
            .fold(T::zero(), |a, b| a.max(b))
    }

    /// A scale-invariant measure of how far the triangle is from collapsing.
    ///
    /// Computed as twice the area divided by the squared length of the longest side. The
    /// measure is zero for triangles collapsed to a line or a point, and attains its maximum
    /// value of `sqrt(3) / 2` for equilateral triangles.
    pub fn quality(&self) -> T {
        let longest = self.longest_side_squared();
        if longest == T::zero() {
            T::zero()
        } else {
            self.normal_dir().norm() / longest
        }
    }

    /// Gradients of the three linear hat functions associated with the vertices.
    ///
    /// The gradient of the hat function of vertex `a` is `N x (c - b) / |N|^2`, where `N` is
    /// the (unnormalized) normal, and correspondingly for `b` and `c` by cyclic permutation.
    /// The gradients lie in the plane of the triangle and sum to zero.
    ///
    /// Returns `None` if the triangle has zero area.
    pub fn hat_function_gradients(&self) -> Option<[Vector3<T>; 3]> {
        let n = self.normal_dir();
        let n_norm2 = n.norm_squared();
        if n_norm2 == T::zero() {
            return None;
        }

        let [a, b, c] = &self.0;
        let grad_a = n.cross(&(c - b)) / n_norm2.clone();
        let grad_b = n.cross(&(a - c)) / n_norm2.clone();
        let grad_c = n.cross(&(b - a)) / n_norm2;
        Some([grad_a, grad_b, grad_c])
    }
}
