//! Sparse least-squares solves with LSQR.
//!
//! LSQR (Paige and Saunders, 1982) solves $\min_x \norm{A x - b}_2$ using only products with
//! $A$ and $A^T$. It is algebraically equivalent to Conjugate-Gradient applied to the normal
//! equations, but numerically more reliable. When started from $x_0 = 0$, the iterates stay in
//! the row space of $A$, so that for rank-deficient problems the method converges to the
//! minimum-norm least-squares solution.
use core::fmt;
use log::debug;
use nalgebra::{ClosedAdd, ClosedMul, DMatrix, DVector, DVectorView, DVectorViewMut, RealField, Scalar};
use nalgebra_sparse::ops::serial::spmm_csr_dense;
use nalgebra_sparse::ops::Op;
use nalgebra_sparse::CsrMatrix;
use num::{One, Zero};
use std::error::Error;
use std::ops::{Deref, DerefMut};

/// A linear operator that can be applied along with its transpose.
pub trait LinearOperator<T: Scalar> {
    /// Computes `y = A x`.
    fn apply(&self, y: DVectorViewMut<T>, x: DVectorView<T>) -> Result<(), Box<dyn Error>>;

    /// Computes `y = A^T x`.
    fn apply_transpose(&self, y: DVectorViewMut<T>, x: DVectorView<T>) -> Result<(), Box<dyn Error>>;
}

impl<'a, T, A> LinearOperator<T> for &'a A
where
    T: Scalar,
    A: ?Sized + LinearOperator<T>,
{
    fn apply(&self, y: DVectorViewMut<T>, x: DVectorView<T>) -> Result<(), Box<dyn Error>> {
        <A as LinearOperator<T>>::apply(self, y, x)
    }

    fn apply_transpose(&self, y: DVectorViewMut<T>, x: DVectorView<T>) -> Result<(), Box<dyn Error>> {
        <A as LinearOperator<T>>::apply_transpose(self, y, x)
    }
}

impl<T> LinearOperator<T> for DMatrix<T>
where
    T: Scalar + Zero + One + ClosedMul + ClosedAdd,
{
    fn apply(&self, mut y: DVectorViewMut<T>, x: DVectorView<T>) -> Result<(), Box<dyn Error>> {
        y.gemv(T::one(), self, &x, T::zero());
        Ok(())
    }

    fn apply_transpose(&self, mut y: DVectorViewMut<T>, x: DVectorView<T>) -> Result<(), Box<dyn Error>> {
        y.gemv_tr(T::one(), self, &x, T::zero());
        Ok(())
    }
}

impl<T> LinearOperator<T> for CsrMatrix<T>
where
    T: Scalar + Zero + One + ClosedMul + ClosedAdd,
{
    fn apply(&self, mut y: DVectorViewMut<T>, x: DVectorView<T>) -> Result<(), Box<dyn Error>> {
        spmm_csr_dense(T::zero(), &mut y, T::one(), Op::NoOp(self), Op::NoOp(&x));
        Ok(())
    }

    fn apply_transpose(&self, mut y: DVectorViewMut<T>, x: DVectorView<T>) -> Result<(), Box<dyn Error>> {
        spmm_csr_dense(T::zero(), &mut y, T::one(), Op::Transpose(self), Op::NoOp(&x));
        Ok(())
    }
}

pub struct IdentityOperator;

impl<T: Scalar> LinearOperator<T> for IdentityOperator {
    fn apply(&self, mut y: DVectorViewMut<T>, x: DVectorView<T>) -> Result<(), Box<dyn Error>> {
        y.copy_from(&x);
        Ok(())
    }

    fn apply_transpose(&self, mut y: DVectorViewMut<T>, x: DVectorView<T>) -> Result<(), Box<dyn Error>> {
        y.copy_from(&x);
        Ok(())
    }
}

/// Quantities estimated by LSQR at the end of each iteration.
///
/// All norms except `solution_norm` are the cheap recurrence estimates maintained by the
/// bidiagonalization, not recomputed from scratch.
#[derive(Debug, Clone)]
pub struct LsqrEstimates<T> {
    pub iteration: usize,
    /// Norm of the initial residual `b - A x_0`.
    pub rhs_norm: T,
    /// Estimate of `||b - A x||`.
    pub residual_norm: T,
    /// Estimate of `||A^T (b - A x)||`.
    pub normal_residual_norm: T,
    /// Frobenius norm estimate of `A` restricted to the current Krylov space.
    pub operator_norm: T,
    pub solution_norm: T,
}

pub trait LsqrStoppingCriterion<T: Scalar> {
    fn has_converged(&self, estimates: &LsqrEstimates<T>) -> Result<bool, SolveErrorKind>;
}

/// The two stopping rules from Paige and Saunders.
///
/// The solve terminates when either
///
/// - `||r|| <= btol * ||b|| + atol * ||A|| * ||x||`, meaning that the system is compatible
///   and `x` solves it to the requested accuracy, or
/// - `||A^T r|| <= atol * ||A|| * ||r||`, meaning that `x` is an accurate least-squares
///   solution of an incompatible system.
#[derive(Debug, Clone)]
pub struct PaigeSaundersCriterion<T: Scalar> {
    atol: T,
    btol: T,
}

impl<T: Scalar> PaigeSaundersCriterion<T> {
    pub fn new(atol: T, btol: T) -> Self {
        Self { atol, btol }
    }
}

impl Default for PaigeSaundersCriterion<f64> {
    fn default() -> Self {
        Self::new(1e-10, 1e-10)
    }
}

impl Default for PaigeSaundersCriterion<f32> {
    fn default() -> Self {
        Self::new(1e-5, 1e-5)
    }
}

impl<T> LsqrStoppingCriterion<T> for PaigeSaundersCriterion<T>
where
    T: RealField + Copy,
{
    fn has_converged(&self, estimates: &LsqrEstimates<T>) -> Result<bool, SolveErrorKind> {
        let compatible_bound =
            self.btol * estimates.rhs_norm + self.atol * estimates.operator_norm * estimates.solution_norm;
        if estimates.residual_norm <= compatible_bound {
            return Ok(true);
        }
        let least_squares_bound = self.atol * estimates.operator_norm * estimates.residual_norm;
        Ok(estimates.normal_residual_norm <= least_squares_bound)
    }
}

#[derive(Debug, Clone)]
pub struct LsqrWorkspace<T: Scalar> {
    u: DVector<T>,
    v: DVector<T>,
    w: DVector<T>,
    av: DVector<T>,
    atu: DVector<T>,
}

struct Buffers<'a, T: Scalar> {
    u: &'a mut DVector<T>,
    v: &'a mut DVector<T>,
    w: &'a mut DVector<T>,
    av: &'a mut DVector<T>,
    atu: &'a mut DVector<T>,
}

impl<T: Scalar + Zero> Default for LsqrWorkspace<T> {
    fn default() -> Self {
        Self {
            u: DVector::zeros(0),
            v: DVector::zeros(0),
            w: DVector::zeros(0),
            av: DVector::zeros(0),
            atu: DVector::zeros(0),
        }
    }
}

impl<T: Scalar + Zero> LsqrWorkspace<T> {
    fn prepare_buffers(&mut self, nrows: usize, ncols: usize) -> Buffers<T> {
        // Vectors in the range of A
        self.u.resize_vertically_mut(nrows, T::zero());
        self.av.resize_vertically_mut(nrows, T::zero());
        // Vectors in the domain of A
        self.v.resize_vertically_mut(ncols, T::zero());
        self.w.resize_vertically_mut(ncols, T::zero());
        self.atu.resize_vertically_mut(ncols, T::zero());
        Buffers {
            u: &mut self.u,
            v: &mut self.v,
            w: &mut self.w,
            av: &mut self.av,
            atu: &mut self.atu,
        }
    }
}

#[derive(Debug)]
enum OwnedOrMutRef<'a, T> {
    Owned(T),
    MutRef(&'a mut T),
}

impl<'a, T> Deref for OwnedOrMutRef<'a, T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        match self {
            Self::Owned(owned) => owned,
            Self::MutRef(mutref) => mutref,
        }
    }
}

impl<'a, T> DerefMut for OwnedOrMutRef<'a, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        match self {
            Self::Owned(owned) => owned,
            Self::MutRef(mutref) => mutref,
        }
    }
}

#[derive(Debug)]
pub struct Lsqr<'a, T, A, Criterion>
where
    T: Scalar,
{
    workspace: OwnedOrMutRef<'a, LsqrWorkspace<T>>,
    operator: A,
    stopping_criterion: Criterion,
    max_iter: Option<usize>,
}

/// Iteration budget used when none is set with [`Lsqr::with_max_iter`].
///
/// In exact arithmetic LSQR terminates after at most `ncols` iterations. The factor four
/// leaves room for the loss of orthogonality in floating point.
pub fn default_max_iter(ncols: usize) -> usize {
    4 * ncols.max(1)
}

impl<'a, T: Scalar + Zero> Lsqr<'a, T, (), ()> {
    pub fn new() -> Self {
        Self {
            workspace: OwnedOrMutRef::Owned(LsqrWorkspace::default()),
            operator: (),
            stopping_criterion: (),
            max_iter: None,
        }
    }
}

impl<'a, T: Scalar> Lsqr<'a, T, (), ()> {
    pub fn with_workspace(workspace: &'a mut LsqrWorkspace<T>) -> Self {
        Self {
            workspace: OwnedOrMutRef::MutRef(workspace),
            operator: (),
            stopping_criterion: (),
            max_iter: None,
        }
    }
}

impl<'a, T: Scalar, Criterion> Lsqr<'a, T, (), Criterion> {
    pub fn with_operator<A>(self, operator: A) -> Lsqr<'a, T, A, Criterion> {
        Lsqr {
            workspace: self.workspace,
            operator,
            stopping_criterion: self.stopping_criterion,
            max_iter: self.max_iter,
        }
    }
}

impl<'a, T: Scalar, A> Lsqr<'a, T, A, ()> {
    pub fn with_stopping_criterion<Criterion>(self, stopping_criterion: Criterion) -> Lsqr<'a, T, A, Criterion> {
        Lsqr {
            workspace: self.workspace,
            operator: self.operator,
            stopping_criterion,
            max_iter: self.max_iter,
        }
    }
}

impl<'a, T: Scalar, A, Criterion> Lsqr<'a, T, A, Criterion> {
    /// Sets the iteration budget. Without it, the budget is [`default_max_iter`] of the
    /// number of unknowns.
    pub fn with_max_iter(self, max_iter: usize) -> Self {
        Self {
            max_iter: Some(max_iter),
            ..self
        }
    }
}

#[derive(Debug)]
#[non_exhaustive]
pub enum SolveErrorKind {
    OperatorError(Box<dyn Error>),
    StoppingCriterionError(Box<dyn Error>),
    /// The recurrences produced NaN or infinite values, typically because the operator
    /// itself contains such values.
    NonFiniteEstimates,
    MaxIterationsReached {
        max_iter: usize,
    },
}

impl fmt::Display for SolveErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OperatorError(err) => {
                write!(f, "Error applying operator: ")?;
                err.fmt(f)
            }
            Self::StoppingCriterionError(err) => {
                write!(f, "Error evaluating stopping criterion: ")?;
                err.fmt(f)
            }
            Self::NonFiniteEstimates => write!(f, "Encountered non-finite values in the LSQR recurrences"),
            Self::MaxIterationsReached { max_iter } => {
                write!(f, "Max iterations ({}) reached.", max_iter)
            }
        }
    }
}

/// Error returned by a failed LSQR solve.
///
/// The solution vector passed to the solver holds the last iterate when the error is returned.
#[non_exhaustive]
#[derive(Debug)]
pub struct SolveError<T> {
    pub output: LsqrOutput<T>,
    pub kind: SolveErrorKind,
}

impl<T> SolveError<T> {
    fn new(output: LsqrOutput<T>, kind: SolveErrorKind) -> Self {
        Self { output, kind }
    }
}

impl<T> fmt::Display for SolveError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LSQR solve failed after {} iterations: ", self.output.num_iterations)?;
        write!(f, "{}", self.kind)
    }
}

impl<T: fmt::Debug> std::error::Error for SolveError<T> {}

/// y = Ax
fn apply_operator<'a, T, A>(
    y: impl Into<DVectorViewMut<'a, T>>,
    a: &'a A,
    x: impl Into<DVectorView<'a, T>>,
) -> Result<(), Box<dyn Error>>
where
    T: Scalar,
    A: LinearOperator<T>,
{
    a.apply(y.into(), x.into())
}

/// y = A^T x
fn apply_operator_transpose<'a, T, A>(
    y: impl Into<DVectorViewMut<'a, T>>,
    a: &'a A,
    x: impl Into<DVectorView<'a, T>>,
) -> Result<(), Box<dyn Error>>
where
    T: Scalar,
    A: LinearOperator<T>,
{
    a.apply_transpose(y.into(), x.into())
}

#[non_exhaustive]
#[derive(Debug, Clone)]
pub struct LsqrOutput<T> {
    /// Number of iterations of the solver.
    ///
    /// Corresponds to the number of updates made to the (initial) solution vector.
    pub num_iterations: usize,
    /// Estimate of `||b - A x||` for the returned solution.
    pub residual_norm: T,
    /// Estimate of `||A^T (b - A x)||` for the returned solution.
    pub normal_residual_norm: T,
    /// Frobenius norm estimate of the operator.
    pub operator_norm: T,
}

impl<'a, T, A, Criterion> Lsqr<'a, T, A, Criterion>
where
    T: RealField + Copy,
    A: LinearOperator<T>,
    Criterion: LsqrStoppingCriterion<T>,
{
    /// Solves the least-squares problem `min ||A x - b||`, using the contents of `x` as the
    /// initial guess.
    ///
    /// Only a zero initial guess yields the minimum-norm solution of a rank-deficient
    /// problem. For any other guess, the solver computes the minimum-norm *correction*.
    pub fn solve_with_guess<'b>(
        &mut self,
        b: impl Into<DVectorView<'b, T>>,
        x: impl Into<DVectorViewMut<'b, T>>,
    ) -> Result<LsqrOutput<T>, SolveError<T>> {
        self.solve_with_guess_(b.into(), x.into())
    }

    fn solve_with_guess_(&mut self, b: DVectorView<T>, mut x: DVectorViewMut<T>) -> Result<LsqrOutput<T>, SolveError<T>> {
        use SolveErrorKind::*;

        let mut output = LsqrOutput {
            num_iterations: 0,
            residual_norm: T::zero(),
            normal_residual_norm: T::zero(),
            operator_norm: T::zero(),
        };

        let max_iter = self.max_iter.unwrap_or_else(|| default_max_iter(x.len()));
        let Buffers { u, v, w, av, atu } = self.workspace.prepare_buffers(b.len(), x.len());

        // u = b - Ax
        if let Err(err) = apply_operator(&mut *u, &self.operator, &x) {
            return Err(SolveError::new(output, OperatorError(err)));
        }
        u.axpy(T::one(), &b, -T::one());

        let mut beta = u.norm();
        output.residual_norm = beta;
        if beta == T::zero() {
            // The initial guess solves the system exactly
            return Ok(output);
        }
        let rhs_norm = beta;
        u.unscale_mut(beta);

        // v = A^T u
        if let Err(err) = apply_operator_transpose(&mut *v, &self.operator, &*u) {
            return Err(SolveError::new(output, OperatorError(err)));
        }
        let mut alpha = v.norm();
        output.normal_residual_norm = alpha * beta;
        if alpha == T::zero() {
            // A^T r = 0, so the initial guess is already a least-squares solution
            return Ok(output);
        }
        v.unscale_mut(alpha);
        w.copy_from(&*v);

        let mut phi_bar = beta;
        let mut rho_bar = alpha;
        let mut operator_norm = T::zero();

        loop {
            // u <- A v - alpha u
            if let Err(err) = apply_operator(&mut *av, &self.operator, &*v) {
                return Err(SolveError::new(output, OperatorError(err)));
            }
            u.axpy(T::one(), &*av, -alpha);
            beta = u.norm();
            if beta > T::zero() {
                u.unscale_mut(beta);
            }
            operator_norm = (operator_norm * operator_norm + alpha * alpha + beta * beta).sqrt();

            // v <- A^T u - beta v
            if let Err(err) = apply_operator_transpose(&mut *atu, &self.operator, &*u) {
                return Err(SolveError::new(output, OperatorError(err)));
            }
            v.axpy(T::one(), &*atu, -beta);
            alpha = v.norm();
            if alpha > T::zero() {
                v.unscale_mut(alpha);
            }

            // Plane rotation eliminating beta from the lower bidiagonal matrix
            let rho = (rho_bar * rho_bar + beta * beta).sqrt();
            let c = rho_bar / rho;
            let s = beta / rho;
            let theta = s * alpha;
            rho_bar = -c * alpha;
            let phi = c * phi_bar;
            phi_bar = s * phi_bar;

            // x <- x + (phi / rho) w
            x.axpy(phi / rho, &*w, T::one());
            // w <- v - (theta / rho) w
            w.axpy(T::one(), &*v, -theta / rho);

            // Number of iterations corresponds to number of updates to the x vector
            output.num_iterations += 1;
            output.residual_norm = phi_bar;
            output.normal_residual_norm = phi_bar * alpha * c.abs();
            output.operator_norm = operator_norm;

            if !(phi_bar.is_finite() && rho.is_finite() && output.normal_residual_norm.is_finite()) {
                return Err(SolveError::new(output, NonFiniteEstimates));
            }

            let estimates = LsqrEstimates {
                iteration: output.num_iterations,
                rhs_norm,
                residual_norm: output.residual_norm,
                normal_residual_norm: output.normal_residual_norm,
                operator_norm,
                solution_norm: x.norm(),
            };

            let has_converged = match self.stopping_criterion.has_converged(&estimates) {
                Ok(converged) => converged,
                Err(error_kind) => return Err(SolveError::new(output, error_kind)),
            };

            // alpha = 0 means that the bidiagonalization terminated, and x is then
            // a least-squares solution in exact arithmetic
            if has_converged || alpha == T::zero() {
                debug!(
                    "LSQR finished after {} iterations (residual norm {}, normal residual norm {})",
                    output.num_iterations, output.residual_norm, output.normal_residual_norm
                );
                break;
            } else if output.num_iterations >= max_iter {
                return Err(SolveError::new(output, MaxIterationsReached { max_iter }));
            }
        }

        Ok(output)
    }
}
