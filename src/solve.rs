//! Assembly and solution of the weighted least-squares problem.
use crate::constraints::{assemble_constraint_operator, ConstraintSet};
use crate::error::AkvfError;
use crate::field::DisplacementField;
use crate::gradient::{build_gradient_with_tolerance, GradientOperator, DEFAULT_DEGENERATE_FACE_TOLERANCE};
use crate::killing::{assemble_killing_operator, KillingOperator};
use crate::mesh::SurfaceMesh;
use crate::sparse::block::BlockCooBuilder;
use crate::sparse::lsqr::{default_max_iter, Lsqr, LsqrWorkspace, PaigeSaundersCriterion};
use crate::Real;
use log::{debug, info, warn};
use nalgebra::{convert, DVector, Scalar};
use nalgebra_sparse::CsrMatrix;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Settings for [`solve_akvf`] and [`KillingSystem`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverSettings {
    /// Relative accuracy of the operator, used by the LSQR stopping rules.
    pub atol: f64,
    /// Relative accuracy of the right-hand side, used by the LSQR stopping rules.
    pub btol: f64,
    /// Maximum number of LSQR iterations. Defaults to four times the number of unknowns.
    pub max_iterations: Option<usize>,
    /// Faces with quality at or below this value are rejected as degenerate.
    pub degenerate_face_tolerance: f64,
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self {
            atol: 1e-10,
            btol: 1e-10,
            max_iterations: None,
            degenerate_face_tolerance: DEFAULT_DEGENERATE_FACE_TOLERANCE,
        }
    }
}

impl SolverSettings {
    pub fn with_atol(self, atol: f64) -> Self {
        Self { atol, ..self }
    }

    pub fn with_btol(self, btol: f64) -> Self {
        Self { btol, ..self }
    }

    pub fn with_max_iterations(self, max_iterations: usize) -> Self {
        Self {
            max_iterations: Some(max_iterations),
            ..self
        }
    }

    pub fn with_degenerate_face_tolerance(self, tolerance: f64) -> Self {
        Self {
            degenerate_face_tolerance: tolerance,
            ..self
        }
    }

    /// The iteration budget for a problem with the given number of unknowns.
    pub fn iteration_budget(&self, num_unknowns: usize) -> usize {
        self.max_iterations
            .unwrap_or_else(|| default_max_iter(num_unknowns))
    }
}

/// A non-fatal problem with the input of a solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigurationWarning {
    /// The constraint weight is zero or negative. A zero weight ignores the constraints
    /// altogether, and a negative weight acts like its absolute value.
    NonPositiveWeight,
    /// No vertex is constrained, so the solution is the zero field.
    NoConstraints,
}

impl fmt::Display for ConfigurationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NonPositiveWeight => write!(f, "Constraint weight is not positive"),
            Self::NoConstraints => write!(f, "No vertices are constrained"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolveReport<T> {
    /// Number of LSQR iterations.
    pub iterations: usize,
    /// Estimate of `|A x - b|` reported by LSQR.
    pub residual_norm: T,
    /// Total Killing energy `|P x|^2` of the solution.
    pub killing_energy: T,
    /// Sum of squared distances between the displacements of the constrained vertices and
    /// their targets.
    pub constraint_violation: T,
    pub warnings: Vec<ConfigurationWarning>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AkvfSolution<T: Scalar> {
    pub field: DisplacementField<T>,
    pub report: SolveReport<T>,
}

/// The mesh-dependent part of the least-squares problem.
///
/// Holds the gradient and Killing-energy operators of a mesh so that the problem can be
/// solved repeatedly for different constraints and weights without reassembling them.
#[derive(Debug, Clone)]
pub struct KillingSystem<T: Scalar> {
    gradient: GradientOperator<T>,
    killing: KillingOperator<T>,
    settings: SolverSettings,
    workspace: LsqrWorkspace<T>,
}

impl<T: Real> KillingSystem<T> {
    pub fn new(mesh: &SurfaceMesh<T>) -> Result<Self, AkvfError<T>> {
        Self::with_settings(mesh, SolverSettings::default())
    }

    pub fn with_settings(mesh: &SurfaceMesh<T>, settings: SolverSettings) -> Result<Self, AkvfError<T>> {
        let gradient = build_gradient_with_tolerance(mesh, convert(settings.degenerate_face_tolerance))?;
        let killing = assemble_killing_operator(&gradient);
        Ok(Self {
            gradient,
            killing,
            settings,
            workspace: LsqrWorkspace::default(),
        })
    }

    pub fn gradient(&self) -> &GradientOperator<T> {
        &self.gradient
    }

    pub fn killing_operator(&self) -> &KillingOperator<T> {
        &self.killing
    }

    pub fn settings(&self) -> &SolverSettings {
        &self.settings
    }

    pub fn num_vertices(&self) -> usize {
        self.killing.num_vertices()
    }

    /// Assembles `A = [P; λ Ik]` and `b = [0; λ t]`, where `t` are the flattened targets.
    ///
    /// `A` has `6m + 3k` rows and `3n` columns.
    pub fn assemble_least_squares_system(
        &self,
        constraints: &ConstraintSet<T>,
        weight: T,
    ) -> Result<(CsrMatrix<T>, DVector<T>), AkvfError<T>> {
        let n = self.num_vertices();
        let constraint_operator = assemble_constraint_operator(constraints, n)?;
        let num_killing_rows = self.killing.matrix().nrows();
        let num_constraint_rows = constraint_operator.nrows();

        let mut builder = BlockCooBuilder::new(&[num_killing_rows, num_constraint_rows], &[3 * n]);
        builder.add_scaled_block(0, 0, T::one(), self.killing.matrix());
        builder.add_scaled_block(1, 0, weight, &constraint_operator);
        let a = builder.build();

        let mut b = DVector::zeros(num_killing_rows + num_constraint_rows);
        b.rows_mut(num_killing_rows, num_constraint_rows)
            .copy_from(&(constraints.flattened_targets() * weight));

        Ok((a, b))
    }

    /// Solves for the displacement field that best balances Killing energy against the
    /// constraints with the given weight.
    ///
    /// The solve starts from the zero field, so that among all minimizers the one with the
    /// smallest norm is returned. In particular, rigid motions that the constraints do not
    /// determine are not added to the solution.
    pub fn solve(&mut self, constraints: &ConstraintSet<T>, weight: T) -> Result<AkvfSolution<T>, AkvfError<T>> {
        let n = self.num_vertices();
        constraints.validate(n)?;

        let mut warnings = Vec::new();
        if weight <= T::zero() {
            warn!("Constraint weight {} is not positive", weight);
            warnings.push(ConfigurationWarning::NonPositiveWeight);
        }
        if constraints.is_empty() {
            warn!("No vertices are constrained, the solution is the zero field");
            warnings.push(ConfigurationWarning::NoConstraints);
        }

        let (a, b) = self.assemble_least_squares_system(constraints, weight)?;
        debug!(
            "Assembled least-squares system of size {}x{} with {} non-zeros",
            a.nrows(),
            a.ncols(),
            a.nnz()
        );

        let criterion = PaigeSaundersCriterion::new(convert(self.settings.atol), convert(self.settings.btol));
        let max_iter = self.settings.iteration_budget(3 * n);
        let mut x = DVector::zeros(3 * n);
        let output = Lsqr::with_workspace(&mut self.workspace)
            .with_operator(&a)
            .with_stopping_criterion(criterion)
            .with_max_iter(max_iter)
            .solve_with_guess(&b, &mut x)
            .map_err(|err| AkvfError::NumericalInstability {
                iterations: err.output.num_iterations,
                residual_norm: err.output.residual_norm,
                reason: err.kind.to_string(),
                best_iterate: DisplacementField::from_flattened(&x),
            })?;

        let field = DisplacementField::from_flattened(&x);
        let killing_energy = self.killing.energy(&field);
        let constraint_violation = constraints
            .iter()
            .map(|(vertex, target)| (field.displacements()[vertex] - target).norm_squared())
            .fold(T::zero(), |sum, v| sum + v);

        info!(
            "AKVF solve finished after {} LSQR iterations (Killing energy {}, constraint violation {})",
            output.num_iterations, killing_energy, constraint_violation
        );

        let report = SolveReport {
            iterations: output.num_iterations,
            residual_norm: output.residual_norm,
            killing_energy,
            constraint_violation,
            warnings,
        };
        Ok(AkvfSolution { field, report })
    }
}

/// Computes the approximate Killing vector field of the mesh subject to the given constraints.
///
/// Constraints are validated before any operator is assembled. See [`KillingSystem::solve`]
/// for details on the solve.
pub fn solve_akvf<T: Real>(
    mesh: &SurfaceMesh<T>,
    constraints: &ConstraintSet<T>,
    weight: T,
    settings: &SolverSettings,
) -> Result<AkvfSolution<T>, AkvfError<T>> {
    constraints.validate(mesh.num_vertices())?;
    KillingSystem::with_settings(mesh, settings.clone())?.solve(constraints, weight)
}
