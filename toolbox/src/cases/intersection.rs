use crate::cases::case::{Case, ConstraintBlock};
use crate::cases::validity::{block_is_feasible, bounds_for_slice, feasibility_problem};
use crate::errors::{Error, Result};
use crate::geometry::slice2d;
use crate::geometry::vertices::Vertices;
use crate::lp::LpEnvironment;
use crate::symbols::variable::VariablePool;

/// The intersection of several cases over shared variable pools.
///
/// Owns a fresh boundary block composed by row-stacking each case's block;
/// the S-system of the first case stands in for the whole intersection,
/// later cases only contribute constraint rows.
pub struct CaseIntersection<'a> {
    cases: Vec<&'a Case>,
    block: ConstraintBlock,
}

impl<'a> CaseIntersection<'a> {
    /// Stacks the boundary systems of `cases`. Every case must have a
    /// steady-state solution and the same independent pool width.
    pub fn new(cases: &[&'a Case]) -> Result<CaseIntersection<'a>> {
        let first = *cases.first().ok_or(Error::NullArgument("cases"))?;
        let mut block = first
            .boundaries()
            .cloned()
            .ok_or(Error::SingularSystem)?;
        for case in &cases[1..] {
            let other = case.boundaries().ok_or(Error::SingularSystem)?;
            if other.u.cols() != block.u.cols() {
                return Err(Error::WrongShapeOrDomain(
                    "cases do not share an independent pool".into(),
                ));
            }
            block = ConstraintBlock {
                u: block.u.append_below(&other.u)?,
                zeta: block.zeta.append_below(&other.zeta)?,
            };
        }
        Ok(CaseIntersection {
            cases: cases.to_vec(),
            block,
        })
    }

    pub fn number_of_cases(&self) -> usize {
        self.cases.len()
    }

    pub fn boundaries(&self) -> &ConstraintBlock {
        &self.block
    }

    /// True when all stacked boundary systems admit a common interior
    /// point.
    pub fn is_valid(&self) -> bool {
        let problem = feasibility_problem(&self.block);
        block_is_feasible(&mut LpEnvironment::new(), &problem, true)
    }

    /// Slice variant of [`CaseIntersection::is_valid`] with the usual
    /// bounding-box classification.
    pub fn is_valid_at_slice(&self, lower: &VariablePool, upper: &VariablePool) -> bool {
        if lower.number_of_variables() != upper.number_of_variables() {
            tracing::warn!("slice bound pools must have matching variable counts");
            return false;
        }
        let mut problem = feasibility_problem(&self.block);
        for (index, bound) in bounds_for_slice(self.cases[0], lower, upper) {
            problem.set_col_bound(index, bound);
        }
        block_is_feasible(&mut LpEnvironment::new(), &problem, true)
    }

    /// Vertices of the intersection on a two-variable slice.
    pub fn vertices_for_2d_slice(
        &self,
        lower: &VariablePool,
        upper: &VariablePool,
        x_name: &str,
        y_name: &str,
    ) -> Result<Vertices> {
        slice2d::vertices_for_2d_slice(
            self.cases[0],
            Some(&self.block),
            lower,
            upper,
            x_name,
            y_name,
        )
    }
}

/// Convenience wrapper deciding validity of a slice of cases at once.
pub fn intersection_is_valid(cases: &[&Case]) -> bool {
    match CaseIntersection::new(cases) {
        Ok(intersection) => intersection.is_valid(),
        Err(_) => false,
    }
}
