use crate::cases::case::Case;
use crate::designspace::DesignSpace;
use crate::math::linear;
use crate::symbols::dictionary::Dictionary;
use crate::symbols::variable::VariablePool;
use tracing::{debug, warn};

/// Component magnitude above which an equation participates in a left
/// null vector of `Gd - Hd`.
const NULL_COMPONENT_TOLERANCE: f64 = 1e-9;

/// An under-determined case, resolved through a design space of its own.
///
/// When the dominant fluxes of a case cancel structurally, the reduced
/// system is singular and the case cannot be judged by its own boundary
/// system. Summing the offending cycle of equations cancels the dominant
/// fluxes, so one equation of the cycle is re-stated as the cycle's
/// aggregate remainder; the rewritten system is re-parsed with the outer
/// case's conditions attached, and the case stands or falls with the
/// validity of that internal design space.
pub struct CyclicalCase {
    case_number: u64,
    original: Case,
    internal: DesignSpace,
}

impl CyclicalCase {
    /// Attempts resolution of `case`. Returns `None` when the case is not
    /// cyclical, cannot be resolved, or the recursion guard trips.
    pub(crate) fn try_new(ds: &DesignSpace, case: &Case) -> Option<CyclicalCase> {
        if case.is_valid() {
            return None;
        }
        if case.has_solution() {
            // Zero boundaries of solvable cases are handled by codominance
            // normalization, not by recursion.
            return None;
        }
        if ds.depth() >= ds.enumeration_opts().max_cyclical_depth {
            warn!(
                case = case.case_number(),
                depth = ds.depth(),
                "cyclical recursion depth limit reached"
            );
            return None;
        }

        let difference = case.ssystem().dependent_difference();
        let null_basis = linear::left_null_space(&difference);
        if null_basis.is_empty() {
            return None;
        }

        // Each left null vector names one cycle of equations whose dominant
        // fluxes cancel. Summing the cycle cancels those fluxes, so its
        // first equation is re-stated as the cycle's aggregate remainder
        // while the other members keep their full equations.
        let gma = ds.gma();
        let signature = case.signature();
        let mut rewritten: Vec<String> = gma.equations().to_vec();
        let mut replaced = vec![false; ds.number_of_equations()];
        for vector in &null_basis {
            let members: Vec<usize> = vector
                .iter()
                .enumerate()
                .filter(|(_, component)| component.abs() > NULL_COMPONENT_TOLERANCE)
                .map(|(i, _)| i)
                .collect();
            let representative = match members.first() {
                Some(&first) if !replaced[first] => first,
                _ => {
                    warn!(
                        case = case.case_number(),
                        "overlapping cycles share a representative equation"
                    );
                    continue;
                }
            };
            let mut positive = Vec::new();
            let mut negative = Vec::new();
            for &i in &members {
                let chosen_positive = (signature[2 * i] - 1) as usize;
                let chosen_negative = (signature[2 * i + 1] - 1) as usize;
                positive.extend(
                    (0..gma.signature()[2 * i] as usize)
                        .filter(|&p| p != chosen_positive)
                        .map(|p| gma.positive_term_source(i, p)),
                );
                negative.extend(
                    (0..gma.signature()[2 * i + 1] as usize)
                        .filter(|&n| n != chosen_negative)
                        .map(|n| gma.negative_term_source(i, n)),
                );
            }
            if positive.is_empty() || negative.is_empty() {
                warn!(
                    case = case.case_number(),
                    "cyclical case cannot be resolved; its cycle has no remaining flux"
                );
                return None;
            }
            let lhs = gma.lhs_forms()[representative].to_source();
            rewritten[representative] =
                format!("{lhs} = {} - {}", positive.join(" + "), negative.join(" - "));
            replaced[representative] = true;
        }

        if rewritten == gma.equations() {
            warn!(
                case = case.case_number(),
                "cyclical resolution reproduced the parent system"
            );
            return None;
        }

        let strings: Vec<&str> = rewritten.iter().map(String::as_str).collect();
        let xd_a = pool_copy(gma.xd_a());
        let mut internal = match DesignSpace::by_parsing_strings_with_xi(
            &strings,
            Some(&xd_a),
            gma.xi(),
        ) {
            Ok(internal) => internal,
            Err(error) => {
                warn!(case = case.case_number(), %error, "cyclical resolution failed to parse");
                return None;
            }
        };
        if internal
            .add_conditions(case.cd(), case.ci(), case.delta())
            .is_err()
        {
            warn!(case = case.case_number(), "cyclical conditions do not fit");
            return None;
        }
        internal.set_opts(*ds.opts());
        internal.set_cyclical(true);
        internal.set_depth(ds.depth() + 1);
        debug!(
            case = case.case_number(),
            subcases = internal.number_of_cases(),
            "cyclical case resolved into an internal design space"
        );
        Some(CyclicalCase {
            case_number: case.case_number(),
            original: case.clone(),
            internal,
        })
    }

    /// Reassembles a recorded cyclical case; used by the decoder.
    pub(crate) fn from_parts(
        case_number: u64,
        original: Case,
        internal: DesignSpace,
    ) -> CyclicalCase {
        CyclicalCase {
            case_number,
            original,
            internal,
        }
    }

    pub fn case_number(&self) -> u64 {
        self.case_number
    }

    pub fn original_case(&self) -> &Case {
        &self.original
    }

    pub fn internal_design_space(&self) -> &DesignSpace {
        &self.internal
    }

    /// A cyclical case is valid when its internal design space has at
    /// least one valid case.
    pub fn is_valid(&self) -> bool {
        self.internal.number_of_valid_cases() > 0
    }

    /// Slice variant of [`CyclicalCase::is_valid`].
    pub fn is_valid_at_slice(&self, lower: &VariablePool, upper: &VariablePool) -> bool {
        self.internal
            .calculate_all_valid_cases_for_slice(lower, upper)
            .count()
            > 0
    }

    /// Valid sub-cases, recursively resolved; keys are the internal case
    /// numbers (or dotted identifiers for nested cycles).
    pub fn calculate_all_valid_subcases(&self) -> Dictionary<Case> {
        self.internal.calculate_all_valid_cases_by_resolving_cyclical_cases()
    }

    /// Slice variant of [`CyclicalCase::calculate_all_valid_subcases`].
    pub fn calculate_all_valid_subcases_for_slice(
        &self,
        lower: &VariablePool,
        upper: &VariablePool,
    ) -> Dictionary<Case> {
        self.internal
            .calculate_all_valid_cases_for_slice_by_resolving_cyclical_cases(lower, upper)
    }
}

fn pool_copy(pool: &VariablePool) -> VariablePool {
    let mut out = VariablePool::new();
    out.copy_variables_from(pool).expect("fresh pool accepts adds");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cases::case::Case;
    use crate::designspace::DesignSpace;

    fn cycle_space() -> DesignSpace {
        // A closed interconversion cycle with equal fluxes: choosing the
        // cycle fluxes as dominant makes every dominant system singular.
        let mut ds = DesignSpace::by_parsing_strings(
            &[
                "dX1/dt = a + k*X3 - k*X1 - b*X1",
                "dX2/dt = k*X1 - k*X2",
                "dX3/dt = k*X2 - k*X3",
            ],
            None,
        )
        .unwrap();
        ds.set_serial(true);
        ds.set_cyclical(true);
        ds
    }

    #[test]
    fn singular_cases_resolve_into_internal_spaces() {
        let ds = cycle_space();
        // Signature [2,1,1,1,1,1]: the cycle term k*X3 dominates inflow
        // and k*X1 dominates outflow in every equation.
        let case = Case::from_gma(ds.gma(), &[2, 1, 1, 1, 1, 1], None, None).unwrap();
        assert!(!case.has_solution());
        let cyclical = CyclicalCase::try_new(&ds, &case).expect("resolvable");
        let internal = cyclical.internal_design_space();
        // The first cycle equation becomes the aggregate remainder
        // `dX1/dt = a - b*X1`; the other members keep their equations.
        assert_eq!(internal.number_of_equations(), 3);
        assert!(internal.number_of_cases() < ds.number_of_cases());
    }

    #[test]
    fn solvable_cases_are_not_cyclical() {
        let ds = cycle_space();
        let case = Case::from_gma(ds.gma(), &[1, 1, 1, 1, 1, 1], None, None).unwrap();
        if case.has_solution() {
            assert!(CyclicalCase::try_new(&ds, &case).is_none());
        }
    }
}
