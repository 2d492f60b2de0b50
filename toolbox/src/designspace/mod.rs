pub mod cyclical;
pub(crate) mod parallel;
pub mod prune;

use crate::cases::case::Case;
use crate::cases::signature::{signature_for_case_number, signature_to_string};
use crate::compiler::terms::parse_constraint;
use crate::configs::opts::{EnumerationOpts, SweepOpts};
use crate::designspace::cyclical::CyclicalCase;
use crate::errors::{Error, Result};
use crate::math::matrix::Matrix;
use crate::symbols::dictionary::Dictionary;
use crate::symbols::variable::VariablePool;
use crate::system::gma::GmaSystem;
use std::sync::{Arc, Once};
use tracing::{debug, instrument, warn};

/// The design space of a GMA system: the aggregate over every case,
/// holding the parsed system, user constraints, and the pools of valid
/// and cyclical cases discovered by sweeps.
///
/// Constraints only accumulate; once added they are never removed. The
/// valid and cyclical pools fill lazily, at most once each.
#[derive(Debug)]
pub struct DesignSpace {
    gma: Arc<GmaSystem>,
    cd: Option<Matrix>,
    ci: Option<Matrix>,
    delta: Option<Matrix>,
    number_of_cases: u64,
    valid_cases: Dictionary<()>,
    cyclical_cases: Dictionary<Arc<CyclicalCase>>,
    case_prefix: Option<String>,
    opts: SweepOpts,
    enumeration_opts: EnumerationOpts,
    depth: usize,
    validity_done: Once,
    cyclical_done: Once,
}

impl DesignSpace {
    /// Parses equation strings into a design space. `xd_a` supplies the
    /// dependent variables of `0 = ...` equations.
    pub fn by_parsing_strings(
        strings: &[&str],
        xd_a: Option<&VariablePool>,
    ) -> Result<DesignSpace> {
        Ok(Self::from_gma(GmaSystem::by_parsing_strings(strings, xd_a)?))
    }

    /// Like [`DesignSpace::by_parsing_strings`] with an explicit
    /// independent pool fixing the column ordering.
    pub fn by_parsing_strings_with_xi(
        strings: &[&str],
        xd_a: Option<&VariablePool>,
        xi: &VariablePool,
    ) -> Result<DesignSpace> {
        Ok(Self::from_gma(GmaSystem::by_parsing_strings_with_xi(
            strings, xd_a, xi,
        )?))
    }

    pub(crate) fn from_gma(gma: GmaSystem) -> DesignSpace {
        let number_of_cases = gma.number_of_cases();
        DesignSpace {
            gma: Arc::new(gma),
            cd: None,
            ci: None,
            delta: None,
            number_of_cases,
            valid_cases: Dictionary::new(),
            cyclical_cases: Dictionary::new(),
            case_prefix: None,
            opts: SweepOpts::default(),
            enumeration_opts: EnumerationOpts::default(),
            depth: 0,
            validity_done: Once::new(),
            cyclical_done: Once::new(),
        }
    }

    pub fn gma(&self) -> &GmaSystem {
        &self.gma
    }

    pub fn xd(&self) -> &Arc<VariablePool> {
        self.gma.xd()
    }

    pub fn xi(&self) -> &Arc<VariablePool> {
        self.gma.xi()
    }

    pub fn equations(&self) -> &[String] {
        self.gma.equations()
    }

    pub fn number_of_equations(&self) -> usize {
        self.gma.number_of_equations()
    }

    pub fn number_of_cases(&self) -> u64 {
        self.number_of_cases
    }

    pub fn signature(&self) -> &[u32] {
        self.gma.signature()
    }

    pub fn signature_to_string(&self) -> String {
        signature_to_string(self.signature())
    }

    pub fn opts(&self) -> &SweepOpts {
        &self.opts
    }

    pub fn set_opts(&mut self, opts: SweepOpts) {
        self.opts = opts;
    }

    pub fn serial(&self) -> bool {
        self.opts.serial
    }

    pub fn set_serial(&mut self, serial: bool) {
        self.opts.serial = serial;
    }

    pub fn cyclical(&self) -> bool {
        self.opts.cyclical
    }

    pub fn set_cyclical(&mut self, cyclical: bool) {
        self.opts.cyclical = cyclical;
    }

    pub fn resolve_codominance(&self) -> bool {
        self.opts.resolve_codominance
    }

    pub fn set_resolve_codominance(&mut self, resolve: bool) {
        self.opts.resolve_codominance = resolve;
    }

    pub fn case_prefix(&self) -> Option<&str> {
        self.case_prefix.as_deref()
    }

    pub fn set_case_prefix(&mut self, prefix: Option<String>) {
        self.case_prefix = prefix;
    }

    pub fn enumeration_opts(&self) -> &EnumerationOpts {
        &self.enumeration_opts
    }

    pub fn set_enumeration_opts(&mut self, opts: EnumerationOpts) {
        self.enumeration_opts = opts;
    }

    pub(crate) fn depth(&self) -> usize {
        self.depth
    }

    pub(crate) fn set_depth(&mut self, depth: usize) {
        self.depth = depth;
    }

    /// The accumulated user-constraint matrices, when any were added.
    pub fn extra_conditions(&self) -> Option<(&Matrix, &Matrix, &Matrix)> {
        match (&self.cd, &self.ci, &self.delta) {
            (Some(cd), Some(ci), Some(delta)) => Some((cd, ci, delta)),
            _ => None,
        }
    }

    /// Appends condition rows over `(log Xd, log Xi, 1)`. Shapes are
    /// validated before any mutation.
    pub fn add_conditions(&mut self, cd: &Matrix, ci: &Matrix, delta: &Matrix) -> Result<()> {
        if cd.cols() != self.gma.xd().number_of_variables() {
            return Err(Error::WrongShapeOrDomain(
                "columns of Cd must match the dependent pool".into(),
            ));
        }
        if ci.cols() != self.gma.xi().number_of_variables() {
            return Err(Error::WrongShapeOrDomain(
                "columns of Ci must match the independent pool".into(),
            ));
        }
        if cd.rows() != ci.rows() || cd.rows() != delta.rows() || delta.cols() != 1 {
            return Err(Error::WrongShapeOrDomain(
                "condition matrices must agree row for row".into(),
            ));
        }
        match (&mut self.cd, &mut self.ci, &mut self.delta) {
            (Some(have_cd), Some(have_ci), Some(have_delta)) => {
                *have_cd = have_cd.append_below(cd)?;
                *have_ci = have_ci.append_below(ci)?;
                *have_delta = have_delta.append_below(delta)?;
            }
            _ => {
                self.cd = Some(cd.clone());
                self.ci = Some(ci.clone());
                self.delta = Some(delta.clone());
            }
        }
        Ok(())
    }

    /// Parses dominance constraints (`term > term` or `term < term`) and
    /// appends them as condition rows. Nothing is mutated unless every
    /// string parses.
    pub fn add_constraints(&mut self, strings: &[&str]) -> Result<()> {
        if strings.is_empty() {
            return Err(Error::NullArgument("constraints"));
        }
        let parsed = strings
            .iter()
            .map(|s| parse_constraint(s))
            .collect::<Result<Vec<_>>>()?;

        let xd = self.gma.xd();
        let xi = self.gma.xi();
        let mut cd = Matrix::new(parsed.len(), xd.number_of_variables());
        let mut ci = Matrix::new(parsed.len(), xi.number_of_variables());
        let mut delta = Matrix::new(parsed.len(), 1);
        for (row, constraint) in parsed.iter().enumerate() {
            delta.set(
                row,
                0,
                (constraint.dominant.coefficient / constraint.subordinate.coefficient).log10(),
            );
            for (term, sign) in [(&constraint.dominant, 1.0), (&constraint.subordinate, -1.0)] {
                for (name, exponent) in &term.factors {
                    if let Some(k) = xd.index_of_variable_with_name(name) {
                        cd.set(row, k, cd.value(row, k) + sign * exponent);
                    } else if let Some(k) = xi.index_of_variable_with_name(name) {
                        ci.set(row, k, ci.value(row, k) + sign * exponent);
                    } else {
                        warn!(name, "constraint variable unknown to the system; ignored");
                    }
                }
            }
        }
        self.add_conditions(&cd, &ci, &delta)
    }

    /// Materializes the case for a 1-based case number, applying
    /// codominance normalization when the flag is set.
    pub fn case_with_case_number(&self, case_number: u64) -> Result<Case> {
        let signature = signature_for_case_number(case_number, self.signature())?;
        self.case_with_signature(&signature)
    }

    /// Materializes the case for a term signature.
    pub fn case_with_signature(&self, signature: &[u32]) -> Result<Case> {
        let case = Case::from_gma(
            &self.gma,
            signature,
            self.extra_conditions(),
            self.case_prefix(),
        )?;
        if self.opts.resolve_codominance {
            Ok(self.case_by_removing_identical_fluxes(case))
        } else {
            Ok(case)
        }
    }

    /// Resolves a dotted identifier such as `"7_3"`: each prefix component
    /// walks into a recorded cyclical case's internal design space.
    pub fn case_with_identifier(&self, identifier: &str) -> Result<Case> {
        match identifier.split_once('_') {
            None => {
                let number: u64 = identifier.parse().map_err(|_| {
                    Error::ParseFail(format!("bad case identifier `{identifier}`"))
                })?;
                self.case_with_case_number(number)
            }
            Some((head, rest)) => {
                let number: u64 = head.parse().map_err(|_| {
                    Error::ParseFail(format!("bad case identifier `{identifier}`"))
                })?;
                let cyclical = self.cyclical_case_with_case_number(number).ok_or_else(|| {
                    Error::NotFound(format!("cyclical case `{number}` in `{identifier}`"))
                })?;
                cyclical.internal_design_space().case_with_identifier(rest)
            }
        }
    }

    /// The recorded cyclical case for a case number, if any.
    pub fn cyclical_case_with_case_number(&self, case_number: u64) -> Option<Arc<CyclicalCase>> {
        self.cyclical_cases.value_for_name(&case_number.to_string())
    }

    pub fn number_of_cyclical_cases(&self) -> usize {
        self.cyclical_cases.count()
    }

    /// Detects and records cyclical cases across the whole case space.
    /// Runs at most once; later calls return immediately.
    #[instrument(skip(self), fields(cases = self.number_of_cases))]
    pub fn calculate_cyclical_cases(&self) {
        self.cyclical_done.call_once(|| {
            let numbers: Vec<u64> = (1..=self.number_of_cases).collect();
            let _: Vec<(String, ())> = parallel::sweep(self, numbers, |_env, number| {
                let case = match Case::from_gma(
                    &self.gma,
                    &match signature_for_case_number(number, self.signature()) {
                        Ok(signature) => signature,
                        Err(_) => return Vec::new(),
                    },
                    self.extra_conditions(),
                    self.case_prefix(),
                ) {
                    Ok(case) => case,
                    Err(_) => return Vec::new(),
                };
                if !case.conditions_are_valid() {
                    return Vec::new();
                }
                let name = number.to_string();
                if !self.cyclical_cases.has_name(&name) {
                    if let Some(cyclical) = CyclicalCase::try_new(self, &case) {
                        self.cyclical_cases
                            .add_value_with_name(&name, Arc::new(cyclical));
                    }
                }
                Vec::new()
            });
            debug!(found = self.cyclical_cases.count(), "cyclical sweep done");
        });
    }

    pub(crate) fn ensure_cyclical(&self) {
        if self.opts.cyclical {
            self.calculate_cyclical_cases();
        }
    }

    /// Sweeps every case once and records the valid case numbers. Runs at
    /// most once; later calls return immediately.
    pub fn calculate_validity_of_cases(&self) {
        self.ensure_validity();
    }

    pub(crate) fn ensure_validity(&self) {
        self.validity_done.call_once(|| {
            self.ensure_cyclical();
            let numbers: Vec<u64> = (1..=self.number_of_cases).collect();
            self.sweep_validity(numbers);
        });
    }

    /// Restricted validity sweep used by pruning; marks validity as
    /// computed for the surviving set.
    pub(crate) fn calculate_validity_of_case_numbers(&self, numbers: Vec<u64>) {
        if self.validity_done.is_completed() {
            warn!("valid cases have already been calculated");
            return;
        }
        self.validity_done.call_once(|| {
            self.ensure_cyclical();
            self.sweep_validity(numbers);
        });
    }

    #[instrument(skip(self, numbers), fields(cases = numbers.len()))]
    fn sweep_validity(&self, numbers: Vec<u64>) {
        let entries = parallel::sweep(self, numbers, |env, number| {
            let case = match self.case_with_case_number(number) {
                Ok(case) => case,
                Err(error) => {
                    warn!(number, %error, "case could not be materialized");
                    return Vec::new();
                }
            };
            if case.is_valid_in(env) {
                return vec![(number.to_string(), ())];
            }
            if let Some(cyclical) = self.cyclical_case_with_case_number(number) {
                if cyclical.is_valid() {
                    return vec![(number.to_string(), ())];
                }
            }
            Vec::new()
        });
        for (name, ()) in entries {
            self.valid_cases.add_value_with_name(&name, ());
        }
        debug!(valid = self.valid_cases.count(), "validity sweep done");
    }

    /// Number of valid cases, sweeping first if necessary.
    pub fn number_of_valid_cases(&self) -> usize {
        self.ensure_validity();
        self.valid_cases.count()
    }

    /// Recorded valid case numbers, in dictionary order. Deterministic
    /// only under serial sweeps; sort before comparing.
    pub fn valid_case_numbers(&self) -> Vec<u64> {
        self.valid_cases
            .names()
            .iter()
            .filter_map(|name| name.parse().ok())
            .collect()
    }

    /// The valid-case dictionary itself (case number strings to unit).
    pub fn valid_cases(&self) -> &Dictionary<()> {
        &self.valid_cases
    }

    /// Sweeps (if needed) and materializes every valid case.
    pub fn calculate_all_valid_cases(&self) -> Vec<Case> {
        self.ensure_validity();
        self.valid_case_numbers()
            .into_iter()
            .filter_map(|number| self.case_with_case_number(number).ok())
            .collect()
    }

    /// Valid cases over a slice, strictly feasible within the box.
    pub fn calculate_all_valid_cases_for_slice(
        &self,
        lower: &VariablePool,
        upper: &VariablePool,
    ) -> Dictionary<Case> {
        self.slice_sweep(lower, upper, true)
    }

    /// Slice sweep admitting boundary-only intersections.
    pub fn calculate_all_valid_cases_for_slice_non_strict(
        &self,
        lower: &VariablePool,
        upper: &VariablePool,
    ) -> Dictionary<Case> {
        self.slice_sweep(lower, upper, false)
    }

    #[instrument(skip_all, fields(cases = self.number_of_cases, strict))]
    fn slice_sweep(
        &self,
        lower: &VariablePool,
        upper: &VariablePool,
        strict: bool,
    ) -> Dictionary<Case> {
        self.ensure_cyclical();
        let numbers: Vec<u64> = (1..=self.number_of_cases).collect();
        let entries = parallel::sweep(self, numbers, |env, number| {
            let case = match self.case_with_case_number(number) {
                Ok(case) => case,
                Err(_) => return Vec::new(),
            };
            let name = number.to_string();
            if let Some(cyclical) = self.cyclical_case_with_case_number(number) {
                if cyclical.is_valid_at_slice(lower, upper) {
                    return vec![(name, case)];
                }
                return Vec::new();
            }
            if case.is_valid_at_slice_in(env, lower, upper, strict) {
                vec![(name, case)]
            } else {
                Vec::new()
            }
        });
        let dictionary = Dictionary::new();
        for (name, case) in entries {
            dictionary.add_value_with_name(&name, case);
        }
        dictionary
    }

    /// Valid cases with every cyclical case replaced by its resolved
    /// sub-cases, keyed by composite identifiers such as `"7_3"`.
    pub fn calculate_all_valid_cases_by_resolving_cyclical_cases(&self) -> Dictionary<Case> {
        self.ensure_validity();
        let numbers = self.valid_case_numbers();
        let entries = parallel::sweep(self, numbers, |env, number| {
            let name = number.to_string();
            if let Some(cyclical) = self.cyclical_case_with_case_number(number) {
                return cyclical
                    .calculate_all_valid_subcases()
                    .entries()
                    .into_iter()
                    .map(|(sub_name, sub_case)| (format!("{name}_{sub_name}"), sub_case))
                    .collect();
            }
            match self.case_with_case_number(number) {
                Ok(case) if case.is_valid_in(env) => vec![(name, case)],
                _ => Vec::new(),
            }
        });
        let dictionary = Dictionary::new();
        for (name, case) in entries {
            dictionary.add_value_with_name(&name, case);
        }
        dictionary
    }

    /// Slice variant of
    /// [`DesignSpace::calculate_all_valid_cases_by_resolving_cyclical_cases`].
    pub fn calculate_all_valid_cases_for_slice_by_resolving_cyclical_cases(
        &self,
        lower: &VariablePool,
        upper: &VariablePool,
    ) -> Dictionary<Case> {
        self.ensure_cyclical();
        let numbers: Vec<u64> = (1..=self.number_of_cases).collect();
        let entries = parallel::sweep(self, numbers, |env, number| {
            let name = number.to_string();
            if let Some(cyclical) = self.cyclical_case_with_case_number(number) {
                return cyclical
                    .calculate_all_valid_subcases_for_slice(lower, upper)
                    .entries()
                    .into_iter()
                    .map(|(sub_name, sub_case)| (format!("{name}_{sub_name}"), sub_case))
                    .collect();
            }
            match self.case_with_case_number(number) {
                Ok(case) if case.is_valid_at_slice_in(env, lower, upper, true) => {
                    vec![(name, case)]
                }
                _ => Vec::new(),
            }
        });
        let dictionary = Dictionary::new();
        for (name, case) in entries {
            dictionary.add_value_with_name(&name, case);
        }
        dictionary
    }

    pub(crate) fn cyclical_cases(&self) -> &Dictionary<Arc<CyclicalCase>> {
        &self.cyclical_cases
    }

    pub(crate) fn record_cyclical_case(&self, case_number: u64, cyclical: Arc<CyclicalCase>) {
        self.cyclical_cases
            .add_value_with_name(&case_number.to_string(), cyclical);
    }

    pub(crate) fn record_valid_case(&self, case_number: u64) {
        self.valid_cases
            .add_value_with_name(&case_number.to_string(), ());
    }

    /// True once a validity sweep (full or pruned) has run.
    pub fn validity_is_computed(&self) -> bool {
        self.validity_done.is_completed()
    }

    pub(crate) fn mark_validity_computed(&self) {
        self.validity_done.call_once(|| {});
    }

    /// True once the cyclical-case sweep has run.
    pub fn cyclical_cases_are_computed(&self) -> bool {
        self.cyclical_done.is_completed()
    }

    pub(crate) fn mark_cyclical_computed(&self) {
        self.cyclical_done.call_once(|| {});
    }

    // ---------------------------------------------------------------
    // Codominance normalization
    // ---------------------------------------------------------------

    /// Collapses numerically equal dominant fluxes: every vanished
    /// boundary row has its delta raised to log10(2), folding the equal
    /// fluxes into one. Left untouched when the zero-boundary pattern
    /// points at a cyclical alternative, maps outside the subdominance
    /// block, or the alternate term does not precede the chosen one.
    fn case_by_removing_identical_fluxes(&self, case: Case) -> Case {
        if !case.has_solution() {
            return case;
        }
        let zero_rows = match case.zero_boundary_indices() {
            Some(rows) if !rows.is_empty() => rows,
            _ => return case,
        };
        if self.identical_flux_alternatives_are_cyclical(&case, &zero_rows) {
            return case;
        }
        for &row in &zero_rows {
            match self.map_zero_boundary_row(row) {
                Some((position, offset)) => {
                    if offset as u32 >= case.signature()[position] - 1 {
                        return case;
                    }
                }
                None => {
                    // The row belongs to a user constraint; only cyclical
                    // handling tolerates that.
                    if !self.opts.cyclical {
                        return case;
                    }
                    break;
                }
            }
        }
        let mut normalized = case;
        for &row in &zero_rows {
            normalized.delta_mut().set(row, 0, 2f64.log10());
        }
        normalized.recalculate_boundaries();
        normalized
    }

    /// Maps a subdominance row index back to its signature position and
    /// its offset among the non-chosen terms of that position. `None` for
    /// rows of the user-constraint block.
    fn map_zero_boundary_row(&self, row: usize) -> Option<(usize, usize)> {
        let mut remaining = row;
        for (position, &terms) in self.signature().iter().enumerate() {
            if terms == 1 {
                continue;
            }
            let rows_here = (terms - 1) as usize;
            if remaining < rows_here {
                return Some((position, remaining));
            }
            remaining -= rows_here;
        }
        None
    }

    /// True when some combination of the alternate dominant terms implied
    /// by the zero boundaries names a recorded cyclical case.
    fn identical_flux_alternatives_are_cyclical(&self, case: &Case, zero_rows: &[usize]) -> bool {
        if self.cyclical_cases.count() == 0 {
            return false;
        }
        // Alternate term numbers per signature position, skipping over the
        // chosen term.
        let mut alternates: Vec<Vec<u32>> = vec![Vec::new(); self.signature().len()];
        for &row in zero_rows {
            if let Some((position, offset)) = self.map_zero_boundary_row(row) {
                let mut term = offset as u32 + 1;
                if term >= case.signature()[position] {
                    term += 1;
                }
                alternates[position].push(term);
            }
        }
        let mut candidates: Vec<Vec<u32>> = vec![case.signature().to_vec()];
        for (position, terms) in alternates.iter().enumerate() {
            if terms.is_empty() {
                continue;
            }
            let mut expanded = Vec::with_capacity(candidates.len() * terms.len());
            for candidate in &candidates {
                for &term in terms {
                    let mut next = candidate.clone();
                    next[position] = term;
                    expanded.push(next);
                }
            }
            candidates = expanded;
        }
        candidates
            .iter()
            .filter(|candidate| candidate.as_slice() != case.signature())
            .any(|candidate| {
                crate::cases::signature::case_number_for_signature(candidate, self.signature())
                    .ok()
                    .and_then(|number| self.cyclical_case_with_case_number(number))
                    .is_some()
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bistable() -> DesignSpace {
        let mut ds = DesignSpace::by_parsing_strings(
            &["dX1/dt = a + X2^2 - X1", "dX2/dt = a + X1^2 - X2"],
            None,
        )
        .unwrap();
        ds.set_serial(true);
        ds
    }

    #[test]
    fn counts_cases_from_the_signature() {
        let ds = bistable();
        assert_eq!(ds.number_of_cases(), 4);
        assert_eq!(ds.signature_to_string(), "2121");
    }

    #[test]
    fn valid_set_matches_the_symmetric_pair() {
        let ds = bistable();
        ds.calculate_validity_of_cases();
        let mut valid = ds.valid_case_numbers();
        valid.sort_unstable();
        assert_eq!(valid, vec![1, 4]);
        assert_eq!(ds.number_of_valid_cases(), 2);
    }

    #[test]
    fn serial_sweep_order_follows_case_numbers() {
        let ds = bistable();
        ds.calculate_validity_of_cases();
        assert_eq!(ds.valid_cases().names(), vec!["1", "4"]);
    }

    #[test]
    fn parallel_and_serial_find_the_same_set() {
        let serial = bistable();
        serial.calculate_validity_of_cases();
        let mut expected = serial.valid_case_numbers();
        expected.sort_unstable();

        let mut parallel_ds = DesignSpace::by_parsing_strings(
            &["dX1/dt = a + X2^2 - X1", "dX2/dt = a + X1^2 - X2"],
            None,
        )
        .unwrap();
        parallel_ds.set_serial(false);
        parallel_ds.calculate_validity_of_cases();
        let mut got = parallel_ds.valid_case_numbers();
        got.sort_unstable();
        assert_eq!(got, expected);
    }

    #[test]
    fn constraints_accumulate_and_restrict() {
        let mut ds = bistable();
        // Forcing a above ten contradicts both valid regions (a <= 1).
        ds.add_constraints(&["a > 10"]).unwrap();
        assert_eq!(ds.extra_conditions().unwrap().2.value(0, 0), -1.0);
        ds.calculate_validity_of_cases();
        assert_eq!(ds.number_of_valid_cases(), 0);
    }

    #[test]
    fn bad_constraints_leave_the_space_unchanged() {
        let mut ds = bistable();
        assert!(ds.add_constraints(&["a > 10", "not an inequality"]).is_err());
        assert!(ds.extra_conditions().is_none());
    }

    #[test]
    fn case_factory_validates_numbers() {
        let ds = bistable();
        assert!(ds.case_with_case_number(0).is_err());
        assert!(ds.case_with_case_number(5).is_err());
        let case = ds.case_with_case_number(4).unwrap();
        assert_eq!(case.signature(), &[2, 1, 2, 1]);
        assert_eq!(
            ds.case_with_signature(&[2, 1, 2, 1]).unwrap().case_number(),
            4
        );
    }

    #[test]
    fn slice_sweep_returns_cases_in_a_dictionary() {
        let ds = bistable();
        let lower = VariablePool::by_parsing_string("a : 1e-3").unwrap();
        let upper = VariablePool::by_parsing_string("a : 1e3").unwrap();
        let dictionary = ds.calculate_all_valid_cases_for_slice(&lower, &upper);
        let mut names = dictionary.names();
        names.sort();
        assert_eq!(names, vec!["1", "4"]);
        assert_eq!(dictionary.value_for_name("1").unwrap().case_number(), 1);

        // A box entirely above a = 1 excludes both.
        let lower = VariablePool::by_parsing_string("a : 10").unwrap();
        let upper = VariablePool::by_parsing_string("a : 1e3").unwrap();
        assert_eq!(
            ds.calculate_all_valid_cases_for_slice(&lower, &upper).count(),
            0
        );
    }

    #[test]
    fn codominant_terms_need_the_flag() {
        // Two identical positive terms: without normalization each case
        // carries a vanished boundary and fails the strict test.
        let strings = ["dX/dt = k + k - b*X"];
        let plain = DesignSpace::by_parsing_strings(&strings, None).unwrap();
        let case_one = plain.case_with_case_number(1).unwrap();
        assert_eq!(case_one.zero_boundary_indices().unwrap().len(), 1);
        assert!(!case_one.is_valid());
        assert!(!plain.case_with_case_number(2).unwrap().is_valid());

        let mut normalizing = DesignSpace::by_parsing_strings(&strings, None).unwrap();
        normalizing.set_resolve_codominance(true);
        // The later of the two equal terms absorbs both fluxes.
        let case_two = normalizing.case_with_case_number(2).unwrap();
        assert_eq!(
            case_two.delta().value(0, 0),
            2f64.log10(),
            "the vanished row takes a log10(2) delta"
        );
        assert!(case_two.is_valid());
        // The earlier one is left untouched.
        assert!(!normalizing.case_with_case_number(1).unwrap().is_valid());
    }
}
