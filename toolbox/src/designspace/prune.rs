//! Pruned enumeration of valid cases.
//!
//! Rather than sweeping the full Cartesian product of term choices, the
//! system is projected down one equation at a time: valid prefix
//! signatures of the reduced system are enumerated recursively, and only
//! case numbers extending a valid prefix are swept at each level.

use crate::cases::signature::{case_number_for_signature, signature_for_case_number};
use crate::designspace::DesignSpace;
use crate::errors::{Error, Result};
use crate::symbols::variable::VariablePool;
use tracing::debug;

impl DesignSpace {
    /// All case numbers whose signature starts with `prefix`.
    pub fn case_numbers_with_prefix(&self, prefix: &[u32]) -> Result<Vec<u64>> {
        let system = self.signature();
        if prefix.is_empty() || prefix.len() > system.len() {
            return Err(Error::WrongShapeOrDomain(
                "prefix length must be between one and the signature length".into(),
            ));
        }
        let mut signature = vec![0u32; system.len()];
        signature[..prefix.len()].copy_from_slice(prefix);
        let suffix = &system[prefix.len()..];
        let count: u64 = suffix.iter().map(|&s| s as u64).product();
        let mut numbers = Vec::with_capacity(count as usize);
        for raw in 0..count {
            let mut remainder = raw;
            // Suffix digits spin most-significant-last, matching the
            // mixed-radix codec.
            for (offset, &radix) in suffix.iter().enumerate().rev() {
                signature[prefix.len() + offset] = (remainder % radix as u64) as u32 + 1;
                remainder /= radix as u64;
            }
            numbers.push(case_number_for_signature(&signature, system)?);
        }
        Ok(numbers)
    }

    /// Valid case numbers found by recursive down-projection. Levels that
    /// run a sweep leave their valid-case dictionaries populated.
    pub fn calculate_valid_cases_by_pruning(&self) -> Result<Vec<u64>> {
        let prefixes = self.valid_prefix_signatures()?;
        let system = self.signature();
        prefixes
            .iter()
            .map(|signature| case_number_for_signature(signature, system))
            .collect()
    }

    fn valid_prefix_signatures(&self) -> Result<Vec<Vec<u32>>> {
        let equations = self.number_of_equations();
        let system = self.signature();
        if equations == 1 {
            if system == [1, 1] {
                // A single forced choice needs no linear program.
                return Ok(vec![vec![1, 1]]);
            }
            self.ensure_validity();
            return self
                .valid_case_numbers()
                .into_iter()
                .map(|n| signature_for_case_number(n, system))
                .collect();
        }

        let subspace = self
            .sub_design_space_by_removing_last_equation()
            .ok_or_else(|| {
                Error::WrongShapeOrDomain("cannot project a one-equation system".into())
            })?;
        let prefixes = subspace.valid_prefix_signatures()?;
        debug!(
            equations,
            prefixes = prefixes.len(),
            "pruned one equation"
        );

        let last_pair = &system[2 * equations - 2..];
        if last_pair == [1, 1] {
            // The dropped equation admits a single choice; extend in place.
            return Ok(prefixes
                .into_iter()
                .map(|mut prefix| {
                    prefix.extend_from_slice(&[1, 1]);
                    prefix
                })
                .collect());
        }

        let mut candidates = Vec::new();
        for prefix in &prefixes {
            candidates.extend(self.case_numbers_with_prefix(prefix)?);
        }
        self.calculate_validity_of_case_numbers(candidates);
        self.valid_case_numbers()
            .into_iter()
            .map(|n| signature_for_case_number(n, system))
            .collect()
    }

    /// Projects away the last equation, re-parsing the remaining strings.
    /// The dropped equation's dependent variable becomes independent
    /// wherever it is still referenced.
    pub(crate) fn sub_design_space_by_removing_last_equation(&self) -> Option<DesignSpace> {
        let equations = self.gma().equations();
        if equations.len() <= 1 {
            return None;
        }
        let remaining: Vec<&str> = equations[..equations.len() - 1]
            .iter()
            .map(String::as_str)
            .collect();
        let mut algebraic = VariablePool::new();
        algebraic
            .copy_variables_from(self.gma().xd_a())
            .expect("fresh pool accepts adds");
        let mut subspace =
            DesignSpace::by_parsing_strings(&remaining, Some(&algebraic)).ok()?;
        subspace.set_opts(*self.opts());
        Some(subspace)
    }
}

#[cfg(test)]
mod tests {
    use crate::designspace::DesignSpace;

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
    fn prefix_expansion_covers_the_suffix_product() {
        let ds = bistable();
        let numbers = ds.case_numbers_with_prefix(&[1, 1]).unwrap();
        assert_eq!(numbers, vec![1, 3]);
        let numbers = ds.case_numbers_with_prefix(&[2, 1]).unwrap();
        assert_eq!(numbers, vec![2, 4]);
        let all = ds.case_numbers_with_prefix(&[1]).unwrap();
        assert_eq!(all.len(), 2);
        assert!(ds.case_numbers_with_prefix(&[]).is_err());
    }

    #[test]
    fn pruning_finds_the_same_valid_set() {
        let mut pruned = bistable().calculate_valid_cases_by_pruning().unwrap();
        pruned.sort_unstable();

        let full = bistable();
        full.ensure_validity();
        let mut swept = full.valid_case_numbers();
        swept.sort_unstable();
        assert_eq!(pruned, swept);
    }

    #[test]
    fn projection_drops_the_last_equation() {
        let ds = bistable();
        let sub = ds.sub_design_space_by_removing_last_equation().unwrap();
        assert_eq!(sub.number_of_equations(), 1);
        // X2 becomes independent in the projected system.
        assert!(sub.gma().xi().has_variable_with_name("X2"));
        assert!(sub.sub_design_space_by_removing_last_equation().is_none());
    }
}
