use crate::errors::{Error, Result};

/// Encodes a term signature as a 1-based case number.
///
/// The signature digits form a mixed-radix numeral with position 0 least
/// significant: `N = 1 + sum_j (s_j - 1) * prod_{k<j} sigma_k`. Zero is
/// reserved as "no case".
pub fn case_number_for_signature(signature: &[u32], system_signature: &[u32]) -> Result<u64> {
    if signature.len() != system_signature.len() {
        return Err(Error::WrongShapeOrDomain(format!(
            "signature length {} does not match system length {}",
            signature.len(),
            system_signature.len()
        )));
    }
    let mut number = 0u64;
    let mut weight = 1u64;
    for (j, (&digit, &radix)) in signature.iter().zip(system_signature).enumerate() {
        if digit == 0 || digit > radix {
            return Err(Error::WrongShapeOrDomain(format!(
                "signature digit {digit} out of range at position {j}"
            )));
        }
        number += (digit as u64 - 1) * weight;
        weight *= radix as u64;
    }
    Ok(number + 1)
}

/// Decodes a 1-based case number back into its term signature.
pub fn signature_for_case_number(case_number: u64, system_signature: &[u32]) -> Result<Vec<u32>> {
    let total: u64 = system_signature.iter().map(|&s| s as u64).product();
    if case_number == 0 || case_number > total {
        return Err(Error::WrongShapeOrDomain(format!(
            "case number {case_number} outside 1..={total}"
        )));
    }
    let mut remainder = case_number - 1;
    let mut signature = Vec::with_capacity(system_signature.len());
    for &radix in system_signature {
        signature.push((remainder % radix as u64) as u32 + 1);
        remainder /= radix as u64;
    }
    Ok(signature)
}

/// Renders a signature as a digit string; digits above 9 are wrapped in
/// parentheses to stay unambiguous.
pub fn signature_to_string(signature: &[u32]) -> String {
    let mut out = String::new();
    for &digit in signature {
        if digit > 9 {
            out.push('(');
            out.push_str(&digit.to_string());
            out.push(')');
        } else {
            out.push_str(&digit.to_string());
        }
    }
    out
}
