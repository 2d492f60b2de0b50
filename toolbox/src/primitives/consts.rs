/*
For boundary arithmetic
 */

/// Entries of a boundary row with absolute value below this are zero.
pub const ZERO_TOLERANCE: f64 = 1e-14;

/// Two vertices closer than this in every coordinate are the same vertex.
pub const VERTEX_TOLERANCE: f64 = 1e-14;

/// Pivots below this during elimination mark the system as singular.
pub const SINGULAR_TOLERANCE: f64 = 1e-12;

/*
For linear programming
 */

/// Lower bound of the feasibility slack column.
pub const SLACK_LOWER_BOUND: f64 = -1.0;

/// Numerical tolerance of the simplex pivot and ratio tests.
pub const LP_TOLERANCE: f64 = 1e-9;

/// Iteration cap of the simplex; Bland's rule terminates well before this.
pub const LP_MAX_ITERATIONS: usize = 50_000;

/*
For vertex enumeration
 */

/// Largest denominator admitted when boundary entries are converted to
/// rationals. Enumeration is very sensitive to precision error, so the
/// cap is kept small by default and recorded in the serialized envelope.
pub const DEFAULT_DENOMINATOR_LIMIT: u32 = 100;

/*
For sweeps
 */

/// Chunk in which the shared work stack grows its backing storage.
pub const WORK_STACK_CHUNK: usize = 5000;

/// Depth bound for recursive resolution of cyclical cases.
pub const MAX_CYCLICAL_DEPTH: usize = 16;
