use thiserror::Error;

/// Errors surfaced by the toolbox.
///
/// Recoverable faults are logged at `warn` by the caller and answered with a
/// sentinel value; faults that abort an operation are returned as `Err` of
/// this type. Allocation failure is left to the global allocator.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// A required argument was empty or absent.
    #[error("required argument is missing: {0}")]
    NullArgument(&'static str),

    /// An argument had the wrong shape, or a value fell outside its domain.
    #[error("wrong shape or domain: {0}")]
    WrongShapeOrDomain(String),

    /// A matrix operand was empty where a populated matrix was required.
    #[error("matrix operand is empty: {0}")]
    MatrixNull(&'static str),

    /// The input string is not a well-formed expression or is not in
    /// generalized mass action form.
    #[error("parse failed: {0}")]
    ParseFail(String),

    /// The requested operation is recognized but not supported.
    #[error("not implemented: {0}")]
    NotImplemented(&'static str),

    /// A named variable or case could not be found.
    #[error("not found: {0}")]
    NotFound(String),

    /// The linear-programming backend failed to set up or solve a problem.
    #[error("linear problem failed: {0}")]
    LinearProgram(String),

    /// A reduced system matrix is singular; the case may be cyclical.
    #[error("system matrix is singular")]
    SingularSystem,

    /// The binary envelope could not be written or read back.
    #[error("serialization failed: {0}")]
    Serialization(String),
}

pub type Result<T> = core::result::Result<T, Error>;
