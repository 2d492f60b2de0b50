//! Binary envelope for design spaces and cases.
//!
//! Messages are plain serde structs encoded with bincode under a fixed
//! integer encoding, so a given endianness always produces the same
//! bytes: encode, decode, and encode again is byte-identical. The
//! endianness is an explicit parameter; a process-wide default (little
//! unless set at startup) backs the parameterless entry points.

use crate::cases::case::Case;
use crate::configs::opts::{EnumerationOpts, SweepOpts};
use crate::designspace::cyclical::CyclicalCase;
use crate::designspace::DesignSpace;
use crate::errors::{Error, Result};
use crate::math::matrix::Matrix;
use crate::math::matrix_array::MatrixArray;
use crate::compiler::terms::EquationLhs;
use crate::symbols::variable::{PoolAccess, VariablePool};
use crate::system::gma::GmaSystem;
use crate::system::ssystem::SSystem;
use bincode::Options;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

/// Byte order of the numeric envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Endianness {
    Little,
    Big,
}

static DEFAULT_ENDIANNESS: AtomicU8 = AtomicU8::new(0);

/// Sets the process-wide default byte order. Call once at startup; the
/// explicit `_with` entry points are preferred.
pub fn set_default_endianness(endianness: Endianness) {
    let value = match endianness {
        Endianness::Little => 0,
        Endianness::Big => 1,
    };
    DEFAULT_ENDIANNESS.store(value, Ordering::Relaxed);
}

pub fn default_endianness() -> Endianness {
    match DEFAULT_ENDIANNESS.load(Ordering::Relaxed) {
        0 => Endianness::Little,
        _ => Endianness::Big,
    }
}

/// A variable pool flattened to ordered name/value lists, so the bytes do
/// not depend on hash-map iteration order.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct PoolMessage {
    names: Vec<String>,
    values: Vec<f64>,
    access: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct GmaMessage {
    xd: PoolMessage,
    xd_a: PoolMessage,
    xd_t: PoolMessage,
    xi: PoolMessage,
    alpha: Matrix,
    beta: Matrix,
    gd: MatrixArray,
    gi: MatrixArray,
    hd: MatrixArray,
    hi: MatrixArray,
    signature: Vec<u32>,
    equations: Vec<String>,
    lhs_forms: Vec<EquationLhs>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SSystemMessage {
    xd: PoolMessage,
    xi: PoolMessage,
    alpha: Matrix,
    beta: Matrix,
    gd: Matrix,
    gi: Matrix,
    hd: Matrix,
    hi: Matrix,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CaseMessage {
    name: String,
    signature: Vec<u32>,
    case_number: u64,
    ssystem: SSystemMessage,
    cd: Matrix,
    ci: Matrix,
    delta: Matrix,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CyclicalCaseMessage {
    case_number: u64,
    original: CaseMessage,
    internal: DesignSpaceMessage,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct DesignSpaceMessage {
    gma: GmaMessage,
    cd: Option<Matrix>,
    ci: Option<Matrix>,
    delta: Option<Matrix>,
    serial: bool,
    cyclical: bool,
    resolve_codominance: bool,
    number_of_cases: u64,
    validity_computed: bool,
    valid_cases: Vec<u64>,
    cyclical_computed: bool,
    cyclical_cases: Vec<CyclicalCaseMessage>,
    case_prefix: Option<String>,
    denominator_limit: u32,
}

/// Encodes a design space with the process-wide default byte order.
pub fn encode_design_space(ds: &DesignSpace) -> Result<Vec<u8>> {
    encode_design_space_with(ds, default_endianness())
}

pub fn encode_design_space_with(ds: &DesignSpace, endianness: Endianness) -> Result<Vec<u8>> {
    serialize(&design_space_to_message(ds), endianness)
}

/// Decodes a design space with the process-wide default byte order.
pub fn decode_design_space(buffer: &[u8]) -> Result<DesignSpace> {
    decode_design_space_with(buffer, default_endianness())
}

pub fn decode_design_space_with(buffer: &[u8], endianness: Endianness) -> Result<DesignSpace> {
    let message: DesignSpaceMessage = deserialize(buffer, endianness)?;
    Ok(design_space_from_message(message, 0))
}

/// Encodes a single case with the process-wide default byte order.
pub fn encode_case(case: &Case) -> Result<Vec<u8>> {
    encode_case_with(case, default_endianness())
}

pub fn encode_case_with(case: &Case, endianness: Endianness) -> Result<Vec<u8>> {
    serialize(&case_to_message(case), endianness)
}

/// Decodes a single case with the process-wide default byte order.
pub fn decode_case(buffer: &[u8]) -> Result<Case> {
    decode_case_with(buffer, default_endianness())
}

pub fn decode_case_with(buffer: &[u8], endianness: Endianness) -> Result<Case> {
    let message: CaseMessage = deserialize(buffer, endianness)?;
    Ok(case_from_message(message))
}

fn serialize<T: Serialize>(message: &T, endianness: Endianness) -> Result<Vec<u8>> {
    let options = bincode::DefaultOptions::new().with_fixint_encoding();
    let encoded = match endianness {
        Endianness::Little => options.with_little_endian().serialize(message),
        Endianness::Big => options.with_big_endian().serialize(message),
    };
    encoded.map_err(|error| Error::Serialization(error.to_string()))
}

fn deserialize<T: for<'de> Deserialize<'de>>(buffer: &[u8], endianness: Endianness) -> Result<T> {
    let options = bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .allow_trailing_bytes();
    let decoded = match endianness {
        Endianness::Little => options.with_little_endian().deserialize(buffer),
        Endianness::Big => options.with_big_endian().deserialize(buffer),
    };
    decoded.map_err(|error| Error::Serialization(error.to_string()))
}

fn pool_to_message(pool: &VariablePool) -> PoolMessage {
    PoolMessage {
        names: pool
            .all_variable_names()
            .into_iter()
            .map(str::to_string)
            .collect(),
        values: pool.variables().iter().map(|v| v.value()).collect(),
        access: match pool.access() {
            PoolAccess::ReadOnly => 0,
            PoolAccess::ReadWrite => 1,
            PoolAccess::ReadWriteAdd => 2,
        },
    }
}

fn pool_from_message(message: PoolMessage) -> VariablePool {
    let mut pool = VariablePool::new();
    for (name, value) in message.names.iter().zip(&message.values) {
        pool.add(name, *value).expect("fresh pool accepts adds");
    }
    match message.access {
        0 => pool.set_read_only(),
        1 => pool.set_read_write(),
        _ => pool.set_read_write_add(),
    }
    pool
}

fn gma_to_message(gma: &GmaSystem) -> GmaMessage {
    GmaMessage {
        xd: pool_to_message(gma.xd()),
        xd_a: pool_to_message(gma.xd_a()),
        xd_t: pool_to_message(gma.xd_t()),
        xi: pool_to_message(gma.xi()),
        alpha: gma.alpha().clone(),
        beta: gma.beta().clone(),
        gd: gma.gd().clone(),
        gi: gma.gi().clone(),
        hd: gma.hd().clone(),
        hi: gma.hi().clone(),
        signature: gma.signature().to_vec(),
        equations: gma.equations().to_vec(),
        lhs_forms: gma.lhs_forms().to_vec(),
    }
}

fn gma_from_message(message: GmaMessage) -> GmaSystem {
    GmaSystem::from_parts(
        pool_from_message(message.xd),
        pool_from_message(message.xd_a),
        pool_from_message(message.xd_t),
        pool_from_message(message.xi),
        message.alpha,
        message.beta,
        message.gd,
        message.gi,
        message.hd,
        message.hi,
        message.signature,
        message.equations,
        message.lhs_forms,
    )
}

fn case_to_message(case: &Case) -> CaseMessage {
    let ssys = case.ssystem();
    CaseMessage {
        name: case.name().to_string(),
        signature: case.signature().to_vec(),
        case_number: case.case_number(),
        ssystem: SSystemMessage {
            xd: pool_to_message(ssys.xd()),
            xi: pool_to_message(ssys.xi()),
            alpha: ssys.alpha().clone(),
            beta: ssys.beta().clone(),
            gd: ssys.gd().clone(),
            gi: ssys.gi().clone(),
            hd: ssys.hd().clone(),
            hi: ssys.hi().clone(),
        },
        cd: case.cd().clone(),
        ci: case.ci().clone(),
        delta: case.delta().clone(),
    }
}

fn case_from_message(message: CaseMessage) -> Case {
    let ssys = SSystem::from_parts(
        Arc::new(pool_from_message(message.ssystem.xd)),
        Arc::new(pool_from_message(message.ssystem.xi)),
        message.ssystem.alpha,
        message.ssystem.beta,
        message.ssystem.gd,
        message.ssystem.gi,
        message.ssystem.hd,
        message.ssystem.hi,
    );
    Case::from_parts(
        message.name,
        ssys,
        message.cd,
        message.ci,
        message.delta,
        message.signature,
        message.case_number,
    )
}

fn design_space_to_message(ds: &DesignSpace) -> DesignSpaceMessage {
    let cyclical_cases = ds
        .cyclical_cases()
        .entries()
        .into_iter()
        .map(|(_, cyclical)| cyclical_to_message(&cyclical))
        .collect();
    let (cd, ci, delta) = match ds.extra_conditions() {
        Some((cd, ci, delta)) => (Some(cd.clone()), Some(ci.clone()), Some(delta.clone())),
        None => (None, None, None),
    };
    DesignSpaceMessage {
        gma: gma_to_message(ds.gma()),
        cd,
        ci,
        delta,
        serial: ds.serial(),
        cyclical: ds.cyclical(),
        resolve_codominance: ds.resolve_codominance(),
        number_of_cases: ds.number_of_cases(),
        validity_computed: ds.validity_is_computed(),
        valid_cases: ds.valid_case_numbers(),
        cyclical_computed: ds.cyclical_cases_are_computed(),
        cyclical_cases,
        case_prefix: ds.case_prefix().map(str::to_string),
        denominator_limit: ds.enumeration_opts().denominator_limit,
    }
}

fn cyclical_to_message(cyclical: &CyclicalCase) -> CyclicalCaseMessage {
    CyclicalCaseMessage {
        case_number: cyclical.case_number(),
        original: case_to_message(cyclical.original_case()),
        internal: design_space_to_message(cyclical.internal_design_space()),
    }
}

fn design_space_from_message(message: DesignSpaceMessage, depth: usize) -> DesignSpace {
    let mut ds = DesignSpace::from_gma(gma_from_message(message.gma));
    if let (Some(cd), Some(ci), Some(delta)) = (&message.cd, &message.ci, &message.delta) {
        ds.add_conditions(cd, ci, delta)
            .expect("encoded conditions fit the encoded system");
    }
    ds.set_opts(SweepOpts {
        serial: message.serial,
        cyclical: message.cyclical,
        resolve_codominance: message.resolve_codominance,
        ..SweepOpts::default()
    });
    ds.set_case_prefix(message.case_prefix);
    ds.set_enumeration_opts(EnumerationOpts {
        denominator_limit: message.denominator_limit,
        ..EnumerationOpts::default()
    });
    ds.set_depth(depth);
    for number in message.valid_cases {
        ds.record_valid_case(number);
    }
    if message.validity_computed {
        ds.mark_validity_computed();
    }
    for cyclical in message.cyclical_cases {
        let case_number = cyclical.case_number;
        let original = case_from_message(cyclical.original);
        let internal = design_space_from_message(cyclical.internal, depth + 1);
        ds.record_cyclical_case(
            case_number,
            Arc::new(CyclicalCase::from_parts(case_number, original, internal)),
        );
    }
    if message.cyclical_computed {
        ds.mark_cyclical_computed();
    }
    ds
}
