//! End-to-end scenarios over whole design spaces.

use dst_toolbox::cases::intersection::intersection_is_valid;
use dst_toolbox::codec;
use dst_toolbox::configs::opts::EnumerationOpts;
use dst_toolbox::designspace::DesignSpace;
use dst_toolbox::geometry::enumerate::enumerate_vertices;
use dst_toolbox::geometry::slice2d::vertices_for_2d_slice;
use dst_toolbox::math::matrix::Matrix;
use dst_toolbox::symbols::variable::VariablePool;

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn pool(entries: &str) -> VariablePool {
    VariablePool::by_parsing_string(entries).unwrap()
}

#[test]
fn two_term_toggle_has_one_valid_case() {
    init_logging();
    let ds = DesignSpace::by_parsing_strings(
        &["dX1/dt = a1 - b1*X1", "dX2/dt = a2 - b2*X2"],
        None,
    )
    .unwrap();
    assert_eq!(ds.signature(), &[1, 1, 1, 1]);
    assert_eq!(ds.number_of_cases(), 1);
    ds.calculate_validity_of_cases();
    assert_eq!(ds.valid_case_numbers(), vec![1]);

    let case = ds.case_with_case_number(1).unwrap();
    assert!(case.is_valid());
    assert_eq!(case.number_of_conditions(), 0);

    // Over a box in every independent variable, the region is the box
    // itself: its vertices are the 2^4 corners.
    let lower = pool("a1 : 1e-2, b1 : 1e-2, a2 : 1e-2, b2 : 1e-2");
    let upper = pool("a1 : 1e2, b1 : 1e2, a2 : 1e2, b2 : 1e2");
    let corners =
        enumerate_vertices(&case, &lower, &upper, &EnumerationOpts::default()).unwrap();
    assert_eq!(corners.len(), 16);
}

#[test]
fn bistable_pair_keeps_the_symmetric_cases() {
    init_logging();
    let mut ds = DesignSpace::by_parsing_strings(
        &["dX1/dt = a + X2^2 - X1", "dX2/dt = a + X1^2 - X2"],
        None,
    )
    .unwrap();
    ds.set_serial(true);
    assert_eq!(ds.signature(), &[2, 1, 2, 1]);
    assert_eq!(ds.number_of_cases(), 4);
    ds.calculate_validity_of_cases();
    let mut valid = ds.valid_case_numbers();
    valid.sort_unstable();
    assert_eq!(valid, vec![1, 4]);

    // Universal condition count: sum of (sigma_j - 1) plus extra rows.
    for n in 1..=4 {
        let case = ds.case_with_case_number(n).unwrap();
        assert_eq!(case.number_of_conditions(), 2);
        let block = case.boundaries().unwrap();
        assert_eq!(block.u.rows(), 2);
        assert_eq!(block.u.cols(), 1);
    }

    // A single-case intersection decides exactly like the case.
    let one = ds.case_with_case_number(1).unwrap();
    assert_eq!(intersection_is_valid(&[&one]), one.is_valid());
}

#[test]
fn serial_and_parallel_sweeps_agree() {
    init_logging();
    let equations = ["dX1/dt = a + X2^2 - X1", "dX2/dt = a + X1^2 - X2"];
    let mut serial = DesignSpace::by_parsing_strings(&equations, None).unwrap();
    serial.set_serial(true);
    serial.calculate_validity_of_cases();
    let mut expected = serial.valid_case_numbers();
    expected.sort_unstable();

    for _ in 0..3 {
        let parallel = DesignSpace::by_parsing_strings(&equations, None).unwrap();
        parallel.calculate_validity_of_cases();
        let mut got = parallel.valid_case_numbers();
        got.sort_unstable();
        assert_eq!(got, expected);
    }
}

#[test]
fn codominance_flag_rescues_equal_fluxes() {
    init_logging();
    let equations = ["dX/dt = k + k - b*X"];
    let plain = DesignSpace::by_parsing_strings(&equations, None).unwrap();
    plain.calculate_validity_of_cases();
    assert_eq!(plain.number_of_valid_cases(), 0);
    let case = plain.case_with_case_number(1).unwrap();
    assert_eq!(case.zero_boundary_indices().unwrap().len(), 1);

    let mut resolving = DesignSpace::by_parsing_strings(&equations, None).unwrap();
    resolving.set_resolve_codominance(true);
    resolving.set_serial(true);
    resolving.calculate_validity_of_cases();
    // The combined flux keeps exactly one of the two equal-term cases.
    assert_eq!(resolving.valid_case_numbers(), vec![2]);
    let normalized = resolving.case_with_case_number(2).unwrap();
    assert_eq!(normalized.delta().value(0, 0), 2f64.log10());
    assert!(normalized.is_valid());
}

#[test]
fn cyclical_cases_resolve_through_internal_spaces() {
    init_logging();
    // A three-species interconversion cycle with equal fluxes: choosing
    // the cycle fluxes as dominant cancels them and the dominant system
    // goes singular.
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
    assert_eq!(ds.number_of_cases(), 4);

    ds.calculate_cyclical_cases();
    // Both cases that keep k*X3 dominant are singular and recorded.
    assert_eq!(ds.number_of_cyclical_cases(), 2);
    let cyclical = ds.cyclical_case_with_case_number(2).unwrap();
    assert!(!cyclical.original_case().has_solution());
    assert!(cyclical.is_valid());

    ds.calculate_validity_of_cases();
    let mut valid = ds.valid_case_numbers();
    valid.sort_unstable();
    // Case 3 is plainly valid; case 2 is valid through its resolution.
    assert_eq!(valid, vec![2, 3]);

    // Resolution replaces the cyclical case by composite sub-case names.
    let resolved = ds.calculate_all_valid_cases_by_resolving_cyclical_cases();
    let mut names = resolved.names();
    names.sort();
    assert_eq!(names, vec!["2_1", "3"]);

    // Composite identifiers address sub-cases directly.
    let subcase = ds.case_with_identifier("2_1").unwrap();
    assert_eq!(subcase.case_number(), 1);
    assert!(subcase.is_valid());
}

#[test]
fn redundant_rows_do_not_change_the_polygon() {
    init_logging();
    let equations = ["dX1/dt = a + X2^2 - b*X1", "dX2/dt = a + X1^2 - X2"];
    let lower = pool("a : 1e-3, b : 1e-3");
    let upper = pool("a : 1e3, b : 1e3");

    let plain = DesignSpace::by_parsing_strings(&equations, None).unwrap();
    let case = plain.case_with_case_number(1).unwrap();
    let baseline = vertices_for_2d_slice(&case, None, &lower, &upper, "a", "b").unwrap();
    assert!(baseline.len() >= 3);
    let pair_count = case.number_of_boundaries() + 4;
    assert!(baseline.len() <= pair_count * (pair_count - 1) / 2);

    // Append a copy of an existing boundary row; the polygon may gain
    // duplicate candidate intersections but not new vertices.
    let mut redundant = DesignSpace::by_parsing_strings(&equations, None).unwrap();
    let block = case.boundaries().unwrap();
    let cd = Matrix::new(1, 2);
    let ci = block.u.submatrix(&[0], &[0, 1]).unwrap();
    let delta = block.zeta.submatrix(&[0], &[0]).unwrap();
    redundant.add_conditions(&cd, &ci, &delta).unwrap();
    let case_redundant = redundant.case_with_case_number(1).unwrap();
    let repeated =
        vertices_for_2d_slice(&case_redundant, None, &lower, &upper, "a", "b").unwrap();

    assert_eq!(baseline.len(), repeated.len());
    for vertex in baseline.iter() {
        assert!(
            repeated
                .iter()
                .any(|other| other
                    .iter()
                    .zip(vertex)
                    .all(|(x, y)| (x - y).abs() < 1e-9)),
            "vertex {vertex:?} lost after adding a redundant row"
        );
    }
}

#[test]
fn pruned_and_full_sweeps_match() {
    init_logging();
    let equations = ["dX1/dt = a + X2^2 - X1", "dX2/dt = a + X1^2 - X2"];
    let mut pruned_ds = DesignSpace::by_parsing_strings(&equations, None).unwrap();
    pruned_ds.set_serial(true);
    let mut pruned = pruned_ds.calculate_valid_cases_by_pruning().unwrap();
    pruned.sort_unstable();

    let full = DesignSpace::by_parsing_strings(&equations, None).unwrap();
    full.calculate_validity_of_cases();
    let mut swept = full.valid_case_numbers();
    swept.sort_unstable();
    assert_eq!(pruned, swept);
}

#[test]
fn envelope_round_trip_preserves_cyclical_resolution() {
    init_logging();
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
    ds.calculate_validity_of_cases();

    let bytes = codec::encode_design_space(&ds).unwrap();
    let decoded = codec::decode_design_space(&bytes).unwrap();
    assert_eq!(decoded.number_of_cyclical_cases(), ds.number_of_cyclical_cases());
    let mut expected = ds.valid_case_numbers();
    expected.sort_unstable();
    let mut got = decoded.valid_case_numbers();
    got.sort_unstable();
    assert_eq!(got, expected);
    // The embedded internal design space still resolves sub-cases.
    let resolved = decoded.calculate_all_valid_cases_by_resolving_cyclical_cases();
    let mut names = resolved.names();
    names.sort();
    assert_eq!(names, vec!["2_1", "3"]);

    let again = codec::encode_design_space(&decoded).unwrap();
    assert_eq!(bytes, again);
}
