// SPDX-License-Identifier: MPL-2.0

use std::io::Write;

use log::LevelFilter;
use version_solver::{
    resolve, DefaultStringReporter, DerivationTree, External, Map, OfflineSource, Reporter,
    SolveError, VersionRange,
};

fn init_log() {
    let _ = env_logger::builder()
        .filter_level(LevelFilter::Trace)
        .format(|buf, record| writeln!(buf, "{}", record.args()))
        .is_test(true)
        .try_init();
}

fn expect_no_solution(
    result: Result<Map<&'static str, u32>, SolveError<&'static str, u32>>,
) -> DerivationTree<&'static str, u32> {
    match result {
        Err(SolveError::NoSolution(tree)) => tree,
        other => panic!("expected no solution, got {:?}", other.map_err(|e| e.to_string())),
    }
}

/// Collect the dependency edges cited by a failure explanation.
fn dependency_edges(
    tree: &DerivationTree<&'static str, u32>,
    edges: &mut Vec<(&'static str, u32, String)>,
) {
    match tree {
        DerivationTree::External(External::Dependency(package, version, dep)) => {
            edges.push((*package, *version, dep.to_string()));
        }
        DerivationTree::External(_) => {}
        DerivationTree::Derived(derived) => {
            dependency_edges(&derived.cause1, edges);
            dependency_edges(&derived.cause2, edges);
        }
    }
}

#[test]
fn trivial_success() {
    init_log();
    let mut source = OfflineSource::<&str, u32>::new("root");
    source.add_dependencies("root", 1u32, [("a", VersionRange::any())]);
    source.add_dependencies("a", 1u32, []);

    let computed_solution = resolve(&source).unwrap();

    let mut expected_solution = Map::default();
    expected_solution.insert("a", 1);
    assert_eq!(expected_solution, computed_solution);
}

#[test]
fn transitive_success() {
    init_log();
    let mut source = OfflineSource::<&str, u32>::new("root");
    source.add_dependencies("root", 1u32, [("a", VersionRange::higher_than(1u32))]);
    source.add_dependencies("a", 2u32, [("b", VersionRange::higher_than(2u32))]);
    source.add_dependencies("b", 1u32, []);
    source.add_dependencies("b", 2u32, []);

    let computed_solution = resolve(&source).unwrap();

    let mut expected_solution = Map::default();
    expected_solution.insert("a", 2);
    expected_solution.insert("b", 2);
    assert_eq!(expected_solution, computed_solution);
}

/// The preferred candidate `a 2` requires a missing `c 2`; the solver must
/// learn that and back off to `a 1`.
#[test]
fn backjump_after_missing_version() {
    init_log();
    let mut source = OfflineSource::<&str, u32>::new("root");
    source.add_dependencies("root", 1u32, [("a", VersionRange::any())]);
    source.add_dependencies("a", 2u32, [("c", VersionRange::exact(2u32))]);
    source.add_dependencies("a", 1u32, []);
    source.add_dependencies("c", 1u32, []);

    let computed_solution = resolve(&source).unwrap();

    let mut expected_solution = Map::default();
    expected_solution.insert("a", 1);
    assert_eq!(expected_solution, computed_solution);
}

/// `root` requires `a >= 2` and `a < 2` at the same time, which leaves no
/// permissible range for `a` at all.
#[test]
fn unsatisfiable_overlap() {
    init_log();
    let impossible = VersionRange::higher_than(2u32)
        .intersection(&VersionRange::strictly_lower_than(2u32));
    assert!(impossible.is_empty());

    let mut source = OfflineSource::<&str, u32>::new("root");
    source.add_dependencies("root", 1u32, [("a", impossible)]);
    source.add_dependencies("a", 1u32, []);
    source.add_dependencies("a", 2u32, []);

    let tree = expect_no_solution(resolve(&source));
    let report = DefaultStringReporter::report(&tree);
    assert!(report.contains("depends on a none"), "report: {}", report);
    assert!(report.contains("version solving failed"), "report: {}", report);
}

/// A negated interval produces a union with a hole in the middle; the
/// solver picks the source-preferred candidate outside the hole.
#[test]
fn union_producing_invert() {
    init_log();
    let hole = VersionRange::between(2u32, 5u32).complement();

    let mut source = OfflineSource::<&str, u32>::new("root");
    source.add_dependencies("root", 1u32, [("a", hole)]);
    source.add_dependencies("a", 1u32, []);
    source.add_dependencies("a", 3u32, []);
    source.add_dependencies("a", 6u32, []);

    let computed_solution = resolve(&source).unwrap();

    let mut expected_solution = Map::default();
    expected_solution.insert("a", 6);
    assert_eq!(expected_solution, computed_solution);
}

/// `a` and `b` pull `shared` towards different exact versions; the failure
/// explanation must cite both dependency edges.
#[test]
fn conflict_across_packages() {
    init_log();
    let mut source = OfflineSource::<&str, u32>::new("root");
    source.add_dependencies(
        "root",
        1u32,
        [("a", VersionRange::any()), ("b", VersionRange::any())],
    );
    source.add_dependencies("a", 1u32, [("shared", VersionRange::exact(1u32))]);
    source.add_dependencies("b", 1u32, [("shared", VersionRange::exact(2u32))]);
    source.add_dependencies("shared", 1u32, []);
    source.add_dependencies("shared", 2u32, []);

    let tree = expect_no_solution(resolve(&source));
    let mut edges = Vec::new();
    dependency_edges(&tree, &mut edges);
    assert!(
        edges.contains(&("a", 1, "shared = 1".to_string())),
        "edges: {:?}",
        edges
    );
    assert!(
        edges.contains(&("b", 1, "shared = 2".to_string())),
        "edges: {:?}",
        edges
    );
}

// The following scenarios mirror the walkthroughs of
// https://github.com/dart-lang/pub/blob/master/doc/solver.md
// with `u32` versions (100 reads as 1.0.0, 110 as 1.1.0, and so on).

#[test]
fn no_conflict() {
    init_log();
    let mut source = OfflineSource::<&str, u32>::new("root");
    source.add_dependencies("root", 100u32, [("foo", VersionRange::between(100u32, 200u32))]);
    source.add_dependencies("foo", 100u32, [("bar", VersionRange::between(100u32, 200u32))]);
    source.add_dependencies("bar", 100u32, []);
    source.add_dependencies("bar", 200u32, []);

    let computed_solution = resolve(&source).unwrap();

    let mut expected_solution = Map::default();
    expected_solution.insert("foo", 100);
    expected_solution.insert("bar", 100);
    assert_eq!(expected_solution, computed_solution);
}

#[test]
fn avoiding_conflict_during_decision_making() {
    init_log();
    let mut source = OfflineSource::<&str, u32>::new("root");
    source.add_dependencies(
        "root",
        100u32,
        [
            ("foo", VersionRange::between(100u32, 200u32)),
            ("bar", VersionRange::between(100u32, 200u32)),
        ],
    );
    source.add_dependencies("foo", 110u32, [("bar", VersionRange::between(200u32, 300u32))]);
    source.add_dependencies("foo", 100u32, []);
    source.add_dependencies("bar", 100u32, []);
    source.add_dependencies("bar", 110u32, []);
    source.add_dependencies("bar", 200u32, []);

    let computed_solution = resolve(&source).unwrap();

    let mut expected_solution = Map::default();
    expected_solution.insert("foo", 100);
    expected_solution.insert("bar", 110);
    assert_eq!(expected_solution, computed_solution);
}

#[test]
fn conflict_resolution() {
    init_log();
    let mut source = OfflineSource::<&str, u32>::new("root");
    source.add_dependencies("root", 100u32, [("foo", VersionRange::higher_than(100u32))]);
    source.add_dependencies("foo", 200u32, [("bar", VersionRange::between(100u32, 200u32))]);
    source.add_dependencies("foo", 100u32, []);
    source.add_dependencies("bar", 100u32, [("foo", VersionRange::between(100u32, 200u32))]);

    let computed_solution = resolve(&source).unwrap();

    let mut expected_solution = Map::default();
    expected_solution.insert("foo", 100);
    assert_eq!(expected_solution, computed_solution);
}

#[test]
fn conflict_with_partial_satisfier() {
    init_log();
    let mut source = OfflineSource::<&str, u32>::new("root");
    // root 1.0.0 depends on foo ^1.0.0 and target ^2.0.0
    source.add_dependencies(
        "root",
        100u32,
        [
            ("foo", VersionRange::between(100u32, 200u32)),
            ("target", VersionRange::between(200u32, 300u32)),
        ],
    );
    // foo 1.1.0 depends on left ^1.0.0 and right ^1.0.0
    source.add_dependencies(
        "foo",
        110u32,
        [
            ("left", VersionRange::between(100u32, 200u32)),
            ("right", VersionRange::between(100u32, 200u32)),
        ],
    );
    source.add_dependencies("foo", 100u32, []);
    // left 1.0.0 depends on shared >=1.0.0
    source.add_dependencies("left", 100u32, [("shared", VersionRange::higher_than(100u32))]);
    // right 1.0.0 depends on shared <2.0.0
    source.add_dependencies(
        "right",
        100u32,
        [("shared", VersionRange::strictly_lower_than(200u32))],
    );
    source.add_dependencies("shared", 200u32, []);
    // shared 1.0.0 depends on target ^1.0.0
    source.add_dependencies("shared", 100u32, [("target", VersionRange::between(100u32, 200u32))]);
    source.add_dependencies("target", 200u32, []);
    source.add_dependencies("target", 100u32, []);

    let computed_solution = resolve(&source).unwrap();

    let mut expected_solution = Map::default();
    expected_solution.insert("foo", 100);
    expected_solution.insert("target", 200);
    assert_eq!(expected_solution, computed_solution);
}

/// a 0 depends on b and c; b 1 and c 1 each need a d version that does
/// not exist, so both fall back to version 0.
#[test]
fn double_choices() {
    init_log();
    let mut source = OfflineSource::<&str, u32>::new("a");
    source.add_dependencies("a", 0u32, [("b", VersionRange::any()), ("c", VersionRange::any())]);
    source.add_dependencies("b", 0u32, [("d", VersionRange::exact(0u32))]);
    source.add_dependencies("b", 1u32, [("d", VersionRange::exact(1u32))]);
    source.add_dependencies("c", 0u32, []);
    source.add_dependencies("c", 1u32, [("d", VersionRange::exact(2u32))]);
    source.add_dependencies("d", 0u32, []);

    let computed_solution = resolve(&source).unwrap();

    let mut expected_solution = Map::default();
    expected_solution.insert("b", 0);
    expected_solution.insert("c", 0);
    expected_solution.insert("d", 0);
    assert_eq!(expected_solution, computed_solution);
}
