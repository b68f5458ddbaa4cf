// crates/manifest-gate-core/tests/proptest_version.rs
// ============================================================================
// Module: Version Property-Based Tests
// Description: Randomized checks for version ordering and requirements.
// Purpose: Ensure comparisons agree with numeric segment ordering.
// ============================================================================
//! ## Overview
//! Randomized checks for version ordering and requirement matching.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

use manifest_gate_core::Requirement;
use manifest_gate_core::Version;
use proptest::prelude::*;

fn render(segments: &[u32]) -> String {
    segments.iter().map(ToString::to_string).collect::<Vec<_>>().join(".")
}

proptest! {
    #[test]
    fn numeric_versions_order_like_their_segments(
        a in proptest::collection::vec(0u32 .. 50, 3),
        b in proptest::collection::vec(0u32 .. 50, 3),
    ) {
        let left = Version::parse(&render(&a)).unwrap();
        let right = Version::parse(&render(&b)).unwrap();
        prop_assert_eq!(left.cmp(&right), a.cmp(&b));
    }

    #[test]
    fn trailing_zero_segments_are_insignificant(
        segments in proptest::collection::vec(0u32 .. 100, 1 .. 4),
        zeros in 1usize .. 4,
    ) {
        let base = render(&segments);
        let padded = format!("{base}{}", ".0".repeat(zeros));
        prop_assert_eq!(Version::parse(&base).unwrap(), Version::parse(&padded).unwrap());
    }

    #[test]
    fn pessimistic_requirements_pin_the_prefix(
        major in 0u32 .. 20,
        minor in 0u32 .. 20,
        patch in 0u32 .. 20,
    ) {
        let requirement = Requirement::parse(&format!("~> {major}.{minor}")).unwrap();
        let inside = Version::parse(&format!("{major}.{minor}.{patch}")).unwrap();
        let outside = Version::parse(&format!("{}.0", major + 1)).unwrap();
        prop_assert!(requirement.is_satisfied_by(&inside));
        prop_assert!(!requirement.is_satisfied_by(&outside));
    }

    #[test]
    fn bare_versions_mean_equality(segments in proptest::collection::vec(0u32 .. 100, 1 .. 5)) {
        let text = render(&segments);
        let requirement = Requirement::parse(&text).unwrap();
        prop_assert!(requirement.is_satisfied_by(&Version::parse(&text).unwrap()));
        let bumped = Version::parse(&format!("{text}.1")).unwrap();
        prop_assert!(!requirement.is_satisfied_by(&bumped));
    }

    #[test]
    fn arbitrary_input_never_panics(raw in ".{0,32}") {
        let _ = Version::parse(&raw);
        let _ = Requirement::parse(&raw);
    }
}
