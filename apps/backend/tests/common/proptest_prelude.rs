// Shared proptest configuration.
//
// PROPTEST_CASES overrides the case count (default 64); validation inputs are
// cheap so the default runs more cases than a DB-backed property would.
// Generators build valid inputs directly instead of filtering with prop_assume!.

use proptest::prelude::ProptestConfig;

pub fn proptest_prelude_config() -> ProptestConfig {
    let cases = std::env::var("PROPTEST_CASES")
        .ok()
        .and_then(|s| s.parse::<u32>().ok())
        .unwrap_or(64)
        .max(1);

    ProptestConfig {
        // No regression files from integration binaries
        failure_persistence: None,
        cases,
        ..ProptestConfig::default()
    }
}
