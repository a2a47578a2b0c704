//! Shared fixture files for tests and benchmarks.

use std::path::PathBuf;

/// Two segments along the equator, `S1: (0,0)-(0,1)` and `S2: (0,1)-(0,2)`.
pub const EQUATOR_PAIR: &str = "equator_pair.json";

/// A 3x3 block of streets with one-block (~111m) spacing, plus a detached spur.
pub const CITY_BLOCK: &str = "city_block.json";

/// An eastward drive along the middle street of [`CITY_BLOCK`].
pub const CITY_BLOCK_TRACE: &str = "city_block_trace.json";

/// Resolves a fixture name into its absolute path on disk.
pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("data")
        .join(name)
}
