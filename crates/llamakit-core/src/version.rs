//! Lenient dotted-version comparison
//!
//! Used for driver-version-vs-minimum checks and for ordering release tags.
//! Release tags come in shapes like `b7523` or `v1.2.0`, so each segment is
//! compared by its numeric content; segments with no digits count as zero and
//! missing trailing segments count as zero. Comparison never fails.

use std::cmp::Ordering;

/// Compare two dotted version strings numerically.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let parts_a: Vec<&str> = a.split('.').collect();
    let parts_b: Vec<&str> = b.split('.').collect();

    let max_len = parts_a.len().max(parts_b.len());

    for i in 0..max_len {
        let num_a = parts_a.get(i).map(|s| segment_value(s)).unwrap_or(0);
        let num_b = parts_b.get(i).map(|s| segment_value(s)).unwrap_or(0);

        match num_a.cmp(&num_b) {
            Ordering::Equal => continue,
            other => return other,
        }
    }

    Ordering::Equal
}

/// Numeric value of one version segment, ignoring a leading tag prefix
/// (`b7523` -> 7523, `v1` -> 1, `alpha` -> 0).
fn segment_value(segment: &str) -> u64 {
    let digits: String = segment
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse::<u64>().unwrap_or(0)
}

/// Numeric build number of a release tag (`b7523` -> 7523), 0 if none.
pub fn build_number(tag: &str) -> u64 {
    let numeric = tag.trim_start_matches(|c: char| !c.is_ascii_digit());
    let digits: String = numeric.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse::<u64>().unwrap_or(0)
}
