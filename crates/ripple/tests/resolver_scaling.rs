//! Call resolution must scale with the number of rows, not their product.

use std::time::{Duration, Instant};

use ripple::resolver::{CallResolver, CallSiteRow, DefinitionRow};

/// Names every function in the ambiguous workload calls; each is defined
/// in `SHARED_COPIES` files.
const SHARED_NAMES: usize = 4;
const SHARED_COPIES: usize = 3;

struct Workload {
    files: Vec<String>,
    names: Vec<String>,
    shared: Vec<(String, String)>,
}

impl Workload {
    fn new(n: usize) -> Self {
        let shared = (0..SHARED_NAMES)
            .flat_map(|j| {
                (0..SHARED_COPIES).map(move |c| (format!("util/copy{c}.py"), format!("shared_{j}")))
            })
            .collect();
        Self {
            files: (0..n).map(|i| format!("pkg/mod{}.py", i % 97)).collect(),
            names: (0..n).map(|i| format!("func_{i}")).collect(),
            shared,
        }
    }

    fn definitions(&self) -> Vec<DefinitionRow<'_>> {
        let unique = self
            .files
            .iter()
            .zip(&self.names)
            .enumerate()
            .map(|(i, (file, name))| DefinitionRow {
                file,
                name,
                start_line: u32::try_from(i).unwrap() + 1,
            });
        let shared = self.shared.iter().map(|(file, name)| DefinitionRow {
            file,
            name,
            start_line: 1,
        });
        unique.chain(shared).collect()
    }

    /// Function i calls function i+1.
    fn chain_sites(&self) -> Vec<CallSiteRow<'_>> {
        let n = self.names.len();
        (0..n)
            .map(|i| CallSiteRow {
                caller_file: &self.files[i],
                caller_name: &self.names[i],
                called_name: &self.names[(i + 1) % n],
                call_line: u32::try_from(i).unwrap() + 2,
            })
            .collect()
    }

    /// Function i calls one of the shared names, which matches every copy.
    fn shared_sites(&self) -> Vec<CallSiteRow<'_>> {
        (0..self.names.len())
            .map(|i| CallSiteRow {
                caller_file: &self.files[i],
                caller_name: &self.names[i],
                called_name: &self.shared[(i % SHARED_NAMES) * SHARED_COPIES].1,
                call_line: u32::try_from(i).unwrap() + 3,
            })
            .collect()
    }
}

fn best_of_five(n: usize, shared: bool) -> (Duration, usize, usize) {
    let workload = Workload::new(n);
    let definitions = workload.definitions();
    let sites = if shared {
        workload.shared_sites()
    } else {
        workload.chain_sites()
    };

    let mut best = Duration::MAX;
    let mut resolved = 0;
    let mut ambiguous = 0;
    for _ in 0..5 {
        let start = Instant::now();
        let resolver = CallResolver::new(&definitions);
        let (rows, stats) = resolver.resolve(&sites);
        best = best.min(start.elapsed());
        resolved = rows.len();
        ambiguous = stats.ambiguous_sites;
    }
    (best, resolved, ambiguous)
}

fn assert_near_linear(small: Duration, large: Duration) {
    // 100x the rows; a pairwise join would be 10,000x slower
    let ratio = large.as_secs_f64() / small.as_secs_f64().max(1e-9);
    assert!(
        ratio < 2500.0,
        "10k rows took {large:?} ({ratio:.0}x the 100 row time of {small:?})"
    );
}

#[test]
fn resolution_scales_near_linearly() {
    let (small, small_rows, _) = best_of_five(100, false);
    let (large, large_rows, _) = best_of_five(10_000, false);

    assert_eq!(small_rows, 100);
    assert_eq!(large_rows, 10_000);
    assert_near_linear(small, large);
}

#[test]
fn ambiguous_resolution_scales_near_linearly() {
    let (small, small_rows, small_ambiguous) = best_of_five(100, true);
    let (large, large_rows, large_ambiguous) = best_of_five(10_000, true);

    assert_eq!(small_rows, 100 * SHARED_COPIES);
    assert_eq!(large_rows, 10_000 * SHARED_COPIES);
    assert_eq!(small_ambiguous, 100);
    assert_eq!(large_ambiguous, 10_000);
    assert_near_linear(small, large);
}
