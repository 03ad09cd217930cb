/// Target URLs and filter keywords as selected for one submission.
///
/// Construction deduplicates while preserving first-seen order, so the
/// resulting config is stable for a given input sequence.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct JobSelection {
    pub targets: Vec<String>,
    pub keywords: Vec<String>,
}

impl JobSelection {
    pub fn new<T, K>(targets: T, keywords: K) -> Self
    where
        T: IntoIterator<Item = String>,
        K: IntoIterator<Item = String>,
    {
        Self {
            targets: dedupe_preserving_order(targets),
            keywords: dedupe_preserving_order(keywords),
        }
    }
}

/// Configuration submitted to the remote scraping service.
///
/// Immutable once built; a new submission rebuilds it from scratch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobConfig {
    pub targets: Vec<String>,
    pub keywords: Vec<String>,
    /// Targets processed per remote batch, derived from the target count.
    pub batch_size: u32,
    pub max_retries: u32,
    /// The remote job may run for an unbounded time; individual network
    /// calls still carry their own timeouts.
    pub no_timeout: bool,
    /// Ask the service to keep partial output if it is interrupted.
    pub save_partial: bool,
}

impl JobConfig {
    pub fn from_selection(selection: &JobSelection, max_retries: u32) -> Self {
        Self {
            targets: selection.targets.clone(),
            keywords: selection.keywords.clone(),
            batch_size: dynamic_batch_size(selection.targets.len()),
            max_retries,
            no_timeout: true,
            save_partial: true,
        }
    }
}

/// `clamp(ceil(targets / 5), 1, 5)`: one batch per five targets, capped.
fn dynamic_batch_size(target_count: usize) -> u32 {
    (target_count.div_ceil(5)).clamp(1, 5) as u32
}

fn dedupe_preserving_order<I>(values: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut seen = std::collections::HashSet::new();
    values
        .into_iter()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .filter(|v| seen.insert(v.clone()))
        .collect()
}
