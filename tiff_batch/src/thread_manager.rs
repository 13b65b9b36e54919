//! Worker count selection.

/// Host parallelism, never less than one.
pub fn default_threads() -> usize {
    num_cpus::get().max(1)
}

/// A requested count of zero falls back to [`default_threads`].
pub fn resolve_threads(requested: Option<usize>) -> usize {
    match requested {
        Some(n) if n > 0 => n,
        _ => default_threads(),
    }
}
