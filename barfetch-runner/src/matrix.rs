//! Task matrix construction: symbols × timeframes, resolved once against the
//! terminal's catalog.

use barfetch_core::domain::Timeframe;

/// One (symbol, timeframe) unit of fetch-and-export work.
///
/// `requested` is the user's spelling; `resolved` the terminal's exact-cased
/// name when a case-insensitive match exists. Tasks are built once per run
/// and never mutated, only annotated with an outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub requested: String,
    pub resolved: Option<String>,
    pub timeframe: Timeframe,
}

impl Task {
    /// Canonical symbol when resolved, the user's spelling otherwise.
    pub fn symbol(&self) -> &str {
        self.resolved.as_deref().unwrap_or(&self.requested)
    }

    /// Stable result key: `{symbol}_{timeframe}`.
    pub fn key(&self) -> String {
        format!("{}_{}", self.symbol(), self.timeframe)
    }
}

/// Expand requested symbols × timeframes into the ordered task list.
///
/// Outer iteration follows symbol input order, inner iteration timeframe
/// input order. Resolution is case-insensitive first-match against the
/// catalog, performed once per symbol; a catalog with case-insensitive
/// duplicates resolves to whichever entry the terminal listed first.
pub fn build_matrix(
    symbols: &[String],
    timeframes: &[Timeframe],
    catalog: &[String],
) -> Vec<Task> {
    let mut tasks = Vec::with_capacity(symbols.len() * timeframes.len());
    for requested in symbols {
        let resolved = catalog
            .iter()
            .find(|name| name.eq_ignore_ascii_case(requested))
            .cloned();
        for &timeframe in timeframes {
            tasks.push(Task {
                requested: requested.clone(),
                resolved: resolved.clone(),
                timeframe,
            });
        }
    }
    tasks
}
