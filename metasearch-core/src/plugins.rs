//! Built-in [`ResultPlugin`]s.

use crate::container::ResultPlugin;
use crate::types::SearchResult;
use url::Url;

/// Query parameter name prefixes treated as trackers.
///
/// Covers email marketing (`wkey`, `wemail`), HubSpot, and Reddit's
/// `tl` language parameters. Google Analytics `utm_*` is matched separately
/// because it needs a non-empty suffix.
const TRACKER_PREFIXES: &[&str] = &[
    "wkey",
    "wemail",
    "_hsenc",
    "_hsmi",
    "hsCtaTracking",
    "__hssc",
    "__hstc",
    "__hsfp",
    "tl",
];

fn is_tracker(name: &str) -> bool {
    name.strip_prefix("utm_").is_some_and(|rest| !rest.is_empty())
        || TRACKER_PREFIXES.iter().any(|prefix| name.starts_with(prefix))
}

/// Strip tracker parameters from `raw`.
///
/// Returns `None` when the URL does not parse or carries no tracker, so
/// callers keep the original text byte for byte.
pub fn strip_trackers(raw: &str) -> Option<String> {
    let mut parsed = Url::parse(raw).ok()?;
    let pairs: Vec<(String, String)> = parsed.query_pairs().into_owned().collect();
    if !pairs.iter().any(|(name, _)| is_tracker(name)) {
        return None;
    }

    let kept: Vec<(String, String)> = pairs
        .into_iter()
        .filter(|(name, _)| !is_tracker(name))
        .collect();
    if kept.is_empty() {
        parsed.set_query(None);
    } else {
        parsed.query_pairs_mut().clear().extend_pairs(kept);
    }
    Some(parsed.into())
}

/// Removes tracking arguments from result URLs.
///
/// The container runs it on each result and each sitelink separately.
#[derive(Debug, Default, Clone, Copy)]
pub struct TrackerUrlRemover;

impl ResultPlugin for TrackerUrlRemover {
    fn id(&self) -> &str {
        "tracker_url_remover"
    }

    fn on_result(&self, result: &mut SearchResult) -> bool {
        if let Some(cleaned) = result.url.as_deref().and_then(strip_trackers) {
            tracing::trace!(url = %cleaned, "tracker parameters removed");
            result.url = Some(cleaned);
        }
        true
    }
}
