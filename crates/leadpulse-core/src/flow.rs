//! Visit ↔ session correlation and page-transition reconstruction.
//!
//! A visit and its session are written by two independent requests. The
//! tracking snippet stamps the visit with the session's `startTime`
//! (`sessionStartTime`); that stamp is the only join key. Visits recorded
//! without it are reported as unmatched rather than guessed at.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::session::{Session, ValidatedSession};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowNode {
    pub path: String,
    /// Sum of `timeSpent` (ms) over every page view of this path, saturating
    /// at `i64::MAX`.
    pub time_spent: i64,
    /// Number of page views recorded for this path.
    pub page_views: u64,
    /// Next path → number of transitions.
    pub transitions: BTreeMap<String, u64>,
}

/// Directed page-transition graph of one session.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PageFlow {
    /// Nodes in order of first appearance in the navigation path.
    pub nodes: Vec<FlowNode>,
}

impl PageFlow {
    pub fn from_session(session: &Session) -> Self {
        let mut nodes: Vec<FlowNode> = Vec::new();
        let mut index: HashMap<&str, usize> = HashMap::new();

        for path in &session.navigation_path {
            if !index.contains_key(path.as_str()) {
                index.insert(path.as_str(), nodes.len());
                nodes.push(FlowNode {
                    path: path.clone(),
                    time_spent: 0,
                    page_views: 0,
                    transitions: BTreeMap::new(),
                });
            }
        }

        for pair in session.navigation_path.windows(2) {
            if let Some(&i) = index.get(pair[0].as_str()) {
                *nodes[i].transitions.entry(pair[1].clone()).or_default() += 1;
            }
        }

        // Page views outside the navigation path have no node to land on.
        for view in &session.page_views {
            if let Some(&i) = index.get(view.path.as_str()) {
                nodes[i].time_spent = nodes[i].time_spent.saturating_add(view.time_spent);
                nodes[i].page_views += 1;
            }
        }

        Self { nodes }
    }

    pub fn node(&self, path: &str) -> Option<&FlowNode> {
        self.nodes.iter().find(|n| n.path == path)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnmatchedReason {
    /// The visit carries no session key.
    MissingSessionKey,
    /// No stored session has the visit's key as its `startTime`.
    NoMatchingSession,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Correlation {
    Matched { session_id: i64, flow: PageFlow },
    Unmatched(UnmatchedReason),
}

/// Find the session a visit belongs to and build its page flow.
///
/// `sessions` is expected in `startTime` order; when several sessions share a
/// `startTime` the first one wins.
pub fn correlate(session_key: Option<i64>, sessions: &[ValidatedSession]) -> Correlation {
    let Some(key) = session_key else {
        return Correlation::Unmatched(UnmatchedReason::MissingSessionKey);
    };
    match sessions.iter().find(|s| s.session.start_time == key) {
        Some(found) => Correlation::Matched {
            session_id: key,
            flow: PageFlow::from_session(&found.session),
        },
        None => Correlation::Unmatched(UnmatchedReason::NoMatchingSession),
    }
}
