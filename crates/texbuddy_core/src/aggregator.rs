//! Runs checkers and merges their findings into one problem set.

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;

use rayon::prelude::*;
use tracing::{debug, error, info, warn};

use crate::checker::{Checker, CheckerRegistry};
use crate::context::RunContext;
use crate::document::Document;
use crate::preprocessor::Preprocessor;
use crate::problem::{Problem, Severity};
use crate::whitelist::{Whitelist, WhitelistError};

/// The live problems of one run, indexed by uid.
#[derive(Debug, Clone, Default)]
pub struct ProblemSet {
    problems: HashMap<String, Problem>,
}

impl ProblemSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `problem`, replacing and returning one with the same uid.
    pub fn insert(&mut self, problem: Problem) -> Option<Problem> {
        self.problems.insert(problem.uid().to_string(), problem)
    }

    pub fn get(&self, uid: &str) -> Option<&Problem> {
        self.problems.get(uid)
    }

    pub fn len(&self) -> usize {
        self.problems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.problems.is_empty()
    }

    /// Iterates in no particular order. Use [`sorted`](Self::sorted) for display.
    pub fn iter(&self) -> impl Iterator<Item = &Problem> {
        self.problems.values()
    }

    /// Number of live problems with `key`.
    pub fn count_key(&self, key: &str) -> usize {
        self.iter().filter(|problem| problem.key() == key).count()
    }

    /// Returns true if any problem has ERROR severity.
    pub fn has_errors(&self) -> bool {
        self.iter().any(|problem| problem.severity() == Severity::Error)
    }

    /// Removes every problem whose key is whitelisted, returning how many were removed.
    pub fn apply_whitelist(&mut self, whitelist: &Whitelist) -> usize {
        let before = self.problems.len();
        self.problems
            .retain(|_, problem| !whitelist.contains(problem.key()));
        before - self.problems.len()
    }

    /// Whitelists the key of the problem with `uid` and removes all problems sharing it.
    ///
    /// Returns the number of removed problems; an unknown uid removes nothing
    /// and leaves the whitelist untouched.
    pub fn whitelist_uid(
        &mut self,
        uid: &str,
        whitelist: &mut Whitelist,
    ) -> Result<usize, WhitelistError> {
        let Some(problem) = self.problems.get(uid) else {
            warn!("No problem with uid {uid:?} to whitelist");
            return Ok(0);
        };
        let key = problem.key().to_string();
        whitelist.add(&key)?;
        let removed = self.apply_whitelist(whitelist);
        info!("Whitelisted '{key}', removed {removed} problem(s)");
        Ok(removed)
    }

    /// Problems in display order.
    pub fn sorted(&self) -> Vec<&Problem> {
        let mut problems: Vec<&Problem> = self.iter().collect();
        problems.sort_by(|a, b| a.display_cmp(b));
        problems
    }

    /// Consumes the set, returning problems in display order.
    pub fn into_sorted(self) -> Vec<Problem> {
        let mut problems: Vec<Problem> = self.problems.into_values().collect();
        problems.sort_by(Problem::display_cmp);
        problems
    }
}

impl Extend<Problem> for ProblemSet {
    fn extend<T: IntoIterator<Item = Problem>>(&mut self, iter: T) {
        for problem in iter {
            self.insert(problem);
        }
    }
}

impl FromIterator<Problem> for ProblemSet {
    fn from_iter<T: IntoIterator<Item = Problem>>(iter: T) -> Self {
        let mut set = Self::new();
        set.extend(iter);
        set
    }
}

/// Runs a fixed set of checkers over documents.
pub struct Aggregator {
    checkers: Vec<Box<dyn Checker>>,
}

impl Aggregator {
    pub fn new(checkers: Vec<Box<dyn Checker>>) -> Self {
        Self { checkers }
    }

    /// Creates an aggregator with the checkers `registry` enables for `ctx`.
    pub fn from_registry(registry: &CheckerRegistry, ctx: &RunContext) -> Self {
        Self::new(registry.select(ctx))
    }

    pub fn checker_names(&self) -> Vec<&str> {
        self.checkers.iter().map(|checker| checker.name()).collect()
    }

    /// Checks `document` with every checker.
    ///
    /// Checkers run in parallel and each returns its own list. The lists are
    /// merged afterwards on the calling thread: problems suppressed by a
    /// directive are dropped, the rest are keyed by uid (last writer wins).
    /// The whitelist is applied once, at the end.
    pub fn check(
        &self,
        ctx: &RunContext,
        document: &Document,
        whitelist: &Whitelist,
    ) -> ProblemSet {
        let preprocessor = Preprocessor::parse(document.source());

        let results: Vec<Vec<Problem>> = self
            .checkers
            .par_iter()
            .map(|checker| run_checker(checker.as_ref(), ctx, document))
            .collect();

        let mut set = ProblemSet::new();
        let mut suppressed = 0;
        for problem in results.into_iter().flatten() {
            if preprocessor.matches_filter(&problem) {
                suppressed += 1;
                continue;
            }
            set.insert(problem);
        }

        let whitelisted = set.apply_whitelist(whitelist);
        debug!(
            "{}: {} problem(s), {} suppressed by directives, {} whitelisted",
            document.path().display(),
            set.len(),
            suppressed,
            whitelisted
        );
        set
    }
}

impl std::fmt::Debug for Aggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Aggregator")
            .field("checkers", &self.checker_names())
            .finish()
    }
}

/// Runs one checker. Any failure, including a panic, yields no problems.
fn run_checker(checker: &dyn Checker, ctx: &RunContext, document: &Document) -> Vec<Problem> {
    let name = checker.name();
    let start = Instant::now();
    debug!("{name} started checks");

    match panic::catch_unwind(AssertUnwindSafe(|| checker.run(ctx, document))) {
        Ok(Ok(problems)) => {
            debug!(
                "{name} finished after {:.2?} with {} problem(s)",
                start.elapsed(),
                problems.len()
            );
            problems
        }
        Ok(Err(e)) => {
            warn!(
                "{name} failed after {:.2?} ({}): {e}",
                start.elapsed(),
                e.kind()
            );
            Vec::new()
        }
        Err(_) => {
            error!("{name} panicked after {:.2?}", start.elapsed());
            Vec::new()
        }
    }
}
