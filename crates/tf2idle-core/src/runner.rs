use std::collections::{BTreeMap, HashSet};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Mutex;

use rayon::{ThreadPool, ThreadPoolBuildError, ThreadPoolBuilder};
use tracing::{debug, error, warn};

use crate::account::Account;
use crate::error::Error;

/// One result per account, keyed by username.
pub type BatchResults<T> = BTreeMap<String, Result<T, Error>>;

/// Trait for reporting batch progress.
///
/// All methods have default no-op implementations.
pub trait BatchReporter: Send + Sync {
    fn on_batch_start(&self, _accounts: usize) {}
    fn on_task_start(&self, _username: &str) {}
    /// `error` is set when the account's operation failed outright.
    fn on_task_complete(&self, _username: &str, _error: Option<&Error>) {}
    fn on_batch_complete(&self) {}
}

/// No-op reporter for silent operation.
pub struct SilentReporter;

impl BatchReporter for SilentReporter {}

/// A fixed-width pool running one operation per account.
///
/// The width bounds how many game clients run at once; every operation
/// blocks its worker for its whole duration.
pub struct TaskRunner {
    pool: ThreadPool,
    width: usize,
}

impl TaskRunner {
    pub fn new(width: usize) -> Result<Self, ThreadPoolBuildError> {
        let width = width.max(1);
        let pool = ThreadPoolBuilder::new()
            .num_threads(width)
            .thread_name(|i| format!("tf2idle-worker-{}", i))
            .build()?;
        Ok(Self { pool, width })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Run `op` for every account and wait for all of them. A failing or
    /// panicking account never affects the others.
    ///
    /// A username listed twice runs once, with the first entry's password.
    pub fn run<T, F>(
        &self,
        accounts: &[Account],
        reporter: &dyn BatchReporter,
        op: F,
    ) -> BatchResults<T>
    where
        T: Send,
        F: Fn(&Account) -> Result<T, Error> + Sync,
    {
        let accounts = unique_accounts(accounts);
        reporter.on_batch_start(accounts.len());
        let results = Mutex::new(BTreeMap::new());

        self.pool.scope(|scope| {
            for account in accounts {
                let op = &op;
                let results = &results;
                scope.spawn(move |_| {
                    let username = account.username.clone();
                    reporter.on_task_start(&username);
                    debug!("[{}] task started", username);

                    let result = panic::catch_unwind(AssertUnwindSafe(|| op(account)))
                        .unwrap_or_else(|_| {
                            error!("[{}] task panicked", username);
                            Err(Error::TaskPanicked {
                                account: username.clone(),
                            })
                        });

                    reporter.on_task_complete(&username, result.as_ref().err());

                    results
                        .lock()
                        .unwrap_or_else(|e| e.into_inner())
                        .insert(username, result);
                });
            }
        });

        reporter.on_batch_complete();
        results.into_inner().unwrap_or_else(|e| e.into_inner())
    }
}

fn unique_accounts(accounts: &[Account]) -> Vec<&Account> {
    let mut seen = HashSet::new();
    accounts
        .iter()
        .filter(|account| {
            let first = seen.insert(account.username.as_str());
            if !first {
                warn!("[{}] listed more than once, running it once", account.username);
            }
            first
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    fn accounts(names: &[&str]) -> Vec<Account> {
        names.iter().map(|n| Account::new(*n)).collect()
    }

    #[test]
    fn test_every_account_gets_a_result() {
        let runner = TaskRunner::new(2).unwrap();
        let results = runner.run(&accounts(&["a", "b", "c"]), &SilentReporter, |account| {
            if account.username == "b" {
                Err(Error::sandbox("b", "boom"))
            } else {
                Ok(account.username.len())
            }
        });
        assert_eq!(results.len(), 3);
        assert_eq!(*results["a"].as_ref().unwrap(), 1);
        assert!(results["b"].is_err());
        assert!(results["c"].is_ok());
    }

    #[test]
    fn test_panic_is_contained() {
        let runner = TaskRunner::new(2).unwrap();
        let results = runner.run(&accounts(&["ok", "bad"]), &SilentReporter, |account| {
            if account.username == "bad" {
                panic!("simulated");
            }
            Ok(true)
        });
        assert!(matches!(results["bad"], Err(Error::TaskPanicked { .. })));
        assert!(results["ok"].is_ok());
    }

    #[test]
    fn test_duplicate_username_runs_once() {
        let runner = TaskRunner::new(2).unwrap();
        let calls = AtomicUsize::new(0);
        let results = runner.run(&accounts(&["a", "a", "b"]), &SilentReporter, |account| {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(account.username.clone())
        });
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(results.len(), 2);
        assert_eq!(results["a"].as_ref().unwrap(), "a");
    }

    #[test]
    fn test_width_bounds_concurrency() {
        let runner = TaskRunner::new(2).unwrap();
        let running = AtomicUsize::new(0);
        let peak = AtomicUsize::new(0);
        runner.run(&accounts(&["a", "b", "c", "d", "e"]), &SilentReporter, |_| {
            let now = running.fetch_add(1, Ordering::SeqCst) + 1;
            peak.fetch_max(now, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(20));
            running.fetch_sub(1, Ordering::SeqCst);
            Ok(0)
        });
        assert!(peak.load(Ordering::SeqCst) <= 2);
    }
}
