//! Sequential bulk-mutation runner.
//!
//! Admin API mutations are applied one at a time, in input order, and a
//! failure never aborts the run: every remaining item is still attempted and
//! the caller gets a per-item outcome plus aggregate counts. Sequential
//! execution keeps the run inside Shopify's mutation rate limits without a
//! separate limiter.

use std::fmt::Display;
use std::future::Future;

use tracing::warn;

use crate::ShopifyError;

/// Outcome of a single mutation attempt.
#[derive(Debug)]
pub enum MutationOutcome<T> {
    /// The mutation was applied; payload decoded from the response.
    Applied(T),
    /// Shopify accepted the request but rejected the mutation with
    /// `userErrors`. The platform state is unchanged for this item.
    Rejected(Vec<String>),
    /// The attempt failed before a definitive answer (transport, auth,
    /// malformed response). Platform state for this item is unknown.
    Failed(ShopifyError),
}

impl<T> MutationOutcome<T> {
    /// Classify a raw call result.
    ///
    /// `UserError` means Shopify answered and said no; anything else means
    /// the call never got a definitive answer.
    pub fn from_result(result: Result<T, ShopifyError>) -> Self {
        match result {
            Ok(payload) => Self::Applied(payload),
            Err(ShopifyError::UserError(message)) => Self::Rejected(vec![message]),
            Err(err) => Self::Failed(err),
        }
    }

    /// Whether the mutation was applied.
    pub const fn is_applied(&self) -> bool {
        matches!(self, Self::Applied(_))
    }
}

/// Aggregate counts for a bulk run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BulkSummary {
    /// Items attempted (always the full input length).
    pub attempted: usize,
    /// Mutations applied.
    pub applied: usize,
    /// Mutations rejected with `userErrors`.
    pub rejected: usize,
    /// Attempts that failed without a definitive answer.
    pub failed: usize,
}

impl BulkSummary {
    /// Whether every attempted mutation was applied.
    #[must_use]
    pub const fn all_applied(&self) -> bool {
        self.applied == self.attempted
    }
}

impl Display for BulkSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} attempted, {} applied, {} rejected, {} failed",
            self.attempted, self.applied, self.rejected, self.failed
        )
    }
}

/// Run `mutate` over every item in order, continuing past failures.
///
/// Returns each item paired with its outcome, in input order, plus the
/// aggregate summary. Rejections and failures are logged here so callers
/// only need to act on the summary.
pub async fn run_bulk<I, T, F, Fut>(
    items: Vec<I>,
    mut mutate: F,
) -> (Vec<(I, MutationOutcome<T>)>, BulkSummary)
where
    I: Clone + Display,
    F: FnMut(I) -> Fut,
    Fut: Future<Output = Result<T, ShopifyError>>,
{
    let mut summary = BulkSummary {
        attempted: items.len(),
        applied: 0,
        rejected: 0,
        failed: 0,
    };
    let mut results = Vec::with_capacity(items.len());

    for item in items {
        let outcome = MutationOutcome::from_result(mutate(item.clone()).await);
        match &outcome {
            MutationOutcome::Applied(_) => summary.applied += 1,
            MutationOutcome::Rejected(messages) => {
                summary.rejected += 1;
                warn!(item = %item, errors = %messages.join("; "), "mutation rejected");
            }
            MutationOutcome::Failed(err) => {
                summary.failed += 1;
                warn!(item = %item, error = %err, "mutation attempt failed");
            }
        }
        results.push((item, outcome));
    }

    (results, summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn flaky(item: u32) -> Result<u32, ShopifyError> {
        match item {
            2 => Err(ShopifyError::UserError("does not exist".to_string())),
            3 => Err(ShopifyError::UnexpectedStatus(500)),
            n => Ok(n * 10),
        }
    }

    #[tokio::test]
    async fn continues_past_rejections_and_failures() {
        let (results, summary) = run_bulk(vec![1, 2, 3, 4], flaky).await;

        assert_eq!(
            summary,
            BulkSummary {
                attempted: 4,
                applied: 2,
                rejected: 1,
                failed: 1,
            }
        );
        assert!(!summary.all_applied());

        // Input order preserved, every item attempted.
        assert_eq!(results.len(), 4);
        assert!(matches!(results[0], (1, MutationOutcome::Applied(10))));
        assert!(matches!(results[1], (2, MutationOutcome::Rejected(_))));
        assert!(matches!(
            results[2],
            (3, MutationOutcome::Failed(ShopifyError::UnexpectedStatus(500)))
        ));
        assert!(matches!(results[3], (4, MutationOutcome::Applied(40))));
    }

    #[tokio::test]
    async fn clean_run_is_all_applied() {
        let (results, summary) = run_bulk(vec![1, 4], flaky).await;

        assert!(summary.all_applied());
        assert!(results.iter().all(|(_, outcome)| outcome.is_applied()));
    }

    #[tokio::test]
    async fn empty_input_is_a_vacuous_success() {
        let (results, summary) = run_bulk(Vec::new(), flaky).await;

        assert!(results.is_empty());
        assert_eq!(summary.attempted, 0);
        assert!(summary.all_applied());
    }

    #[test]
    fn user_error_classifies_as_rejected() {
        let outcome: MutationOutcome<()> = MutationOutcome::from_result(Err(
            ShopifyError::UserError("id: Variant does not exist".to_string()),
        ));
        match outcome {
            MutationOutcome::Rejected(messages) => {
                assert_eq!(messages, vec!["id: Variant does not exist".to_string()]);
            }
            other => panic!("expected Rejected, got {other:?}"),
        }
    }

    #[test]
    fn transport_error_classifies_as_failed() {
        let outcome: MutationOutcome<()> =
            MutationOutcome::from_result(Err(ShopifyError::Unauthorized));
        assert!(matches!(
            outcome,
            MutationOutcome::Failed(ShopifyError::Unauthorized)
        ));
    }

    #[test]
    fn summary_display_is_compact() {
        let summary = BulkSummary {
            attempted: 3,
            applied: 1,
            rejected: 1,
            failed: 1,
        };
        assert_eq!(summary.to_string(), "3 attempted, 1 applied, 1 rejected, 1 failed");
    }
}
