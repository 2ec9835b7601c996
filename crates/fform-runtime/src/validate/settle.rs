#![forbid(unsafe_code)]

//! Wait-for-all combinator.
//!
//! [`all_settled`] drives every future to completion and never short-circuits
//! on a failure. The outcomes keep the input order.

use std::future::Future;

use futures::future::join_all;

/// Outcome of one settled future.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Settled<T, E> {
    Fulfilled(T),
    Rejected(E),
}

impl<T, E> Settled<T, E> {
    #[must_use]
    pub const fn is_fulfilled(&self) -> bool {
        matches!(self, Self::Fulfilled(_))
    }

    #[must_use]
    pub const fn is_rejected(&self) -> bool {
        matches!(self, Self::Rejected(_))
    }

    pub fn into_result(self) -> Result<T, E> {
        match self {
            Self::Fulfilled(value) => Ok(value),
            Self::Rejected(err) => Err(err),
        }
    }
}

impl<T, E> From<Result<T, E>> for Settled<T, E> {
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(value) => Self::Fulfilled(value),
            Err(err) => Self::Rejected(err),
        }
    }
}

/// Resolve once every future has settled.
pub async fn all_settled<I, F, T, E>(futures: I) -> Vec<Settled<T, E>>
where
    I: IntoIterator<Item = F>,
    F: Future<Output = Result<T, E>>,
{
    join_all(futures)
        .await
        .into_iter()
        .map(Settled::from)
        .collect()
}

/// Collapse outcomes that carry the same payload either way.
///
/// `Ok` with every payload when nothing was rejected, `Err` with every
/// payload (fulfilled ones included) otherwise.
pub fn settle_summary<T>(outcomes: Vec<Settled<T, T>>) -> Result<Vec<T>, Vec<T>> {
    let failed = outcomes.iter().any(Settled::is_rejected);
    let payloads = outcomes
        .into_iter()
        .map(|outcome| match outcome {
            Settled::Fulfilled(value) | Settled::Rejected(value) => value,
        })
        .collect();
    if failed { Err(payloads) } else { Ok(payloads) }
}
