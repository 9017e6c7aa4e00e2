//! Convenience constructors over [`Fetch`].

use crate::{DataSource, Fetch, FetchValue};
use std::sync::Arc;

/// Yield `value` without touching any source.
pub fn pure<T: FetchValue>(value: T) -> Fetch<T> {
    Fetch::pure(value)
}

/// Fail with `error` when evaluation reaches this node.
pub fn raise<T, E>(error: E) -> Fetch<T>
where
    T: FetchValue,
    E: std::error::Error + Send + Sync + 'static,
{
    Fetch::raise(error)
}

/// Fetch a single identifier.
pub fn one<S: DataSource>(id: S::Id, source: &Arc<S>) -> Fetch<S::Value> {
    Fetch::one(id, source)
}

/// Fetch several identifiers from one source in a single round.
pub fn many<S, I>(ids: I, source: &Arc<S>) -> Fetch<Vec<S::Value>>
where
    S: DataSource,
    I: IntoIterator<Item = S::Id>,
{
    Fetch::many(ids, source)
}

/// Alias of [`many`].
pub fn collect<S, I>(ids: I, source: &Arc<S>) -> Fetch<Vec<S::Value>>
where
    S: DataSource,
    I: IntoIterator<Item = S::Id>,
{
    many(ids, source)
}

/// Map every item to an identifier and fetch them all in one round.
pub fn traverse<S, X, I, F>(items: I, f: F, source: &Arc<S>) -> Fetch<Vec<S::Value>>
where
    S: DataSource,
    I: IntoIterator<Item = X>,
    F: FnMut(X) -> S::Id,
{
    many(items.into_iter().map(f), source)
}

/// Fetch two identifiers from the same source in one round.
pub fn coalesce<S: DataSource>(a: S::Id, b: S::Id, source: &Arc<S>) -> Fetch<(S::Value, S::Value)> {
    Fetch::pair(a, b, source)
}

/// Fetch one identifier from each of two sources, left first.
///
/// The two fetches are separate rounds even if both sources are the same.
pub fn join<SA, SB>(
    a: SA::Id,
    source_a: &Arc<SA>,
    b: SB::Id,
    source_b: &Arc<SB>,
) -> Fetch<(SA::Value, SB::Value)>
where
    SA: DataSource,
    SB: DataSource,
{
    one(a, source_a).zip(one(b, source_b))
}

/// Run independent expressions in order and gather their results.
///
/// Each expression keeps its own rounds; nothing is merged.
pub fn sequence<T, I>(fetches: I) -> Fetch<Vec<T>>
where
    T: FetchValue,
    I: IntoIterator<Item = Fetch<T>>,
{
    fetches.into_iter().fold(Fetch::pure(Vec::new()), |acc, next| {
        acc.and_then(move |values: Vec<T>| {
            next.clone().map(move |value| {
                let mut values = values.clone();
                values.push(value);
                values
            })
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SourceId;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, thiserror::Error)]
    #[error("unused")]
    struct Never;

    #[derive(Default)]
    struct Squares {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl DataSource for Squares {
        type Id = u32;
        type Value = u64;
        type Error = Never;

        fn identity(&self) -> SourceId {
            self.calls.fetch_add(1, Ordering::SeqCst);
            SourceId::new("squares")
        }

        async fn fetch_batch(&self, ids: &[u32]) -> Result<HashMap<u32, u64>, Never> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(ids.iter().map(|id| (*id, u64::from(*id) * u64::from(*id))).collect())
        }
    }

    #[test]
    fn test_combinators_are_lazy() {
        let squares = Arc::new(Squares::default());

        let _ = traverse(vec!["1", "2"], |s| s.len() as u32, &squares);
        let _ = coalesce(1, 2, &squares);
        let _ = join(1, &squares, 2, &squares);
        let _ = collect([3, 3], &squares);
        let _ = sequence(vec![one(1, &squares), one(2, &squares)]);
        let _ = raise::<u64, _>(Never);

        assert_eq!(squares.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_pure_is_pure() {
        assert!(pure(5).is_pure());
        assert!(!sequence(vec![pure(1)]).is_pure());
    }
}
