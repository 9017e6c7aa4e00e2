//! The fetch expression algebra.
//!
//! A [`Fetch<T>`] describes how to obtain a `T`: a pure value, an error, a
//! single-identifier fetch, a batched fetch, or a composition of those.
//! Building one never touches a data source or a cache. Evaluation happens in
//! [`Fetch::run_in`], which walks the tree against a [`Handler`], threading the
//! [`Environment`] from node to node.
//!
//! ```text
//! many([1, 2, 2], users)          -> 1 round, fetch_batch([1, 2])
//!   .and_then(|us| one(us[0].team, teams))   -> 1 more round
//! ```

use crate::{
    AnyId, AppError, CachedValue, DataSource, Environment, FetchError, FetchMany, FetchOne,
    FetchResult, Handler, SharedSource, SourceId,
};
use futures::future::{self, BoxFuture, FutureExt};
use std::any::type_name;
use std::fmt;
use std::sync::Arc;

/// Bound for values produced by an expression.
///
/// Blanket-implemented. Expressions can be evaluated any number of times, so
/// their values are cloned out of the tree on every run.
pub trait FetchValue: Clone + Send + Sync + 'static {}

impl<T> FetchValue for T where T: Clone + Send + Sync + 'static {}

/// Turns erased values back into the expression's result type.
type Decode<T, R> = fn(R) -> Result<T, DecodeError>;

enum DecodeError {
    Type {
        expected: &'static str,
        found: &'static str,
    },
    Count {
        expected: usize,
        found: usize,
    },
}

impl DecodeError {
    fn into_fetch_error(self, source_id: SourceId) -> FetchError {
        match self {
            DecodeError::Type { expected, found } => FetchError::TypeMismatch {
                source_id,
                expected,
                found,
            },
            DecodeError::Count { expected, found } => FetchError::UnexpectedResultCount {
                source_id,
                expected,
                found,
            },
        }
    }
}

/// A side-effect-free description of a fetch.
///
/// Cloning is cheap: composite nodes are shared, not copied.
pub struct Fetch<T> {
    node: Node<T>,
}

enum Node<T> {
    Pure(T),
    Raise(AppError),
    One(FetchOne, Decode<T, CachedValue>),
    Many(FetchMany, Decode<T, Vec<CachedValue>>),
    Then(Arc<dyn Continuation<T>>),
}

impl<T: Clone> Clone for Fetch<T> {
    fn clone(&self) -> Self {
        let node = match &self.node {
            Node::Pure(value) => Node::Pure(value.clone()),
            Node::Raise(error) => Node::Raise(Arc::clone(error)),
            Node::One(request, decode) => Node::One(request.clone(), *decode),
            Node::Many(request, decode) => Node::Many(request.clone(), *decode),
            Node::Then(continuation) => Node::Then(Arc::clone(continuation)),
        };
        Self { node }
    }
}

/// A composite node whose intermediate result type is hidden.
trait Continuation<T>: Send + Sync {
    fn eval<'a>(
        &'a self,
        handler: &'a dyn Handler,
        env: Environment,
    ) -> BoxFuture<'a, FetchResult<(Environment, T)>>;
}

struct AndThen<A, F> {
    first: Fetch<A>,
    next: F,
}

impl<A, T, F> Continuation<T> for AndThen<A, F>
where
    A: FetchValue,
    T: FetchValue,
    F: Fn(A) -> Fetch<T> + Send + Sync + 'static,
{
    fn eval<'a>(
        &'a self,
        handler: &'a dyn Handler,
        env: Environment,
    ) -> BoxFuture<'a, FetchResult<(Environment, T)>> {
        async move {
            let (env, value) = self.first.run_in(handler, env).await?;
            let next = (self.next)(value);
            next.run_in(handler, env).await
        }
        .boxed()
    }
}

impl<T: FetchValue> Fetch<T> {
    /// An expression that yields `value` without recording a round.
    pub fn pure(value: T) -> Self {
        Self {
            node: Node::Pure(value),
        }
    }

    /// An expression that fails with `error` when reached.
    pub fn raise<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::raise_shared(Arc::new(error))
    }

    /// Like [`Fetch::raise`] for an error that is already shared.
    pub fn raise_shared(error: AppError) -> Self {
        Self {
            node: Node::Raise(error),
        }
    }

    /// Sequence a dependent expression after this one.
    ///
    /// `next` runs during interpretation, once this expression has produced
    /// its value; it is never called while building the tree. It is called
    /// again on every evaluation.
    pub fn and_then<U, F>(self, next: F) -> Fetch<U>
    where
        U: FetchValue,
        F: Fn(T) -> Fetch<U> + Send + Sync + 'static,
    {
        Fetch {
            node: Node::Then(Arc::new(AndThen { first: self, next })),
        }
    }

    pub fn map<U, F>(self, f: F) -> Fetch<U>
    where
        U: FetchValue,
        F: Fn(T) -> U + Send + Sync + 'static,
    {
        self.and_then(move |value| Fetch::pure(f(value)))
    }

    /// Combine with an independent expression. The left side runs first.
    ///
    /// Rounds of the two sides are not merged, even when both target the same
    /// source; use a batched fetch for that.
    pub fn zip<U: FetchValue>(self, other: Fetch<U>) -> Fetch<(T, U)> {
        self.and_then(move |left| {
            other
                .clone()
                .map(move |right| (left.clone(), right))
        })
    }

    pub fn is_pure(&self) -> bool {
        matches!(self.node, Node::Pure(_))
    }

    /// Evaluate the expression against `handler`, starting from `env`.
    ///
    /// The expression is left intact and can be evaluated again, for example
    /// from the environment carried by a structural failure.
    pub fn run_in<'a>(
        &'a self,
        handler: &'a dyn Handler,
        env: Environment,
    ) -> BoxFuture<'a, FetchResult<(Environment, T)>> {
        match &self.node {
            Node::Pure(value) => future::ready(Ok((env, value.clone()))).boxed(),
            Node::Raise(error) => {
                future::ready(Err(FetchError::Application(Arc::clone(error)))).boxed()
            }
            Node::One(request, decode) => async move {
                let (env, value) = handler.fetch_one(request.clone(), env).await?;
                let value = decode(value).map_err(|err| err.into_fetch_error(request.source_id()))?;
                Ok((env, value))
            }
            .boxed(),
            Node::Many(request, decode) => async move {
                let (env, values) = handler.fetch_many(request.clone(), env).await?;
                let values =
                    decode(values).map_err(|err| err.into_fetch_error(request.source_id()))?;
                Ok((env, values))
            }
            .boxed(),
            Node::Then(continuation) => continuation.eval(handler, env),
        }
    }
}

impl<V: FetchValue> Fetch<V> {
    /// Fetch a single identifier from `source`.
    pub fn one<S>(id: S::Id, source: &Arc<S>) -> Self
    where
        S: DataSource<Value = V>,
    {
        Self {
            node: Node::One(FetchOne::new(share(source), AnyId::new(id)), decode_one::<V>),
        }
    }
}

impl<V: FetchValue> Fetch<Vec<V>> {
    /// Fetch several identifiers from `source` in one round.
    ///
    /// The result has one value per requested identifier, in request order,
    /// duplicates included.
    pub fn many<S, I>(ids: I, source: &Arc<S>) -> Self
    where
        S: DataSource<Value = V>,
        I: IntoIterator<Item = S::Id>,
    {
        Self {
            node: Node::Many(
                FetchMany::new(share(source), ids.into_iter().map(AnyId::new).collect()),
                decode_many::<V>,
            ),
        }
    }
}

impl<V: FetchValue> Fetch<(V, V)> {
    /// Fetch two identifiers from `source` in one round.
    pub fn pair<S>(a: S::Id, b: S::Id, source: &Arc<S>) -> Self
    where
        S: DataSource<Value = V>,
    {
        Self {
            node: Node::Many(
                FetchMany::new(share(source), vec![AnyId::new(a), AnyId::new(b)]),
                decode_pair::<V>,
            ),
        }
    }
}

impl<T> fmt::Debug for Fetch<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.node {
            Node::Pure(_) => f.write_str("Fetch::Pure"),
            Node::Raise(error) => write!(f, "Fetch::Raise({error})"),
            Node::One(request, _) => write!(f, "Fetch::One({:?})", request.id()),
            Node::Many(request, _) => write!(f, "Fetch::Many({:?})", request.ids()),
            Node::Then(_) => f.write_str("Fetch::Then"),
        }
    }
}

fn share<S: DataSource>(source: &Arc<S>) -> SharedSource {
    Arc::clone(source) as SharedSource
}

fn decode_one<V: Clone + 'static>(value: CachedValue) -> Result<V, DecodeError> {
    value.downcast::<V>().ok_or_else(|| DecodeError::Type {
        expected: type_name::<V>(),
        found: value.type_name(),
    })
}

fn decode_many<V: Clone + 'static>(values: Vec<CachedValue>) -> Result<Vec<V>, DecodeError> {
    values.into_iter().map(decode_one::<V>).collect()
}

fn decode_pair<V: Clone + 'static>(values: Vec<CachedValue>) -> Result<(V, V), DecodeError> {
    match <[CachedValue; 2]>::try_from(values) {
        Ok([a, b]) => Ok((decode_one(a)?, decode_one(b)?)),
        Err(values) => Err(DecodeError::Count {
            expected: 2,
            found: values.len(),
        }),
    }
}
