use std::{future::Future, num::NonZeroUsize};

use tokio::task::{JoinError, JoinSet};

/// Runs every future on its own task with at most `capacity` of them in
/// flight, folding outputs in completion order. Returns only once all
/// spawned tasks have finished.
pub async fn join_all_bounded<Iterable, Output, Accumulator, FoldWith>(
    iterable: Iterable,
    capacity: NonZeroUsize,
    mut accumulator: Accumulator,
    mut fold_with: FoldWith,
) -> Result<Accumulator, JoinError>
where
    Iterable: IntoIterator,
    Iterable::Item: Future<Output = Output> + Send + 'static,
    Output: Send + 'static,
    FoldWith: FnMut(Accumulator, Output) -> Accumulator,
{
    let mut iter = iterable.into_iter().fuse();
    let mut set: JoinSet<Output> = (&mut iter).take(capacity.get()).collect();
    let mut failure: Option<JoinError> = None;

    while let Some(result) = set.join_next().await {
        match result {
            Ok(output) => {
                accumulator = fold_with(accumulator, output);
            },
            Err(error) => {
                failure.get_or_insert(error);
            },
        }

        if failure.is_none() {
            if let Some(future) = iter.next() {
                set.spawn(future);
            }
        }
    }

    match failure {
        Some(error) => Err(error),
        None => Ok(accumulator),
    }
}
