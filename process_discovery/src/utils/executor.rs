use rayon::prelude::*;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

///
/// Scheduling strategy for the data-parallel parts of the discovery algorithms
///
/// Both variants run the exact same closure on every item and return the results in
/// input order, so the surrounding algorithm cannot tell them apart.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
pub enum Executor {
    /// Run on the calling thread
    #[default]
    Sequential,
    /// Fan out over the global rayon thread pool
    Parallel,
}

impl Executor {
    /// Apply `f` to every item, keeping the input order of the results
    pub fn map<T, R, F>(&self, items: &[T], f: F) -> Vec<R>
    where
        T: Sync,
        R: Send,
        F: Fn(&T) -> R + Sync + Send,
    {
        match self {
            Executor::Sequential => items.iter().map(f).collect(),
            Executor::Parallel => items.par_iter().map(f).collect(),
        }
    }

    /// Apply `f` to every item and concatenate the produced collections
    pub fn flat_map<T, R, I, F>(&self, items: &[T], f: F) -> Vec<R>
    where
        T: Sync,
        R: Send,
        I: IntoIterator<Item = R>,
        F: Fn(&T) -> I + Sync + Send,
    {
        self.map(items, |item| f(item).into_iter().collect::<Vec<R>>())
            .into_iter()
            .flatten()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn executors_agree() {
        let items: Vec<u64> = (0..1000).collect();
        let seq = Executor::Sequential.map(&items, |x| x * x);
        let par = Executor::Parallel.map(&items, |x| x * x);
        assert_eq!(seq, par);

        let seq = Executor::Sequential.flat_map(&items, |x| vec![*x; (*x % 3) as usize]);
        let par = Executor::Parallel.flat_map(&items, |x| vec![*x; (*x % 3) as usize]);
        assert_eq!(seq, par);
    }
}
