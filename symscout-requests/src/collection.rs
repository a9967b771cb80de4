//! Merged results of a batch run.

use crate::error::RequestError;
use std::collections::HashMap;

/// Terminal failure of a single batch item.
#[derive(Debug)]
pub struct ItemFailure {
    /// Position of the descriptor in the submitted batch.
    pub index: usize,
    /// The descriptor's result key, when it had one.
    pub key: Option<String>,
    pub error: RequestError,
}

pub type ItemResult<T> = Result<T, ItemFailure>;

/// The reassembled output of a batch run.
///
/// - every descriptor keyed: `Keyed`, with the last completion winning on a
///   key collision (completion time, not submission order, decides);
/// - no keys and exactly one descriptor: `Single`, unwrapped;
/// - otherwise `Ordered` in completion order. Callers that need positional
///   correspondence with the input batch must supply keys.
#[derive(Debug)]
pub enum ResultCollection<T> {
    Single(ItemResult<T>),
    Keyed(HashMap<String, ItemResult<T>>),
    Ordered(Vec<ItemResult<T>>),
}

impl<T> ResultCollection<T> {
    /// Merge completions, given in completion order.
    pub(crate) fn assemble(
        completions: Vec<(usize, Option<String>, Result<T, RequestError>)>,
        all_keyed: bool,
        batch_len: usize,
    ) -> Self {
        if all_keyed {
            let mut map = HashMap::with_capacity(batch_len);
            for (index, key, result) in completions {
                let item = result.map_err(|error| ItemFailure {
                    index,
                    key: key.clone(),
                    error,
                });
                if let Some(key) = key {
                    map.insert(key, item);
                }
            }
            return ResultCollection::Keyed(map);
        }

        let mut ordered: Vec<ItemResult<T>> = completions
            .into_iter()
            .map(|(index, key, result)| {
                result.map_err(|error| ItemFailure { index, key, error })
            })
            .collect();

        if batch_len == 1 {
            match ordered.pop() {
                Some(item) => ResultCollection::Single(item),
                None => ResultCollection::Ordered(Vec::new()),
            }
        } else {
            ResultCollection::Ordered(ordered)
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ResultCollection::Single(_) => 1,
            ResultCollection::Keyed(map) => map.len(),
            ResultCollection::Ordered(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The item stored under `key`, for keyed collections.
    pub fn get(&self, key: &str) -> Option<&ItemResult<T>> {
        match self {
            ResultCollection::Keyed(map) => map.get(key),
            _ => None,
        }
    }

    /// All per-item failures, in collection order.
    pub fn failures(&self) -> Vec<&ItemFailure> {
        match self {
            ResultCollection::Single(item) => item.as_ref().err().into_iter().collect(),
            ResultCollection::Keyed(map) => {
                map.values().filter_map(|item| item.as_ref().err()).collect()
            }
            ResultCollection::Ordered(items) => {
                items.iter().filter_map(|item| item.as_ref().err()).collect()
            }
        }
    }

    /// Successful values, discarding failures.
    pub fn into_ok(self) -> Vec<T> {
        match self {
            ResultCollection::Single(item) => item.into_iter().collect(),
            ResultCollection::Keyed(map) => map.into_values().filter_map(Result::ok).collect(),
            ResultCollection::Ordered(items) => {
                items.into_iter().filter_map(Result::ok).collect()
            }
        }
    }
}
