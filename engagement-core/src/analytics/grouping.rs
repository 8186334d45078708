//! Group-by primitive shared by every grouped series
//!
//! A [`GroupTally`] counts rows per key, optionally accumulates a numeric
//! sample per key for a mean, and hands the groups back either in the order
//! keys were first seen, stably sorted by count, or sorted by key.

use std::collections::HashMap;
use std::hash::Hash;

/// Round to a fixed number of decimals (half away from zero)
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

/// `part / whole` as a whole percentage, 0 when `whole` is 0
pub fn percentage(part: usize, whole: usize) -> u32 {
    if whole == 0 {
        return 0;
    }
    (part as f64 / whole as f64 * 100.0).round() as u32
}

/// Running arithmetic mean
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Mean {
    sum: f64,
    samples: usize,
}

impl Mean {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, value: f64) {
        self.sum += value;
        self.samples += 1;
    }

    /// Add a value if present; absent values do not count as samples
    pub fn add_opt(&mut self, value: Option<f64>) {
        if let Some(value) = value {
            self.add(value);
        }
    }

    pub fn samples(&self) -> usize {
        self.samples
    }

    /// The mean, `None` without samples
    pub fn value(&self) -> Option<f64> {
        (self.samples > 0).then(|| self.sum / self.samples as f64)
    }

    /// The mean rounded to `decimals`, or 0 without samples
    pub fn rounded(&self, decimals: u32) -> f64 {
        self.value().map_or(0.0, |mean| round_to(mean, decimals))
    }
}

impl FromIterator<f64> for Mean {
    fn from_iter<I: IntoIterator<Item = f64>>(iter: I) -> Self {
        let mut mean = Mean::new();
        for value in iter {
            mean.add(value);
        }
        mean
    }
}

/// One group of a [`GroupTally`]
#[derive(Debug, Clone, PartialEq)]
pub struct Group<K> {
    pub key: K,
    pub count: usize,
    pub mean: Mean,
}

/// Count-and-mean accumulator keyed by `K`
#[derive(Debug, Clone)]
pub struct GroupTally<K> {
    /// Key: group key, Value: index into `groups`
    index: HashMap<K, usize>,
    /// Groups in first-seen order
    groups: Vec<Group<K>>,
}

impl<K: Eq + Hash + Clone> GroupTally<K> {
    pub fn new() -> Self {
        Self {
            index: HashMap::new(),
            groups: Vec::new(),
        }
    }

    /// Count one row for `key`, creating the group on first sight
    pub fn count(&mut self, key: K) {
        match self.index.get(&key) {
            Some(&idx) => self.groups[idx].count += 1,
            None => {
                self.index.insert(key.clone(), self.groups.len());
                self.groups.push(Group {
                    key,
                    count: 1,
                    mean: Mean::new(),
                });
            }
        }
    }

    /// Add a mean sample to an existing group
    ///
    /// Samples for keys that were never counted are dropped: a group exists
    /// only because rows were counted for it.
    pub fn sample(&mut self, key: &K, value: Option<f64>) {
        if let Some(&idx) = self.index.get(key) {
            self.groups[idx].mean.add_opt(value);
        }
    }

    pub fn contains(&self, key: &K) -> bool {
        self.index.contains_key(key)
    }

    /// Groups in first-seen order
    pub fn into_groups(self) -> Vec<Group<K>> {
        self.groups
    }

    /// Groups by count descending; ties keep first-seen order
    pub fn sorted_by_count(self) -> Vec<Group<K>> {
        let mut groups = self.groups;
        // sort_by is stable
        groups.sort_by(|a, b| b.count.cmp(&a.count));
        groups
    }

    /// Groups by key ascending
    pub fn sorted_by_key(self) -> Vec<Group<K>>
    where
        K: Ord,
    {
        let mut groups = self.groups;
        groups.sort_by(|a, b| a.key.cmp(&b.key));
        groups
    }
}

impl<K: Eq + Hash + Clone> Default for GroupTally<K> {
    fn default() -> Self {
        Self::new()
    }
}
