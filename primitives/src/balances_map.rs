use std::{
    collections::{
        btree_map::{Entry, IntoIter, Iter, Values},
        BTreeMap,
    },
    iter::FromIterator,
    ops::Index,
};

use serde::{Deserialize, Serialize};

use crate::{BigNum, ValidatorId};

/// Mapping from an earner (publisher or validator) to its balance.
///
/// Backed by a `BTreeMap` so iteration is always in ascending key order,
/// which keeps fee distribution and the state-root leaves canonical on
/// both sides of the channel.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct BalancesMap(BTreeMap<ValidatorId, BigNum>);

impl BalancesMap {
    pub fn iter(&self) -> Iter<'_, ValidatorId, BigNum> {
        self.0.iter()
    }

    pub fn values(&self) -> Values<'_, ValidatorId, BigNum> {
        self.0.values()
    }

    pub fn get(&self, key: &ValidatorId) -> Option<&BigNum> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &ValidatorId) -> bool {
        self.0.contains_key(key)
    }

    pub fn entry(&mut self, key: ValidatorId) -> Entry<'_, ValidatorId, BigNum> {
        self.0.entry(key)
    }

    pub fn insert(&mut self, key: ValidatorId, value: BigNum) -> Option<BigNum> {
        self.0.insert(key, value)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Index<&'_ ValidatorId> for BalancesMap {
    type Output = BigNum;

    fn index(&self, index: &ValidatorId) -> &Self::Output {
        self.0.index(index)
    }
}

impl FromIterator<(ValidatorId, BigNum)> for BalancesMap {
    fn from_iter<I: IntoIterator<Item = (ValidatorId, BigNum)>>(iter: I) -> Self {
        BalancesMap(iter.into_iter().collect())
    }
}

impl IntoIterator for BalancesMap {
    type Item = (ValidatorId, BigNum);
    type IntoIter = IntoIter<ValidatorId, BigNum>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
