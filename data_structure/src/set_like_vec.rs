use crate::FxHashMap;

/// A vector that only stores unique elements.
///
/// Remembers the order of insertion.
#[derive(Debug, Clone)]
pub struct SetLikeVec<T: Copy> {
    vec: Vec<T>,
    map: FxHashMap<T, usize>,
}

impl<T> SetLikeVec<T>
where
    T: Copy,
{
    pub fn new() -> Self {
        Self {
            vec: Vec::default(),
            map: FxHashMap::default(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.vec.is_empty()
    }

    pub fn len(&self) -> usize {
        self.vec.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.vec.iter()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.vec
    }
}

impl<T> Default for SetLikeVec<T>
where
    T: Copy,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> SetLikeVec<T>
where
    T: Copy + Eq + std::hash::Hash,
{
    /// Returns `true` if the value was not present.
    pub fn insert(&mut self, value: T) -> bool {
        if self.map.contains_key(&value) {
            return false;
        }
        self.map.insert(value, self.vec.len());
        self.vec.push(value);
        true
    }

    /// Position of `value` in insertion order.
    pub fn get<Q>(&self, value: &Q) -> Option<usize>
    where
        T: std::borrow::Borrow<Q>,
        Q: ?Sized + std::hash::Hash + Eq,
    {
        self.map.get(value).copied()
    }

    pub fn contains<Q>(&self, value: &Q) -> bool
    where
        T: std::borrow::Borrow<Q>,
        Q: ?Sized + std::hash::Hash + Eq,
    {
        self.map.contains_key(value)
    }
}

impl<T: Copy + Eq + std::hash::Hash> FromIterator<T> for SetLikeVec<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut set = Self::new();
        set.extend(iter);
        set
    }
}

impl<T: Copy + Eq + std::hash::Hash> Extend<T> for SetLikeVec<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for value in iter {
            self.insert(value);
        }
    }
}

impl<T: Copy> IntoIterator for SetLikeVec<T> {
    type Item = T;

    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.vec.into_iter()
    }
}

impl<'a, T: Copy> IntoIterator for &'a SetLikeVec<T> {
    type Item = &'a T;

    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.vec.iter()
    }
}
