//! Typed key-value storage shared across stages.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;

/// A typed key into [`SharedData`].
///
/// ```rust
/// use strata_batch::context::{SharedData, SharedKey};
///
/// const SEEN_CLASSES: SharedKey<Vec<String>> = SharedKey::new("seen_classes");
///
/// let mut data = SharedData::default();
/// data.insert(&SEEN_CLASSES, vec!["user".to_owned()]);
/// assert_eq!(data.get(&SEEN_CLASSES).map(Vec::len), Some(1));
/// ```
pub struct SharedKey<T> {
    name: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<T> SharedKey<T> {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _marker: PhantomData,
        }
    }

    #[inline]
    pub const fn name(&self) -> &'static str {
        self.name
    }
}

impl<T> Clone for SharedKey<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for SharedKey<T> {}

impl<T> fmt::Debug for SharedKey<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SharedKey").field(&self.name).finish()
    }
}

/// Open key-value bag for coordination between processors.
///
/// This is an escape hatch outside the batch data model: the standard
/// processors never read it, and nothing in the pipeline depends on its
/// contents. A value stored under a key with a different type is invisible
/// through the mismatching key.
#[derive(Default)]
pub struct SharedData {
    values: HashMap<&'static str, Box<dyn Any + Send + Sync>>,
}

impl SharedData {
    /// Stores a value, returning the previous value of the same type.
    pub fn insert<T>(&mut self, key: &SharedKey<T>, value: T) -> Option<T>
    where
        T: Any + Send + Sync,
    {
        self.values
            .insert(key.name, Box::new(value))
            .and_then(|previous| previous.downcast::<T>().ok())
            .map(|previous| *previous)
    }

    pub fn get<T: Any>(&self, key: &SharedKey<T>) -> Option<&T> {
        self.values.get(key.name)?.downcast_ref::<T>()
    }

    pub fn get_mut<T: Any>(&mut self, key: &SharedKey<T>) -> Option<&mut T> {
        self.values.get_mut(key.name)?.downcast_mut::<T>()
    }

    pub fn remove<T: Any>(&mut self, key: &SharedKey<T>) -> Option<T> {
        let value = self.values.remove(key.name)?;
        match value.downcast::<T>() {
            Ok(value) => Some(*value),
            Err(value) => {
                self.values.insert(key.name, value);
                None
            }
        }
    }

    pub fn contains_key<T: Any>(&self, key: &SharedKey<T>) -> bool {
        self.get(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl fmt::Debug for SharedData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.values.keys()).finish()
    }
}
