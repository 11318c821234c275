//! Comparator registry
//!
//! One comparator per type name, overridable. Owned by a `StorageContext`
//! rather than held globally.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::comparator::builtin::*;
use crate::comparator::{DecodingComparator, RawComparator};
use crate::writable::*;

/// Maps type names to raw comparators
pub struct ComparatorRegistry {
    comparators: RwLock<HashMap<String, Arc<dyn RawComparator>>>,
}

impl ComparatorRegistry {
    /// Registry preloaded with the built-in comparators
    pub fn new() -> Self {
        let registry = Self::empty();
        registry.define_for::<BooleanWritable>(Arc::new(BooleanComparator));
        registry.define_for::<ByteWritable>(Arc::new(SignedIntComparator::BYTE));
        registry.define_for::<ShortWritable>(Arc::new(SignedIntComparator::SHORT));
        registry.define_for::<IntWritable>(Arc::new(SignedIntComparator::INT));
        registry.define_for::<LongWritable>(Arc::new(SignedIntComparator::LONG));
        registry.define_for::<FloatWritable>(Arc::new(FloatComparator));
        registry.define_for::<DoubleWritable>(Arc::new(DoubleComparator));
        registry.define_for::<VIntWritable>(Arc::new(VLongComparator));
        registry.define_for::<VLongWritable>(Arc::new(VLongComparator));
        registry.define_for::<Text>(Arc::new(TextComparator));
        registry.define_for::<BytesWritable>(Arc::new(BytesComparator));
        registry.define_for::<NullWritable>(Arc::new(NullComparator));
        registry
    }

    /// Registry with no entries; every lookup falls back to decoding
    pub fn empty() -> Self {
        Self {
            comparators: RwLock::new(HashMap::new()),
        }
    }

    /// Register (or replace) the comparator for a type name
    pub fn define(&self, type_name: impl Into<String>, comparator: Arc<dyn RawComparator>) {
        self.comparators.write().insert(type_name.into(), comparator);
    }

    /// Register (or replace) the comparator for `T`
    pub fn define_for<T: Writable>(&self, comparator: Arc<dyn RawComparator>) {
        self.define(T::type_name(), comparator);
    }

    /// Registered comparator for a type name, if any
    pub fn lookup(&self, type_name: &str) -> Option<Arc<dyn RawComparator>> {
        self.comparators.read().get(type_name).cloned()
    }

    /// Comparator for `T`, falling back to decode-then-compare
    pub fn get<T>(&self) -> Arc<dyn RawComparator>
    where
        T: Writable + Ord + Default + 'static,
    {
        self.lookup(&T::type_name())
            .unwrap_or_else(|| Arc::new(DecodingComparator::<T>::new()))
    }
}

impl Default for ComparatorRegistry {
    fn default() -> Self {
        Self::new()
    }
}
