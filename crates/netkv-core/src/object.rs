//! The versioned object contracts.
//!
//! Domain types (networks, endpoints, ...) implement [`KvObject`] to take
//! part in the store. Types that can be enumerated by prefix also implement
//! [`KvConstructor`] and expose it through [`KvObject::constructor`].

use std::fmt;

use crate::error::Result;
use crate::key::KeyPath;
use crate::scope::Scope;

/// An object that can be persisted in the store.
///
/// The caller owns the instance. The store reads it and stamps its index,
/// but never keeps a reference to it past the call.
pub trait KvObject: Send + Sync + fmt::Debug {
    /// Full key of this object.
    fn key(&self) -> KeyPath;

    /// Immediate parent key, used for enumeration.
    fn key_prefix(&self) -> KeyPath {
        self.key().parent()
    }

    /// Serialized content. `None` means the object has no value to store.
    fn value(&self) -> Option<Vec<u8>>;

    /// Hydrate the object from serialized content loaded from the store.
    fn set_value(&mut self, value: &[u8]) -> Result<()>;

    /// Latest index as seen by this object.
    fn index(&self) -> u64;

    /// Record the index assigned by the store.
    fn set_index(&mut self, index: u64);

    /// True once the object has been stored, i.e. once an index was assigned.
    fn exists(&self) -> bool;

    /// Storage scope of the object.
    fn data_scope(&self) -> Scope;

    /// True if the object must never be written to the backing store.
    fn skip(&self) -> bool;

    /// The constructor capability, if this type supports enumeration.
    fn constructor(&self) -> Option<&dyn KvConstructor> {
        None
    }
}

/// Builds fresh instances of a [`KvObject`] type.
pub trait KvConstructor: Send + Sync {
    /// A new zero-value object of the same concrete type.
    fn new_object(&self) -> Box<dyn KvObject>;

    /// Deep copy this object's content and index into `dst`.
    fn copy_to(&self, dst: &mut dyn KvObject) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default)]
    struct Plain {
        index: u64,
    }

    impl KvObject for Plain {
        fn key(&self) -> KeyPath {
            KeyPath::new(["plain", "one"])
        }

        fn value(&self) -> Option<Vec<u8>> {
            Some(b"plain".to_vec())
        }

        fn set_value(&mut self, _value: &[u8]) -> Result<()> {
            Ok(())
        }

        fn index(&self) -> u64 {
            self.index
        }

        fn set_index(&mut self, index: u64) {
            self.index = index;
        }

        fn exists(&self) -> bool {
            self.index > 0
        }

        fn data_scope(&self) -> Scope {
            Scope::Local
        }

        fn skip(&self) -> bool {
            false
        }
    }

    #[test]
    fn test_default_key_prefix_is_parent() {
        let obj = Plain::default();
        assert_eq!(obj.key_prefix(), KeyPath::new(["plain"]));
    }

    #[test]
    fn test_default_has_no_constructor() {
        let obj = Plain::default();
        assert!(obj.constructor().is_none());
    }
}
