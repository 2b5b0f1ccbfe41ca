//! Type-directed extension payloads
//!
//! Core entities (build, items, objects, components, meshes) do not know which
//! extensions will decorate them. Instead each carries an ordered bag of erased
//! payloads: [`AnyAttr`] for values that serialize as attributes on the host element
//! and [`AnyElement`] for values that serialize as child elements.
//!
//! Payloads are retrieved by concrete type (`get::<T>()`) or by capability
//! ([`AnyAttr::object_path`]). Retrieval always returns the first match in insertion
//! order.

use std::any::Any;
use std::fmt;

use crate::error::Result;
use crate::extension::XmlAttr;
use crate::writer::XmlEncoder;

/// Erased access to a concrete value, used for downcasting and structural equality
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    /// Equality against another erased value of possibly different type
    fn eq_any(&self, other: &dyn Any) -> bool;
}

impl<T: Any + PartialEq> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn eq_any(&self, other: &dyn Any) -> bool {
        other.downcast_ref::<T>().is_some_and(|other| self == other)
    }
}

/// A payload that serializes as attributes on its host element
pub trait AttrMarshaler: AsAny + fmt::Debug + Send + Sync {
    /// Namespace of the attributes this payload writes
    fn namespace(&self) -> &str;

    /// Attributes to append to the host element, qualified by namespace
    fn marshal_attrs(&self) -> Vec<XmlAttr>;

    /// Object-path capability: the document an item or component points into
    fn object_path(&self) -> Option<&str> {
        None
    }
}

/// A payload that serializes as child elements of its host element
pub trait ElementMarshaler: AsAny + fmt::Debug + Send + Sync {
    /// Namespace of the elements this payload writes
    fn namespace(&self) -> &str;

    fn marshal(&self, x: &mut XmlEncoder) -> Result<()>;
}

/// Ordered, heterogeneous bag of erased payloads
pub struct ExtensionBag<M: ?Sized>(Vec<Box<M>>);

/// Attribute payloads attached to a core entity
pub type AnyAttr = ExtensionBag<dyn AttrMarshaler>;

/// Element payloads attached to a core entity
pub type AnyElement = ExtensionBag<dyn ElementMarshaler>;

impl<M: ?Sized + AsAny> ExtensionBag<M> {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Append a payload; existing entries are left untouched
    pub fn push(&mut self, value: Box<M>) {
        self.0.push(value);
    }

    /// First payload of concrete type `T`
    pub fn get<T: Any>(&self) -> Option<&T> {
        self.0.iter().find_map(|v| (**v).as_any().downcast_ref::<T>())
    }

    /// First payload of concrete type `T`, mutably
    pub fn get_mut<T: Any>(&mut self) -> Option<&mut T> {
        self.0
            .iter_mut()
            .find_map(|v| (**v).as_any_mut().downcast_mut::<T>())
    }

    /// First payload of type `T`, appending the result of `make` when there is none
    ///
    /// Returns `None` only if `make` builds a payload of another type.
    pub fn get_or_insert_with<T: Any>(
        &mut self,
        make: impl FnOnce() -> Box<M>,
    ) -> Option<&mut T> {
        if self.get::<T>().is_none() {
            self.0.push(make());
        }
        self.get_mut::<T>()
    }

    pub fn iter(&self) -> impl Iterator<Item = &M> {
        self.0.iter().map(|v| &**v)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AnyAttr {
    /// First non-empty object path offered by any payload
    pub fn object_path(&self) -> Option<&str> {
        self.0
            .iter()
            .filter_map(|v| v.object_path())
            .find(|path| !path.is_empty())
    }
}

impl<M: ?Sized + AsAny> Default for ExtensionBag<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: ?Sized + fmt::Debug> fmt::Debug for ExtensionBag<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.0.iter()).finish()
    }
}

impl<M: ?Sized + AsAny> PartialEq for ExtensionBag<M> {
    fn eq(&self, other: &Self) -> bool {
        boxed_slice_eq(&self.0, &other.0)
    }
}

/// Element-wise equality of two slices of erased values
pub(crate) fn boxed_slice_eq<M: ?Sized + AsAny>(a: &[Box<M>], b: &[Box<M>]) -> bool {
    a.len() == b.len()
        && a
            .iter()
            .zip(b)
            .all(|(x, y)| (**x).eq_any((**y).as_any()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extension::XmlName;

    #[derive(Debug, Default, PartialEq)]
    struct PathAttr {
        path: String,
    }

    impl AttrMarshaler for PathAttr {
        fn namespace(&self) -> &str {
            "urn:test:path"
        }

        fn marshal_attrs(&self) -> Vec<XmlAttr> {
            vec![XmlAttr::new(
                XmlName::new("urn:test:path", "path"),
                self.path.clone(),
            )]
        }

        fn object_path(&self) -> Option<&str> {
            Some(&self.path)
        }
    }

    #[derive(Debug, Default, PartialEq)]
    struct Marker(u32);

    impl AttrMarshaler for Marker {
        fn namespace(&self) -> &str {
            "urn:test:marker"
        }

        fn marshal_attrs(&self) -> Vec<XmlAttr> {
            Vec::new()
        }
    }

    #[test]
    fn test_get_returns_first_match() {
        let mut bag = AnyAttr::new();
        bag.push(Box::new(Marker(1)));
        bag.push(Box::new(PathAttr {
            path: "/a.model".to_string(),
        }));
        bag.push(Box::new(Marker(2)));

        assert_eq!(bag.get::<Marker>(), Some(&Marker(1)));
        assert!(bag.get::<String>().is_none());

        bag.get_mut::<Marker>().unwrap().0 = 7;
        assert_eq!(bag.get::<Marker>(), Some(&Marker(7)));
        assert_eq!(bag.len(), 3);
    }

    #[test]
    fn test_object_path_skips_empty() {
        let mut bag = AnyAttr::new();
        assert_eq!(bag.object_path(), None);

        bag.push(Box::new(PathAttr::default()));
        assert_eq!(bag.object_path(), None);

        bag.push(Box::new(PathAttr {
            path: "/3D/other.model".to_string(),
        }));
        assert_eq!(bag.object_path(), Some("/3D/other.model"));
    }

    #[test]
    fn test_get_or_insert_with_probes_first() {
        let mut bag = AnyAttr::new();
        bag.get_or_insert_with::<Marker>(|| Box::new(Marker::default()))
            .unwrap()
            .0 = 3;
        bag.get_or_insert_with::<Marker>(|| Box::new(Marker::default()))
            .unwrap()
            .0 += 1;
        assert_eq!(bag.len(), 1);
        assert_eq!(bag.get::<Marker>(), Some(&Marker(4)));
    }

    #[test]
    fn test_bag_equality_is_structural() {
        let mut a = AnyAttr::new();
        let mut b = AnyAttr::new();
        a.push(Box::new(Marker(1)));
        b.push(Box::new(Marker(1)));
        assert_eq!(a, b);

        b.push(Box::new(Marker(2)));
        assert_ne!(a, b);

        let mut c = AnyAttr::new();
        c.push(Box::new(PathAttr::default()));
        a.0.clear();
        a.push(Box::new(Marker(0)));
        assert_ne!(a, c);
    }
}
