//! Production extension types
//!
//! Each host element gets its own attribute payload so that the `p:path`
//! capability is only offered where the schema allows it.

use crate::extension::{XmlAttr, XmlName};

use super::any::AttrMarshaler;
use super::core::PRODUCTION_NAMESPACE;

fn uuid_attr(uuid: &str, attrs: &mut Vec<XmlAttr>) {
    if !uuid.is_empty() {
        attrs.push(XmlAttr::new(
            XmlName::new(PRODUCTION_NAMESPACE, "UUID"),
            uuid.to_string(),
        ));
    }
}

fn path_attr(path: &str, attrs: &mut Vec<XmlAttr>) {
    if !path.is_empty() {
        attrs.push(XmlAttr::new(
            XmlName::new(PRODUCTION_NAMESPACE, "path"),
            path.to_string(),
        ));
    }
}

/// `p:UUID` on `<build>`
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BuildAttr {
    pub uuid: String,
}

impl AttrMarshaler for BuildAttr {
    fn namespace(&self) -> &str {
        PRODUCTION_NAMESPACE
    }

    fn marshal_attrs(&self) -> Vec<XmlAttr> {
        let mut attrs = Vec::with_capacity(1);
        uuid_attr(&self.uuid, &mut attrs);
        attrs
    }
}

/// `p:UUID` on `<object>`
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ObjectAttr {
    pub uuid: String,
}

impl AttrMarshaler for ObjectAttr {
    fn namespace(&self) -> &str {
        PRODUCTION_NAMESPACE
    }

    fn marshal_attrs(&self) -> Vec<XmlAttr> {
        let mut attrs = Vec::with_capacity(1);
        uuid_attr(&self.uuid, &mut attrs);
        attrs
    }
}

/// `p:UUID` and `p:path` on `<item>`
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ItemAttr {
    pub uuid: String,
    /// Document holding the referenced object
    pub path: String,
}

impl AttrMarshaler for ItemAttr {
    fn namespace(&self) -> &str {
        PRODUCTION_NAMESPACE
    }

    fn marshal_attrs(&self) -> Vec<XmlAttr> {
        let mut attrs = Vec::with_capacity(2);
        path_attr(&self.path, &mut attrs);
        uuid_attr(&self.uuid, &mut attrs);
        attrs
    }

    fn object_path(&self) -> Option<&str> {
        Some(&self.path)
    }
}

/// `p:UUID` and `p:path` on `<component>`
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ComponentAttr {
    pub uuid: String,
    /// Document holding the referenced object
    pub path: String,
}

impl AttrMarshaler for ComponentAttr {
    fn namespace(&self) -> &str {
        PRODUCTION_NAMESPACE
    }

    fn marshal_attrs(&self) -> Vec<XmlAttr> {
        let mut attrs = Vec::with_capacity(2);
        path_attr(&self.path, &mut attrs);
        uuid_attr(&self.uuid, &mut attrs);
        attrs
    }

    fn object_path(&self) -> Option<&str> {
        Some(&self.path)
    }
}
