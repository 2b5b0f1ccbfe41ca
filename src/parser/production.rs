//! Production extension parsing
//!
//! The production extension adds no elements, only `p:UUID` and `p:path`
//! attributes on core elements. Each host keeps a single payload of its own type;
//! attributes found later update it in place.

use crate::error::{Diagnostics, DiagnosticsResult, ModelError};
use crate::extension::{NodeMut, XmlAttr};
use crate::model::AnyAttr;
use crate::model::production::{BuildAttr, ComponentAttr, ItemAttr, ObjectAttr};

/// Validated UUID text, or a diagnostic and an empty string
fn parse_uuid(attr: &XmlAttr, errs: &mut Diagnostics) -> String {
    match uuid::Uuid::parse_str(&attr.value) {
        Ok(_) => attr.value.clone(),
        Err(_) => {
            errs.add(ModelError::parse_attr("UUID", true));
            String::new()
        }
    }
}

fn payload<T: Default + crate::model::AttrMarshaler>(bag: &mut AnyAttr) -> Option<&mut T> {
    bag.get_or_insert_with::<T>(|| Box::new(T::default()))
}

/// Decode a production attribute on a core element
pub(crate) fn decode_production_attribute(
    parent: NodeMut<'_>,
    attr: &XmlAttr,
) -> DiagnosticsResult {
    let mut errs = Diagnostics::new();
    let local = attr.name.local.as_str();
    match parent {
        NodeMut::Build(build) if local == "UUID" => {
            let uuid = parse_uuid(attr, &mut errs);
            if let Some(ext) = payload::<BuildAttr>(&mut build.any_attr) {
                ext.uuid = uuid;
            }
        }
        NodeMut::Object(object) if local == "UUID" => {
            let uuid = parse_uuid(attr, &mut errs);
            if let Some(ext) = payload::<ObjectAttr>(&mut object.any_attr) {
                ext.uuid = uuid;
            }
        }
        NodeMut::Item(item) => {
            if let Some(ext) = payload::<ItemAttr>(&mut item.any_attr) {
                match local {
                    "UUID" => ext.uuid = parse_uuid(attr, &mut errs),
                    "path" => ext.path = attr.value.clone(),
                    _ => {}
                }
            }
        }
        NodeMut::Component(component) => {
            if let Some(ext) = payload::<ComponentAttr>(&mut component.any_attr) {
                match local {
                    "UUID" => ext.uuid = parse_uuid(attr, &mut errs),
                    "path" => ext.path = attr.value.clone(),
                    _ => {}
                }
            }
        }
        _ => {}
    }
    errs.into_result()
}
