//! Production extension validation
//!
//! Once a model uses the production extension every build, item, object and
//! component must carry a UUID. Only the root document may point components at
//! other documents.

use crate::error::{Diagnostic, Diagnostics, DiagnosticsResult, ModelError, Segment};
use crate::model::production::{BuildAttr, ComponentAttr, ItemAttr, ObjectAttr};
use crate::model::{Model, Object};

fn missing_uuid(uuid: Option<&str>) -> bool {
    uuid.is_none_or(str::is_empty)
}

/// Build and item UUIDs
pub(crate) fn validate_model(model: &Model) -> DiagnosticsResult {
    let mut errs = Diagnostics::new();
    let build = &model.build;
    if missing_uuid(build.any_attr.get::<BuildAttr>().map(|a| a.uuid.as_str())) {
        errs.add_at(Segment::named("Build"), ModelError::missing_field("UUID"));
    }
    for (index, item) in build.items.iter().enumerate() {
        if missing_uuid(item.any_attr.get::<ItemAttr>().map(|a| a.uuid.as_str())) {
            errs.push(
                Diagnostic::new(ModelError::missing_field("UUID"))
                    .wrap(Segment::indexed("Item", index))
                    .wrap(Segment::named("Build")),
            );
        }
    }
    errs.into_result()
}

/// Object and component UUIDs, and cross-document references in child documents
pub(crate) fn validate_object(model: &Model, path: &str, object: &Object) -> DiagnosticsResult {
    let mut errs = Diagnostics::new();
    if missing_uuid(object.any_attr.get::<ObjectAttr>().map(|a| a.uuid.as_str())) {
        errs.add(ModelError::missing_field("UUID"));
    }

    let mut components = Diagnostics::new();
    for (index, component) in object.components.iter().enumerate() {
        let segment = Segment::indexed("Component", index);
        let attr = component.any_attr.get::<ComponentAttr>();
        if missing_uuid(attr.map(|a| a.uuid.as_str())) {
            components.add_at(segment, ModelError::missing_field("UUID"));
        }
        let references_other = attr.is_some_and(|a| !a.path.is_empty());
        if references_other && !model.is_root_path(path) {
            components.add_at(segment, ModelError::ReferenceInNonRoot);
        }
    }
    errs.extend(components.wrap(Segment::named("Components")));
    errs.into_result()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BuildItem, Component, Mesh};

    #[test]
    fn test_uuids_required() {
        let mut model = Model::new();
        model.build.any_attr.push(Box::new(BuildAttr {
            uuid: "e9ecd7ba-8d53-4bba-a8b1-a4f0eef8a5d0".to_string(),
        }));
        model.build.items.push(BuildItem::new(1));

        let messages = validate_model(&model).unwrap_err().messages();
        assert_eq!(messages, vec!["Build@Item#0: required field 'UUID' is missing"]);

        let object = Object::with_mesh(1, Mesh::new());
        let messages = validate_object(&model, "", &object).unwrap_err().messages();
        assert_eq!(messages, vec!["required field 'UUID' is missing"]);
    }

    #[test]
    fn test_reference_in_non_root() {
        let model = Model::new();
        let mut component = Component::new(3);
        component.any_attr.push(Box::new(ComponentAttr {
            uuid: "1b4a0c37-2f4e-4d36-a3bd-26c7b9c3b8a0".to_string(),
            path: "/3D/other.model".to_string(),
        }));
        let mut object = Object::with_components(1, vec![component]);
        object.any_attr.push(Box::new(ObjectAttr {
            uuid: "d8ac8ff3-58d4-4d33-8b8d-5f4c0c1f3e36".to_string(),
        }));

        assert!(validate_object(&model, "", &object).is_ok());
        assert!(validate_object(&model, "/3D/3dmodel.model", &object).is_ok());
        let messages = validate_object(&model, "/3D/other.model", &object)
            .unwrap_err()
            .messages();
        assert_eq!(
            messages,
            vec!["Components@Component#0: only the root document may reference other documents"]
        );
    }
}
