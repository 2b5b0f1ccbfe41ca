//! Core validation functions for 3MF models

use std::collections::HashSet;

use crate::error::{Diagnostics, ModelError, Segment};
use crate::model::{Asset, BaseMaterialGroup, Build, Mesh, Model, Object, ObjectType};

/// IDs already claimed in one document
///
/// Assets and objects share a single ID space.
#[derive(Debug, Default)]
pub(crate) struct IdTracker {
    seen: HashSet<u32>,
}

impl IdTracker {
    /// Record `id`; false if it was already claimed
    fn claim(&mut self, id: u32) -> bool {
        self.seen.insert(id)
    }
}

/// Checks shared by every asset, plus the rules for core base materials
pub(crate) fn validate_asset(asset: &dyn Asset, ids: &mut IdTracker) -> Diagnostics {
    let mut errs = Diagnostics::new();
    if asset.id() == 0 {
        errs.add(ModelError::MissingId);
    } else if !ids.claim(asset.id()) {
        errs.add(ModelError::DuplicatedId);
    }

    if let Some(group) = asset.as_any().downcast_ref::<BaseMaterialGroup>() {
        if group.materials.is_empty() {
            errs.add(ModelError::EmptyResourceProps);
        }
        for (index, material) in group.materials.iter().enumerate() {
            if material.name.is_empty() {
                errs.add_at(Segment::indexed("Base", index), ModelError::missing_field("name"));
            }
        }
    }
    errs
}

pub(crate) fn validate_object(
    model: &Model,
    path: &str,
    object: &Object,
    ids: &mut IdTracker,
) -> Diagnostics {
    let mut errs = Diagnostics::new();
    if object.id == 0 {
        errs.add(ModelError::MissingId);
    } else if !ids.claim(object.id) {
        errs.add(ModelError::DuplicatedId);
    }
    if object.mesh.is_some() == !object.components.is_empty() {
        errs.add(ModelError::InvalidObject);
    }

    if let Some(pid) = object.pid.filter(|&pid| pid != 0) {
        match model.find_asset(path, pid) {
            None => errs.add(ModelError::MissingResource),
            Some(asset) => {
                if let (Some(pindex), Some(count)) = (object.pindex, asset.property_count()) {
                    if pindex as usize >= count {
                        errs.add(ModelError::IndexOutOfBounds);
                    }
                }
            }
        }
    }

    if let Some(mesh) = &object.mesh {
        errs.extend(validate_mesh(model, path, object.pid, mesh).wrap(Segment::named("Mesh")));
    }
    if !object.components.is_empty() {
        errs.extend(validate_components(model, path, object).wrap(Segment::named("Components")));
    }
    errs
}

/// Triangle indices and property references of a mesh
///
/// Triangles without a `pid` use the object default `default_pid`.
fn validate_mesh(model: &Model, path: &str, default_pid: Option<u32>, mesh: &Mesh) -> Diagnostics {
    let mut errs = Diagnostics::new();
    let vertex_count = mesh.vertices.len();

    for (index, triangle) in mesh.triangles.iter().enumerate() {
        let segment = Segment::indexed("Triangle", index);
        let [v1, v2, v3] = triangle.indices();
        if [v1, v2, v3].iter().any(|&v| v as usize >= vertex_count) {
            errs.add_at(segment, ModelError::IndexOutOfBounds);
        } else if v1 == v2 || v2 == v3 || v1 == v3 {
            errs.add_at(segment, ModelError::DuplicatedIndices);
        }

        let Some(pid) = triangle.pid.or(default_pid).filter(|&pid| pid != 0) else {
            continue;
        };
        match model.find_asset(path, pid) {
            None => {
                if triangle.pid.is_some() {
                    errs.add_at(segment, ModelError::MissingResource);
                }
            }
            Some(asset) => {
                let count = asset.property_count();
                let indices = triangle.property_indices();
                if let (Some(count), Some(indices)) = (count, indices) {
                    if indices.iter().any(|&p| p as usize >= count) {
                        errs.add_at(segment, ModelError::IndexOutOfBounds);
                    }
                }
            }
        }
    }
    errs
}

/// Key identifying a document, with every spelling of the root collapsed
fn document_key<'a>(model: &Model, path: &'a str) -> &'a str {
    if model.is_root_path(path) { "" } else { path }
}

fn validate_components(model: &Model, path: &str, object: &Object) -> Diagnostics {
    let mut errs = Diagnostics::new();
    let origin = (document_key(model, path).to_string(), object.id);

    for (index, component) in object.components.iter().enumerate() {
        let segment = Segment::indexed("Component", index);
        let target = component.object_path(path);
        let key = (document_key(model, target).to_string(), component.objectid);
        if key == origin {
            errs.add_at(segment, ModelError::RecursiveComponent);
            continue;
        }
        match model.find_object(target, component.objectid) {
            None => errs.add_at(segment, ModelError::MissingResource),
            Some(referenced) => {
                let mut visited = HashSet::new();
                if reaches(model, target, referenced, &origin, &mut visited) {
                    errs.add_at(segment, ModelError::RecursiveComponent);
                }
            }
        }
    }
    errs
}

/// Whether following the components of `object` leads back to `origin`
fn reaches(
    model: &Model,
    path: &str,
    object: &Object,
    origin: &(String, u32),
    visited: &mut HashSet<(String, u32)>,
) -> bool {
    if !visited.insert((document_key(model, path).to_string(), object.id)) {
        return false;
    }
    object.components.iter().any(|component| {
        let target = component.object_path(path);
        if document_key(model, target) == origin.0 && component.objectid == origin.1 {
            return true;
        }
        model
            .find_object(target, component.objectid)
            .is_some_and(|next| reaches(model, target, next, origin, visited))
    })
}

pub(crate) fn validate_build(model: &Model, path: &str, build: &Build) -> Diagnostics {
    let mut errs = Diagnostics::new();
    for (index, item) in build.items.iter().enumerate() {
        let segment = Segment::indexed("Item", index);
        match model.find_object(item.object_path(path), item.objectid) {
            None => errs.add_at(segment, ModelError::MissingResource),
            Some(object) if object.object_type == ObjectType::Other => {
                errs.add_at(segment, ModelError::OtherItem);
            }
            Some(_) => {}
        }
    }
    errs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::production::ComponentAttr;
    use crate::model::{BaseMaterial, BuildItem, ChildModel, Component, Triangle, Vertex};

    fn triangle_mesh() -> Mesh {
        let mut mesh = Mesh::new();
        mesh.vertices.push(Vertex::new(0.0, 0.0, 0.0));
        mesh.vertices.push(Vertex::new(1.0, 0.0, 0.0));
        mesh.vertices.push(Vertex::new(0.0, 1.0, 0.0));
        mesh.triangles.push(Triangle::new(0, 1, 2));
        mesh
    }

    #[test]
    fn test_base_materials_rules() {
        let mut ids = IdTracker::default();
        let empty = BaseMaterialGroup::new(0);
        assert_eq!(
            validate_asset(&empty, &mut ids).messages(),
            vec![
                "resource id must be a positive integer",
                "resource properties must not be empty",
            ]
        );

        let mut unnamed = BaseMaterialGroup::new(1);
        unnamed.materials.push(BaseMaterial::new("red", (255, 0, 0, 255)));
        unnamed.materials.push(BaseMaterial::new("", (0, 0, 0, 255)));
        assert_eq!(
            validate_asset(&unnamed, &mut ids).messages(),
            vec!["Base#1: required field 'name' is missing"]
        );
        assert_eq!(
            validate_asset(&unnamed, &mut ids).messages()[0],
            "resource id is already used in this document"
        );
    }

    #[test]
    fn test_triangle_properties_resolve() {
        let mut model = Model::new();
        let mut group = BaseMaterialGroup::new(5);
        group.materials.push(BaseMaterial::new("a", (1, 0, 0, 255)));
        model.resources.push_asset(group);

        let mut mesh = triangle_mesh();
        mesh.triangles.push(Triangle::with_properties(0, 1, 2, 5, [0, 0, 1]));
        mesh.triangles.push(Triangle::with_properties(0, 1, 2, 6, [0, 0, 0]));
        let object = Object::with_mesh(1, mesh);

        let errs = validate_object(&model, "", &object, &mut IdTracker::default());
        assert_eq!(
            errs.messages(),
            vec![
                "Mesh@Triangle#1: index is out of bounds",
                "Mesh@Triangle#2: referenced resource does not exist",
            ]
        );
    }

    fn component_in(objectid: u32, path: &str) -> Component {
        let mut component = Component::new(objectid);
        component.any_attr.push(Box::new(ComponentAttr {
            uuid: String::new(),
            path: path.to_string(),
        }));
        component
    }

    #[test]
    fn test_recursive_components_across_documents() {
        let mut model = Model::new();
        let mut child = ChildModel::default();
        child.resources.objects.push(Object::with_components(
            5,
            vec![component_in(1, "/3D/3dmodel.model")],
        ));
        model.children.insert("/3D/part.model".to_string(), child);
        model.resources.objects.push(Object::with_components(
            1,
            vec![component_in(5, "/3D/part.model")],
        ));

        let errs = validate_components(&model, "", &model.resources.objects[0]);
        assert_eq!(
            errs.messages(),
            vec!["Component#0: component references its own object"]
        );
        let part = &model.children["/3D/part.model"].resources.objects[0];
        let errs = validate_components(&model, "/3D/part.model", part);
        assert_eq!(
            errs.messages(),
            vec!["Component#0: component references its own object"]
        );
    }

    #[test]
    fn test_recursive_components_in_one_document() {
        let mut model = Model::new();
        model
            .resources
            .objects
            .push(Object::with_components(1, vec![Component::new(2)]));
        model
            .resources
            .objects
            .push(Object::with_components(2, vec![Component::new(1)]));

        let errs = validate_components(&model, "", &model.resources.objects[0]);
        assert_eq!(
            errs.messages(),
            vec!["Component#0: component references its own object"]
        );
    }

    #[test]
    fn test_build_items() {
        let mut model = Model::new();
        let mut other = Object::with_mesh(1, triangle_mesh());
        other.object_type = ObjectType::Other;
        model.resources.objects.push(other);
        model.build.items.push(BuildItem::new(1));
        model.build.items.push(BuildItem::new(2));

        let errs = validate_build(&model, "", &model.build);
        assert_eq!(
            errs.messages(),
            vec![
                "Item#0: build items must not reference objects of type other",
                "Item#1: referenced resource does not exist",
            ]
        );
    }
}
