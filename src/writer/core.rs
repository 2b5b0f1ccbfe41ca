//! Core element writing for 3MF model files
//!
//! This module provides functionality to write core 3MF elements like
//! objects, meshes, components and the build.

use quick_xml::events::BytesStart;

use crate::error::Result;
use crate::model::{BaseMaterialGroup, Build, Component, Mesh, Object, ObjectType};

use super::{XmlEncoder, format_color, format_transform, write_metadata_group};

/// Write a `<basematerials>` group
pub(crate) fn write_base_materials(x: &mut XmlEncoder, group: &BaseMaterialGroup) -> Result<()> {
    let mut elem = BytesStart::new("basematerials");
    elem.push_attribute(("id", group.id.to_string().as_str()));
    if group.materials.is_empty() {
        return x.empty(elem);
    }
    x.start(elem.borrow())?;
    for material in &group.materials {
        let mut base = BytesStart::new("base");
        base.push_attribute(("name", material.name.as_str()));
        base.push_attribute(("displaycolor", format_color(material.displaycolor).as_str()));
        x.empty(base)?;
    }
    x.end(&elem)
}

/// Write an object
pub(crate) fn write_object(x: &mut XmlEncoder, object: &Object) -> Result<()> {
    let mut elem = BytesStart::new("object");
    elem.push_attribute(("id", object.id.to_string().as_str()));
    if object.object_type != ObjectType::Model {
        elem.push_attribute(("type", object.object_type.as_str()));
    }
    if !object.name.is_empty() {
        elem.push_attribute(("name", object.name.as_str()));
    }
    if !object.partnumber.is_empty() {
        elem.push_attribute(("partnumber", object.partnumber.as_str()));
    }
    if !object.thumbnail.is_empty() {
        elem.push_attribute(("thumbnail", object.thumbnail.as_str()));
    }
    if let Some(pid) = object.pid {
        elem.push_attribute(("pid", pid.to_string().as_str()));
    }
    if let Some(pindex) = object.pindex {
        elem.push_attribute(("pindex", pindex.to_string().as_str()));
    }
    x.push_any_attr(&mut elem, &object.any_attr)?;

    x.start(elem.borrow())?;
    write_metadata_group(x, &object.metadata)?;
    if let Some(mesh) = &object.mesh {
        write_mesh(x, mesh)?;
    } else if !object.components.is_empty() {
        write_components(x, &object.components)?;
    }
    x.end(&elem)
}

/// Write a mesh
fn write_mesh(x: &mut XmlEncoder, mesh: &Mesh) -> Result<()> {
    let mut elem = BytesStart::new("mesh");
    x.push_any_attr(&mut elem, &mesh.any_attr)?;
    x.start(elem.borrow())?;

    let vertices = BytesStart::new("vertices");
    x.start(vertices.borrow())?;
    for vertex in &mesh.vertices {
        let mut v = BytesStart::new("vertex");
        v.push_attribute(("x", vertex.x.to_string().as_str()));
        v.push_attribute(("y", vertex.y.to_string().as_str()));
        v.push_attribute(("z", vertex.z.to_string().as_str()));
        x.empty(v)?;
    }
    x.end(&vertices)?;

    let triangles = BytesStart::new("triangles");
    x.start(triangles.borrow())?;
    for triangle in &mesh.triangles {
        let mut t = BytesStart::new("triangle");
        t.push_attribute(("v1", triangle.v1.to_string().as_str()));
        t.push_attribute(("v2", triangle.v2.to_string().as_str()));
        t.push_attribute(("v3", triangle.v3.to_string().as_str()));
        let properties = [
            ("pid", triangle.pid),
            ("p1", triangle.p1),
            ("p2", triangle.p2),
            ("p3", triangle.p3),
        ];
        for (name, value) in properties {
            if let Some(value) = value {
                t.push_attribute((name, value.to_string().as_str()));
            }
        }
        x.empty(t)?;
    }
    x.end(&triangles)?;

    x.write_any_elements(&mesh.any)?;
    x.end(&elem)
}

/// Write components
fn write_components(x: &mut XmlEncoder, components: &[Component]) -> Result<()> {
    let elem = BytesStart::new("components");
    x.start(elem.borrow())?;
    for component in components {
        let mut c = BytesStart::new("component");
        c.push_attribute(("objectid", component.objectid.to_string().as_str()));
        if let Some(transform) = &component.transform {
            c.push_attribute(("transform", format_transform(transform).as_str()));
        }
        x.push_any_attr(&mut c, &component.any_attr)?;
        x.empty(c)?;
    }
    x.end(&elem)
}

/// Write the build section
pub(crate) fn write_build(x: &mut XmlEncoder, build: &Build) -> Result<()> {
    let mut elem = BytesStart::new("build");
    x.push_any_attr(&mut elem, &build.any_attr)?;
    if build.items.is_empty() {
        return x.empty(elem);
    }
    x.start(elem.borrow())?;
    for item in &build.items {
        let mut i = BytesStart::new("item");
        i.push_attribute(("objectid", item.objectid.to_string().as_str()));
        if let Some(transform) = &item.transform {
            i.push_attribute(("transform", format_transform(transform).as_str()));
        }
        if !item.partnumber.is_empty() {
            i.push_attribute(("partnumber", item.partnumber.as_str()));
        }
        x.push_any_attr(&mut i, &item.any_attr)?;
        if item.metadata.is_empty() {
            x.empty(i)?;
        } else {
            x.start(i.borrow())?;
            write_metadata_group(x, &item.metadata)?;
            x.end(&i)?;
        }
    }
    x.end(&elem)
}
