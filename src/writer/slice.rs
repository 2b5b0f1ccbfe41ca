//! Slice extension writing

use crate::error::Result;
use crate::model::{SLICE_NAMESPACE, Slice, SliceStack};

use super::XmlEncoder;

/// Write a slice stack with its slices or slice references
pub(crate) fn write_slice_stack(x: &mut XmlEncoder, stack: &SliceStack) -> Result<()> {
    let mut elem = x.element(SLICE_NAMESPACE, "slicestack")?;
    elem.push_attribute(("id", stack.id.to_string().as_str()));
    elem.push_attribute(("zbottom", stack.zbottom.to_string().as_str()));
    if stack.slices.is_empty() && stack.slice_refs.is_empty() {
        return x.empty(elem);
    }
    x.start(elem.borrow())?;
    for slice in &stack.slices {
        write_slice(x, slice)?;
    }
    for slice_ref in &stack.slice_refs {
        let mut r = x.element(SLICE_NAMESPACE, "sliceref")?;
        r.push_attribute(("slicestackid", slice_ref.slicestackid.to_string().as_str()));
        r.push_attribute(("slicepath", slice_ref.slicepath.as_str()));
        x.empty(r)?;
    }
    x.end(&elem)
}

fn write_slice(x: &mut XmlEncoder, slice: &Slice) -> Result<()> {
    let mut elem = x.element(SLICE_NAMESPACE, "slice")?;
    elem.push_attribute(("ztop", slice.ztop.to_string().as_str()));
    if slice.vertices.is_empty() && slice.polygons.is_empty() {
        return x.empty(elem);
    }
    x.start(elem.borrow())?;

    let vertices = x.element(SLICE_NAMESPACE, "vertices")?;
    x.start(vertices.borrow())?;
    for vertex in &slice.vertices {
        let mut v = x.element(SLICE_NAMESPACE, "vertex")?;
        v.push_attribute(("x", vertex.x.to_string().as_str()));
        v.push_attribute(("y", vertex.y.to_string().as_str()));
        x.empty(v)?;
    }
    x.end(&vertices)?;

    for polygon in &slice.polygons {
        let mut p = x.element(SLICE_NAMESPACE, "polygon")?;
        p.push_attribute(("startv", polygon.startv.to_string().as_str()));
        x.start(p.borrow())?;
        for segment in &polygon.segments {
            let mut s = x.element(SLICE_NAMESPACE, "segment")?;
            s.push_attribute(("v2", segment.v2.to_string().as_str()));
            for (name, value) in [("p1", segment.p1), ("p2", segment.p2), ("pid", segment.pid)] {
                if let Some(value) = value {
                    s.push_attribute((name, value.to_string().as_str()));
                }
            }
            x.empty(s)?;
        }
        x.end(&p)?;
    }
    x.end(&elem)
}
