//! Slice extension parsing

use std::mem;

use crate::error::{Diagnostics, DiagnosticsResult, Segment};
use crate::extension::{NodeMut, XmlAttr, XmlName};
use crate::model::{
    MeshResolution, SLICE_NAMESPACE, Slice, SliceObjectAttr, SlicePolygon, SliceRef,
    SliceSegment, SliceStack, Vertex2D,
};

use super::{
    DecodeContext, ElementDecoder, parse_attr, parse_enum_attr, parse_opt_attr, push_asset,
};

/// Decoder for a slice element found under `parent`
pub(crate) fn new_slice_decoder(
    parent: NodeMut<'_>,
    name: &str,
) -> Option<Box<dyn ElementDecoder>> {
    match (parent, name) {
        (NodeMut::Resources(resources), "slicestack") => Some(Box::new(SliceStackDecoder {
            stack: SliceStack::default(),
            index: resources.assets.len(),
        })),
        _ => None,
    }
}

/// Decode `s:slicestackid` and `s:meshresolution` on an object
pub(crate) fn decode_slice_attribute(parent: NodeMut<'_>, attr: &XmlAttr) -> DiagnosticsResult {
    let NodeMut::Object(object) = parent else {
        return Ok(());
    };
    let mut errs = Diagnostics::new();
    match attr.name.local.as_str() {
        "slicestackid" => {
            let id = parse_attr(attr, true, &mut errs);
            if let Some(ext) = object
                .any_attr
                .get_or_insert_with::<SliceObjectAttr>(|| Box::new(SliceObjectAttr::default()))
            {
                ext.slicestackid = id;
            }
        }
        "meshresolution" => {
            let resolution = parse_enum_attr(attr, false, &mut errs, MeshResolution::parse);
            if let Some(ext) = object
                .any_attr
                .get_or_insert_with::<SliceObjectAttr>(|| Box::new(SliceObjectAttr::default()))
            {
                ext.meshresolution = resolution;
            }
        }
        _ => {}
    }
    errs.into_result()
}

fn own_attrs(attrs: &[XmlAttr]) -> impl Iterator<Item = &XmlAttr> {
    attrs.iter().filter(|a| a.name.space.is_empty())
}

fn is_slice(name: &XmlName, local: &str) -> bool {
    name.is(SLICE_NAMESPACE, local)
}

struct SliceStackDecoder {
    stack: SliceStack,
    index: usize,
}

impl ElementDecoder for SliceStackDecoder {
    fn start(
        &mut self,
        _ctx: &DecodeContext<'_>,
        attrs: &[XmlAttr],
        _parent: &mut dyn ElementDecoder,
    ) -> DiagnosticsResult {
        let mut errs = Diagnostics::new();
        for attr in own_attrs(attrs) {
            match attr.name.local.as_str() {
                "id" => self.stack.id = parse_attr(attr, true, &mut errs),
                "zbottom" => self.stack.zbottom = parse_attr(attr, false, &mut errs),
                _ => {}
            }
        }
        errs.into_result()
    }

    fn child(&mut self, _ctx: &DecodeContext<'_>, name: &XmlName) -> Option<Box<dyn ElementDecoder>> {
        if is_slice(name, "slice") {
            Some(Box::new(SliceDecoder {
                slice: Slice::default(),
                index: self.stack.slices.len(),
            }))
        } else if is_slice(name, "sliceref") {
            Some(Box::new(SliceRefDecoder {
                index: self.stack.slice_refs.len(),
            }))
        } else {
            None
        }
    }

    fn end(&mut self, _ctx: &DecodeContext<'_>, parent: &mut dyn ElementDecoder) -> DiagnosticsResult {
        push_asset(parent, mem::take(&mut self.stack));
        Ok(())
    }

    fn segment(&self) -> Option<Segment> {
        Some(Segment::indexed("SliceStack", self.index))
    }
}

struct SliceRefDecoder {
    index: usize,
}

impl ElementDecoder for SliceRefDecoder {
    fn start(
        &mut self,
        _ctx: &DecodeContext<'_>,
        attrs: &[XmlAttr],
        parent: &mut dyn ElementDecoder,
    ) -> DiagnosticsResult {
        let mut errs = Diagnostics::new();
        let mut slice_ref = SliceRef::default();
        for attr in own_attrs(attrs) {
            match attr.name.local.as_str() {
                "slicestackid" => slice_ref.slicestackid = parse_attr(attr, true, &mut errs),
                "slicepath" => slice_ref.slicepath = attr.value.clone(),
                _ => {}
            }
        }
        if let Some(stack) = parent.as_any_mut().downcast_mut::<SliceStackDecoder>() {
            stack.stack.slice_refs.push(slice_ref);
        }
        errs.into_result()
    }

    fn segment(&self) -> Option<Segment> {
        Some(Segment::indexed("SliceRef", self.index))
    }
}

struct SliceDecoder {
    slice: Slice,
    index: usize,
}

impl ElementDecoder for SliceDecoder {
    fn start(
        &mut self,
        _ctx: &DecodeContext<'_>,
        attrs: &[XmlAttr],
        _parent: &mut dyn ElementDecoder,
    ) -> DiagnosticsResult {
        let mut errs = Diagnostics::new();
        if let Some(attr) = own_attrs(attrs).find(|a| a.name.local == "ztop") {
            self.slice.ztop = parse_attr(attr, true, &mut errs);
        }
        errs.into_result()
    }

    fn child(&mut self, _ctx: &DecodeContext<'_>, name: &XmlName) -> Option<Box<dyn ElementDecoder>> {
        if is_slice(name, "vertices") {
            Some(Box::new(SliceVerticesDecoder::default()))
        } else if is_slice(name, "polygon") {
            Some(Box::new(PolygonDecoder {
                polygon: SlicePolygon::default(),
                index: self.slice.polygons.len(),
            }))
        } else {
            None
        }
    }

    fn end(&mut self, _ctx: &DecodeContext<'_>, parent: &mut dyn ElementDecoder) -> DiagnosticsResult {
        if let Some(stack) = parent.as_any_mut().downcast_mut::<SliceStackDecoder>() {
            stack.stack.slices.push(mem::take(&mut self.slice));
        }
        Ok(())
    }

    fn segment(&self) -> Option<Segment> {
        Some(Segment::indexed("Slice", self.index))
    }
}

#[derive(Default)]
struct SliceVerticesDecoder {
    vertices: Vec<Vertex2D>,
}

impl ElementDecoder for SliceVerticesDecoder {
    fn start(
        &mut self,
        _ctx: &DecodeContext<'_>,
        _attrs: &[XmlAttr],
        parent: &mut dyn ElementDecoder,
    ) -> DiagnosticsResult {
        if let Some(slice) = parent.as_any_mut().downcast_mut::<SliceDecoder>() {
            self.vertices = mem::take(&mut slice.slice.vertices);
        }
        Ok(())
    }

    fn child(&mut self, _ctx: &DecodeContext<'_>, name: &XmlName) -> Option<Box<dyn ElementDecoder>> {
        if is_slice(name, "vertex") {
            Some(Box::new(SliceVertexDecoder {
                index: self.vertices.len(),
            }))
        } else {
            None
        }
    }

    fn end(&mut self, _ctx: &DecodeContext<'_>, parent: &mut dyn ElementDecoder) -> DiagnosticsResult {
        if let Some(slice) = parent.as_any_mut().downcast_mut::<SliceDecoder>() {
            slice.slice.vertices = mem::take(&mut self.vertices);
        }
        Ok(())
    }
}

struct SliceVertexDecoder {
    index: usize,
}

impl ElementDecoder for SliceVertexDecoder {
    fn start(
        &mut self,
        _ctx: &DecodeContext<'_>,
        attrs: &[XmlAttr],
        parent: &mut dyn ElementDecoder,
    ) -> DiagnosticsResult {
        let mut errs = Diagnostics::new();
        let mut vertex = Vertex2D::default();
        for attr in own_attrs(attrs) {
            match attr.name.local.as_str() {
                "x" => vertex.x = parse_attr(attr, true, &mut errs),
                "y" => vertex.y = parse_attr(attr, true, &mut errs),
                _ => {}
            }
        }
        if let Some(vertices) = parent.as_any_mut().downcast_mut::<SliceVerticesDecoder>() {
            vertices.vertices.push(vertex);
        }
        errs.into_result()
    }

    fn segment(&self) -> Option<Segment> {
        Some(Segment::indexed("Vertex2D", self.index))
    }
}

struct PolygonDecoder {
    polygon: SlicePolygon,
    index: usize,
}

impl ElementDecoder for PolygonDecoder {
    fn start(
        &mut self,
        _ctx: &DecodeContext<'_>,
        attrs: &[XmlAttr],
        _parent: &mut dyn ElementDecoder,
    ) -> DiagnosticsResult {
        let mut errs = Diagnostics::new();
        if let Some(attr) = own_attrs(attrs).find(|a| a.name.local == "startv") {
            self.polygon.startv = parse_attr(attr, true, &mut errs);
        }
        errs.into_result()
    }

    fn child(&mut self, _ctx: &DecodeContext<'_>, name: &XmlName) -> Option<Box<dyn ElementDecoder>> {
        if is_slice(name, "segment") {
            Some(Box::new(SegmentDecoder {
                index: self.polygon.segments.len(),
            }))
        } else {
            None
        }
    }

    fn end(&mut self, _ctx: &DecodeContext<'_>, parent: &mut dyn ElementDecoder) -> DiagnosticsResult {
        if let Some(slice) = parent.as_any_mut().downcast_mut::<SliceDecoder>() {
            slice.slice.polygons.push(mem::take(&mut self.polygon));
        }
        Ok(())
    }

    fn segment(&self) -> Option<Segment> {
        Some(Segment::indexed("Polygon", self.index))
    }
}

struct SegmentDecoder {
    index: usize,
}

impl ElementDecoder for SegmentDecoder {
    fn start(
        &mut self,
        _ctx: &DecodeContext<'_>,
        attrs: &[XmlAttr],
        parent: &mut dyn ElementDecoder,
    ) -> DiagnosticsResult {
        let mut errs = Diagnostics::new();
        let mut segment = SliceSegment::default();
        for attr in own_attrs(attrs) {
            match attr.name.local.as_str() {
                "v2" => segment.v2 = parse_attr(attr, true, &mut errs),
                "pid" => segment.pid = parse_opt_attr(attr, false, &mut errs),
                "p1" => segment.p1 = parse_opt_attr(attr, false, &mut errs),
                "p2" => segment.p2 = parse_opt_attr(attr, false, &mut errs),
                _ => {}
            }
        }
        if let Some(polygon) = parent.as_any_mut().downcast_mut::<PolygonDecoder>() {
            polygon.polygon.segments.push(segment);
        }
        errs.into_result()
    }

    fn segment(&self) -> Option<Segment> {
        Some(Segment::indexed("Segment", self.index))
    }
}
