//! Material extension parsing
//!
//! Decoders for color groups, 2D textures, texture coordinate groups, composite
//! materials and multi-properties. All of them are assets and therefore only
//! appear under `<resources>`.

use std::mem;

use crate::error::{Diagnostics, DiagnosticsResult, Segment};
use crate::extension::{NodeMut, XmlAttr, XmlName};
use crate::model::{
    BlendMethod, ColorGroup, Composite, CompositeMaterials, FilterMode, MATERIAL_NAMESPACE, Multi,
    MultiProperties, Tex2Coord, Texture2D, Texture2DGroup, TextureType, TileStyle,
};

use super::{
    DecodeContext, ElementDecoder, parse_attr, parse_color, parse_enum_attr, parse_list_attr,
    push_asset,
};

/// Decoder for a materials element found under `parent`
pub(crate) fn new_material_decoder(
    parent: NodeMut<'_>,
    name: &str,
) -> Option<Box<dyn ElementDecoder>> {
    let NodeMut::Resources(resources) = parent else {
        return None;
    };
    let index = resources.assets.len();
    let decoder: Box<dyn ElementDecoder> = match name {
        "colorgroup" => Box::new(ColorGroupDecoder::new(index)),
        "texture2d" => Box::new(Texture2DDecoder::new(index)),
        "texture2dgroup" => Box::new(Texture2DGroupDecoder::new(index)),
        "compositematerials" => Box::new(CompositeMaterialsDecoder::new(index)),
        "multiproperties" => Box::new(MultiPropertiesDecoder::new(index)),
        _ => return None,
    };
    Some(decoder)
}

/// Unprefixed attributes; materials elements carry no foreign attributes we keep
fn own_attrs(attrs: &[XmlAttr]) -> impl Iterator<Item = &XmlAttr> {
    attrs.iter().filter(|a| a.name.space.is_empty())
}

fn is_material(name: &XmlName, local: &str) -> bool {
    name.is(MATERIAL_NAMESPACE, local)
}

struct ColorGroupDecoder {
    group: ColorGroup,
    index: usize,
}

impl ColorGroupDecoder {
    fn new(index: usize) -> Self {
        Self {
            group: ColorGroup::default(),
            index,
        }
    }
}

impl ElementDecoder for ColorGroupDecoder {
    fn start(
        &mut self,
        _ctx: &DecodeContext<'_>,
        attrs: &[XmlAttr],
        _parent: &mut dyn ElementDecoder,
    ) -> DiagnosticsResult {
        let mut errs = Diagnostics::new();
        for attr in own_attrs(attrs) {
            if attr.name.local == "id" {
                self.group.id = parse_attr(attr, true, &mut errs);
            }
        }
        errs.into_result()
    }

    fn child(&mut self, _ctx: &DecodeContext<'_>, name: &XmlName) -> Option<Box<dyn ElementDecoder>> {
        if is_material(name, "color") {
            Some(Box::new(ColorDecoder {
                index: self.group.colors.len(),
            }))
        } else {
            None
        }
    }

    fn end(&mut self, _ctx: &DecodeContext<'_>, parent: &mut dyn ElementDecoder) -> DiagnosticsResult {
        push_asset(parent, mem::take(&mut self.group));
        Ok(())
    }

    fn segment(&self) -> Option<Segment> {
        Some(Segment::indexed("ColorGroup", self.index))
    }
}

struct ColorDecoder {
    index: usize,
}

impl ElementDecoder for ColorDecoder {
    fn start(
        &mut self,
        _ctx: &DecodeContext<'_>,
        attrs: &[XmlAttr],
        parent: &mut dyn ElementDecoder,
    ) -> DiagnosticsResult {
        let mut errs = Diagnostics::new();
        let mut color = (0, 0, 0, 0);
        for attr in own_attrs(attrs) {
            if attr.name.local == "color" {
                color = parse_enum_attr(attr, true, &mut errs, parse_color);
            }
        }
        if let Some(group) = parent.as_any_mut().downcast_mut::<ColorGroupDecoder>() {
            group.group.colors.push(color);
        }
        errs.into_result()
    }

    fn segment(&self) -> Option<Segment> {
        Some(Segment::indexed("RGBA", self.index))
    }
}

struct Texture2DDecoder {
    texture: Texture2D,
    index: usize,
}

impl Texture2DDecoder {
    fn new(index: usize) -> Self {
        Self {
            texture: Texture2D::default(),
            index,
        }
    }
}

impl ElementDecoder for Texture2DDecoder {
    fn start(
        &mut self,
        _ctx: &DecodeContext<'_>,
        attrs: &[XmlAttr],
        _parent: &mut dyn ElementDecoder,
    ) -> DiagnosticsResult {
        let mut errs = Diagnostics::new();
        let texture = &mut self.texture;
        for attr in own_attrs(attrs) {
            match attr.name.local.as_str() {
                "id" => texture.id = parse_attr(attr, true, &mut errs),
                "path" => texture.path = attr.value.clone(),
                "contenttype" => {
                    texture.contenttype =
                        parse_enum_attr(attr, true, &mut errs, |s| TextureType::parse(s).map(Some))
                }
                "tilestyleu" => {
                    texture.tilestyleu = parse_enum_attr(attr, false, &mut errs, TileStyle::parse)
                }
                "tilestylev" => {
                    texture.tilestylev = parse_enum_attr(attr, false, &mut errs, TileStyle::parse)
                }
                "filter" => {
                    texture.filter = parse_enum_attr(attr, false, &mut errs, FilterMode::parse)
                }
                _ => {}
            }
        }
        errs.into_result()
    }

    fn end(&mut self, _ctx: &DecodeContext<'_>, parent: &mut dyn ElementDecoder) -> DiagnosticsResult {
        push_asset(parent, mem::take(&mut self.texture));
        Ok(())
    }

    fn segment(&self) -> Option<Segment> {
        Some(Segment::indexed("Texture2D", self.index))
    }
}

struct Texture2DGroupDecoder {
    group: Texture2DGroup,
    index: usize,
}

impl Texture2DGroupDecoder {
    fn new(index: usize) -> Self {
        Self {
            group: Texture2DGroup::default(),
            index,
        }
    }
}

impl ElementDecoder for Texture2DGroupDecoder {
    fn start(
        &mut self,
        _ctx: &DecodeContext<'_>,
        attrs: &[XmlAttr],
        _parent: &mut dyn ElementDecoder,
    ) -> DiagnosticsResult {
        let mut errs = Diagnostics::new();
        for attr in own_attrs(attrs) {
            match attr.name.local.as_str() {
                "id" => self.group.id = parse_attr(attr, true, &mut errs),
                "texid" => self.group.texid = parse_attr(attr, true, &mut errs),
                _ => {}
            }
        }
        errs.into_result()
    }

    fn child(&mut self, _ctx: &DecodeContext<'_>, name: &XmlName) -> Option<Box<dyn ElementDecoder>> {
        if is_material(name, "tex2coord") {
            Some(Box::new(Tex2CoordDecoder {
                index: self.group.tex2coords.len(),
            }))
        } else {
            None
        }
    }

    fn end(&mut self, _ctx: &DecodeContext<'_>, parent: &mut dyn ElementDecoder) -> DiagnosticsResult {
        push_asset(parent, mem::take(&mut self.group));
        Ok(())
    }

    fn segment(&self) -> Option<Segment> {
        Some(Segment::indexed("Texture2DGroup", self.index))
    }
}

struct Tex2CoordDecoder {
    index: usize,
}

impl ElementDecoder for Tex2CoordDecoder {
    fn start(
        &mut self,
        _ctx: &DecodeContext<'_>,
        attrs: &[XmlAttr],
        parent: &mut dyn ElementDecoder,
    ) -> DiagnosticsResult {
        let mut errs = Diagnostics::new();
        let mut coord = Tex2Coord::default();
        for attr in own_attrs(attrs) {
            match attr.name.local.as_str() {
                "u" => coord.u = parse_attr(attr, true, &mut errs),
                "v" => coord.v = parse_attr(attr, true, &mut errs),
                _ => {}
            }
        }
        if let Some(group) = parent.as_any_mut().downcast_mut::<Texture2DGroupDecoder>() {
            group.group.tex2coords.push(coord);
        }
        errs.into_result()
    }

    fn segment(&self) -> Option<Segment> {
        Some(Segment::indexed("TextureCoord", self.index))
    }
}

struct CompositeMaterialsDecoder {
    group: CompositeMaterials,
    index: usize,
}

impl CompositeMaterialsDecoder {
    fn new(index: usize) -> Self {
        Self {
            group: CompositeMaterials::default(),
            index,
        }
    }
}

impl ElementDecoder for CompositeMaterialsDecoder {
    fn start(
        &mut self,
        _ctx: &DecodeContext<'_>,
        attrs: &[XmlAttr],
        _parent: &mut dyn ElementDecoder,
    ) -> DiagnosticsResult {
        let mut errs = Diagnostics::new();
        for attr in own_attrs(attrs) {
            match attr.name.local.as_str() {
                "id" => self.group.id = parse_attr(attr, true, &mut errs),
                "matid" => self.group.matid = parse_attr(attr, true, &mut errs),
                "matindices" => self.group.matindices = parse_list_attr(attr, true, &mut errs),
                _ => {}
            }
        }
        errs.into_result()
    }

    fn child(&mut self, _ctx: &DecodeContext<'_>, name: &XmlName) -> Option<Box<dyn ElementDecoder>> {
        if is_material(name, "composite") {
            Some(Box::new(CompositeDecoder {
                index: self.group.composites.len(),
            }))
        } else {
            None
        }
    }

    fn end(&mut self, _ctx: &DecodeContext<'_>, parent: &mut dyn ElementDecoder) -> DiagnosticsResult {
        push_asset(parent, mem::take(&mut self.group));
        Ok(())
    }

    fn segment(&self) -> Option<Segment> {
        Some(Segment::indexed("CompositeMaterials", self.index))
    }
}

struct CompositeDecoder {
    index: usize,
}

impl ElementDecoder for CompositeDecoder {
    fn start(
        &mut self,
        _ctx: &DecodeContext<'_>,
        attrs: &[XmlAttr],
        parent: &mut dyn ElementDecoder,
    ) -> DiagnosticsResult {
        let mut errs = Diagnostics::new();
        let mut composite = Composite::default();
        for attr in own_attrs(attrs) {
            if attr.name.local == "values" {
                composite.values = parse_list_attr(attr, true, &mut errs);
            }
        }
        if let Some(group) = parent
            .as_any_mut()
            .downcast_mut::<CompositeMaterialsDecoder>()
        {
            group.group.composites.push(composite);
        }
        errs.into_result()
    }

    fn segment(&self) -> Option<Segment> {
        Some(Segment::indexed("Composite", self.index))
    }
}

struct MultiPropertiesDecoder {
    group: MultiProperties,
    index: usize,
}

impl MultiPropertiesDecoder {
    fn new(index: usize) -> Self {
        Self {
            group: MultiProperties::default(),
            index,
        }
    }
}

impl ElementDecoder for MultiPropertiesDecoder {
    fn start(
        &mut self,
        _ctx: &DecodeContext<'_>,
        attrs: &[XmlAttr],
        _parent: &mut dyn ElementDecoder,
    ) -> DiagnosticsResult {
        let mut errs = Diagnostics::new();
        for attr in own_attrs(attrs) {
            match attr.name.local.as_str() {
                "id" => self.group.id = parse_attr(attr, true, &mut errs),
                "pids" => self.group.pids = parse_list_attr(attr, true, &mut errs),
                "blendmethods" => {
                    self.group.blendmethods = parse_enum_attr(attr, false, &mut errs, |s| {
                        s.split_whitespace().map(BlendMethod::parse).collect()
                    })
                }
                _ => {}
            }
        }
        errs.into_result()
    }

    fn child(&mut self, _ctx: &DecodeContext<'_>, name: &XmlName) -> Option<Box<dyn ElementDecoder>> {
        if is_material(name, "multi") {
            Some(Box::new(MultiDecoder {
                index: self.group.multis.len(),
            }))
        } else {
            None
        }
    }

    fn end(&mut self, _ctx: &DecodeContext<'_>, parent: &mut dyn ElementDecoder) -> DiagnosticsResult {
        push_asset(parent, mem::take(&mut self.group));
        Ok(())
    }

    fn segment(&self) -> Option<Segment> {
        Some(Segment::indexed("MultiProperties", self.index))
    }
}

struct MultiDecoder {
    index: usize,
}

impl ElementDecoder for MultiDecoder {
    fn start(
        &mut self,
        _ctx: &DecodeContext<'_>,
        attrs: &[XmlAttr],
        parent: &mut dyn ElementDecoder,
    ) -> DiagnosticsResult {
        let mut errs = Diagnostics::new();
        let mut multi = Multi::default();
        for attr in own_attrs(attrs) {
            if attr.name.local == "pindices" {
                multi.pindices = parse_list_attr(attr, true, &mut errs);
            }
        }
        if let Some(group) = parent.as_any_mut().downcast_mut::<MultiPropertiesDecoder>() {
            group.group.multis.push(multi);
        }
        errs.into_result()
    }

    fn segment(&self) -> Option<Segment> {
        Some(Segment::indexed("Multi", self.index))
    }
}
