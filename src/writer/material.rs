//! Material extension writing for 3MF model files
//!
//! This module provides functionality to write Material extension elements like
//! textures, color groups, composites, and multi-properties.

use crate::error::Result;
use crate::model::{
    ColorGroup, CompositeMaterials, FilterMode, MATERIAL_NAMESPACE, MultiProperties, TileStyle,
    Texture2D, Texture2DGroup,
};

use super::{XmlEncoder, format_color, format_list};

/// Write a color group
pub(crate) fn write_color_group(x: &mut XmlEncoder, group: &ColorGroup) -> Result<()> {
    let mut elem = x.element(MATERIAL_NAMESPACE, "colorgroup")?;
    elem.push_attribute(("id", group.id.to_string().as_str()));
    if group.colors.is_empty() {
        return x.empty(elem);
    }
    x.start(elem.borrow())?;
    for color in &group.colors {
        let mut c = x.element(MATERIAL_NAMESPACE, "color")?;
        c.push_attribute(("color", format_color(*color).as_str()));
        x.empty(c)?;
    }
    x.end(&elem)
}

/// Write a texture2d resource
///
/// Tile styles and filter are only written when they differ from the defaults.
pub(crate) fn write_texture2d(x: &mut XmlEncoder, texture: &Texture2D) -> Result<()> {
    let mut elem = x.element(MATERIAL_NAMESPACE, "texture2d")?;
    elem.push_attribute(("id", texture.id.to_string().as_str()));
    elem.push_attribute(("path", texture.path.as_str()));
    if let Some(contenttype) = texture.contenttype {
        elem.push_attribute(("contenttype", contenttype.as_str()));
    }
    if texture.tilestyleu != TileStyle::Wrap {
        elem.push_attribute(("tilestyleu", texture.tilestyleu.as_str()));
    }
    if texture.tilestylev != TileStyle::Wrap {
        elem.push_attribute(("tilestylev", texture.tilestylev.as_str()));
    }
    if texture.filter != FilterMode::Auto {
        elem.push_attribute(("filter", texture.filter.as_str()));
    }
    x.empty(elem)
}

/// Write a texture2d group
pub(crate) fn write_texture2d_group(x: &mut XmlEncoder, group: &Texture2DGroup) -> Result<()> {
    let mut elem = x.element(MATERIAL_NAMESPACE, "texture2dgroup")?;
    elem.push_attribute(("id", group.id.to_string().as_str()));
    elem.push_attribute(("texid", group.texid.to_string().as_str()));
    if group.tex2coords.is_empty() {
        return x.empty(elem);
    }
    x.start(elem.borrow())?;
    for coord in &group.tex2coords {
        let mut c = x.element(MATERIAL_NAMESPACE, "tex2coord")?;
        c.push_attribute(("u", coord.u.to_string().as_str()));
        c.push_attribute(("v", coord.v.to_string().as_str()));
        x.empty(c)?;
    }
    x.end(&elem)
}

/// Write composite materials
pub(crate) fn write_composite_materials(
    x: &mut XmlEncoder,
    group: &CompositeMaterials,
) -> Result<()> {
    let mut elem = x.element(MATERIAL_NAMESPACE, "compositematerials")?;
    elem.push_attribute(("id", group.id.to_string().as_str()));
    elem.push_attribute(("matid", group.matid.to_string().as_str()));
    elem.push_attribute(("matindices", format_list(group.matindices.iter()).as_str()));
    if group.composites.is_empty() {
        return x.empty(elem);
    }
    x.start(elem.borrow())?;
    for composite in &group.composites {
        let mut c = x.element(MATERIAL_NAMESPACE, "composite")?;
        c.push_attribute(("values", format_list(composite.values.iter()).as_str()));
        x.empty(c)?;
    }
    x.end(&elem)
}

/// Write multi-properties
pub(crate) fn write_multi_properties(x: &mut XmlEncoder, group: &MultiProperties) -> Result<()> {
    let mut elem = x.element(MATERIAL_NAMESPACE, "multiproperties")?;
    elem.push_attribute(("id", group.id.to_string().as_str()));
    elem.push_attribute(("pids", format_list(group.pids.iter()).as_str()));
    if !group.blendmethods.is_empty() {
        let methods = format_list(group.blendmethods.iter().map(|m| m.as_str()));
        elem.push_attribute(("blendmethods", methods.as_str()));
    }
    if group.multis.is_empty() {
        return x.empty(elem);
    }
    x.start(elem.borrow())?;
    for multi in &group.multis {
        let mut m = x.element(MATERIAL_NAMESPACE, "multi")?;
        m.push_attribute(("pindices", format_list(multi.pindices.iter()).as_str()));
        x.empty(m)?;
    }
    x.end(&elem)
}

#[cfg(test)]
mod tests {
    use crate::extension::ExtensionRegistry;
    use crate::model::{
        BlendMethod, Composite, Model, Multi, Tex2Coord, TextureType,
    };
    use crate::writer::encode_part;

    use super::*;

    #[test]
    fn test_write_material_assets() {
        let mut model = Model::new();
        let mut colors = ColorGroup::new(1);
        colors.colors.push((85, 85, 85, 255));
        model.resources.push_asset(colors);

        let mut texture = Texture2D::new(6, "/3D/Texture/logo.png", TextureType::Png);
        texture.tilestylev = TileStyle::Mirror;
        model.resources.push_asset(texture);

        let mut coords = Texture2DGroup::new(2, 6);
        coords.tex2coords.push(Tex2Coord::new(0.3, 0.5));
        model.resources.push_asset(coords);

        let mut composites = CompositeMaterials::new(4, 5, vec![1, 2]);
        composites.composites.push(Composite::new(vec![1.0, 0.0]));
        model.resources.push_asset(composites);

        let mut multi = MultiProperties::new(9, vec![5, 2]);
        multi.blendmethods.push(BlendMethod::Multiply);
        multi.multis.push(Multi::new(vec![0, 0]));
        model.resources.push_asset(multi);

        let registry = ExtensionRegistry::with_default_extensions();
        let xml = String::from_utf8(encode_part(&model, &registry).unwrap()).unwrap();
        assert!(xml.contains("<m:color color=\"#555555FF\"/>"));
        assert!(xml.contains(
            "<m:texture2d id=\"6\" path=\"/3D/Texture/logo.png\" contenttype=\"image/png\" tilestylev=\"mirror\"/>"
        ));
        assert!(xml.contains("<m:tex2coord u=\"0.3\" v=\"0.5\"/>"));
        assert!(xml.contains("<m:compositematerials id=\"4\" matid=\"5\" matindices=\"1 2\">"));
        assert!(xml.contains("<m:composite values=\"1 0\"/>"));
        assert!(xml.contains(
            "<m:multiproperties id=\"9\" pids=\"5 2\" blendmethods=\"multiply\">"
        ));
        assert!(xml.contains("<m:multi pindices=\"0 0\"/>"));
    }
}
