//! Materials & Properties extension validation

use crate::error::{Diagnostics, DiagnosticsResult, ModelError, Segment};
use crate::model::{
    Asset, BaseMaterialGroup, ColorGroup, CompositeMaterials, MaterialError, Model,
    MultiProperties, Texture2D, Texture2DGroup,
};

/// Validate an asset of the materials namespace
///
/// Diagnostics are positioned relative to the asset.
pub(crate) fn validate_asset(model: &Model, path: &str, asset: &dyn Asset) -> DiagnosticsResult {
    let any = asset.as_any();
    let errs = if let Some(group) = any.downcast_ref::<ColorGroup>() {
        validate_color_group(group)
    } else if let Some(group) = any.downcast_ref::<Texture2DGroup>() {
        validate_texture2d_group(model, path, group)
    } else if let Some(texture) = any.downcast_ref::<Texture2D>() {
        validate_texture2d(model, texture)
    } else if let Some(group) = any.downcast_ref::<MultiProperties>() {
        validate_multi_properties(model, path, group)
    } else if let Some(group) = any.downcast_ref::<CompositeMaterials>() {
        validate_composite_materials(model, path, group)
    } else {
        Diagnostics::new()
    };
    errs.into_result()
}

fn validate_color_group(group: &ColorGroup) -> Diagnostics {
    let mut errs = Diagnostics::new();
    if group.colors.is_empty() {
        errs.add(ModelError::EmptyResourceProps);
    }
    for (index, color) in group.colors.iter().enumerate() {
        if *color == (0, 0, 0, 0) {
            errs.add_at(Segment::indexed("RGBA", index), ModelError::missing_field("color"));
        }
    }
    errs
}

fn validate_texture2d_group(model: &Model, path: &str, group: &Texture2DGroup) -> Diagnostics {
    let mut errs = Diagnostics::new();
    if group.texid == 0 {
        errs.add(ModelError::missing_field("texid"));
    } else {
        let is_texture = model
            .find_asset(path, group.texid)
            .is_some_and(|asset| asset.as_any().is::<Texture2D>());
        if !is_texture {
            errs.add(MaterialError::TextureReference);
        }
    }
    if group.tex2coords.is_empty() {
        errs.add(ModelError::EmptyResourceProps);
    }
    errs
}

fn validate_texture2d(model: &Model, texture: &Texture2D) -> Diagnostics {
    let mut errs = Diagnostics::new();
    if texture.path.is_empty() {
        errs.add(ModelError::missing_field("path"));
    } else {
        let wanted = texture.path.to_lowercase();
        let attached = model
            .attachments
            .iter()
            .any(|attachment| attachment.path.to_lowercase() == wanted);
        if !attached {
            errs.add(MaterialError::MissingTexturePart);
        }
    }
    if texture.contenttype.is_none() {
        errs.add(ModelError::missing_field("contenttype"));
    }
    errs
}

fn validate_multi_properties(model: &Model, path: &str, group: &MultiProperties) -> Diagnostics {
    let mut errs = Diagnostics::new();
    if group.pids.is_empty() {
        errs.add(ModelError::missing_field("pids"));
    }
    if group.blendmethods.len() + 1 > group.pids.len() {
        errs.add(MaterialError::MultiBlend);
    }
    if group.multis.is_empty() {
        errs.add(ModelError::EmptyResourceProps);
    }

    let mut color_groups = 0;
    let mut unresolved = false;
    let mut lengths = vec![0usize; group.pids.len()];
    for (slot, &pid) in group.pids.iter().enumerate() {
        let Some(asset) = model.find_asset(path, pid) else {
            if !unresolved {
                unresolved = true;
                errs.add(ModelError::MissingResource);
            }
            continue;
        };
        let any = asset.as_any();
        if let Some(base) = any.downcast_ref::<BaseMaterialGroup>() {
            if slot != 0 {
                errs.add(MaterialError::MaterialMulti);
            }
            lengths[slot] = base.materials.len();
        } else if let Some(composite) = any.downcast_ref::<CompositeMaterials>() {
            if slot != 0 {
                errs.add(MaterialError::MaterialMulti);
            }
            lengths[slot] = composite.composites.len();
        } else if any.is::<MultiProperties>() {
            errs.add(MaterialError::MultiRefMulti);
        } else if let Some(colors) = any.downcast_ref::<ColorGroup>() {
            if color_groups == 1 {
                errs.add(MaterialError::MultiColors);
            }
            color_groups += 1;
            lengths[slot] = colors.colors.len();
        }
    }

    for (index, multi) in group.multis.iter().enumerate() {
        // one report per multi, for the first layer out of range
        let out_of_range = multi
            .pindices
            .iter()
            .zip(&lengths)
            .any(|(&pindex, &length)| length < pindex as usize);
        if out_of_range {
            errs.add_at(Segment::indexed("Multi", index), ModelError::IndexOutOfBounds);
        }
    }
    errs
}

fn validate_composite_materials(
    model: &Model,
    path: &str,
    group: &CompositeMaterials,
) -> Diagnostics {
    let mut errs = Diagnostics::new();
    if group.matid == 0 {
        errs.add(ModelError::missing_field("matid"));
    } else {
        match model.find_asset(path, group.matid) {
            None => errs.add(ModelError::MissingResource),
            Some(asset) => match asset.as_any().downcast_ref::<BaseMaterialGroup>() {
                Some(base) => {
                    let count = base.materials.len();
                    if group.matindices.iter().any(|&index| index as usize > count) {
                        errs.add(ModelError::IndexOutOfBounds);
                    }
                }
                None => errs.add(MaterialError::CompositeBase),
            },
        }
    }
    if group.matindices.is_empty() {
        errs.add(ModelError::missing_field("matindices"));
    }
    if group.composites.is_empty() {
        errs.add(ModelError::EmptyResourceProps);
    }
    errs
}
