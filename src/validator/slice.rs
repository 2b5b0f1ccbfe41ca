//! Slice extension validation

use crate::error::{Diagnostics, DiagnosticsResult, ModelError, Segment};
use crate::model::{Asset, Model, Object, Slice, SliceError, SliceObjectAttr, SliceStack};

/// Validate a slice stack
pub(crate) fn validate_asset(model: &Model, path: &str, asset: &dyn Asset) -> DiagnosticsResult {
    match asset.as_any().downcast_ref::<SliceStack>() {
        Some(stack) => validate_slice_stack(model, path, stack).into_result(),
        None => Ok(()),
    }
}

fn validate_slice_stack(model: &Model, path: &str, stack: &SliceStack) -> Diagnostics {
    let mut errs = Diagnostics::new();
    if !stack.slices.is_empty() && !stack.slice_refs.is_empty() {
        errs.add(SliceError::SlicesAndRefs);
    }

    for (index, slice_ref) in stack.slice_refs.iter().enumerate() {
        let segment = Segment::indexed("SliceRef", index);
        let target = slice_ref.slicepath.as_str();
        let same_part = target.is_empty()
            || target == path
            || (model.is_root_path(target) && model.is_root_path(path));
        if same_part {
            errs.add_at(segment, SliceError::SliceRefSamePart);
            continue;
        }
        match model.find_asset(target, slice_ref.slicestackid) {
            None => errs.add_at(segment, ModelError::MissingResource),
            Some(asset) => match asset.as_any().downcast_ref::<SliceStack>() {
                None => errs.add_at(segment, SliceError::NonSliceStack),
                Some(referenced) if !referenced.slice_refs.is_empty() => {
                    errs.add_at(segment, SliceError::SliceRefRef);
                }
                Some(_) => {}
            },
        }
    }

    let mut previous: Option<f64> = None;
    for (index, slice) in stack.slices.iter().enumerate() {
        let mut found = Diagnostics::new();
        match previous {
            None if slice.ztop < stack.zbottom => found.add(SliceError::SmallTopZ),
            Some(ztop) if slice.ztop <= ztop => found.add(SliceError::NoMonotonic),
            _ => {}
        }
        previous = Some(slice.ztop);
        found.extend(validate_slice(slice));
        errs.extend(found.wrap(Segment::indexed("Slice", index)));
    }
    errs
}

fn validate_slice(slice: &Slice) -> Diagnostics {
    let mut errs = Diagnostics::new();
    if slice.polygons.is_empty() {
        return errs;
    }
    let vertex_count = slice.vertices.len();
    if vertex_count < 2 {
        errs.add(SliceError::InsufficientVertices);
    }
    for (index, polygon) in slice.polygons.iter().enumerate() {
        let mut found = Diagnostics::new();
        if polygon.startv as usize >= vertex_count {
            found.add(ModelError::IndexOutOfBounds);
        }
        if polygon.segments.is_empty() {
            found.add(SliceError::InsufficientSegments);
        }
        for (position, segment) in polygon.segments.iter().enumerate() {
            if segment.v2 as usize >= vertex_count {
                found.add_at(Segment::indexed("Segment", position), ModelError::IndexOutOfBounds);
            }
        }
        errs.extend(found.wrap(Segment::indexed("Polygon", index)));
    }
    errs
}

/// The slice stack referenced by an object must exist
pub(crate) fn validate_object(model: &Model, path: &str, object: &Object) -> DiagnosticsResult {
    let mut errs = Diagnostics::new();
    if let Some(attr) = object.any_attr.get::<SliceObjectAttr>() {
        if attr.slicestackid == 0 {
            errs.add(ModelError::missing_field("slicestackid"));
        } else {
            match model.find_asset(path, attr.slicestackid) {
                None => errs.add(ModelError::MissingResource),
                Some(asset) if !asset.as_any().is::<SliceStack>() => {
                    errs.add(SliceError::NonSliceStack);
                }
                Some(_) => {}
            }
        }
    }
    errs.into_result()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ChildModel, ColorGroup, SlicePolygon, SliceRef, SliceSegment, Vertex2D};

    #[test]
    fn test_slice_heights_and_polygons() {
        let model = Model::new();
        let mut stack = SliceStack::new(1, 1.0);
        let mut first = Slice::new(0.5);
        first.vertices.push(Vertex2D::new(0.0, 0.0));
        let mut polygon = SlicePolygon::new(3);
        polygon.segments.push(SliceSegment::new(0));
        polygon.segments.push(SliceSegment::new(4));
        first.polygons.push(polygon);
        first.polygons.push(SlicePolygon::new(0));
        stack.slices.push(first);
        stack.slices.push(Slice::new(0.5));

        let messages = validate_slice_stack(&model, "", &stack).messages();
        assert_eq!(
            messages,
            vec![
                "Slice#0: the first slice must not be below the bottom of the stack",
                "Slice#0: a slice with polygons needs at least two vertices",
                "Slice#0@Polygon#0: index is out of bounds",
                "Slice#0@Polygon#0@Segment#1: index is out of bounds",
                "Slice#0@Polygon#1: a polygon needs at least one segment",
                "Slice#1: slice heights must increase monotonically",
            ]
        );
    }

    #[test]
    fn test_slice_references() {
        let mut model = Model::new();
        let mut child = ChildModel::default();
        let mut nested = SliceStack::new(1, 0.0);
        nested.slice_refs.push(SliceRef::new(2, "/2D/other.model"));
        child.resources.push_asset(nested);
        child.resources.push_asset(ColorGroup::new(2));
        child.resources.push_asset(SliceStack::new(3, 0.0));
        model.children.insert("/2D/2dmodel.model".to_string(), child);

        let mut stack = SliceStack::new(7, 0.0);
        stack.slices.push(Slice::new(1.0));
        for (id, path) in [
            (3, "/2D/2dmodel.model"),
            (1, "/2D/2dmodel.model"),
            (2, "/2D/2dmodel.model"),
            (4, "/2D/2dmodel.model"),
            (3, ""),
        ] {
            stack.slice_refs.push(SliceRef::new(id, path));
        }

        let messages = validate_slice_stack(&model, "", &stack).messages();
        assert_eq!(
            messages,
            vec![
                "a slice stack must contain either slices or slice references",
                "SliceRef#1: a referenced slice stack must not contain slice references",
                "SliceRef#2: the referenced resource is not a slice stack",
                "SliceRef#3: referenced resource does not exist",
                "SliceRef#4: a slice reference must point into another document",
            ]
        );
    }

    #[test]
    fn test_object_slice_stack_reference() {
        let mut model = Model::new();
        model.resources.push_asset(ColorGroup::new(2));
        let mut object = Object::new(1);
        object.any_attr.push(Box::new(SliceObjectAttr {
            slicestackid: 2,
            ..Default::default()
        }));
        let messages = validate_object(&model, "", &object).unwrap_err().messages();
        assert_eq!(messages, vec!["the referenced resource is not a slice stack"]);
    }
}
