//! Beam Lattice extension validation

use crate::error::{Diagnostics, DiagnosticsResult, ModelError, Segment};
use crate::model::{BeamLattice, BeamLatticeError, ClipMode, Model, Object, ObjectType};

/// Validate the lattice of a mesh object, if it has one
pub(crate) fn validate_object(model: &Model, path: &str, object: &Object) -> DiagnosticsResult {
    let Some(mesh) = &object.mesh else {
        return Ok(());
    };
    let Some(lattice) = mesh.any.get::<BeamLattice>() else {
        return Ok(());
    };
    validate_lattice(model, path, object, mesh.vertices.len(), lattice)
        .wrap(Segment::named("BeamLattice"))
        .wrap(Segment::named("Mesh"))
        .into_result()
}

fn validate_lattice(
    model: &Model,
    path: &str,
    object: &Object,
    vertex_count: usize,
    lattice: &BeamLattice,
) -> Diagnostics {
    let mut errs = Diagnostics::new();
    if !matches!(object.object_type, ObjectType::Model | ObjectType::SolidSupport) {
        errs.add(BeamLatticeError::LatticeObjType);
    }
    if lattice.clipping_mode != ClipMode::None && lattice.clipping_mesh_id.is_none() {
        errs.add(BeamLatticeError::LatticeClippedNoMesh);
    }
    for id in [lattice.clipping_mesh_id, lattice.representation_mesh_id]
        .into_iter()
        .flatten()
    {
        match model.find_object(path, id) {
            None => errs.add(ModelError::MissingResource),
            Some(referenced) if !is_plain_mesh(referenced) => {
                errs.add(BeamLatticeError::LatticeInvalidMesh);
            }
            Some(_) => {}
        }
    }

    let mut beams = Diagnostics::new();
    for (index, beam) in lattice.beams.iter().enumerate() {
        let segment = Segment::indexed("Beam", index);
        if beam.v1 == beam.v2 {
            beams.add_at(segment, BeamLatticeError::LatticeSameVertex);
        }
        if beam.v1 as usize >= vertex_count || beam.v2 as usize >= vertex_count {
            beams.add_at(segment, ModelError::IndexOutOfBounds);
        }
    }
    errs.extend(beams);

    for (index, set) in lattice.beam_sets.iter().enumerate() {
        if set.refs.iter().any(|&r| r as usize >= lattice.beams.len()) {
            errs.add_at(Segment::indexed("BeamSet", index), ModelError::IndexOutOfBounds);
        }
    }
    errs
}

/// A mesh object of type model that carries no lattice itself
fn is_plain_mesh(object: &Object) -> bool {
    object.object_type == ObjectType::Model
        && object
            .mesh
            .as_ref()
            .is_some_and(|mesh| mesh.any.get::<BeamLattice>().is_none())
}
