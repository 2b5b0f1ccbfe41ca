//! Beam lattice extension writing
//!
//! Beams are stored with resolved radii and caps; values equal to the lattice
//! defaults are left out again when writing.

use crate::error::Result;
use crate::model::{BEAM_LATTICE_NAMESPACE, Beam, BeamCapMode, BeamLattice, BeamSet, ClipMode};

use super::XmlEncoder;

/// Write a `<beamlattice>` element
pub(crate) fn write_beam_lattice(x: &mut XmlEncoder, lattice: &BeamLattice) -> Result<()> {
    let mut elem = x.element(BEAM_LATTICE_NAMESPACE, "beamlattice")?;
    elem.push_attribute(("radius", lattice.radius.to_string().as_str()));
    elem.push_attribute(("minlength", lattice.min_length.to_string().as_str()));
    if lattice.cap_mode != BeamCapMode::Sphere {
        elem.push_attribute(("cap", lattice.cap_mode.as_str()));
    }
    if lattice.clipping_mode != ClipMode::None {
        elem.push_attribute(("clippingmode", lattice.clipping_mode.as_str()));
    }
    if let Some(id) = lattice.clipping_mesh_id {
        elem.push_attribute(("clippingmesh", id.to_string().as_str()));
    }
    if let Some(id) = lattice.representation_mesh_id {
        elem.push_attribute(("representationmesh", id.to_string().as_str()));
    }
    x.start(elem.borrow())?;

    let beams = x.element(BEAM_LATTICE_NAMESPACE, "beams")?;
    if lattice.beams.is_empty() {
        x.empty(beams)?;
    } else {
        x.start(beams.borrow())?;
        for beam in &lattice.beams {
            write_beam(x, lattice, beam)?;
        }
        x.end(&beams)?;
    }

    if !lattice.beam_sets.is_empty() {
        let sets = x.element(BEAM_LATTICE_NAMESPACE, "beamsets")?;
        x.start(sets.borrow())?;
        for set in &lattice.beam_sets {
            write_beam_set(x, set)?;
        }
        x.end(&sets)?;
    }
    x.end(&elem)
}

fn write_beam(x: &mut XmlEncoder, lattice: &BeamLattice, beam: &Beam) -> Result<()> {
    let mut elem = x.element(BEAM_LATTICE_NAMESPACE, "beam")?;
    elem.push_attribute(("v1", beam.v1.to_string().as_str()));
    elem.push_attribute(("v2", beam.v2.to_string().as_str()));
    // r2 is only meaningful next to r1
    let write_r2 = beam.r2 != beam.r1;
    if beam.r1 != lattice.radius || write_r2 {
        elem.push_attribute(("r1", beam.r1.to_string().as_str()));
    }
    if write_r2 {
        elem.push_attribute(("r2", beam.r2.to_string().as_str()));
    }
    if beam.cap1 != lattice.cap_mode {
        elem.push_attribute(("cap1", beam.cap1.as_str()));
    }
    if beam.cap2 != lattice.cap_mode {
        elem.push_attribute(("cap2", beam.cap2.as_str()));
    }
    x.empty(elem)
}

fn write_beam_set(x: &mut XmlEncoder, set: &BeamSet) -> Result<()> {
    let mut elem = x.element(BEAM_LATTICE_NAMESPACE, "beamset")?;
    if !set.name.is_empty() {
        elem.push_attribute(("name", set.name.as_str()));
    }
    if !set.identifier.is_empty() {
        elem.push_attribute(("identifier", set.identifier.as_str()));
    }
    if set.refs.is_empty() {
        return x.empty(elem);
    }
    x.start(elem.borrow())?;
    for index in &set.refs {
        let mut r = x.element(BEAM_LATTICE_NAMESPACE, "ref")?;
        r.push_attribute(("index", index.to_string().as_str()));
        x.empty(r)?;
    }
    x.end(&elem)
}
