//! Beam lattice extension parsing
//!
//! A `<b:beamlattice>` lives inside `<mesh>` and is stored in the mesh's element
//! bag. Beams are stored with their radii and caps resolved against the lattice
//! defaults.

use std::mem;

use crate::error::{Diagnostics, DiagnosticsResult, Segment};
use crate::extension::{NodeMut, XmlAttr, XmlName};
use crate::model::{
    BEAM_LATTICE_NAMESPACE, Beam, BeamCapMode, BeamLattice, BeamLatticeError, BeamSet, ClipMode,
};

use super::{DecodeContext, ElementDecoder, parse_attr, parse_enum_attr, parse_opt_attr};

/// Decoder for a beam lattice element found under `parent`
pub(crate) fn new_beam_lattice_decoder(
    parent: NodeMut<'_>,
    name: &str,
) -> Option<Box<dyn ElementDecoder>> {
    match (parent, name) {
        (NodeMut::Mesh(_), "beamlattice") => Some(Box::new(BeamLatticeDecoder::default())),
        _ => None,
    }
}

fn own_attrs(attrs: &[XmlAttr]) -> impl Iterator<Item = &XmlAttr> {
    attrs.iter().filter(|a| a.name.space.is_empty())
}

fn is_beam_lattice(name: &XmlName, local: &str) -> bool {
    name.is(BEAM_LATTICE_NAMESPACE, local)
}

#[derive(Default)]
struct BeamLatticeDecoder {
    lattice: BeamLattice,
}

impl ElementDecoder for BeamLatticeDecoder {
    fn start(
        &mut self,
        _ctx: &DecodeContext<'_>,
        attrs: &[XmlAttr],
        _parent: &mut dyn ElementDecoder,
    ) -> DiagnosticsResult {
        let mut errs = Diagnostics::new();
        let lattice = &mut self.lattice;
        for attr in own_attrs(attrs) {
            match attr.name.local.as_str() {
                "radius" => lattice.radius = parse_attr(attr, true, &mut errs),
                "minlength" => lattice.min_length = parse_attr(attr, true, &mut errs),
                "cap" => lattice.cap_mode = parse_enum_attr(attr, false, &mut errs, BeamCapMode::parse),
                "clippingmode" | "clipping" => {
                    lattice.clipping_mode = parse_enum_attr(attr, false, &mut errs, ClipMode::parse)
                }
                "clippingmesh" => lattice.clipping_mesh_id = parse_opt_attr(attr, false, &mut errs),
                "representationmesh" => {
                    lattice.representation_mesh_id = parse_opt_attr(attr, false, &mut errs)
                }
                _ => {}
            }
        }
        errs.into_result()
    }

    fn child(&mut self, _ctx: &DecodeContext<'_>, name: &XmlName) -> Option<Box<dyn ElementDecoder>> {
        if is_beam_lattice(name, "beams") {
            Some(Box::new(BeamsDecoder::default()))
        } else if is_beam_lattice(name, "beamsets") {
            Some(Box::new(BeamSetsDecoder::default()))
        } else {
            None
        }
    }

    fn end(&mut self, _ctx: &DecodeContext<'_>, parent: &mut dyn ElementDecoder) -> DiagnosticsResult {
        if let NodeMut::Mesh(mesh) = parent.node() {
            mesh.any.push(Box::new(mem::take(&mut self.lattice)));
        }
        Ok(())
    }

    fn segment(&self) -> Option<Segment> {
        Some(Segment::named("BeamLattice"))
    }
}

#[derive(Default)]
struct BeamsDecoder {
    beams: Vec<Beam>,
    radius: f64,
    cap: BeamCapMode,
}

impl ElementDecoder for BeamsDecoder {
    fn start(
        &mut self,
        _ctx: &DecodeContext<'_>,
        _attrs: &[XmlAttr],
        parent: &mut dyn ElementDecoder,
    ) -> DiagnosticsResult {
        if let Some(lattice) = parent.as_any_mut().downcast_mut::<BeamLatticeDecoder>() {
            self.beams = mem::take(&mut lattice.lattice.beams);
            self.radius = lattice.lattice.radius;
            self.cap = lattice.lattice.cap_mode;
        }
        Ok(())
    }

    fn child(&mut self, _ctx: &DecodeContext<'_>, name: &XmlName) -> Option<Box<dyn ElementDecoder>> {
        if is_beam_lattice(name, "beam") {
            Some(Box::new(BeamDecoder {
                index: self.beams.len(),
            }))
        } else {
            None
        }
    }

    fn end(&mut self, _ctx: &DecodeContext<'_>, parent: &mut dyn ElementDecoder) -> DiagnosticsResult {
        if let Some(lattice) = parent.as_any_mut().downcast_mut::<BeamLatticeDecoder>() {
            lattice.lattice.beams = mem::take(&mut self.beams);
        }
        Ok(())
    }
}

struct BeamDecoder {
    index: usize,
}

impl ElementDecoder for BeamDecoder {
    fn start(
        &mut self,
        _ctx: &DecodeContext<'_>,
        attrs: &[XmlAttr],
        parent: &mut dyn ElementDecoder,
    ) -> DiagnosticsResult {
        let Some(beams) = parent.as_any_mut().downcast_mut::<BeamsDecoder>() else {
            return Ok(());
        };
        let mut errs = Diagnostics::new();
        let mut beam = Beam::new(0, 0, beams.radius);
        beam.cap1 = beams.cap;
        beam.cap2 = beams.cap;
        let (mut r1, mut r2) = (None, None);
        let (mut cap1, mut cap2) = (None, None);
        for attr in own_attrs(attrs) {
            match attr.name.local.as_str() {
                "v1" => beam.v1 = parse_attr(attr, true, &mut errs),
                "v2" => beam.v2 = parse_attr(attr, true, &mut errs),
                "r1" => r1 = parse_opt_attr::<f64>(attr, false, &mut errs),
                "r2" => r2 = parse_opt_attr::<f64>(attr, false, &mut errs),
                "cap1" => cap1 = Some(parse_enum_attr(attr, false, &mut errs, BeamCapMode::parse)),
                "cap2" => cap2 = Some(parse_enum_attr(attr, false, &mut errs, BeamCapMode::parse)),
                _ => {}
            }
        }
        if r2.is_some() && r1.is_none() {
            errs.add(BeamLatticeError::LatticeBeamR2);
        }
        if let Some(r1) = r1 {
            beam.r1 = r1;
        }
        beam.r2 = r2.unwrap_or(beam.r1);
        beam.cap1 = cap1.unwrap_or(beam.cap1);
        beam.cap2 = cap2.unwrap_or(beam.cap2);
        beams.beams.push(beam);
        errs.into_result()
    }

    fn segment(&self) -> Option<Segment> {
        Some(Segment::indexed("Beam", self.index))
    }
}

#[derive(Default)]
struct BeamSetsDecoder {
    sets: Vec<BeamSet>,
}

impl ElementDecoder for BeamSetsDecoder {
    fn start(
        &mut self,
        _ctx: &DecodeContext<'_>,
        _attrs: &[XmlAttr],
        parent: &mut dyn ElementDecoder,
    ) -> DiagnosticsResult {
        if let Some(lattice) = parent.as_any_mut().downcast_mut::<BeamLatticeDecoder>() {
            self.sets = mem::take(&mut lattice.lattice.beam_sets);
        }
        Ok(())
    }

    fn child(&mut self, _ctx: &DecodeContext<'_>, name: &XmlName) -> Option<Box<dyn ElementDecoder>> {
        if is_beam_lattice(name, "beamset") {
            Some(Box::new(BeamSetDecoder {
                set: BeamSet::default(),
                index: self.sets.len(),
            }))
        } else {
            None
        }
    }

    fn end(&mut self, _ctx: &DecodeContext<'_>, parent: &mut dyn ElementDecoder) -> DiagnosticsResult {
        if let Some(lattice) = parent.as_any_mut().downcast_mut::<BeamLatticeDecoder>() {
            lattice.lattice.beam_sets = mem::take(&mut self.sets);
        }
        Ok(())
    }
}

struct BeamSetDecoder {
    set: BeamSet,
    index: usize,
}

impl ElementDecoder for BeamSetDecoder {
    fn start(
        &mut self,
        _ctx: &DecodeContext<'_>,
        attrs: &[XmlAttr],
        _parent: &mut dyn ElementDecoder,
    ) -> DiagnosticsResult {
        for attr in own_attrs(attrs) {
            match attr.name.local.as_str() {
                "name" => self.set.name = attr.value.clone(),
                "identifier" => self.set.identifier = attr.value.clone(),
                _ => {}
            }
        }
        Ok(())
    }

    fn child(&mut self, _ctx: &DecodeContext<'_>, name: &XmlName) -> Option<Box<dyn ElementDecoder>> {
        if is_beam_lattice(name, "ref") {
            Some(Box::new(BeamRefDecoder {
                index: self.set.refs.len(),
            }))
        } else {
            None
        }
    }

    fn end(&mut self, _ctx: &DecodeContext<'_>, parent: &mut dyn ElementDecoder) -> DiagnosticsResult {
        if let Some(sets) = parent.as_any_mut().downcast_mut::<BeamSetsDecoder>() {
            sets.sets.push(mem::take(&mut self.set));
        }
        Ok(())
    }

    fn segment(&self) -> Option<Segment> {
        Some(Segment::indexed("BeamSet", self.index))
    }
}

struct BeamRefDecoder {
    index: usize,
}

impl ElementDecoder for BeamRefDecoder {
    fn start(
        &mut self,
        _ctx: &DecodeContext<'_>,
        attrs: &[XmlAttr],
        parent: &mut dyn ElementDecoder,
    ) -> DiagnosticsResult {
        let mut errs = Diagnostics::new();
        let mut index = 0;
        for attr in own_attrs(attrs) {
            if attr.name.local == "index" {
                index = parse_attr(attr, true, &mut errs);
            }
        }
        if let Some(set) = parent.as_any_mut().downcast_mut::<BeamSetDecoder>() {
            set.set.refs.push(index);
        }
        errs.into_result()
    }

    fn segment(&self) -> Option<Segment> {
        Some(Segment::indexed("Ref", self.index))
    }
}

#[cfg(test)]
mod tests {
    use crate::extension::ExtensionRegistry;
    use crate::model::{BeamCapMode, BeamLattice, ClipMode, Model};
    use crate::parser::decode_part;

    #[test]
    fn test_decode_beam_lattice_defaults() {
        let xml = r#"
        <model xmlns="http://schemas.microsoft.com/3dmanufacturing/core/2015/02" xmlns:b="http://schemas.microsoft.com/3dmanufacturing/beamlattice/2017/02">
          <resources>
            <object id="1">
              <mesh>
                <vertices>
                  <vertex x="0" y="0" z="0"/> <vertex x="1" y="0" z="0"/> <vertex x="0" y="1" z="0"/>
                </vertices>
                <triangles/>
                <b:beamlattice radius="0.5" minlength="0.01" cap="butt" clippingmode="inside" clippingmesh="2">
                  <b:beams>
                    <b:beam v1="0" v2="1"/>
                    <b:beam v1="1" v2="2" r1="0.8" cap2="sphere"/>
                    <b:beam v1="2" v2="0" r2="0.3"/>
                  </b:beams>
                  <b:beamsets>
                    <b:beamset name="outer" identifier="o"><b:ref index="0"/><b:ref index="2"/></b:beamset>
                  </b:beamsets>
                </b:beamlattice>
              </mesh>
            </object>
          </resources>
        </model>"#;
        let registry = ExtensionRegistry::with_default_extensions();
        let mut model = Model::new();
        let diagnostics = decode_part(&mut model, xml.as_bytes(), "", true, &registry).unwrap();
        assert_eq!(
            diagnostics.messages(),
            vec!["Resources@Object#0@Mesh@BeamLattice@Beam#2: r2 must not be defined if r1 is not defined"]
        );

        let mesh = model.resources.objects[0].mesh.as_ref().unwrap();
        let lattice = mesh.any.get::<BeamLattice>().unwrap();
        assert_eq!(lattice.clipping_mode, ClipMode::Inside);
        assert_eq!(lattice.clipping_mesh_id, Some(2));
        assert_eq!(lattice.representation_mesh_id, None);

        let first = lattice.beams[0];
        assert_eq!((first.r1, first.r2), (0.5, 0.5));
        assert_eq!((first.cap1, first.cap2), (BeamCapMode::Butt, BeamCapMode::Butt));
        let second = lattice.beams[1];
        assert_eq!((second.r1, second.r2), (0.8, 0.8));
        assert_eq!(second.cap2, BeamCapMode::Sphere);

        assert_eq!(lattice.beam_sets[0].name, "outer");
        assert_eq!(lattice.beam_sets[0].refs, vec![0, 2]);
    }
}
