//! Incremental mesh construction with vertex deduplication

use std::collections::HashMap;

use crate::model::{Mesh, Triangle, Vertex};

/// Builds a [`Mesh`] in place, reusing indices for repeated vertices
///
/// Vertices are matched on the exact bit patterns of their coordinates, so two
/// vertices are merged only if they are identical (`-0.0` and `0.0` count as the
/// same coordinate).
///
/// # Example
///
/// ```
/// use threemf::mesh_builder::MeshBuilder;
/// use threemf::model::{Mesh, Vertex};
///
/// let mut mesh = Mesh::new();
/// let mut builder = MeshBuilder::new(&mut mesh);
/// let a = builder.add_vertex(Vertex::new(0.0, 0.0, 0.0));
/// let b = builder.add_vertex(Vertex::new(0.0, 0.0, 0.0));
/// assert_eq!(a, b);
/// ```
#[derive(Debug)]
pub struct MeshBuilder<'a> {
    mesh: &'a mut Mesh,
    index: HashMap<[u64; 3], u32>,
    calculate_connectivity: bool,
}

impl<'a> MeshBuilder<'a> {
    /// Create a builder over `mesh`, indexing the vertices it already has
    pub fn new(mesh: &'a mut Mesh) -> Self {
        let mut index = HashMap::with_capacity(mesh.vertices.len());
        for (i, vertex) in mesh.vertices.iter().enumerate() {
            index.entry(vertex_key(vertex)).or_insert(i as u32);
        }
        Self {
            mesh,
            index,
            calculate_connectivity: true,
        }
    }

    /// Turn deduplication on or off
    ///
    /// Without connectivity every added vertex is appended.
    pub fn with_connectivity(mut self, enabled: bool) -> Self {
        self.calculate_connectivity = enabled;
        self
    }

    /// Add a vertex, returning the index of an identical existing vertex if any
    pub fn add_vertex(&mut self, vertex: Vertex) -> u32 {
        if !self.calculate_connectivity {
            return self.push_vertex(vertex);
        }
        let key = vertex_key(&vertex);
        if let Some(&index) = self.index.get(&key) {
            return index;
        }
        let index = self.push_vertex(vertex);
        self.index.insert(key, index);
        index
    }

    /// Append a triangle over previously added vertices, returning its index
    pub fn add_triangle(&mut self, v1: u32, v2: u32, v3: u32) -> usize {
        self.mesh.triangles.push(Triangle::new(v1, v2, v3));
        self.mesh.triangles.len() - 1
    }

    pub fn vertex_count(&self) -> usize {
        self.mesh.vertices.len()
    }

    fn push_vertex(&mut self, vertex: Vertex) -> u32 {
        self.mesh.vertices.push(vertex);
        (self.mesh.vertices.len() - 1) as u32
    }
}

fn vertex_key(vertex: &Vertex) -> [u64; 3] {
    // Adding 0.0 maps -0.0 to 0.0 and leaves every other value unchanged.
    [
        (vertex.x + 0.0).to_bits(),
        (vertex.y + 0.0).to_bits(),
        (vertex.z + 0.0).to_bits(),
    ]
}
