//! Extension handler implementations
//!
//! This module contains concrete implementations of the `ExtensionHandler` trait
//! for each 3MF extension bundled with the library.

mod beam_lattice;
mod material;
mod production;
mod slice;

use std::sync::Arc;

use crate::extension::ExtensionRegistry;

pub use beam_lattice::BeamLatticeExtensionHandler;
pub use material::MaterialExtensionHandler;
pub use production::ProductionExtensionHandler;
pub use slice::SliceExtensionHandler;

/// Create a registry with every bundled extension handler
///
/// # Example
///
/// ```ignore
/// use threemf::extensions::create_default_registry;
///
/// let registry = create_default_registry();
/// assert_eq!(registry.len(), 4);
/// ```
pub fn create_default_registry() -> ExtensionRegistry {
    let registry = ExtensionRegistry::new();
    registry.register(Arc::new(MaterialExtensionHandler));
    registry.register(Arc::new(ProductionExtensionHandler));
    registry.register(Arc::new(SliceExtensionHandler));
    registry.register(Arc::new(BeamLatticeExtensionHandler));
    registry
}
