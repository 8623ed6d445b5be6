//! Scene and GPU data types.
//!
//! - `instance` holds an object's position and orientation
//! - `scene` holds the props, the player and the lights of the demo scene
//! - `model` contains meshes, materials and the vertex layout
//! - `texture` wraps colour textures, depth buffers and the shadow cubemap
//! - `ledger` tracks every GPU resource from creation to release

pub mod instance;
pub mod ledger;
pub mod model;
pub mod scene;
pub mod texture;
