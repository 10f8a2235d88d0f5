pub mod audit;
pub mod common;
pub mod items;
pub mod locations;
pub mod pending;
pub mod status;
pub mod sync;
pub mod wipe;
