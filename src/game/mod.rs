pub mod ai;
pub mod constants;
pub mod controller;
pub mod food;
#[allow(clippy::module_inception)]
pub mod game;
pub mod types;
pub mod world;

#[cfg(test)]
mod tests;

pub use game::Game;
