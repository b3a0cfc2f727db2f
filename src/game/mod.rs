//! Game simulation modules

pub mod court;
pub mod dice;
pub mod hoop;
pub mod r#match;
pub mod physics;
pub mod shot;
pub mod simulation;
pub mod state;

pub use r#match::MatchLauncher;
