pub mod commands;
pub mod generation;
pub mod intake;
pub mod navigation;
pub mod responses;
pub mod view;
