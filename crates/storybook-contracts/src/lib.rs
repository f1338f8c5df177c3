pub mod events;
pub mod languages;
pub mod runs;
pub mod session;
pub mod story;
pub mod text;
