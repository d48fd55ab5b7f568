pub mod chunk;
pub mod color_classifier;
pub mod face_grid;
pub mod frame_source;
pub mod notation;
pub mod overlay;
pub mod pixel;
pub mod scan_session;
pub mod solver;
