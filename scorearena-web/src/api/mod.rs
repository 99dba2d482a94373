//! HTTP API handlers for scorearena-web

pub mod arena;
pub mod buildinfo;
pub mod catalog;
pub mod health;
pub mod rate;
pub mod ui;
pub mod upload;

pub use arena::{get_pairing, submit_verdict};
pub use buildinfo::get_build_info;
pub use catalog::{list_pieces, piece_tracks};
pub use health::health_routes;
pub use rate::{rating_worklist, submit_ratings};
pub use ui::serve_index;
pub use upload::upload_score;
