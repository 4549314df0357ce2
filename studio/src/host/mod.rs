//! Process-wide host state.

mod state;

pub use state::StudioHostState;
