mod phase;
mod rounds;
mod state;

pub use phase::SessionPhase;
pub use rounds::RoundRecord;
pub use state::{SessionState, SketchImage};
