//! Request handlers.

pub mod analysis;
pub mod health;
pub mod session;
pub mod settings;
pub mod video;

pub use analysis::*;
pub use health::*;
pub use session::*;
pub use settings::*;
pub use video::*;
