//! Domain types shared by the pipeline, the HTTP layer, and tests.

pub mod area;
pub mod filters;
pub mod request_state;
pub mod resource;
pub mod zone;

pub use area::*;
pub use filters::*;
pub use request_state::*;
pub use resource::*;
pub use zone::*;
