//! Bounded-retry research workflow
//!
//! ```text
//! Plan -> Search -> Validate -> Synthesize -> SafetyCheck -> end
//!   ^        \          \            \             \
//!   |         +----------+------------+-------------+--> Reflexion -> end
//!   +-------------------------------------------------------/
//! ```

mod orchestrator;
mod router;

pub use orchestrator::{Orchestrator, DEFAULT_THREAD_ID};
pub use router::{resume_point, route, Route};
