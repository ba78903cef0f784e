//! Client-side tools the model can invoke
//!
//! - `registry`: name → handler lookup and the declarations advertised to
//!   the backend at connect time
//! - `dispatcher`: runs one function call and wraps the result into the
//!   response envelope the backend expects

mod dispatcher;
mod registry;

pub use dispatcher::ToolDispatcher;
pub use registry::{FnTool, Tool, ToolRegistry};
