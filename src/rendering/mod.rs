//! Template expansion for recalled factoid values.
//!
//! Values may contain `$name` directives; registered plugins substitute them
//! at recall time using the triggering message's context.

mod pipeline;
mod plugins;

pub use pipeline::{ExpandContext, TemplatePipeline, TemplatePlugin};
pub use plugins::{ClockPlugin, IdentityPlugin};
