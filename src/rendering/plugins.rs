//! Built-in template plugins.

use super::{ExpandContext, TemplatePlugin};

/// Substitutes who and where: `$nick`/`$user`, `$chan`/`$channel`, `$bot`.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityPlugin;

impl TemplatePlugin for IdentityPlugin {
    fn name(&self) -> &'static str {
        "identity"
    }

    fn expand(&self, directive: &str, ctx: &ExpandContext) -> Option<String> {
        match directive.to_ascii_lowercase().as_str() {
            "nick" | "user" => Some(ctx.nick.clone()),
            "chan" | "channel" => Some(ctx.scope.to_string()),
            "bot" => Some(ctx.bot_nick.clone()),
            _ => None,
        }
    }
}

/// Substitutes `$date` (`YYYY-MM-DD`) and `$time` (`HH:MM:SS`), in UTC.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClockPlugin;

impl TemplatePlugin for ClockPlugin {
    fn name(&self) -> &'static str {
        "clock"
    }

    fn expand(&self, directive: &str, ctx: &ExpandContext) -> Option<String> {
        match directive.to_ascii_lowercase().as_str() {
            "date" => Some(ctx.now.format("%Y-%m-%d").to_string()),
            "time" => Some(ctx.now.format("%H:%M:%S").to_string()),
            _ => None,
        }
    }
}
