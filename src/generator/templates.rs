use minijinja::{AutoEscape, Environment, UndefinedBehavior};
use serde::Serialize;

use super::GenerateError;

/// Template sources, embedded at build time.
const TEMPLATES: &[(&str, &str)] = &[
    ("mod.rs.j2", include_str!("../../templates/mod.rs.j2")),
    ("schemas.rs.j2", include_str!("../../templates/schemas.rs.j2")),
    ("events.rs.j2", include_str!("../../templates/events.rs.j2")),
    ("contract.rs.j2", include_str!("../../templates/contract.rs.j2")),
    ("web.rs.j2", include_str!("../../templates/web.rs.j2")),
    ("handler.rs.j2", include_str!("../../templates/handler.rs.j2")),
    ("bus_adapter.rs.j2", include_str!("../../templates/bus_adapter.rs.j2")),
    ("client.rs.j2", include_str!("../../templates/client.rs.j2")),
    ("registry.rs.j2", include_str!("../../templates/registry.rs.j2")),
    ("types.ts.j2", include_str!("../../templates/types.ts.j2")),
];

/// The template engine. Rendering is a pure function of template name and
/// context.
pub struct Templates {
    env: Environment<'static>,
}

impl Templates {
    pub fn new() -> Result<Self, GenerateError> {
        let mut env = Environment::new();
        env.set_trim_blocks(true);
        env.set_lstrip_blocks(true);
        env.set_keep_trailing_newline(true);
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        env.set_auto_escape_callback(|_| AutoEscape::None);
        for (name, text) in TEMPLATES {
            env.add_template(*name, *text)
                .map_err(|source| GenerateError::Render {
                    template: (*name).to_string(),
                    source,
                })?;
        }
        Ok(Templates { env })
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> {
        TEMPLATES.iter().map(|(name, _)| *name)
    }

    pub fn render<S: Serialize>(&self, name: &str, ctx: S) -> Result<String, GenerateError> {
        let err = |source| GenerateError::Render {
            template: name.to_string(),
            source,
        };
        self.env.get_template(name).map_err(err)?.render(ctx).map_err(err)
    }
}
