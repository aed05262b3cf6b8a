use std::collections::BTreeSet;

use serde::Serialize;

use super::naming::{to_camel_case, to_screaming_snake};
use super::{
    use_line, GenerateError, GeneratedFile, GenerationContext, Generator, GeneratorKind, GENERATED_HEADER,
};
use crate::spec::AllSpecs;

/// Emits the shared event directory module: one channel constant and one
/// message type alias per declared event.
pub struct EventsGenerator;

#[derive(Debug, Serialize)]
struct EventCtx {
    const_name: String,
    subject: String,
    alias: String,
    message: String,
}

impl Generator for EventsGenerator {
    fn kind(&self) -> GeneratorKind {
        GeneratorKind::Events
    }

    fn generate(
        &self,
        specs: &AllSpecs,
        ctx: &GenerationContext<'_>,
    ) -> Result<Vec<GeneratedFile>, GenerateError> {
        if specs.events.is_empty() {
            return Ok(Vec::new());
        }
        let events: Vec<EventCtx> = specs
            .events
            .events
            .iter()
            .map(|e| EventCtx {
                const_name: to_screaming_snake(&e.name),
                subject: e.subject(),
                alias: format!("{}Event", to_camel_case(&e.name)),
                message: e.message.clone(),
            })
            .collect();
        let imports: BTreeSet<&str> = specs
            .events
            .events
            .iter()
            .map(|e| e.message.as_str())
            .collect();
        let imports: Vec<&str> = imports.into_iter().collect();
        let published: Vec<String> = specs
            .events
            .publishers()
            .map(|e| to_screaming_snake(&e.name))
            .collect();
        let subscribed: Vec<String> = specs
            .events
            .subscribers()
            .map(|e| to_screaming_snake(&e.name))
            .collect();

        let contents = ctx.templates.render(
            "events.rs.j2",
            minijinja::context! {
                header => GENERATED_HEADER,
                schemas_use => use_line("super::schemas", &imports),
                events => events,
                published => published,
                subscribed => subscribed,
            },
        )?;
        Ok(vec![GeneratedFile::overwrite(
            ctx.layout.shared_output_dir().join("events.rs"),
            contents,
        )])
    }
}
