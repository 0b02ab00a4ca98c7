//! Mappings command - list registered formats

use anyhow::Result;
use colored::Colorize;
use serde_json::json;

use crate::output;
use tallyline_core::services::MappingRegistry;

pub fn run(json: bool) -> Result<()> {
    let registry = MappingRegistry::builtin()?;

    if json {
        let list: Vec<_> = registry
            .iter()
            .map(|def| {
                json!({
                    "id": def.id,
                    "tag": def.tag,
                    "required_headers": def.required_headers,
                    "optional_headers": def.optional_headers,
                    "required_options": def.required_options,
                    "supported": def.error.is_none(),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&list)?);
        return Ok(());
    }

    let mut table = output::create_table();
    table.set_header(vec!["Format", "Wallet", "Required headers", "Options"]);
    for def in registry.iter() {
        let id = if def.error.is_some() {
            format!("{} {}", def.id, "(unsupported)".dimmed())
        } else {
            def.id.to_string()
        };
        table.add_row(vec![
            id,
            def.tag.unwrap_or("-").to_string(),
            def.required_headers.join(", "),
            def.required_options.join(", "),
        ]);
    }
    println!("{}", table);
    println!("{} formats registered", registry.len());

    Ok(())
}
