//! ls command - List objects under a prefix

use bkt_core::{ObjectInfo, ObjectStore as _};
use clap::Args;
use comfy_table::{Cell, CellAlignment, Table, presets};
use serde::Serialize;

use super::{GlobalArgs, connect, fail};
use crate::exit_code::ExitCode;
use crate::output::Formatter;

/// List objects under a prefix
#[derive(Args, Debug)]
pub struct LsArgs {
    /// Key prefix to list; the whole bucket when omitted
    pub prefix: Option<String>,

    /// Print only the total count and size
    #[arg(long)]
    pub summarize: bool,
}

#[derive(Debug, Serialize)]
struct LsOutput {
    bucket: String,
    prefix: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    objects: Vec<ObjectInfo>,
    total_objects: usize,
    total_size_bytes: u64,
    total_size_human: String,
}

/// Execute the ls command
pub async fn execute(args: LsArgs, global: GlobalArgs) -> ExitCode {
    let formatter = Formatter::new(global.output_config());

    let manager = match connect(&global, "Listing").await {
        Ok(m) => m,
        Err(e) => return fail(&formatter, &e),
    };

    let objects = match manager.list(args.prefix.as_deref()).await {
        Ok(objects) => objects,
        Err(e) => return fail(&formatter, &e),
    };

    let total_size: u64 = objects.iter().map(|o| o.size_bytes).sum();
    let output = LsOutput {
        bucket: manager.store().bucket().to_string(),
        prefix: args.prefix.unwrap_or_default(),
        total_objects: objects.len(),
        total_size_bytes: total_size,
        total_size_human: humansize::format_size(total_size, humansize::BINARY),
        objects: if args.summarize { Vec::new() } else { objects },
    };

    if formatter.is_json() {
        formatter.json(&output);
        return ExitCode::Success;
    }

    if !output.objects.is_empty() {
        formatter.println(&render_table(&output.objects, formatter.colors_enabled()));
    }
    formatter.println(&format!(
        "{} object(s), {}",
        output.total_objects,
        formatter.style_size(&output.total_size_human)
    ));

    ExitCode::Success
}

fn render_table(objects: &[ObjectInfo], colors: bool) -> String {
    let mut table = Table::new();
    table.load_preset(presets::NOTHING);
    if !colors {
        table.force_no_tty();
    }
    table.set_header(vec!["Last modified", "Size", "Key"]);

    for object in objects {
        let modified = object
            .last_modified
            .map(|t| t.strftime("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "-".to_string());
        table.add_row(vec![
            Cell::new(modified),
            Cell::new(humansize::format_size(object.size_bytes, humansize::BINARY))
                .set_alignment(CellAlignment::Right),
            Cell::new(&object.key),
        ]);
    }

    table.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_lists_every_key() {
        let mut first = ObjectInfo::new("logs/a.txt", 1536);
        first.last_modified = jiff::Timestamp::from_second(1_700_000_000).ok();
        let second = ObjectInfo::new("logs/b.txt", 10);

        let rendered = render_table(&[first, second], false);

        assert!(rendered.contains("logs/a.txt"));
        assert!(rendered.contains("logs/b.txt"));
        assert!(rendered.contains("KiB"));
        assert!(rendered.contains("2023-11-14 22:13:20"));
    }
}
