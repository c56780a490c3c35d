use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde_json::Value;
use tracing::warn;

use super::BotKind;
use crate::model::list_item::{RawField, RawListItem};
use crate::slack::SlackApi;

/// Exports ask for more rows than the bots do.
pub const EXPORT_LIMIT: u32 = 500;

const CSV_HEADER: &str = "item_id,field_key,text,value,user,select";

fn quote(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| "\"\"".into())
}

/// Strings as-is, other JSON members in their JSON form.
fn cell(member: Option<&Value>) -> String {
    match member {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn csv_row(item: &RawListItem, field: &RawField) -> String {
    let select = field
        .extra
        .get("select")
        .filter(|v| !v.is_null())
        .map(Value::to_string)
        .unwrap_or_default();
    [
        quote(&item.id),
        quote(&field.key),
        quote(&cell(field.text.as_ref())),
        quote(&cell(field.value.as_ref())),
        quote(&field.users.join(";")),
        quote(&select),
    ]
    .join(",")
}

/// Long-form CSV: one row per (item, field), every cell JSON-quoted.
pub fn fields_csv(items: &[RawListItem]) -> String {
    let mut lines = vec![CSV_HEADER.to_string()];
    for item in items {
        for field in &item.fields {
            lines.push(csv_row(item, field));
        }
    }
    lines.join("\n")
}

fn write_file(path: PathBuf, contents: &str, written: &mut Vec<PathBuf>) -> Result<()> {
    std::fs::write(&path, contents).with_context(|| format!("Failed to write {}", path.display()))?;
    written.push(path);
    Ok(())
}

/// Dump a list's schema, raw items and field table into `out_dir`.
///
/// A schema failure only warns; an item fetch failure aborts the export.
pub async fn export_list(
    slack: &dyn SlackApi,
    bot: BotKind,
    list_id: &str,
    out_dir: &Path,
) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("Failed to create {}", out_dir.display()))?;
    let mut written = Vec::new();

    match slack.list_schema(list_id).await {
        Ok(schema) => {
            let json = serde_json::to_string_pretty(&schema)?;
            write_file(out_dir.join(format!("{bot}_list_schema.json")), &json, &mut written)?;
        }
        Err(e) => warn!(list_id, error = %e, "failed to fetch list schema"),
    }

    let items = slack
        .list_items(list_id, EXPORT_LIMIT)
        .await
        .with_context(|| format!("Failed to fetch {bot} list items"))?;

    let json = serde_json::to_string_pretty(&items)?;
    write_file(out_dir.join(format!("{bot}_list_raw.json")), &json, &mut written)?;
    write_file(
        out_dir.join(format!("{bot}_list_fields.csv")),
        &fields_csv(&items),
        &mut written,
    )?;

    Ok(written)
}
