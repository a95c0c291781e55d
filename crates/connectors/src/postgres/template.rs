//! Query templates
//!
//! `custom_sql` may reference `{table}`, `{instance_ts}`,
//! `{instance_ts_precision}` and `{period_end}`. Values are substituted as
//! text; the template author owns quoting. `{{` and `}}` produce literal
//! braces.

use arrival_protocol::{LoadDescriptor, format_instance_ts};

use crate::error::SourceError;

/// Substitute the load parameters into a query template
pub fn render_query(
    template: &str,
    table: &str,
    load: &LoadDescriptor,
) -> Result<String, SourceError> {
    let mut out = String::with_capacity(template.len() + 32);
    let mut rest = template;

    while let Some(pos) = rest.find(['{', '}']) {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];

        if let Some(after) = tail.strip_prefix("{{") {
            out.push('{');
            rest = after;
            continue;
        }
        if let Some(after) = tail.strip_prefix("}}") {
            out.push('}');
            rest = after;
            continue;
        }
        if tail.starts_with('}') {
            return Err(SourceError::Template("unmatched '}'".into()));
        }

        let end = tail
            .find('}')
            .ok_or_else(|| SourceError::Template("unterminated placeholder".into()))?;
        let name = &tail[1..end];
        out.push_str(&placeholder(name, table, load)?);
        rest = &tail[end + 1..];
    }

    out.push_str(rest);
    Ok(out)
}

fn placeholder(name: &str, table: &str, load: &LoadDescriptor) -> Result<String, SourceError> {
    match name {
        "table" => Ok(table.to_string()),
        "instance_ts" => Ok(format_instance_ts(load.instance_ts)),
        "instance_ts_precision" => Ok(load.instance_ts_precision.as_str().to_string()),
        "period_end" => load
            .period_end
            .map(format_instance_ts)
            .ok_or_else(|| SourceError::Template("{period_end} needs a clock-sensed load".into())),
        other => Err(SourceError::Template(format!("unknown placeholder '{{{other}}}'"))),
    }
}
