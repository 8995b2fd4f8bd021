//! `key=value,key2=value2` label syntax used by the command line.

use anyhow::bail;

use podgrid_state::Labels;

/// Parse a comma-separated label list. Whitespace around keys and values
/// is trimmed and empty segments are skipped.
pub fn parse_labels(input: &str) -> anyhow::Result<Labels> {
    let mut labels = Labels::new();
    for pair in input.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let Some((key, value)) = pair.split_once('=') else {
            bail!("invalid label {pair:?}, expected key=value");
        };
        let key = key.trim();
        if key.is_empty() {
            bail!("invalid label {pair:?}, key is empty");
        }
        labels.insert(key.to_string(), value.trim().to_string());
    }
    Ok(labels)
}

pub fn format_labels(labels: &Labels) -> String {
    if labels.is_empty() {
        return "<none>".to_string();
    }
    labels
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join(",")
}

/// Parse `input`, or fall back to `app=<name>` when it is empty.
pub fn labels_or_app(input: &str, name: &str) -> anyhow::Result<Labels> {
    let labels = parse_labels(input)?;
    if labels.is_empty() {
        return Ok(Labels::from([("app".to_string(), name.to_string())]));
    }
    Ok(labels)
}
