use serde::Serialize;

/// Serialize the way every file of the tool is written: two-space indentation,
/// insertion-ordered keys and a single trailing newline.
///
/// Timing files are compared byte for byte by the validator, so nothing else
/// may be used to write them.
pub fn to_pretty_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<String> {
    let mut content = serde_json::to_string_pretty(value)?;
    content.push('\n');
    Ok(content)
}
