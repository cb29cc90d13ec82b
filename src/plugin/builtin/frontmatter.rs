//! Built-in `frontmatter` parser.
//!
//! Splits YAML-like (`---`) or TOML (`+++`) front matter from the body.
//! Files without front matter pass through with empty options.

use anyhow::{Context, Result};
use serde_json::Value;

use crate::template::{Options, Parsed, Parser};

#[derive(Debug, Default, Clone, Copy)]
pub struct FrontMatterParser;

impl Parser for FrontMatterParser {
    fn name(&self) -> &str {
        super::FRONTMATTER
    }

    fn parse(&self, raw: &str, file_name: &str) -> Result<Parsed> {
        let Some((fm, body, is_toml)) = detect_frontmatter(raw) else {
            return Ok(Parsed::body(raw));
        };

        let options = if is_toml {
            parse_toml(fm).with_context(|| format!("invalid TOML front matter in {file_name}"))?
        } else {
            parse_yaml_like(fm)
        };

        Ok(Parsed {
            contents: body.to_owned(),
            options,
        })
    }
}

/// Detect and extract front matter.
/// Returns `(frontmatter, body, is_toml)` if found.
fn detect_frontmatter(content: &str) -> Option<(&str, &str, bool)> {
    let trimmed = content.trim_start();

    for (fence, is_toml) in [("---", false), ("+++", true)] {
        if trimmed.starts_with(fence)
            && let Some(end) = trimmed[3..].find(&format!("\n{fence}"))
        {
            let fm = trimmed[3..3 + end].trim();
            let rest = &trimmed[3 + end + 4..];
            // closing fence line may carry trailing whitespace
            let body = rest
                .split_once('\n')
                .filter(|(line, _)| line.trim().is_empty())
                .map_or(rest, |(_, body)| body);
            return Some((fm, body.trim_start_matches('\n'), is_toml));
        }
    }

    None
}

/// Simple `key: value` lines. Keys keep their case; `#` starts a comment line.
fn parse_yaml_like(content: &str) -> Options {
    let mut options = Options::new();

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some((key, value)) = line.split_once(':') {
            let key = key.trim();
            if !key.is_empty() {
                options.insert(key.to_owned(), parse_yaml_value(value.trim()));
            }
        }
    }

    options
}

fn parse_toml(content: &str) -> Result<Options> {
    let table: toml::Table = toml::from_str(content)?;
    Ok(table
        .into_iter()
        .map(|(k, v)| (k, toml_to_json(v)))
        .collect())
}

fn toml_to_json(value: toml::Value) -> Value {
    match value {
        toml::Value::String(s) => Value::String(s),
        toml::Value::Integer(i) => Value::Number(i.into()),
        toml::Value::Float(f) => serde_json::Number::from_f64(f).map_or(Value::Null, Value::Number),
        toml::Value::Boolean(b) => Value::Bool(b),
        toml::Value::Datetime(dt) => Value::String(dt.to_string()),
        toml::Value::Array(items) => Value::Array(items.into_iter().map(toml_to_json).collect()),
        toml::Value::Table(table) => Value::Object(
            table
                .into_iter()
                .map(|(k, v)| (k, toml_to_json(v)))
                .collect(),
        ),
    }
}

/// Parse a YAML-like value string to JSON value
///
/// Supports:
/// - Booleans: `true`, `false`
/// - Null: `null`, `~`
/// - Numbers: `123`, `3.14`
/// - Arrays: `a, b, c` -> `["a", "b", "c"]`
/// - Quoted strings: `"a, b"` stays one string
/// - Strings: everything else
fn parse_yaml_value(s: &str) -> Value {
    if s.eq_ignore_ascii_case("true") {
        return Value::Bool(true);
    }
    if s.eq_ignore_ascii_case("false") {
        return Value::Bool(false);
    }
    if s.eq_ignore_ascii_case("null") || s == "~" {
        return Value::Null;
    }

    if let Ok(n) = s.parse::<i64>() {
        return Value::Number(n.into());
    }
    if let Ok(n) = s.parse::<f64>()
        && let Some(num) = serde_json::Number::from_f64(n)
    {
        return Value::Number(num);
    }

    for quote in ['"', '\''] {
        if s.len() >= 2 && s.starts_with(quote) && s.ends_with(quote) {
            return Value::String(s[1..s.len() - 1].to_owned());
        }
    }

    if s.contains(',') {
        let arr: Vec<Value> = s
            .split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(|item| Value::String(item.to_owned()))
            .collect();
        return Value::Array(arr);
    }

    Value::String(s.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(content: &str) -> Parsed {
        FrontMatterParser.parse(content, "test.md").unwrap()
    }

    #[test]
    fn test_yaml_frontmatter() {
        let parsed = parse("---\ntitle: Hello\ndate: 2024-01-01\ntags: a, b\n---\n\n# Body");
        assert_eq!(parsed.options.get("title"), Some(&json!("Hello")));
        assert_eq!(parsed.options.get("date"), Some(&json!("2024-01-01")));
        assert_eq!(parsed.options.get("tags"), Some(&json!(["a", "b"])));
        assert!(parsed.contents.starts_with("# Body"));
    }

    #[test]
    fn test_toml_frontmatter() {
        let parsed = parse("+++\ntitle = \"Hello\"\ntags = [\"a\", \"b\"]\ndate = 2024-01-01\n+++\n\n# Body");
        assert_eq!(parsed.options.get("title"), Some(&json!("Hello")));
        assert_eq!(parsed.options.get("tags"), Some(&json!(["a", "b"])));
        assert_eq!(parsed.options.get("date"), Some(&json!("2024-01-01")));
        assert_eq!(parsed.contents, "# Body");
    }

    #[test]
    fn test_no_frontmatter() {
        let parsed = parse("# Just content");
        assert!(parsed.options.is_empty());
        assert_eq!(parsed.contents, "# Just content");
    }

    #[test]
    fn test_unterminated_fence_is_body() {
        let parsed = parse("---\ntitle: x\n\nno closing fence");
        assert!(parsed.options.is_empty());
        assert!(parsed.contents.starts_with("---"));
    }

    #[test]
    fn test_yaml_value_types() {
        let parsed = parse(
            "---\npermalink: contact\ncount: 42\nflag: true\nitems: x, y, z\nquoted: \"a, b\"\nnothing: ~\n---\n",
        );
        assert_eq!(parsed.options.get("permalink"), Some(&json!("contact")));
        assert_eq!(parsed.options.get("count"), Some(&json!(42)));
        assert_eq!(parsed.options.get("flag"), Some(&json!(true)));
        assert_eq!(parsed.options.get("items"), Some(&json!(["x", "y", "z"])));
        assert_eq!(parsed.options.get("quoted"), Some(&json!("a, b")));
        assert_eq!(parsed.options.get("nothing"), Some(&json!(null)));
        assert_eq!(parsed.contents, "");
    }

    #[test]
    fn test_invalid_toml_is_error() {
        let err = FrontMatterParser
            .parse("+++\ntitle = \n+++\nbody", "broken.md")
            .unwrap_err();
        assert!(err.to_string().contains("broken.md"));
    }
}
