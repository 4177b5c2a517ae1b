use super::error::ConfigError;

/// Expand `${NAME}` and `${NAME:-fallback}` references in the value of the
/// setting `field`, reading variables from the process environment.
///
/// Keeps secrets such as `upstream.api_key` out of `relay.yaml`.
pub fn interpolate(field: &'static str, raw: &str) -> Result<String, ConfigError> {
    interpolate_with(field, raw, |name| std::env::var(name).ok())
}

/// `interpolate` with an explicit variable lookup.
///
/// A fallback applies when the variable is unset or empty. A reference
/// with no name (`${}`) or no closing brace is copied through unchanged.
pub(crate) fn interpolate_with<L>(
    field: &'static str,
    raw: &str,
    lookup: L,
) -> Result<String, ConfigError>
where
    L: Fn(&str) -> Option<String>,
{
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;

    while let Some(open) = rest.find("${") {
        out.push_str(&rest[..open]);
        let body = &rest[open + 2..];
        let Some(close) = body.find('}') else {
            out.push_str(&rest[open..]);
            return Ok(out);
        };

        let reference = &body[..close];
        let (name, fallback) = match reference.split_once(":-") {
            Some((name, fallback)) => (name, Some(fallback)),
            None => (reference, None),
        };

        if name.is_empty() {
            out.push_str(&rest[open..open + 2 + close + 1]);
        } else {
            let value = match (lookup(name), fallback) {
                (Some(v), Some(f)) if v.is_empty() => f.to_string(),
                (Some(v), _) => v,
                (None, Some(f)) => f.to_string(),
                (None, None) => {
                    return Err(ConfigError::UndefinedVariable {
                        field,
                        name: name.to_string(),
                    })
                }
            };
            out.push_str(&value);
        }
        rest = &body[close + 1..];
    }

    out.push_str(rest);
    Ok(out)
}
