use anyhow::Context;
use serde::Serialize;

/// Initialize tracing for CLI binaries. `json` switches to one JSON object
/// per line for log shippers.
pub fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}

/// Pretty-printed JSON for stdout
pub fn render_json(value: &impl Serialize) -> anyhow::Result<String> {
    serde_json::to_string_pretty(value).context("Serialize response")
}

pub fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    println!("{}", render_json(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_json_is_pretty() {
        let out = render_json(&serde_json::json!({ "converted": 3 })).unwrap();
        assert_eq!(out, "{\n  \"converted\": 3\n}");
    }
}
