//! Run ID generation
//!
//! IDs use the format: `{uuid-v7-simple}-{kind}-{slug}`
//! Example: `01943f2a9c1b7d3e8f00a1b2c3d4e5f6-run-daily-etl`

/// Generate a run ID from a kind and a title
pub fn generate_id(kind: &str, title: &str) -> String {
    let uuid = uuid::Uuid::now_v7();
    format!("{}-{}-{}", uuid.simple(), kind, slugify(title))
}

fn slugify(title: &str) -> String {
    title
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '-' })
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_id_format() {
        let id = generate_id("run", "Daily ETL");
        let parts: Vec<&str> = id.splitn(3, '-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0].len(), 32);
        assert_eq!(parts[1], "run");
        assert_eq!(parts[2], "daily-etl");
    }

    #[test]
    fn test_generate_id_is_unique_per_call() {
        let a = generate_id("run", "Daily ETL");
        let b = generate_id("run", "Daily ETL");
        assert_ne!(a, b);
    }

    #[test]
    fn test_slugify_collapses_separators() {
        assert_eq!(slugify("Hourly  Incremental / Sync"), "hourly-incremental-sync");
        assert_eq!(slugify("--x--"), "x");
    }
}
