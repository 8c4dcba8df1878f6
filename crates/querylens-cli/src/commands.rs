//! Command implementations. Each returns the text printed on success.

use anyhow::{Context, Result};
use querylens_core::{share_url, Explorer, ExplorerConfig};
use querylens_object_cache::CacheKey;
use querylens_query::{FieldRegistry, RuleGroup};
use std::fmt::Write as _;
use std::path::Path;
use tracing::info;

pub fn explorer(config: ExplorerConfig, shared_url: Option<&str>) -> Result<Explorer> {
    Explorer::from_config(config, shared_url).context("Failed to open explorer session")
}

pub fn build(explorer: &Explorer, rules: Option<&Path>) -> Result<String> {
    if let Some(path) = rules {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read rule tree from {}", path.display()))?;
        let tree = RuleGroup::from_json(&json).context("Rule tree is not valid JSON")?;

        let registry = FieldRegistry::builtin()?;
        registry.validate(&tree).context("Rule tree failed validation")?;

        explorer.session().set_rule_tree(tree)?;
        info!(path = %path.display(), "rule tree replaced");
    }

    Ok(explorer.session().build()?)
}

pub fn extract(explorer: &Explorer, sql: &str) -> Result<String> {
    explorer.session().commit_query_text(sql)?;
    let fragments = explorer.session().fragments().current();

    let show = |value: Option<String>| value.unwrap_or_else(|| "-".to_string());
    Ok(format!(
        "select:   {}\norder by: {}\nlimit:    {}",
        show(fragments.select),
        show(fragments.order_by),
        show(fragments.limit)
    ))
}

pub async fn prefetch(explorer: &Explorer) -> Result<String> {
    let acquisition = explorer.acquisition();
    let (payload, source) = acquisition
        .resolve_payload()
        .await
        .with_context(|| format!("Failed to resolve dataset {}", acquisition.key()))?;

    Ok(format!(
        "{} resolved from {} ({} bytes)",
        acquisition.key(),
        source,
        payload.len()
    ))
}

pub fn share(explorer: &Explorer, base_url: &str) -> Result<String> {
    let text = explorer
        .location()
        .query()
        .unwrap_or_else(|| explorer.session().query_text());
    Ok(share_url(base_url, &text)?)
}

pub fn fields() -> Result<String> {
    let registry = FieldRegistry::builtin()?;
    let mut out = String::new();
    for field in registry.fields() {
        let operators: Vec<String> = field
            .allowed_operators()
            .iter()
            .map(|op| op.to_string())
            .collect();
        writeln!(out, "{:<14} {:<16} {}", field.name, field.label, operators.join(" "))?;
    }
    Ok(out.trim_end().to_string())
}

pub async fn cache_list(explorer: &Explorer) -> Result<String> {
    let keys = explorer.cache().list_keys().await?;
    if keys.is_empty() {
        return Ok("cache is empty".to_string());
    }
    Ok(keys
        .iter()
        .map(CacheKey::as_str)
        .collect::<Vec<_>>()
        .join("\n"))
}

pub async fn cache_evict(explorer: &Explorer, key: &str) -> Result<String> {
    let key = CacheKey::new(key)?;
    explorer.cache().delete(&key).await?;
    Ok(format!("evicted {}", key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_in(dir: &Path, base_url: &str) -> ExplorerConfig {
        let mut config = ExplorerConfig::default();
        config.dataset.key = "d.parquet".to_string();
        config.dataset.base_url = base_url.to_string();
        config.cache.path = Some(dir.join("cache.db"));
        config.session.path = Some(dir.join("session.json"));
        config
    }

    #[test]
    fn test_build_with_rules_file() {
        let dir = tempfile::tempdir().unwrap();
        let rules = dir.path().join("rules.json");
        std::fs::write(
            &rules,
            r#"{"combinator":"and","rules":[{"field":"startYear","operator":">","value":"2015"}]}"#,
        )
        .unwrap();

        let explorer = explorer(config_in(dir.path(), "http://localhost:5173/"), None).unwrap();
        let text = build(&explorer, Some(&rules)).unwrap();

        assert_eq!(text, "SELECT *\nFROM 'd.parquet'\nWHERE\nstartYear > 2015\nLIMIT 100");
    }

    #[test]
    fn test_build_rejects_unknown_field() {
        let dir = tempfile::tempdir().unwrap();
        let rules = dir.path().join("rules.json");
        std::fs::write(
            &rules,
            r#"{"combinator":"and","rules":[{"field":"director","operator":"=","value":"x"}]}"#,
        )
        .unwrap();

        let explorer = explorer(config_in(dir.path(), "http://localhost:5173/"), None).unwrap();
        assert!(build(&explorer, Some(&rules)).is_err());
    }

    #[test]
    fn test_extract_reports_fragments() {
        let dir = tempfile::tempdir().unwrap();
        let explorer = explorer(config_in(dir.path(), "http://localhost:5173/"), None).unwrap();

        let out = extract(&explorer, "SELECT title FROM t LIMIT 5").unwrap();
        assert_eq!(out, "select:   title\norder by: -\nlimit:    5");
    }

    #[test]
    fn test_fields_lists_registry() {
        let out = fields().unwrap();
        assert_eq!(out.lines().count(), 10);
        assert!(out.lines().any(|line| line.starts_with("titleId")));
    }

    #[tokio::test]
    async fn test_prefetch_then_cache_maintenance() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/d.parquet"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![7u8; 2048]))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let base = format!("{}/", server.uri());

        let first = explorer(config_in(dir.path(), &base), None).unwrap();
        assert_eq!(
            prefetch(&first).await.unwrap(),
            "d.parquet resolved from network (2048 bytes)"
        );

        let second = explorer(config_in(dir.path(), &base), None).unwrap();
        assert_eq!(
            prefetch(&second).await.unwrap(),
            "d.parquet resolved from cache (2048 bytes)"
        );
        assert_eq!(cache_list(&second).await.unwrap(), "d.parquet");

        assert_eq!(cache_evict(&second, "d.parquet").await.unwrap(), "evicted d.parquet");
        assert_eq!(cache_list(&second).await.unwrap(), "cache is empty");
    }

    #[test]
    fn test_share_uses_shared_query_first() {
        let dir = tempfile::tempdir().unwrap();
        let explorer = explorer(
            config_in(dir.path(), "http://localhost:5173/"),
            Some("https://explorer.local/?query=SELECT+1"),
        )
        .unwrap();

        let url = share(&explorer, "https://explorer.local/").unwrap();
        assert_eq!(
            querylens_core::share::query_from_url(&url).as_deref(),
            Some("SELECT 1")
        );
    }
}
