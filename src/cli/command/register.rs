use anyhow::{Context, Result};

use crate::{config::Config, db::SqliteCatalog};

pub fn register(
    config: &Config,
    site_code: &str,
    parameters: &[String],
    name: Option<&str>,
) -> Result<String> {
    let mut catalog = SqliteCatalog::open(&config.db_path)?;
    catalog.create_schema()?;

    let site_id = catalog
        .register_site(config.source_id, site_code, name, parameters)
        .with_context(|| format!("cannot register site {site_code}"))?;

    Ok(format!(
        "Registered site {site_code} (id {site_id}) with parameters {}",
        parameters.join(", ")
    ))
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::db::MetadataStore;
    use tempfile::TempDir;

    #[test]
    fn should_register_site_in_fresh_store() {
        let dir = TempDir::new().unwrap();
        let config = Config::new(dir.path());

        let message = register(&config, "09152500", &["00060".to_string()], None).unwrap();
        assert!(message.contains("09152500"));

        let catalog = SqliteCatalog::open_existing(&config.db_path).unwrap();
        let sites = catalog.list_sites(config.source_id).unwrap();
        assert_eq!(catalog.list_parameters(sites[0].site_id).unwrap(), vec!["00060"]);
    }
}
