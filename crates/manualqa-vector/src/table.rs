//! LanceDB connection and table helpers.

use anyhow::Result;
use lancedb::{connect, Connection};

pub async fn open_db(uri: &str) -> Result<Connection> {
    Ok(connect(uri).execute().await?)
}

pub async fn table_exists(conn: &Connection, name: &str) -> Result<bool> {
    Ok(conn.table_names().execute().await?.iter().any(|t| t == name))
}

/// Table names carrying `prefix`, with the prefix stripped, sorted by name.
pub async fn prefixed_tables(conn: &Connection, prefix: &str) -> Result<Vec<String>> {
    let mut names: Vec<String> = conn
        .table_names()
        .execute()
        .await?
        .into_iter()
        .filter_map(|name| name.strip_prefix(prefix).map(str::to_string))
        .filter(|name| !name.is_empty())
        .collect();
    names.sort();
    Ok(names)
}
