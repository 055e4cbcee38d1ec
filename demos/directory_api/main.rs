//! Directory API demo
//!
//! Serves groups, members and extended profile fields from an in-memory
//! directory seeded from YAML. Identity is taken from the `X-User-Id`,
//! `X-User-Capabilities` and `X-User-Groups` headers.
//!
//! ```text
//! curl http://127.0.0.1:3000/buddypress/v1/groups
//! curl 'http://127.0.0.1:3000/buddypress/v1/xprofile/1?fetch_fields=1&fetch_field_data=1&user_id=1'
//! curl -H 'X-User-Id: 1' -H 'X-User-Capabilities: bp_moderate' \
//!     'http://127.0.0.1:3000/buddypress/v1/groups?component=groups'
//! ```

use bp_rest::prelude::*;
use tracing_subscriber::EnvFilter;

const CONFIG: &str = include_str!("config.yaml");
const SEED: &str = include_str!("seed.yaml");

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = RestConfig::from_yaml_str(CONFIG)?;
    let directory = InMemoryDirectory::from_yaml_str(SEED)?;
    let prefix = config.route_prefix();

    println!("Directory API on http://127.0.0.1:3000{}", prefix);
    println!("  GET     {}/core", prefix);
    println!("  GET     {}/groups, {}/groups/{{id}}", prefix, prefix);
    println!("  GET     {}/members, {}/members/{{id}}", prefix, prefix);
    println!("  GET     {}/xprofile, {}/xprofile/{{id}}", prefix, prefix);
    println!("  GET     {}/xprofile/fields/{{id}}", prefix);
    println!("  OPTIONS any of the above for its schema");

    ServerBuilder::new()
        .with_config(config)
        .with_adapter(directory)
        .with_auth_provider(HeaderAuthProvider)
        .serve("127.0.0.1:3000")
        .await
}
