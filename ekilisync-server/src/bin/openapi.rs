//! Print the OpenAPI document of ekilisync-server as JSON.

use ekilisync_server::docs::ApiDoc;
use utoipa::OpenApi;

fn main() -> anyhow::Result<()> {
    println!("{}", ApiDoc::openapi().to_pretty_json()?);
    Ok(())
}
