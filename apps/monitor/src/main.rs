//! SPPG entity table monitor.
//!
//! Lists the registered entities, or loads the first page of one entity and
//! prints it with the entity's column renderers.

#![forbid(unsafe_code)]

mod monitor_config;

use std::env;
use std::sync::Arc;
use std::time::Duration;

use monitor_config::{MonitorConfig, init_tracing};
use sppg_application::{
    EntityGateway, FilterOptionsService, ListController, ListState, TableRegistry, TokenProvider,
    sppg_registry,
};
use sppg_core::{AppError, AppResult};
use sppg_domain::{EntitySchema, OptionsSource};
use sppg_infrastructure::{HttpEntityGateway, StaticTokenProvider};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let registry = sppg_registry()?;
    let mut args = env::args().skip(1);
    let Some(entity_id) = args.next() else {
        print_entities(&registry);
        return Ok(());
    };
    let search_text = args.collect::<Vec<_>>().join(" ");

    let config = MonitorConfig::load()?;
    let schema = resolve_schema(&registry, &entity_id, config.page_size)?;

    let http_client = reqwest::Client::builder()
        .timeout(Duration::from_millis(config.http_timeout_ms))
        .build()
        .map_err(|error| AppError::Config(format!("failed to build HTTP client: {error}")))?;
    let gateway: Arc<dyn EntityGateway> = Arc::new(HttpEntityGateway::new(
        http_client,
        config.api_base_url.as_str(),
    )?);
    let token_provider: Arc<dyn TokenProvider> =
        Arc::new(StaticTokenProvider::new(config.api_token.clone()));

    info!(
        entity_id = %schema.entity_id(),
        api_base_url = %config.api_base_url,
        page_size = config.page_size,
        "sppg-monitor started"
    );

    log_filters(&schema, gateway.clone(), token_provider.clone()).await;

    let controller = ListController::new(schema.clone(), gateway, token_provider);
    let result = load(&controller, search_text.trim()).await;
    controller.unmount().await;

    match result {
        Ok(state) => {
            print_rows(&schema, &state);
            Ok(())
        }
        Err(error) => {
            eprintln!("{}", error.user_message());
            Err(error)
        }
    }
}

/// Looks up an entity, falling back to a view-only schema when unregistered.
fn resolve_schema(
    registry: &TableRegistry,
    entity_id: &str,
    page_size: usize,
) -> AppResult<Arc<EntitySchema>> {
    if registry.find(entity_id).is_none() {
        warn!(entity_id, "entity is not registered, using the view-only fallback");
    }

    Ok(Arc::new(registry.get(entity_id).with_page_size(page_size)?))
}

async fn load(controller: &ListController, search_text: &str) -> AppResult<ListState> {
    let state = controller.mount().await?;
    if search_text.is_empty() {
        return Ok(state);
    }

    controller.set_search(search_text).await
}

async fn log_filters(
    schema: &EntitySchema,
    gateway: Arc<dyn EntityGateway>,
    token_provider: Arc<dyn TokenProvider>,
) {
    let service = FilterOptionsService::new(gateway, token_provider);
    match service.resolve_filters(schema).await {
        Ok(filters) => {
            for filter in filters {
                let options = match filter.options() {
                    OptionsSource::Static(options) => options.len(),
                    OptionsSource::Dynamic(_) => 0,
                };
                info!(
                    entity_id = %schema.entity_id(),
                    filter = filter.key(),
                    kind = filter.kind().as_str(),
                    options,
                    "filter available"
                );
            }
        }
        Err(error) => {
            warn!(
                entity_id = %schema.entity_id(),
                error = %error,
                "failed to resolve filter options"
            );
        }
    }
}

fn print_entities(registry: &TableRegistry) {
    for schema in registry.list() {
        println!("{:<10} {}", schema.entity_id(), schema.display_name());
    }
}

fn print_rows(schema: &EntitySchema, state: &ListState) {
    let header: Vec<&str> = schema.columns().iter().map(|column| column.label()).collect();
    println!("{}", header.join(" | "));

    let rows = state.visible_rows();
    for row in &rows {
        if schema.columns().is_empty() {
            println!("{}", row.clone().into_value());
            continue;
        }

        let cells: Vec<String> = schema
            .columns()
            .iter()
            .map(|column| column.render(row).text)
            .collect();
        println!("{}", cells.join(" | "));
    }

    match state.total_count() {
        Some(total) => println!("{} of {total} {}", rows.len(), schema.display_name()),
        None => println!("{} {}", rows.len(), schema.display_name()),
    }
}
