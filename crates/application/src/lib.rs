//! Application services and ports of the SPPG data-table engine.

#![forbid(unsafe_code)]

pub mod catalog;
mod crud_controller;
mod filter_options_service;
mod gateway_ports;
mod list_controller;
mod query_builder;
mod table_registry;

#[cfg(test)]
mod test_support;

pub use catalog::sppg_registry;
pub use crud_controller::{CrudController, ValidationResult};
pub use filter_options_service::FilterOptionsService;
pub use gateway_ports::{
    EntityGateway, ListPage, ListRequest, LookupRequest, MutationMethod, MutationRequest,
    TokenProvider, require_token,
};
pub use list_controller::{
    FetchMode, FetchOutcome, ListController, ListMachine, ListPhase, ListState, PendingFetch,
};
pub use query_builder::{PageRequest, QueryBuilder, QueryDescriptor};
pub use table_registry::TableRegistry;
