//! Entity table schemas, records and local query predicates.

#![forbid(unsafe_code)]

mod column;
mod filter;
pub mod matching;
mod record;
mod schema;
mod temporal;

pub use column::{BadgeTone, BadgeVariant, CellDisplay, CellRenderer, ColumnSpec};
pub use filter::{
    DynamicOptionsSource, FilterKind, FilterOption, FilterSpec, FilterValue, OptionsSource,
};
pub use record::Record;
pub use schema::{
    EndpointStrategy, EntityAction, EntitySchema, EntitySchemaInput, FormFieldSpec,
    FormInputKind, PaginationScheme, SearchMode, UpdateMethod,
};
