//! Built-in entity tables of the SPPG admin dashboard.

use serde_json::json;
use sppg_core::AppResult;
use sppg_domain::{
    BadgeTone, BadgeVariant, CellRenderer, ColumnSpec, DynamicOptionsSource, EndpointStrategy,
    EntityAction, EntitySchema, EntitySchemaInput, FilterKind, FilterOption, FilterSpec,
    FormFieldSpec, FormInputKind, SearchMode, UpdateMethod,
};

use crate::table_registry::TableRegistry;

const DATE_FORMAT: &str = "%d %b %Y";

/// Builds the registry holding every dashboard entity, in menu order.
pub fn sppg_registry() -> AppResult<TableRegistry> {
    let mut registry = TableRegistry::new();
    registry.register(sppg_schema()?)?;
    registry.register(school_schema()?)?;
    registry.register(menu_schema()?)?;
    registry.register(user_schema()?)?;
    Ok(registry)
}

fn sppg_schema() -> AppResult<EntitySchema> {
    let mut input = EntitySchemaInput::new("sppg", "SPPG", "/admin/sppg");
    input.list_endpoints = vec![
        EndpointStrategy::new("admin", "/admin/sppg")?,
        EndpointStrategy::new("legacy", "/sppg")?,
    ];
    input.searchable_fields = vec!["name".to_owned(), "region".to_owned(), "pic_name".to_owned()];
    input.columns = vec![
        ColumnSpec::new("name", "Nama SPPG", Some(220), CellRenderer::default())?,
        ColumnSpec::text("region", "Wilayah")?,
        ColumnSpec::new(
            "school_count",
            "Sekolah",
            Some(90),
            CellRenderer::Number { decimals: 0 },
        )?,
        ColumnSpec::new(
            "status",
            "Status",
            Some(110),
            CellRenderer::Badge {
                variants: vec![
                    BadgeVariant::new("active", "Aktif", BadgeTone::Success),
                    BadgeVariant::new("pending", "Menunggu", BadgeTone::Warning),
                    BadgeVariant::new("inactive", "Nonaktif", BadgeTone::Danger),
                ],
            },
        )?,
        ColumnSpec::new(
            "created_at",
            "Terdaftar",
            None,
            CellRenderer::Date {
                format: DATE_FORMAT.to_owned(),
            },
        )?,
    ];
    input.filters = vec![
        FilterSpec::select(
            "status",
            "Status",
            vec![
                FilterOption::new(json!("active"), "Aktif"),
                FilterOption::new(json!("pending"), "Menunggu"),
                FilterOption::new(json!("inactive"), "Nonaktif"),
            ],
        )?,
        FilterSpec::dynamic_select(
            "region",
            "Wilayah",
            DynamicOptionsSource::new("regions", "/admin/sppg/regions", "region", "region")?,
        )?,
        FilterSpec::boolean("is_verified", "Terverifikasi", "Sudah", "Belum")?,
    ];
    input.form_fields = vec![
        FormFieldSpec::new("name", "Nama SPPG", FormInputKind::Text, true)?,
        FormFieldSpec::new("address", "Alamat", FormInputKind::TextArea, true)?,
        FormFieldSpec::new("region", "Wilayah", FormInputKind::Select, true)?,
        FormFieldSpec::new("pic_name", "Penanggung Jawab", FormInputKind::Text, false)?,
        FormFieldSpec::new("phone", "Telepon", FormInputKind::Text, false)?,
    ];
    input.allowed_actions = vec![
        EntityAction::View,
        EntityAction::Edit,
        EntityAction::Delete,
        EntityAction::Export,
    ];
    EntitySchema::new(input)
}

fn school_schema() -> AppResult<EntitySchema> {
    let mut input = EntitySchemaInput::new("schools", "Sekolah", "/admin/schools");
    input.search_mode = SearchMode::LocalFallback;
    input.searchable_fields = vec!["name".to_owned(), "npsn".to_owned(), "address".to_owned()];
    input.columns = vec![
        ColumnSpec::new("name", "Nama Sekolah", Some(220), CellRenderer::default())?,
        ColumnSpec::text("npsn", "NPSN")?,
        ColumnSpec::new(
            "sppg.name",
            "SPPG",
            None,
            CellRenderer::Text {
                fallback_field: Some("sppg_name".to_owned()),
            },
        )?,
        ColumnSpec::new(
            "student_count",
            "Siswa",
            Some(80),
            CellRenderer::Number { decimals: 0 },
        )?,
        ColumnSpec::new(
            "level",
            "Jenjang",
            Some(90),
            CellRenderer::Badge {
                variants: vec![
                    BadgeVariant::new("sd", "SD", BadgeTone::Info),
                    BadgeVariant::new("smp", "SMP", BadgeTone::Success),
                    BadgeVariant::new("sma", "SMA", BadgeTone::Warning),
                ],
            },
        )?,
    ];
    input.filters = vec![
        FilterSpec::select(
            "level",
            "Jenjang",
            vec![
                FilterOption::new(json!("sd"), "SD"),
                FilterOption::new(json!("smp"), "SMP"),
                FilterOption::new(json!("sma"), "SMA"),
            ],
        )?,
        FilterSpec::dynamic_select(
            "sppg_id",
            "SPPG",
            DynamicOptionsSource::new("sppg", "/admin/sppg", "id", "name")?,
        )?,
    ];
    input.form_fields = vec![
        FormFieldSpec::new("name", "Nama Sekolah", FormInputKind::Text, true)?,
        FormFieldSpec::new("npsn", "NPSN", FormInputKind::Text, true)?,
        FormFieldSpec::new("sppg_id", "SPPG", FormInputKind::Select, true)?,
        FormFieldSpec::new("student_count", "Jumlah Siswa", FormInputKind::Number, true)?,
        FormFieldSpec::new("address", "Alamat", FormInputKind::TextArea, false)?,
        FormFieldSpec::new("level", "Jenjang", FormInputKind::Select, false)?,
    ];
    input.allowed_actions = vec![EntityAction::View, EntityAction::Edit, EntityAction::Delete];
    EntitySchema::new(input)
}

fn menu_schema() -> AppResult<EntitySchema> {
    let mut input = EntitySchemaInput::new("menus", "Menu", "/admin/menus");
    input.searchable_fields = vec!["name".to_owned()];
    input.columns = vec![
        ColumnSpec::new("name", "Menu", Some(200), CellRenderer::default())?,
        ColumnSpec::text("sppg.name", "SPPG")?,
        ColumnSpec::new(
            "serving_date",
            "Tanggal Saji",
            None,
            CellRenderer::Date {
                format: DATE_FORMAT.to_owned(),
            },
        )?,
        ColumnSpec::new(
            "calories",
            "Kalori",
            Some(80),
            CellRenderer::Number { decimals: 0 },
        )?,
        ColumnSpec::new(
            "condition",
            "Kondisi",
            Some(100),
            CellRenderer::Badge {
                variants: vec![
                    BadgeVariant::new("good", "Baik", BadgeTone::Success),
                    BadgeVariant::new("warning", "Perlu Cek", BadgeTone::Warning),
                    BadgeVariant::new("bad", "Buruk", BadgeTone::Danger),
                ],
            },
        )?,
        ColumnSpec::new(
            "price",
            "Harga",
            None,
            CellRenderer::Currency {
                prefix: "Rp".to_owned(),
            },
        )?,
    ];
    input.filters = vec![
        FilterSpec::select(
            "condition",
            "Kondisi",
            vec![
                FilterOption::new(json!("good"), "Baik"),
                FilterOption::new(json!("warning"), "Perlu Cek"),
                FilterOption::new(json!("bad"), "Buruk"),
            ],
        )?,
        FilterSpec::plain("serving_date", "Tanggal Saji", FilterKind::DateRange)?,
        FilterSpec::plain("calories", "Kalori", FilterKind::Number)?,
    ];
    input.form_fields = vec![
        FormFieldSpec::new("name", "Menu", FormInputKind::Text, true)?,
        FormFieldSpec::new("sppg_id", "SPPG", FormInputKind::Select, true)?,
        FormFieldSpec::new("serving_date", "Tanggal Saji", FormInputKind::Date, true)?,
        FormFieldSpec::new("calories", "Kalori", FormInputKind::Number, false)?,
        FormFieldSpec::new("price", "Harga", FormInputKind::Number, false)?,
        FormFieldSpec::new("condition", "Kondisi", FormInputKind::Select, false)?,
    ];
    input.allowed_actions = vec![
        EntityAction::View,
        EntityAction::Edit,
        EntityAction::Delete,
        EntityAction::Export,
    ];
    EntitySchema::new(input)
}

fn user_schema() -> AppResult<EntitySchema> {
    let mut input = EntitySchemaInput::new("users", "Pengguna", "/admin/users");
    input.update_method = UpdateMethod::Patch;
    input.searchable_fields = vec!["name".to_owned(), "email".to_owned()];
    input.columns = vec![
        ColumnSpec::new("name", "Nama", Some(180), CellRenderer::default())?,
        ColumnSpec::text("email", "Email")?,
        ColumnSpec::new(
            "role",
            "Peran",
            Some(100),
            CellRenderer::Badge {
                variants: vec![
                    BadgeVariant::new("admin", "Admin", BadgeTone::Info),
                    BadgeVariant::new("owner", "Pemilik SPPG", BadgeTone::Success),
                ],
            },
        )?,
        ColumnSpec::new(
            "is_active",
            "Status",
            Some(90),
            CellRenderer::Boolean {
                true_label: "Aktif".to_owned(),
                false_label: "Nonaktif".to_owned(),
            },
        )?,
    ];
    input.filters = vec![
        FilterSpec::select(
            "role",
            "Peran",
            vec![
                FilterOption::new(json!("admin"), "Admin"),
                FilterOption::new(json!("owner"), "Pemilik SPPG"),
            ],
        )?,
        FilterSpec::boolean("is_active", "Status", "Aktif", "Nonaktif")?,
    ];
    input.form_fields = vec![
        FormFieldSpec::new("name", "Nama", FormInputKind::Text, true)?,
        FormFieldSpec::new("email", "Email", FormInputKind::Email, true)?,
        FormFieldSpec::new("role", "Peran", FormInputKind::Select, true)?,
        FormFieldSpec::new("is_active", "Aktif", FormInputKind::Toggle, false)?,
    ];
    input.allowed_actions = vec![EntityAction::View, EntityAction::Edit, EntityAction::Delete];
    EntitySchema::new(input)
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use sppg_domain::{EntityAction, Record, SearchMode, UpdateMethod};

    use super::sppg_registry;

    #[test]
    fn registers_dashboard_entities_in_menu_order() {
        let registry = sppg_registry().unwrap_or_else(|_| unreachable!());
        let order: Vec<String> = registry
            .list()
            .iter()
            .map(|schema| schema.entity_id().to_owned())
            .collect();
        assert_eq!(order, vec!["sppg", "schools", "menus", "users"]);
    }

    #[test]
    fn entity_specific_behaviour_is_declared() {
        let registry = sppg_registry().unwrap_or_else(|_| unreachable!());

        assert_eq!(registry.get("schools").search_mode(), SearchMode::LocalFallback);
        assert_eq!(registry.get("users").update_method(), UpdateMethod::Patch);
        assert!(!registry.get("users").allows(EntityAction::Export));

        let sppg = registry.get("sppg");
        let paths: Vec<&str> = sppg
            .list_endpoints()
            .iter()
            .map(|strategy| strategy.path())
            .collect();
        assert_eq!(paths, vec!["/admin/sppg", "/sppg"]);
        assert_eq!(sppg.required_fields(), vec!["name", "address", "region"]);
    }

    #[test]
    fn menus_use_the_condition_field() {
        let registry = sppg_registry().unwrap_or_else(|_| unreachable!());
        let menus = registry.get("menus");
        assert!(menus.filter("condition").is_some());
        assert!(menus.filter("menu_condition").is_none());

        let row = Record::from_value(json!({"condition": "good", "price": 15000}))
            .unwrap_or_else(|_| unreachable!());
        let rendered: Vec<String> = menus
            .columns()
            .iter()
            .map(|column| column.render(&row).text)
            .collect();
        assert_eq!(rendered, vec!["-", "-", "-", "-", "Baik", "Rp 15.000"]);
    }
}
