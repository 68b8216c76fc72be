//! Deterministic architecture-diagram fallback.
//!
//! When the LLM gateway degrades or returns an unparseable diagram, this
//! pure function of the selected technologies substitutes a six-layer
//! flowchart so the workflow stays reproducible.

use std::collections::BTreeMap;
use tra_core::decision::model::SelectedTechnology;
use tra_core::gap::model::TechCategory;

static FALLBACK_TEMPLATE: &str = include_str!("templates/arch_fallback.tera");

fn pick(selected: &BTreeMap<TechCategory, SelectedTechnology>, category: TechCategory) -> Option<String> {
    selected.get(&category).map(|s| s.option_name.clone())
}

/// Render the fallback diagram from the selected technologies.
pub fn architecture_fallback(selected: &BTreeMap<TechCategory, SelectedTechnology>) -> String {
    let mut context = tera::Context::new();
    context.insert(
        "database",
        &pick(selected, TechCategory::Database).unwrap_or_else(|| "Primary Database".to_string()),
    );
    context.insert("auth", &pick(selected, TechCategory::Authentication));
    context.insert("caching", &pick(selected, TechCategory::Caching));
    context.insert("messaging", &pick(selected, TechCategory::Messaging));
    context.insert("storage", &pick(selected, TechCategory::Storage));

    let external: Vec<String> = [TechCategory::Email, TechCategory::Payments, TechCategory::Search]
        .iter()
        .filter_map(|c| pick(selected, *c))
        .collect();
    context.insert("external", &external);

    tera::Tera::one_off(FALLBACK_TEMPLATE, &context, false)
        .unwrap_or_else(|_| String::from("flowchart TD\n    APP[Application] -->|write| DB[(Database)]\n"))
}
