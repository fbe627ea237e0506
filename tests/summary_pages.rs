use pbix_doc::report::{Extraction, FieldBinding, FilterRecord, FilterScope, SemanticRole};
use pbix_doc::summary::{split_camel_case, summarize, ItemType};

fn binding(visual_type: &str, visual_id: &str, table: &str, role: SemanticRole) -> FieldBinding {
    FieldBinding {
        page: "Overview".into(),
        visual_type: visual_type.into(),
        visual_id: visual_id.into(),
        table: table.into(),
        field: "F".into(),
        display_name: None,
        role,
    }
}

fn filter(scope: FilterScope, scope_id: &str, field: &str) -> FilterRecord {
    FilterRecord {
        page: "Overview".into(),
        scope_id: scope_id.into(),
        scope,
        table: "Sales".into(),
        field: field.into(),
        operator: "=".into(),
        value: "x".into(),
    }
}

#[test]
fn camel_case_split() {
    assert_eq!(
        split_camel_case("lineClusteredColumnComboChart"),
        "Line Clustered Column Combo Chart"
    );
    assert_eq!(split_camel_case("kpi"), "Kpi");
}

#[test]
fn entries_are_ordered_by_item_then_display_type() {
    let values = SemanticRole::Projection("Values".into());
    let ex = Extraction {
        items: vec![
            binding("Group", "g1", "", SemanticRole::Group),
            binding("PageNavigation", "b1", "", SemanticRole::Page),
            binding("slicer", "s1", "Region", values.clone()),
            binding("tableEx", "t1", "Sales", values.clone()),
            binding("barChart", "c1", "Sales", values.clone()),
            binding("barChart", "c1", "Sales", values.clone()),
        ],
        filters: vec![
            filter(FilterScope::ThisPage, "Region", "Region"),
            filter(FilterScope::ThisPage, "Region", "Region"),
            filter(FilterScope::Visual, "c1", "Channel"),
        ],
        ..Default::default()
    };

    let pages = summarize(&ex);
    assert_eq!(pages.len(), 1);
    let entries = &pages[0].entries;
    let kinds: Vec<(ItemType, &str)> = entries
        .iter()
        .map(|e| (e.item_type, e.display_type.as_str()))
        .collect();
    assert_eq!(
        kinds,
        vec![
            (ItemType::Visual, "Bar Chart"),
            (ItemType::Visual, "Table"),
            (ItemType::Slicer, "Region"),
            (ItemType::Filter, "This Page"),
            (ItemType::Button, "PageNavigation"),
            (ItemType::Group, "Panel"),
        ]
    );

    let chart = &entries[0];
    assert_eq!(chart.bindings.len(), 2);
    assert_eq!(chart.filters, vec!["Sales[Channel] = x".to_string()]);
    assert_eq!(entries[3].filters, vec!["Sales[Region] = x".to_string()]);
}

#[test]
fn pages_follow_first_appearance() {
    let mut late = binding("card", "c2", "Sales", SemanticRole::Projection("Values".into()));
    late.page = "Second".into();
    let ex = Extraction {
        items: vec![
            late,
            binding("cardVisual", "c1", "Sales", SemanticRole::Projection("Data".into())),
        ],
        ..Default::default()
    };
    let pages = summarize(&ex);
    let names: Vec<&str> = pages.iter().map(|p| p.page.as_str()).collect();
    assert_eq!(names, vec!["Second", "Overview"]);
    assert_eq!(pages[1].entries[0].display_type, "Card (new)");
}
