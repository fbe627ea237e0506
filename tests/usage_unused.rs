use pbix_doc::config::Config;
use pbix_doc::model::{ModelCatalog, ModelExport};
use pbix_doc::report::{Extraction, FieldBinding, FilterRecord, FilterScope, SemanticRole};
use pbix_doc::usage::{attach_pages, unused_fields};

const TSV: &str = "Object\tName\tDataType\tDescription\tExpression\n\
Model.Tables.Sales\tSales\t\t\t\n\
Model.Tables.Sales.C.[Revenue]\tRevenue\tDecimal\t\t\n\
Model.Tables.Sales.C.[Region]\tRegion\tString\t\t\n\
Model.Tables.Sales.C.[Cost]\tCost\tDecimal\t\t\n\
Model.Tables.Sales.C.[Comment]\tComment\tString\t\t\n\
Model.Tables.Sales.M.[Total Sales]\tTotal Sales\tDecimal\t\tSUM(Sales[Revenue])\n\
Model.Tables.Sales.M.[Margin]\tMargin\tDecimal\t\t[Total Sales] - SUM(Sales[Cost])\n";

fn binding(page: &str, table: &str, field: &str) -> FieldBinding {
    FieldBinding {
        page: page.into(),
        visual_type: "card".into(),
        visual_id: format!("{page}-{field}"),
        table: table.into(),
        field: field.into(),
        display_name: None,
        role: SemanticRole::Projection("Values".into()),
    }
}

fn extraction() -> Extraction {
    Extraction {
        items: vec![
            binding("Overview", "Sales", "Margin"),
            binding("Details", "Sales", "Margin"),
            binding("Overview", "Sales", "Margin"),
        ],
        filters: vec![FilterRecord {
            page: "Overview".into(),
            scope_id: "Region".into(),
            scope: FilterScope::ThisPage,
            table: "Sales".into(),
            field: "Region".into(),
            operator: "=".into(),
            value: "North".into(),
        }],
        ..Default::default()
    }
}

#[test]
fn unused_excludes_items_filters_and_definition_references() {
    let export = ModelExport::from_tsv_str(TSV).expect("parse");
    let catalog = ModelCatalog::build(&export, &Config::default());
    let unused = unused_fields(&catalog, &extraction());
    let names: Vec<(&str, &str)> = unused
        .iter()
        .map(|u| (u.table.as_str(), u.field.as_str()))
        .collect();
    assert_eq!(names, vec![("Sales", "Comment")]);
}

#[test]
fn report_without_bindings_leaves_everything_unreferenced_by_definitions() {
    let export = ModelExport::from_tsv_str(TSV).expect("parse");
    let catalog = ModelCatalog::build(&export, &Config::default());
    let unused = unused_fields(&catalog, &Extraction::default());
    let names: Vec<&str> = unused.iter().map(|u| u.field.as_str()).collect();
    assert_eq!(names, vec!["Region", "Comment", "Margin"]);
}

#[test]
fn pages_are_attached_once_in_first_seen_order() {
    let export = ModelExport::from_tsv_str(TSV).expect("parse");
    let mut catalog = ModelCatalog::build(&export, &Config::default());
    attach_pages(&mut catalog, &extraction());
    let margin = catalog
        .definitions
        .iter()
        .find(|d| d.name == "Margin")
        .expect("margin");
    assert_eq!(margin.pages, vec!["Overview".to_string(), "Details".to_string()]);
}
