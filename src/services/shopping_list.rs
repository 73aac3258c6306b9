//! Shopping list export
//!
//! Renders aggregated cart ingredients as CSV.

use crate::models::ShoppingListItem;

/// Download file name
pub const SHOPPING_LIST_FILENAME: &str = "shopping_list.csv";

const HEADER: [&str; 3] = ["Ingredient", "Amount", "Measurement unit"];

/// Render items as CSV with a header row
pub fn render_csv(items: &[ShoppingListItem]) -> String {
    let mut out = String::new();
    push_row(&mut out, &HEADER);
    for item in items {
        let amount = item.total_amount.to_string();
        push_row(
            &mut out,
            &[item.name.as_str(), amount.as_str(), item.measurement_unit.as_str()],
        );
    }
    out
}

fn push_row(out: &mut String, fields: &[&str]) {
    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        push_field(out, field);
    }
    out.push('\n');
}

/// Quote only when the value contains a separator, quote or line break
fn push_field(out: &mut String, field: &str) {
    if field.contains([',', '"', '\n', '\r']) {
        out.push('"');
        out.push_str(&field.replace('"', "\"\""));
        out.push('"');
    } else {
        out.push_str(field);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(name: &str, unit: &str, total: i64) -> ShoppingListItem {
        ShoppingListItem {
            name: name.to_string(),
            measurement_unit: unit.to_string(),
            total_amount: total,
        }
    }

    #[test]
    fn test_header_only_for_empty_cart() {
        assert_eq!(render_csv(&[]), "Ingredient,Amount,Measurement unit\n");
    }

    #[test]
    fn test_rows_follow_header() {
        let csv = render_csv(&[item("flour", "g", 300), item("milk", "ml", 250)]);
        assert_eq!(
            csv,
            "Ingredient,Amount,Measurement unit\nflour,300,g\nmilk,250,ml\n"
        );
    }

    #[test]
    fn test_quotes_special_characters() {
        let csv = render_csv(&[item("salt, coarse", "pinch \"big\"", 1)]);
        assert!(csv.ends_with("\"salt, coarse\",1,\"pinch \"\"big\"\"\"\n"));
    }
}
