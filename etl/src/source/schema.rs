//! Columns the engine reads from the transactional store.
//!
//! Checked once before any step runs so a renamed or dropped column fails the
//! run up front instead of deep inside a transform.

use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Copy)]
pub struct SourceTable {
    pub name: &'static str,
    pub columns: &'static [&'static str],
}

pub const SOURCE_CONTRACT: &[SourceTable] = &[
    SourceTable {
        name: "Couriers",
        columns: &["id", "name"],
    },
    SourceTable {
        name: "Riders",
        columns: &[
            "id",
            "firstName",
            "lastName",
            "vehicleType",
            "age",
            "gender",
            "courierId",
        ],
    },
    SourceTable {
        name: "Products",
        columns: &["id", "productCode", "name", "category", "description", "price"],
    },
    SourceTable {
        name: "Users",
        columns: &[
            "id",
            "username",
            "firstName",
            "lastName",
            "address1",
            "address2",
            "city",
            "country",
            "zipCode",
            "phoneNumber",
            "birthDate",
            "gender",
        ],
    },
    SourceTable {
        name: "Orders",
        columns: &["id", "orderNumber", "userId", "deliveryRiderId", "deliveryDate"],
    },
    SourceTable {
        name: "OrderItems",
        columns: &["OrderId", "ProductId", "quantity", "notes"],
    },
];

/// Lists every contract table or `Table.column` absent from `present`
/// (table name → column names).
pub fn missing_columns(present: &HashMap<String, HashSet<String>>) -> Vec<String> {
    let mut missing = Vec::new();

    for table in SOURCE_CONTRACT {
        match present.get(table.name) {
            None => missing.push(table.name.to_string()),
            Some(columns) => missing.extend(
                table
                    .columns
                    .iter()
                    .filter(|c| !columns.contains(**c))
                    .map(|c| format!("{}.{}", table.name, c)),
            ),
        }
    }

    missing
}

/// The full contract as a `table → columns` map, the shape `missing_columns` reads.
pub fn contract_columns() -> HashMap<String, HashSet<String>> {
    SOURCE_CONTRACT
        .iter()
        .map(|t| {
            (
                t.name.to_string(),
                t.columns.iter().map(|c| c.to_string()).collect(),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn complete_source_has_no_gaps() {
        assert!(missing_columns(&contract_columns()).is_empty());
    }

    #[test]
    fn reports_missing_tables_and_columns() {
        let mut present = contract_columns();
        present.remove("Couriers");
        present.get_mut("Riders").unwrap().remove("vehicleType");

        assert_eq!(
            missing_columns(&present),
            vec!["Couriers".to_string(), "Riders.vehicleType".to_string()]
        );
    }
}
