//! Pakistani Rupee denomination labels, indexed by model class id.
//!
//! The class order is fixed by the training dataset and must not be edited
//! independently of the model artifact.

pub const PKR_CLASSES: [&str; 7] = [
    "PKR_10",
    "PKR_100",
    "PKR_1000",
    "PKR_20",
    "PKR_50",
    "PKR_500",
    "PKR_5000",
];

/// Denomination name for a class id, or a placeholder for ids the table
/// does not know about.
pub fn class_name(class_id: usize) -> String {
    PKR_CLASSES
        .get(class_id)
        .map(|name| (*name).to_string())
        .unwrap_or_else(|| format!("Unknown_{class_id}"))
}

#[cfg(test)]
mod test {
    use super::{class_name, PKR_CLASSES};

    #[test]
    fn seven_denominations() {
        assert_eq!(PKR_CLASSES.len(), 7);
    }

    #[test]
    fn known_ids_resolve() {
        assert_eq!(class_name(0), "PKR_10");
        assert_eq!(class_name(3), "PKR_20");
        assert_eq!(class_name(6), "PKR_5000");
    }

    #[test]
    fn unknown_id_gets_placeholder() {
        assert_eq!(class_name(99), "Unknown_99");
    }
}
