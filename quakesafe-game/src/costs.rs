//! Budget arithmetic for selections.
use crate::catalog::{BuildingSize, BuildingStructure, Character};
use crate::numbers::{i64_to_f64, round_f64_to_i64};

/// Budget a character brings to the session.
#[must_use]
pub fn character_budget(base_budget: i64, character: &Character) -> i64 {
    round_f64_to_i64(i64_to_f64(base_budget) * character.budget_modifier)
}

#[must_use]
pub const fn size_cost(size: &BuildingSize) -> i64 {
    size.base_cost
}

#[must_use]
pub const fn structure_cost(structure: &BuildingStructure) -> i64 {
    structure.base_cost
}

/// Whether `candidate` fits once the selection it replaces is credited back.
#[must_use]
pub const fn can_afford(available_funds: i64, candidate: i64, replaced: i64) -> bool {
    candidate <= available_funds.saturating_add(replaced)
}

/// Human-readable cost label: `"No extra cost"` for zero, otherwise `"$12,345"`.
#[must_use]
pub fn format_cost(cost: i64) -> String {
    if cost == 0 {
        return "No extra cost".to_string();
    }
    let digits = cost.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if cost < 0 {
        format!("-${grouped}")
    } else {
        format!("${grouped}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;

    #[test]
    fn character_budget_scales_base() {
        let catalog = Catalog::default_catalog();
        let farmer = catalog.character("rural-farmer").unwrap();
        let professional = catalog.character("urban-professional").unwrap();
        assert_eq!(character_budget(200_000, farmer), 160_000);
        assert_eq!(character_budget(200_000, professional), 240_000);
    }

    #[test]
    fn affordability_credits_replaced_selection() {
        assert!(can_afford(10_000, 10_000, 0));
        assert!(!can_afford(10_000, 10_001, 0));
        assert!(can_afford(10_000, 40_000, 30_000));
        assert!(!can_afford(10_000, 40_001, 30_000));
    }

    #[test]
    fn costs_format_with_grouping() {
        assert_eq!(format_cost(0), "No extra cost");
        assert_eq!(format_cost(500), "$500");
        assert_eq!(format_cost(12_345), "$12,345");
        assert_eq!(format_cost(1_200_000), "$1,200,000");
        assert_eq!(format_cost(-2_500), "-$2,500");
    }
}
