use rust_decimal::Decimal;

use super::value_objects::{BlockBody, ConfirmationBlock};
use crate::domain::template::{DiscountKind, ServiceTemplate, TemplateDiscount};

// ============================================================================
// Pricing Calculator
// ============================================================================
//
// Derives the order's running price during negotiation:
//
//   max(0, (starting_price + selected line items) adjusted by each
//           template discount in declaration order)
//
// A discount's threshold is checked against the running price at the
// moment it is evaluated, so an earlier discount can disqualify a later
// one.
//
// ============================================================================

pub fn running_price(template: &ServiceTemplate, blocks: &[ConfirmationBlock]) -> Decimal {
    let mut price = template.starting_price + selected_items_total(blocks);

    for discount in &template.discounts {
        price = apply_discount(price, discount);
    }

    price.max(Decimal::ZERO)
}

fn selected_items_total(blocks: &[ConfirmationBlock]) -> Decimal {
    blocks
        .iter()
        .filter_map(|b| match &b.body {
            BlockBody::List { items } => Some(items),
            _ => None,
        })
        .flatten()
        .filter(|item| item.selected)
        .map(|item| item.line_total())
        .sum()
}

fn apply_discount(price: Decimal, discount: &TemplateDiscount) -> Decimal {
    if let Some(threshold) = discount.threshold {
        if price < threshold {
            return price;
        }
    }

    match discount.kind {
        DiscountKind::Percentage => price - price * discount.value / Decimal::from(100),
        DiscountKind::Fixed => price - discount.value,
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::value_objects::ListItem;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn template(starting: Decimal, discounts: Vec<TemplateDiscount>) -> ServiceTemplate {
        ServiceTemplate {
            id: Uuid::new_v4(),
            name: "Logo design".into(),
            industry_id: Uuid::new_v4(),
            industry_base_rate: dec!(0.10),
            starting_price: starting,
            blocks: vec![],
            discounts,
            contract_blocks: vec![],
            receiving_account: crate::domain::order::value_objects::BankAccount {
                bank_name: "First Bank".into(),
                account_number: "000-1".into(),
                holder_name: "Studio".into(),
            },
        }
    }

    fn list_block(items: Vec<(u32, Decimal, bool)>) -> ConfirmationBlock {
        ConfirmationBlock {
            id: Uuid::new_v4(),
            title: "Add-ons".into(),
            body: BlockBody::List {
                items: items
                    .into_iter()
                    .map(|(quantity, unit_price, selected)| ListItem {
                        id: Uuid::new_v4(),
                        label: "item".into(),
                        quantity,
                        unit_price,
                        selected,
                    })
                    .collect(),
            },
        }
    }

    #[test]
    fn base_plus_selected_items_with_percentage_discount() {
        let tpl = template(
            dec!(100),
            vec![TemplateDiscount {
                kind: DiscountKind::Percentage,
                value: dec!(10),
                threshold: None,
            }],
        );
        let blocks = vec![list_block(vec![(2, dec!(25), true)])];

        // (100 + 2*25) - 10% = 135
        assert_eq!(running_price(&tpl, &blocks), dec!(135.0));
    }

    #[test]
    fn fixed_discount_stacks_after_percentage() {
        let tpl = template(
            dec!(100),
            vec![
                TemplateDiscount {
                    kind: DiscountKind::Percentage,
                    value: dec!(10),
                    threshold: None,
                },
                TemplateDiscount {
                    kind: DiscountKind::Fixed,
                    value: dec!(100),
                    threshold: None,
                },
            ],
        );
        let blocks = vec![list_block(vec![(2, dec!(25), true)])];

        assert_eq!(running_price(&tpl, &blocks), dec!(35.0));
    }

    #[test]
    fn price_is_floored_at_zero() {
        let tpl = template(
            dec!(50),
            vec![TemplateDiscount {
                kind: DiscountKind::Fixed,
                value: dec!(80),
                threshold: None,
            }],
        );
        assert_eq!(running_price(&tpl, &[]), Decimal::ZERO);
    }

    #[test]
    fn unselected_items_do_not_count() {
        let tpl = template(dec!(100), vec![]);
        let blocks = vec![list_block(vec![(2, dec!(25), false), (1, dec!(10), true)])];
        assert_eq!(running_price(&tpl, &blocks), dec!(110));
    }

    #[test]
    fn threshold_is_checked_against_the_running_price() {
        // The fixed discount drops the running price below the percentage
        // discount's threshold, so the second discount never applies.
        let tpl = template(
            dec!(200),
            vec![
                TemplateDiscount {
                    kind: DiscountKind::Fixed,
                    value: dec!(120),
                    threshold: None,
                },
                TemplateDiscount {
                    kind: DiscountKind::Percentage,
                    value: dec!(50),
                    threshold: Some(dec!(100)),
                },
            ],
        );
        assert_eq!(running_price(&tpl, &[]), dec!(80));
    }

    #[test]
    fn threshold_met_applies_discount() {
        let tpl = template(
            dec!(200),
            vec![TemplateDiscount {
                kind: DiscountKind::Percentage,
                value: dec!(25),
                threshold: Some(dec!(150)),
            }],
        );
        assert_eq!(running_price(&tpl, &[]), dec!(150.00));
    }
}
