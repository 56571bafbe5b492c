use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;

use crate::models::{Budget, BudgetState, NotificationEvent, NotificationType, Priority};

pub const NEAR_LIMIT_PERCENT: Decimal = dec!(80);
pub const OVER_BUDGET_PERCENT: Decimal = dec!(100);

/// Spend as a percentage of the limit. `None` when the limit is unset or the
/// ratio does not fit in a `Decimal`.
pub fn percentage(budget: &Budget) -> Option<Decimal> {
    if budget.total <= Decimal::ZERO {
        return None;
    }
    budget
        .spent
        .checked_div(budget.total)?
        .checked_mul(OVER_BUDGET_PERCENT)
}

// Bands compare amounts directly so huge spends cannot overflow the ratio.
pub fn classify(budget: &Budget) -> Option<BudgetState> {
    if budget.total <= Decimal::ZERO {
        return None;
    }
    let near_limit = budget.total * (NEAR_LIMIT_PERCENT / OVER_BUDGET_PERCENT);

    if budget.spent > budget.total {
        Some(BudgetState::OverBudget)
    } else if budget.spent >= near_limit {
        Some(BudgetState::NearLimit)
    } else {
        Some(BudgetState::WithinLimit)
    }
}

pub fn budget_state(budget: &Budget) -> BudgetState {
    classify(budget).unwrap_or(BudgetState::WithinLimit)
}

pub fn evaluate(budget: &Budget) -> Option<NotificationEvent> {
    let spent = format_currency(budget.spent);
    let total = format_currency(budget.total);

    let (title, body, description, priority) = match classify(budget)? {
        BudgetState::WithinLimit => return None,
        BudgetState::OverBudget => {
            let overage = format_currency((budget.spent - budget.total).abs());
            (
                "Budget Exceeded",
                format!(
                    "You have exceeded your {} budget by {}",
                    budget.name, overage
                ),
                format!(
                    "You have spent {} of your {} {} budget, which is {} over the limit.",
                    spent, total, budget.name, overage
                ),
                Priority::High,
            )
        }
        BudgetState::NearLimit => {
            // spent <= total here, so the ratio fits
            let used = percentage(budget)?
                .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
            let remaining = format_currency(budget.total - budget.spent);
            (
                "Budget Warning",
                format!(
                    "You have used {:.0}% of your {} budget",
                    used, budget.name
                ),
                format!(
                    "You have spent {} of your {} {} budget. {} remaining.",
                    spent, total, budget.name, remaining
                ),
                Priority::Normal,
            )
        }
    };

    Some(NotificationEvent {
        title: title.to_string(),
        body,
        description,
        notification_type: NotificationType::BudgetAlert,
        priority,
        user_id: budget.user_id.clone(),
        budget_id: Some(budget.id.clone()),
    })
}

/// Formats an amount as dollars with thousands separators, e.g. `$10,500.00`.
pub fn format_currency(amount: Decimal) -> String {
    let rounded = amount
        .abs()
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let text = format!("{:.2}", rounded);
    let (whole, cents) = text.split_once('.').unwrap_or((text.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (index, digit) in whole.chars().enumerate() {
        if index > 0 && (whole.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if amount.is_sign_negative() && !rounded.is_zero() {
        "-"
    } else {
        ""
    };
    format!("{sign}${grouped}.{cents}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn budget(total: Decimal, spent: Decimal) -> Budget {
        Budget {
            id: "1".to_string(),
            user_id: Some("user-7".to_string()),
            name: "Groceries".to_string(),
            total,
            spent,
        }
    }

    #[test]
    fn near_limit_budget_warns_with_normal_priority() {
        let event = evaluate(&budget(dec!(10000), dec!(9900))).expect("event");
        assert_eq!(event.priority, Priority::Normal);
        assert_eq!(event.title, "Budget Warning");
        assert!(event.body.contains("99%"));
        assert!(event.description.contains("$100.00 remaining"));
        assert_eq!(event.notification_type, NotificationType::BudgetAlert);
    }

    #[test]
    fn over_budget_reports_overage() {
        let event = evaluate(&budget(dec!(10000), dec!(10500))).expect("event");
        assert_eq!(event.priority, Priority::High);
        assert_eq!(event.title, "Budget Exceeded");
        assert!(event.body.contains("500.00"));
        assert!(event.description.contains("$10,500.00"));
        assert!(event.description.contains("$10,000.00"));
    }

    #[test]
    fn low_spend_produces_no_event() {
        assert!(evaluate(&budget(dec!(10000), dec!(100))).is_none());
    }

    #[test]
    fn bands_follow_canonical_thresholds() {
        assert!(evaluate(&budget(dec!(100), dec!(79.99))).is_none());
        assert_eq!(
            evaluate(&budget(dec!(100), dec!(80))).map(|e| e.priority),
            Some(Priority::Normal)
        );
        assert_eq!(
            evaluate(&budget(dec!(100), dec!(100))).map(|e| e.title),
            Some("Budget Warning".to_string())
        );
        assert_eq!(
            evaluate(&budget(dec!(100), dec!(100.01))).map(|e| e.priority),
            Some(Priority::High)
        );
    }

    #[test]
    fn summed_cents_landing_on_the_limit_are_a_warning() {
        let spent = dec!(0.1) + dec!(0.2);
        let event = evaluate(&budget(dec!(0.3), spent)).expect("event");
        assert_eq!(event.title, "Budget Warning");
        assert_eq!(event.priority, Priority::Normal);
        assert!(event.body.contains("100%"));
        assert!(event.description.contains("$0.00 remaining"));
    }

    #[test]
    fn unset_limits_never_notify() {
        assert!(evaluate(&budget(Decimal::ZERO, dec!(50))).is_none());
        assert!(evaluate(&budget(dec!(-10), dec!(50))).is_none());
        assert_eq!(budget_state(&budget(Decimal::ZERO, dec!(50))), BudgetState::WithinLimit);
        assert_eq!(percentage(&budget(Decimal::ZERO, dec!(50))), None);
    }

    #[test]
    fn huge_spend_is_still_over_budget() {
        let event = evaluate(&budget(dec!(0.01), Decimal::MAX)).expect("event");
        assert_eq!(event.priority, Priority::High);
        assert_eq!(percentage(&budget(dec!(0.01), Decimal::MAX)), None);
    }

    #[test]
    fn correlation_ids_are_carried_through() {
        let event = evaluate(&budget(dec!(200), dec!(190))).expect("event");
        assert_eq!(event.user_id.as_deref(), Some("user-7"));
        assert_eq!(event.budget_id.as_deref(), Some("1"));
    }

    #[test]
    fn evaluation_is_deterministic() {
        let snapshot = budget(dec!(250), dec!(300));
        assert_eq!(evaluate(&snapshot), evaluate(&snapshot));
    }

    #[test]
    fn currency_groups_thousands() {
        assert_eq!(format_currency(Decimal::ZERO), "$0.00");
        assert_eq!(format_currency(dec!(500)), "$500.00");
        assert_eq!(format_currency(dec!(1234567.891)), "$1,234,567.89");
        assert_eq!(format_currency(dec!(-42.5)), "-$42.50");
        assert_eq!(format_currency(dec!(1.005)), "$1.01");
    }
}
