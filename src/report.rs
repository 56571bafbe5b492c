use std::fmt::Write;

use rust_decimal::Decimal;

use crate::evaluator::{self, format_currency};
use crate::models::{Budget, BudgetState, BudgetStateSummary, NotificationRecord};

pub fn summarize_by_state(budgets: &[Budget]) -> Vec<BudgetStateSummary> {
    let mut map: std::collections::HashMap<BudgetState, (usize, Decimal)> =
        std::collections::HashMap::new();

    for budget in budgets {
        let entry = map
            .entry(evaluator::budget_state(budget))
            .or_insert((0, Decimal::ZERO));
        entry.0 += 1;
        entry.1 += budget.spent;
    }

    let mut summaries: Vec<BudgetStateSummary> = map
        .into_iter()
        .map(|(state, (count, total_spent))| BudgetStateSummary {
            state,
            count,
            total_spent,
        })
        .collect();

    summaries.sort_by(|a, b| b.count.cmp(&a.count).then(a.state.label().cmp(b.state.label())));
    summaries
}

pub fn build_report(
    user_id: Option<&str>,
    budgets: &[Budget],
    notifications: &[NotificationRecord],
) -> String {
    let summaries = summarize_by_state(budgets);

    let mut output = String::new();
    let scope_label = user_id.unwrap_or("all users");

    let _ = writeln!(output, "# Budget Alert Report");
    let _ = writeln!(output, "Generated for {}", scope_label);
    let _ = writeln!(output);
    let _ = writeln!(output, "## Budget Health");

    if summaries.is_empty() {
        let _ = writeln!(output, "No budgets recorded.");
    } else {
        for summary in summaries.iter() {
            let _ = writeln!(
                output,
                "- {}: {} budgets ({} spent)",
                summary.state.label(),
                summary.count,
                format_currency(summary.total_spent)
            );
        }
    }

    let mut ranked: Vec<(&Budget, Option<Decimal>)> = budgets
        .iter()
        .map(|budget| (budget, evaluator::percentage(budget)))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1));

    let _ = writeln!(output);
    let _ = writeln!(output, "## Budgets Needing Attention");

    let flagged: Vec<_> = ranked
        .iter()
        .filter(|(budget, _)| evaluator::budget_state(budget) != BudgetState::WithinLimit)
        .collect();

    if flagged.is_empty() {
        let _ = writeln!(output, "All budgets are within limit.");
    } else {
        for (budget, percentage) in flagged.iter().take(10) {
            let _ = writeln!(
                output,
                "- {} ({}) {:.0}% used: {} of {}",
                budget.name,
                evaluator::budget_state(budget).label(),
                percentage.unwrap_or(Decimal::ZERO),
                format_currency(budget.spent),
                format_currency(budget.total)
            );
        }
    }

    let mut recent = notifications.to_vec();
    recent.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    let _ = writeln!(output);
    let _ = writeln!(output, "## Recent Notifications");

    if recent.is_empty() {
        let _ = writeln!(output, "No notifications sent yet.");
    } else {
        for record in recent.iter().take(5) {
            let _ = writeln!(
                output,
                "- [{}] {} on {}: {}{}",
                record.priority,
                record.title,
                record.created_at.format("%Y-%m-%d %H:%M"),
                record.body,
                if record.is_read { "" } else { " (unread)" }
            );
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NotificationEvent;
    use chrono::{Duration, Utc};
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn budget(id: &str, total: Decimal, spent: Decimal) -> Budget {
        Budget {
            id: id.to_string(),
            user_id: Some("avery".to_string()),
            name: id.to_string(),
            total,
            spent,
        }
    }

    #[test]
    fn summaries_group_budgets_by_state() {
        let budgets = vec![
            budget("Rent", dec!(1000), dec!(100)),
            budget("Food", dec!(1000), dec!(200)),
            budget("Fun", dec!(100), dec!(150)),
        ];

        let summaries = summarize_by_state(&budgets);
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].state, BudgetState::WithinLimit);
        assert_eq!(summaries[0].count, 2);
        assert_eq!(summaries[0].total_spent, dec!(300));
    }

    #[test]
    fn report_lists_flagged_budgets_and_recent_notifications() {
        let budgets = vec![
            budget("Rent", dec!(1000), dec!(100)),
            budget("Travel", dec!(500), dec!(450)),
            budget("Dining", dec!(200), dec!(260)),
        ];
        let event = crate::evaluator::evaluate(&budgets[2]).unwrap();
        let older = NotificationEvent {
            title: "Budget Warning".to_string(),
            ..event.clone()
        };
        let notifications = vec![
            NotificationRecord::from_event(
                Uuid::new_v4(),
                &older,
                Utc::now() - Duration::days(1),
            ),
            NotificationRecord::from_event(Uuid::new_v4(), &event, Utc::now()),
        ];

        let report = build_report(Some("avery"), &budgets, &notifications);
        assert!(report.contains("Generated for avery"));
        assert!(report.contains("- Dining (over budget) 130% used"));
        assert!(report.contains("- Travel (near limit) 90% used"));
        assert!(!report.contains("- Rent ("));

        let exceeded = report.find("[HIGH] Budget Exceeded").unwrap();
        let warning = report.find("Budget Warning on").unwrap();
        assert!(exceeded < warning);
    }

    #[test]
    fn empty_report_says_so() {
        let report = build_report(None, &[], &[]);
        assert!(report.contains("all users"));
        assert!(report.contains("No budgets recorded."));
        assert!(report.contains("No notifications sent yet."));
    }
}
