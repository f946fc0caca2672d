use serde::Serialize;

/// Owning team for an issue category. Unmatched categories land on
/// general support.
pub fn team_for_category(category: &str) -> &'static str {
    match category {
        "password_reset" => "account_team",
        "billing" => "finance_team",
        "order" => "order_fullfillment_team",
        "bug_report" => "engineering_team",
        "feature_question" => "product_team",
        "performance" => "infrastructure_team",
        "security" => "security_team",
        _ => "general_support",
    }
}

/// Promised first-response time in hours. Unmatched priorities get the
/// low-priority window.
pub fn sla_hours(priority: &str) -> u32 {
    match priority {
        "critical" => 1,
        "high" => 4,
        "medium" => 8,
        "low" => 24,
        _ => 24,
    }
}

/// Who a team escalates to when they cannot resolve the issue.
pub fn escalation_path(team: &str) -> &'static str {
    match team {
        "account_team" => "customer_success_manager",
        "finance_team" => "finance_director",
        "engineering_team" => "engineering_lead",
        "product_team" => "product_manager",
        "integration_team" => "technical_architect",
        "infrastructure_team" => "sre_lead",
        "security_team" => "security_officer",
        "general_support" => "support_manager",
        _ => "support_manager",
    }
}

fn title_case(team: &str) -> String {
    team.split('_')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Full routing outcome for one category/priority pair.
#[derive(Debug, Clone, Serialize)]
pub struct RouteDecision {
    pub team: String,
    pub team_description: String,
    pub sla_hours: u32,
    pub escalation_path: String,
    pub urgency_note: Option<String>,
}

/// Table lookups only; total over all inputs, never fails.
pub fn route(category: &str, priority: &str) -> RouteDecision {
    let team = team_for_category(category);
    let hours = sla_hours(priority);

    let urgency_note = if priority == "critical" || priority == "high" {
        Some(format!(
            "This is a {priority} priority issue - team will be notified immediately"
        ))
    } else {
        None
    };

    RouteDecision {
        team: team.to_string(),
        team_description: format!("The {} handles {category} issues", title_case(team)),
        sla_hours: hours,
        escalation_path: escalation_path(team).to_string(),
        urgency_note,
    }
}
