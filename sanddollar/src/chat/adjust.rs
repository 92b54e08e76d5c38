const BUDGET_KEYWORDS: &[&str] = &[
    "budget", "increase", "decrease", "reduce", "allocate", "move", "transfer", "adjust", "change",
];
const AMOUNT_KEYWORDS: &[&str] = &["$", "%", "dollar", "percent", "by"];

/// Whether a chat message reads like a request to change budget amounts.
///
/// Needs a budget verb plus either an amount marker or a "to" target
/// ("move $50 from dining to savings", "change groceries to 400"). Matching is
/// plain substring search.
pub fn is_budget_adjustment_instruction(message: &str) -> bool {
    let lower = message.trim().to_lowercase();
    let has_budget_keyword = BUDGET_KEYWORDS.iter().any(|k| lower.contains(k));
    let has_amount_keyword = AMOUNT_KEYWORDS.iter().any(|k| lower.contains(k));
    has_budget_keyword && (has_amount_keyword || lower.contains("to"))
}
