//! Placeholder substitution for reminder templates
//!
//! Patterns contain `{{key}}` tokens. Known keys are replaced by their value,
//! unknown tokens are left exactly as written, and substituted values are
//! never scanned again (a client named `{{org_name}}` stays literal).

use std::collections::BTreeMap;

/// Values available to reminder templates
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderContext {
    pub client_name: String,
    pub client_company: String,
    pub invoice_number: String,
    /// Already formatted, see [`format_amount`]
    pub amount: String,
    pub due_date: String,
    pub org_name: String,
}

impl RenderContext {
    /// Placeholder name to value
    pub fn values(&self) -> BTreeMap<&'static str, &str> {
        BTreeMap::from([
            ("client_name", self.client_name.as_str()),
            ("client_company", self.client_company.as_str()),
            ("invoice_number", self.invoice_number.as_str()),
            ("amount", self.amount.as_str()),
            ("due_date", self.due_date.as_str()),
            ("org_name", self.org_name.as_str()),
        ])
    }
}

/// Renders a subject or body pattern
pub fn render(pattern: &str, context: &RenderContext) -> String {
    substitute(pattern, &context.values())
}

/// Replaces each `{{key}}` found in `values`, in one left-to-right pass
pub fn substitute(pattern: &str, values: &BTreeMap<&str, &str>) -> String {
    let mut out = String::with_capacity(pattern.len());
    let mut rest = pattern;

    while let Some(open) = rest.find("{{") {
        out.push_str(&rest[..open]);
        let after_open = &rest[open + 2..];

        let Some(close) = after_open.find("}}") else {
            rest = &rest[open..];
            break;
        };

        match values.get(&after_open[..close]) {
            Some(value) => {
                out.push_str(value);
                rest = &after_open[close + 2..];
            }
            None => {
                out.push_str("{{");
                rest = after_open;
            }
        }
    }

    out.push_str(rest);
    out
}

/// Formats minor currency units as `"<CURRENCY> <units>.<cents>"`
///
/// Integer arithmetic only, so large amounts never lose a cent.
///
/// ```
/// use nudgepay_shared::reminders::render::format_amount;
///
/// assert_eq!(format_amount(125_000, "usd"), "USD 1250.00");
/// assert_eq!(format_amount(-5, "eur"), "EUR -0.05");
/// ```
pub fn format_amount(amount_cents: i64, currency: &str) -> String {
    let sign = if amount_cents < 0 { "-" } else { "" };
    let abs = amount_cents.unsigned_abs();
    format!(
        "{} {}{}.{:02}",
        currency.trim().to_uppercase(),
        sign,
        abs / 100,
        abs % 100
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> RenderContext {
        RenderContext {
            client_name: "Jamie Client".to_string(),
            client_company: "Jamie Co".to_string(),
            invoice_number: "INV-100".to_string(),
            amount: "USD 1250.00".to_string(),
            due_date: "2025-03-01T00:00:00Z".to_string(),
            org_name: "Studio One".to_string(),
        }
    }

    #[test]
    fn test_render_replaces_every_occurrence() {
        let out = render(
            "{{invoice_number}} / {{invoice_number}} for {{client_name}} at {{client_company}}",
            &context(),
        );
        assert_eq!(out, "INV-100 / INV-100 for Jamie Client at Jamie Co");
    }

    #[test]
    fn test_render_leaves_unknown_placeholders() {
        let out = render("Hi {{client_name}}, ref {{po_number}}", &context());
        assert_eq!(out, "Hi Jamie Client, ref {{po_number}}");
    }

    #[test]
    fn test_render_does_not_rescan_values() {
        let mut ctx = context();
        ctx.client_name = "{{org_name}}".to_string();
        assert_eq!(render("{{client_name}}", &ctx), "{{org_name}}");
    }

    #[test]
    fn test_render_handles_unbalanced_braces() {
        assert_eq!(render("open {{ only", &context()), "open {{ only");
        assert_eq!(render("{{ {{org_name}}", &context()), "{{ Studio One");
        assert_eq!(render("}} {{amount}}", &context()), "}} USD 1250.00");
    }

    #[test]
    fn test_render_empty_and_plain_patterns() {
        assert_eq!(render("", &context()), "");
        assert_eq!(render("no tokens here", &context()), "no tokens here");
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(125_000, "usd"), "USD 1250.00");
        assert_eq!(format_amount(7, "gbp"), "GBP 0.07");
        assert_eq!(format_amount(0, "USD"), "USD 0.00");
        assert_eq!(format_amount(-1999, "usd"), "USD -19.99");
        assert_eq!(format_amount(i64::MIN, "usd"), "USD -92233720368547758.08");
    }
}
