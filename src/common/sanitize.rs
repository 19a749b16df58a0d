// src/common/sanitize.rs

// Input sanitization applied by `ValidatedJson` before validation runs.
pub trait Sanitize {
    fn sanitize(&mut self);
}

/// Trims, drops control characters and angle brackets.
pub fn clean_text(value: &str) -> String {
    value
        .trim()
        .chars()
        .filter(|c| !c.is_control() || *c == '\n')
        .filter(|c| *c != '<' && *c != '>')
        .collect::<String>()
        .trim()
        .to_string()
}

pub fn clean_string(value: &mut String) {
    *value = clean_text(value);
}

// Empty optional strings become None so "" never reaches the database.
pub fn clean_opt(value: &mut Option<String>) {
    if let Some(v) = value.take() {
        let cleaned = clean_text(&v);
        if !cleaned.is_empty() {
            *value = Some(cleaned);
        }
    }
}

pub fn clean_email(value: &mut String) {
    *value = clean_text(value).to_lowercase();
}

pub fn clean_opt_email(value: &mut Option<String>) {
    clean_opt(value);
    if let Some(v) = value.as_mut() {
        *v = v.to_lowercase();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_markup_and_whitespace() {
        assert_eq!(clean_text("  <b>Silk Kurta</b>  "), "bSilk Kurta/b");
        assert_eq!(clean_text("\u{0007}Cotton\t"), "Cotton");
    }

    #[test]
    fn keeps_newlines_inside_notes() {
        assert_eq!(clean_text("line one\nline two"), "line one\nline two");
    }

    #[test]
    fn empty_optional_becomes_none() {
        let mut v = Some("   ".to_string());
        clean_opt(&mut v);
        assert!(v.is_none());

        let mut v = Some(" note ".to_string());
        clean_opt(&mut v);
        assert_eq!(v.as_deref(), Some("note"));
    }

    #[test]
    fn emails_are_lowercased() {
        let mut email = "  Owner@Shop.IN ".to_string();
        clean_email(&mut email);
        assert_eq!(email, "owner@shop.in");

        let mut opt = Some("A@B.COM".to_string());
        clean_opt_email(&mut opt);
        assert_eq!(opt.as_deref(), Some("a@b.com"));
    }
}
