//! Lead extraction from unstructured text.
//!
//! Pasted contact lists, OCR output and exported spreadsheet rows rarely
//! keep a name, a phone and an e-mail on one line. Every phone number and
//! e-mail address found is treated as an anchor; the fields it lacks are
//! borrowed from the closest lines within a small window (same line first,
//! then one line above, one below, two above, ...). The resulting leads are
//! deduplicated by phone number, else by e-mail.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// One candidate contact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lead {
    pub name: Option<String>,
    /// Digits only, country code 55 removed.
    pub phone: Option<String>,
    pub email: Option<String>,
    /// 1-indexed line of the anchor that produced this lead.
    pub line: usize,
}

impl Lead {
    fn has_phone(&self, phone: &str) -> bool {
        self.phone.as_deref() == Some(phone)
    }

    fn has_email(&self, email: &str) -> bool {
        self.email.as_deref().is_some_and(|e| e.eq_ignore_ascii_case(email))
    }

    fn absorb(&mut self, other: Lead) {
        if self.name.is_none() {
            self.name = other.name;
        }
        if self.phone.is_none() {
            self.phone = other.phone;
        }
        if self.email.is_none() {
            self.email = other.email;
        }
    }
}

/// Fold `lead` into `leads`: merge with the lead sharing its phone, else its
/// e-mail, else append. A key already held by another lead is not copied, so
/// no phone or e-mail ever appears on two leads.
fn merge_lead(leads: &mut Vec<Lead>, mut lead: Lead) {
    let by_phone = lead
        .phone
        .as_deref()
        .and_then(|p| leads.iter().position(|l| l.has_phone(p)));
    let by_email = || {
        lead.email
            .as_deref()
            .and_then(|e| leads.iter().position(|l| l.has_email(e)))
    };
    let Some(at) = by_phone.or_else(by_email) else {
        leads.push(lead);
        return;
    };

    let email_taken = lead.email.as_deref().is_some_and(|e| {
        leads.iter().enumerate().any(|(j, l)| j != at && l.has_email(e))
    });
    if email_taken {
        lead.email = None;
    }
    let phone_taken = lead.phone.as_deref().is_some_and(|p| {
        leads.iter().enumerate().any(|(j, l)| j != at && l.has_phone(p))
    });
    if phone_taken {
        lead.phone = None;
    }
    leads[at].absorb(lead);
}

/// Proximity-based extractor; `window` is the farthest line distance a
/// missing field is borrowed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeadExtractor {
    pub window: usize,
}

impl Default for LeadExtractor {
    fn default() -> Self {
        Self { window: 2 }
    }
}

/// Extract leads with the default window of 2 lines.
pub fn extract_leads(text: &str) -> Vec<Lead> {
    LeadExtractor::default().extract(text)
}

static RE_EMAIL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9-]+(?:\.[A-Za-z0-9-]+)*\.[A-Za-z]{2,}").unwrap());

static RE_PHONE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\+?\(?\d(?:[ \t().-]{0,2}\d){7,16}").unwrap());

static RE_LABEL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*(?:nome|name|cliente|client|contato|contact|lead|responsável|responsavel)\s*[:\-]\s*")
        .unwrap()
});

static RE_CELL_SPLIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"[,;\t|]+").unwrap());

const NAME_PARTICLES: [&str; 7] = ["da", "de", "do", "das", "dos", "e", "di"];

/// What one line contributes.
#[derive(Debug, Default)]
struct LineHits {
    phones: Vec<String>,
    emails: Vec<String>,
    name: Option<String>,
}

impl LineHits {
    fn has_contact(&self) -> bool {
        !self.phones.is_empty() || !self.emails.is_empty()
    }
}

impl LeadExtractor {
    pub fn new(window: usize) -> Self {
        Self { window }
    }

    pub fn extract(&self, text: &str) -> Vec<Lead> {
        let hits: Vec<LineHits> = text.lines().map(scan_line).collect();
        let mut leads: Vec<Lead> = Vec::new();

        for (i, line) in hits.iter().enumerate() {
            let anchors = line.phones.len().max(line.emails.len());
            for k in 0..anchors {
                let phone = line
                    .phones
                    .get(k)
                    .cloned()
                    .or_else(|| self.nearest(&hits, i, |h| h.phones.first().cloned()));
                let email = line
                    .emails
                    .get(k)
                    .cloned()
                    .or_else(|| self.nearest(&hits, i, |h| h.emails.first().cloned()));
                let name = line.name.clone().or_else(|| {
                    self.nearest(&hits, i, |h| h.name.clone().filter(|_| !h.has_contact()))
                });
                let lead = Lead {
                    name,
                    phone,
                    email,
                    line: i + 1,
                };
                merge_lead(&mut leads, lead);
            }
        }
        leads
    }

    /// First value `f` yields scanning outward from line `i`, above first.
    fn nearest<T>(&self, hits: &[LineHits], i: usize, f: impl Fn(&LineHits) -> Option<T>) -> Option<T> {
        for d in 1..=self.window {
            if let Some(above) = i.checked_sub(d) {
                if let Some(v) = f(&hits[above]) {
                    return Some(v);
                }
            }
            if let Some(below) = hits.get(i + d) {
                if let Some(v) = f(below) {
                    return Some(v);
                }
            }
        }
        None
    }
}

fn scan_line(line: &str) -> LineHits {
    let mut hits = LineHits::default();

    for m in RE_EMAIL.find_iter(line) {
        hits.emails.push(m.as_str().to_ascii_lowercase());
    }
    // Mask e-mails so their digits are not read as phones.
    let rest = RE_EMAIL.replace_all(line, " , ");

    for m in RE_PHONE.find_iter(&rest) {
        if let Some(phone) = normalise_phone(m.as_str()) {
            hits.phones.push(phone);
        }
    }
    let rest = RE_PHONE.replace_all(&rest, " , ");

    hits.name = RE_CELL_SPLIT.split(&rest).find_map(person_name);
    hits
}

/// Digits of a phone number, or `None` if it is not a plausible phone.
pub fn normalise_phone(raw: &str) -> Option<String> {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    let digits = match digits.len() {
        12 | 13 if digits.starts_with("55") => digits[2..].to_string(),
        _ => digits,
    };
    (8..=15).contains(&digits.len()).then_some(digits)
}

/// A cleaned person name if `cell` looks like one: 2 to 5 capitalised words,
/// no digits, label prefixes removed.
fn person_name(cell: &str) -> Option<String> {
    let cell = RE_LABEL.replace(cell, "");
    let cell = cell.trim_matches(|c: char| c.is_whitespace() || ":-–—.()[]\"'".contains(c));
    if cell.is_empty() || cell.chars().any(|c| c.is_ascii_digit() || c == '@') {
        return None;
    }
    let words: Vec<&str> = cell.split_whitespace().collect();
    if !(2..=5).contains(&words.len()) {
        return None;
    }
    let capitalised = words.iter().all(|w| {
        NAME_PARTICLES.contains(&w.to_lowercase().as_str())
            || w.chars().next().is_some_and(char::is_uppercase)
    });
    let letters = words
        .iter()
        .all(|w| w.chars().all(|c| c.is_alphabetic() || c == '\'' || c == '-' || c == '.'));
    (capitalised && letters).then(|| words.join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phones_are_normalised() {
        assert_eq!(normalise_phone("(11) 98765-4321").as_deref(), Some("11987654321"));
        assert_eq!(normalise_phone("+55 11 98765-4321").as_deref(), Some("11987654321"));
        assert_eq!(normalise_phone("+55 11 3456-7890").as_deref(), Some("1134567890"));
        assert_eq!(normalise_phone("1234567").as_deref(), None);
        assert_eq!(normalise_phone("1234567890123456").as_deref(), None);
    }

    #[test]
    fn single_line_lead() {
        let leads = extract_leads("João da Silva - (11) 98765-4321 - joao.silva@exemplo.com.br");
        assert_eq!(
            leads,
            vec![Lead {
                name: Some("João da Silva".into()),
                phone: Some("11987654321".into()),
                email: Some("joao.silva@exemplo.com.br".into()),
                line: 1,
            }]
        );
    }

    #[test]
    fn vertical_blocks_are_assembled_by_proximity() {
        let text = "Nome: Maria Souza\nTel: +55 (21) 99876-5432\nmaria@empresa.com\n\n\
                    Carlos Pereira\nE-mail: carlos@empresa.com\nCelular 31 91234-5678\n";
        let leads = extract_leads(text);
        assert_eq!(leads.len(), 2, "{leads:#?}");

        assert_eq!(leads[0].name.as_deref(), Some("Maria Souza"));
        assert_eq!(leads[0].phone.as_deref(), Some("21998765432"));
        assert_eq!(leads[0].email.as_deref(), Some("maria@empresa.com"));

        assert_eq!(leads[1].name.as_deref(), Some("Carlos Pereira"));
        assert_eq!(leads[1].phone.as_deref(), Some("31912345678"));
        assert_eq!(leads[1].email.as_deref(), Some("carlos@empresa.com"));
    }

    #[test]
    fn spreadsheet_rows_stay_separate() {
        let text = "nome;telefone;email\n\
                    Ana Lima;11 91111-2222;ana@x.com\n\
                    Bruno Costa;11 93333-4444;bruno@x.com\n";
        let leads = extract_leads(text);
        assert_eq!(leads.len(), 2);
        assert_eq!(leads[0].name.as_deref(), Some("Ana Lima"));
        assert_eq!(leads[1].name.as_deref(), Some("Bruno Costa"));
        assert_eq!(leads[1].line, 3);
    }

    #[test]
    fn duplicates_merge_missing_fields() {
        let text = "Ana Lima 11 91111-2222\n\n\n\n\nana@x.com 5511911112222";
        let leads = extract_leads(text);
        assert_eq!(leads.len(), 1);
        assert_eq!(leads[0].email.as_deref(), Some("ana@x.com"));
        assert_eq!(leads[0].name.as_deref(), Some("Ana Lima"));
        assert_eq!(leads[0].line, 1);
    }

    #[test]
    fn merged_leads_never_share_an_email() {
        // The last line repeats Ana's phone and borrows Bruno's e-mail from
        // the line above; Ana's lead must not take that e-mail.
        let text = "Ana Lima 11 91111-2222\n\n\n\n\
                    Bruno Costa 11 93333-4444 bruno@x.com\n\
                    11 91111-2222";
        let leads = extract_leads(text);
        assert_eq!(leads.len(), 2, "{leads:#?}");
        assert_eq!(leads[0].name.as_deref(), Some("Ana Lima"));
        assert_eq!(leads[0].phone.as_deref(), Some("11911112222"));
        assert_eq!(leads[0].email, None);
        assert_eq!(leads[1].name.as_deref(), Some("Bruno Costa"));
        assert_eq!(leads[1].email.as_deref(), Some("bruno@x.com"));
    }

    #[test]
    fn dedup_by_email_ignores_case() {
        let leads = extract_leads("ANA@X.COM\n\n\n\n\nana@x.com");
        assert_eq!(leads.len(), 1);
    }

    #[test]
    fn window_limits_borrowing() {
        let text = "Ana Lima\n\n\n11 91111-2222";
        assert_eq!(LeadExtractor::new(2).extract(text)[0].name, None);
        assert_eq!(
            LeadExtractor::new(3).extract(text)[0].name.as_deref(),
            Some("Ana Lima")
        );
    }

    #[test]
    fn dates_and_short_numbers_are_not_phones() {
        assert!(extract_leads("Reunião em 17/10/2026 às 14:30, sala 204").is_empty());
    }

    #[test]
    fn names_need_capitalised_words() {
        assert_eq!(person_name("maria souza"), None);
        assert_eq!(person_name("Maria"), None);
        assert_eq!(person_name("Name: Ana de Lima").as_deref(), Some("Ana de Lima"));
        assert_eq!(person_name("Rua 7 Setembro"), None);
    }
}
