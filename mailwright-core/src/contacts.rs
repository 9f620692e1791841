//! Contact records and the flat contacts file.
//!
//! The file is CSV with a header row. `email` is required; `name`,
//! `company`, `relationship`, `priority` and `type` are optional. Rows with
//! an empty email are dropped on load.

use std::collections::HashSet;
use std::io;
use std::path::Path;

/// Columns written by [`write_contacts`], in order.
pub const CONTACT_COLUMNS: [&str; 6] = ["email", "name", "company", "relationship", "priority", "type"];

/// One row of the contacts file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactRecord {
    pub email: String,
    pub name: String,
    pub company: String,
    pub relationship: String,
    pub priority: String,
    pub kind: String,
}

/// Display category derived from a contact's `type` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactKind {
    Person,
    Service,
    Notification,
    Unknown,
}

impl ContactKind {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "PERSON" => ContactKind::Person,
            "SERVICE" => ContactKind::Service,
            "NOTIFICATION" => ContactKind::Notification,
            _ => ContactKind::Unknown,
        }
    }

    pub fn icon(self) -> &'static str {
        match self {
            ContactKind::Person => "👤",
            ContactKind::Service => "🔧",
            ContactKind::Notification => "🔔",
            ContactKind::Unknown => "📧",
        }
    }
}

impl ContactRecord {
    pub fn kind(&self) -> ContactKind {
        ContactKind::parse(&self.kind)
    }

    pub fn is_priority(&self) -> bool {
        self.priority == "high"
    }

    /// Company and relationship joined with " · ", skipping empty parts.
    pub fn subtitle(&self) -> String {
        [self.company.as_str(), self.relationship.as_str()]
            .into_iter()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" · ")
    }

    /// Name when present, otherwise the email.
    pub fn label(&self) -> &str {
        if self.name.is_empty() {
            &self.email
        } else {
            &self.name
        }
    }

    /// Text the fuzzy matcher sees: name and email, or the email alone.
    pub fn search_text(&self) -> String {
        if self.name.is_empty() {
            self.email.clone()
        } else {
            format!("{} {}", self.name, self.email)
        }
    }
}

/// Load contacts from `path`. A missing file yields an empty list.
pub fn load_contacts(path: &Path) -> io::Result<Vec<ContactRecord>> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };
    Ok(parse_contacts(&text))
}

/// Parse contacts CSV text.
pub fn parse_contacts(text: &str) -> Vec<ContactRecord> {
    let mut rows = parse_csv(text).into_iter();
    let Some(header) = rows.next() else {
        return Vec::new();
    };
    let column = |name: &str| header.iter().position(|h| h.trim() == name);
    let (email_col, name_col, company_col, rel_col, prio_col, type_col) = (
        column("email"),
        column("name"),
        column("company"),
        column("relationship"),
        column("priority"),
        column("type"),
    );
    let Some(email_col) = email_col else {
        return Vec::new();
    };
    let field = |row: &[String], col: Option<usize>| {
        col.and_then(|c| row.get(c))
            .map(|v| v.trim().to_string())
            .unwrap_or_default()
    };

    // First row wins when an address repeats in any letter case.
    let mut seen = HashSet::new();
    rows.filter_map(|row| {
        let email = field(&row[..], Some(email_col));
        if email.is_empty() || !seen.insert(email.to_lowercase()) {
            return None;
        }
        Some(ContactRecord {
            email,
            name: field(&row[..], name_col),
            company: field(&row[..], company_col),
            relationship: field(&row[..], rel_col),
            priority: field(&row[..], prio_col),
            kind: field(&row[..], type_col),
        })
    })
    .collect()
}

/// Write contacts as CSV with the [`CONTACT_COLUMNS`] header.
pub fn write_contacts(path: &Path, contacts: &[ContactRecord]) -> io::Result<()> {
    let mut csv = CONTACT_COLUMNS.join(",");
    csv.push('\n');
    for c in contacts {
        let fields = [
            &c.email,
            &c.name,
            &c.company,
            &c.relationship,
            &c.priority,
            &c.kind,
        ];
        let line: Vec<String> = fields.iter().map(|f| escape_field(f)).collect();
        csv.push_str(&line.join(","));
        csv.push('\n');
    }
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, csv)
}

fn escape_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Minimal RFC 4180 reader: quoted fields, doubled quotes, CRLF.
fn parse_csv(text: &str) -> Vec<Vec<String>> {
    let mut rows = Vec::new();
    let mut row = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    field.push('"');
                    chars.next();
                }
                '"' => in_quotes = false,
                _ => field.push(c),
            }
            continue;
        }
        match c {
            '"' => in_quotes = true,
            ',' => row.push(std::mem::take(&mut field)),
            '\r' => {}
            '\n' => {
                row.push(std::mem::take(&mut field));
                rows.push(std::mem::take(&mut row));
            }
            _ => field.push(c),
        }
    }
    if !field.is_empty() || !row.is_empty() {
        row.push(field);
        rows.push(row);
    }
    // Blank lines carry no data.
    rows.retain(|r| !(r.len() == 1 && r[0].trim().is_empty()));
    rows
}
