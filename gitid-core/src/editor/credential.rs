//! Per-identity credential files
//!
//! A credential file is a tiny Git config fragment holding one `[user]`
//! section, included by the managed section when the working directory
//! matches:
//!
//! ```text
//! [user]
//!     name = John Doe
//!     email = john@co.com
//! ```

/// The author fields stored in a credential file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub display_name: String,
    pub email: String,
}

/// Field missing from a credential file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MissingKey(pub &'static str);

impl Credential {
    pub fn new(display_name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            email: email.into(),
        }
    }

    /// File contents for this credential
    pub fn render(&self) -> String {
        format!(
            "[user]\n    name = {}\n    email = {}\n",
            quote(&self.display_name),
            quote(&self.email)
        )
    }

    /// Read `user.name` and `user.email` from credential file contents
    ///
    /// Keys and section names are case-insensitive as in Git; the last
    /// occurrence of a key wins. Other sections and keys are ignored.
    pub fn parse(text: &str) -> Result<Self, MissingKey> {
        let mut in_user = false;
        let mut display_name = None;
        let mut email = None;

        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }
            if let Some(section) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
                in_user = section.trim().eq_ignore_ascii_case("user");
                continue;
            }
            if !in_user {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            match key.trim().to_ascii_lowercase().as_str() {
                "name" => display_name = Some(unquote(value)),
                "email" => email = Some(unquote(value)),
                _ => {}
            }
        }

        Ok(Self {
            display_name: display_name.ok_or(MissingKey("name"))?,
            email: email.ok_or(MissingKey("email"))?,
        })
    }
}

/// Quote a value when Git would otherwise misread it
fn quote(value: &str) -> String {
    let needs_quotes = value != value.trim()
        || value.contains(['#', ';', '"', '\\']);
    if !needs_quotes {
        return value.to_string();
    }

    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        if c == '"' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out
}

/// Inverse of [`quote`]; unquoted values end at a comment character
fn unquote(raw: &str) -> String {
    let raw = raw.trim();
    if let Some(inner) = raw.strip_prefix('"').and_then(|r| r.strip_suffix('"')) {
        let mut out = String::with_capacity(inner.len());
        let mut chars = inner.chars();
        while let Some(c) = chars.next() {
            if c == '\\' {
                if let Some(escaped) = chars.next() {
                    out.push(escaped);
                }
            } else {
                out.push(c);
            }
        }
        return out;
    }

    let end = raw.find(['#', ';']).unwrap_or(raw.len());
    raw[..end].trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_plain() {
        let credential = Credential::new("John Doe", "john@co.com");
        assert_eq!(
            credential.render(),
            "[user]\n    name = John Doe\n    email = john@co.com\n"
        );
    }

    #[test]
    fn test_parse_rendered() {
        let credential = Credential::new("Jane \"JD\" Doe #2", "jane@co.com");
        assert_eq!(Credential::parse(&credential.render()), Ok(credential));
    }

    #[test]
    fn test_parse_git_written_file() {
        let text = "# written by git config\n[core]\n\tname = not-me\n[User]\n\tName = John Doe ; comment\n\temail=john@co.com\n";
        let credential = Credential::parse(text).unwrap();
        assert_eq!(credential.display_name, "John Doe");
        assert_eq!(credential.email, "john@co.com");
    }

    #[test]
    fn test_parse_missing_email() {
        assert_eq!(
            Credential::parse("[user]\n    name = John Doe\n"),
            Err(MissingKey("email"))
        );
        assert_eq!(Credential::parse(""), Err(MissingKey("name")));
    }
}
