//! Text-level handling of the managed section
//!
//! Section layout inside the global config file:
//! ```text
//! # GitID Managed Section - Do not edit manually
//! [includeIf "gitdir:/home/john/work/"]
//!     path = /home/john/.gitconfig-gitid-work
//! # End GitID Managed Section
//! ```
//!
//! Everything here works on the file contents as a string and returns new
//! contents; nothing touches the filesystem. Lines are split on `\n` and
//! rejoined the same way, so text outside the markers (including a missing
//! or present final newline and `\r` characters) survives byte for byte.

use std::fmt;

pub const SECTION_START: &str = "# GitID Managed Section - Do not edit manually";
pub const SECTION_END: &str = "# End GitID Managed Section";

/// File name prefix of credential files; the identity name follows it
pub const CREDENTIAL_PREFIX: &str = ".gitconfig-gitid-";

const HEADER_OPEN: &str = "[includeIf \"gitdir:";
const HEADER_CLOSE: &str = "\"]";
const PATH_INDENT: &str = "    ";

/// Line indices of the two markers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionSpan {
    pub start: usize,
    pub end: usize,
}

/// Why a section could not be delimited
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionFault {
    /// Start marker with no end marker after it
    Unterminated,
    /// A second start marker before the end marker
    NestedStart,
}

impl fmt::Display for SectionFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SectionFault::Unterminated => write!(f, "start marker has no matching end marker"),
            SectionFault::NestedStart => write!(f, "start marker repeated inside the section"),
        }
    }
}

/// A marker problem at a 1-based line number
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Malformed {
    pub line: usize,
    pub fault: SectionFault,
}

/// One line inside the section, classified
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryLine<'a> {
    /// `[includeIf "gitdir:<prefix>"]`, prefix without trailing separator
    Header(&'a str),
    /// `path = .../.gitconfig-gitid-<name>`
    Include { name: &'a str },
    /// Blank lines and anything else
    Other,
}

/// Paths collected up to one include line, in file order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncludeGroup {
    pub name: String,
    pub paths: Vec<String>,
}

/// Find the managed section with one forward scan
///
/// End markers before the first start marker are ignored. A start marker
/// without an end marker is an error; end of file is never taken as an
/// implicit end.
pub fn locate(lines: &[&str]) -> Result<Option<SectionSpan>, Malformed> {
    let mut start = None;

    for (index, line) in lines.iter().enumerate() {
        let trimmed = line.trim();
        match start {
            None if trimmed == SECTION_START => start = Some(index),
            None => {}
            Some(start) if trimmed == SECTION_END => {
                return Ok(Some(SectionSpan { start, end: index }));
            }
            Some(_) if trimmed == SECTION_START => {
                return Err(Malformed {
                    line: index + 1,
                    fault: SectionFault::NestedStart,
                });
            }
            Some(_) => {}
        }
    }

    match start {
        Some(start) => Err(Malformed {
            line: start + 1,
            fault: SectionFault::Unterminated,
        }),
        None => Ok(None),
    }
}

/// Classify a single line from inside the section
pub fn classify(line: &str) -> EntryLine<'_> {
    let trimmed = line.trim();

    if let Some(prefix) = trimmed
        .strip_prefix(HEADER_OPEN)
        .and_then(|rest| rest.strip_suffix(HEADER_CLOSE))
    {
        let prefix = match prefix.strip_suffix('/') {
            Some(stripped) if !stripped.is_empty() => stripped,
            _ => prefix,
        };
        return EntryLine::Header(prefix);
    }

    if let Some((key, value)) = trimmed.split_once('=') {
        if key.trim() == "path" {
            let file_name = value
                .trim()
                .rsplit(|c: char| c == '/' || c == '\\')
                .next()
                .unwrap_or("");
            if let Some(name) = file_name.strip_prefix(CREDENTIAL_PREFIX) {
                if !name.is_empty() {
                    return EntryLine::Include { name };
                }
            }
        }
    }

    EntryLine::Other
}

/// Group the section body into (identity, paths) records
///
/// Header prefixes accumulate until the next include line, which takes all
/// of them. Headers after the last include line are dropped.
pub fn parse_groups(text: &str) -> Result<Vec<IncludeGroup>, Malformed> {
    let lines: Vec<&str> = text.split('\n').collect();
    let Some(span) = locate(&lines)? else {
        return Ok(Vec::new());
    };

    let mut groups = Vec::new();
    let mut pending = Vec::new();
    for line in &lines[span.start + 1..span.end] {
        match classify(line) {
            EntryLine::Header(prefix) => pending.push(prefix.to_string()),
            EntryLine::Include { name } => groups.push(IncludeGroup {
                name: name.to_string(),
                paths: std::mem::take(&mut pending),
            }),
            EntryLine::Other => {}
        }
    }
    Ok(groups)
}

/// Header and path lines for one identity, one pair per prefix
pub fn render_entries(prefixes: &[String], credential_path: &str) -> Vec<String> {
    prefixes
        .iter()
        .flat_map(|prefix| {
            [
                format!("{}{}{}", HEADER_OPEN, prefix, HEADER_CLOSE),
                format!("{}path = {}", PATH_INDENT, credential_path),
            ]
        })
        .collect()
}

/// Contents with `entries` appended to the end of the section
///
/// Creates the section at the end of the file when there is none. A new
/// section ends with a line break only if the file did, so collapsing it
/// later gives back the original text.
pub fn append_entries(text: &str, entries: &[String]) -> Result<String, Malformed> {
    let lines: Vec<&str> = text.split('\n').collect();

    match locate(&lines)? {
        Some(span) => {
            let mut out: Vec<&str> = Vec::with_capacity(lines.len() + entries.len());
            out.extend_from_slice(&lines[..span.end]);
            out.extend(entries.iter().map(String::as_str));
            out.extend_from_slice(&lines[span.end..]);
            Ok(out.join("\n"))
        }
        None => {
            let mut block: Vec<&str> = Vec::with_capacity(entries.len() + 2);
            block.push(SECTION_START);
            block.extend(entries.iter().map(String::as_str));
            block.push(SECTION_END);

            let mut out = String::with_capacity(text.len() + 128);
            out.push_str(text);
            if text.is_empty() || text.ends_with('\n') {
                out.push_str(&block.join("\n"));
                out.push('\n');
            } else {
                out.push('\n');
                out.push_str(&block.join("\n"));
            }
            Ok(out)
        }
    }
}

/// Contents with every entry for `name` removed, or `None` if there is none
///
/// An include line is removed together with the header lines collected for
/// it. When no entries remain the markers are removed as well.
pub fn strip_identity(text: &str, name: &str) -> Result<Option<String>, Malformed> {
    let lines: Vec<&str> = text.split('\n').collect();
    let Some(span) = locate(&lines)? else {
        return Ok(None);
    };

    let mut kept: Vec<&str> = Vec::with_capacity(span.end - span.start);
    let mut removed = false;
    for &line in &lines[span.start + 1..span.end] {
        match classify(line) {
            EntryLine::Include { name: owner } if owner == name => {
                while kept
                    .last()
                    .is_some_and(|last| matches!(classify(last), EntryLine::Header(_)))
                {
                    kept.pop();
                }
                removed = true;
            }
            _ => kept.push(line),
        }
    }

    if !removed {
        return Ok(None);
    }

    let mut out: Vec<&str> = Vec::with_capacity(lines.len());
    out.extend_from_slice(&lines[..span.start]);
    if kept.iter().any(|line| !line.trim().is_empty()) {
        out.push(lines[span.start]);
        out.extend(kept);
        out.push(lines[span.end]);
    }
    out.extend_from_slice(&lines[span.end + 1..]);
    Ok(Some(out.join("\n")))
}

#[cfg(test)]
mod tests {
    use super::*;

    const WORK_PATH: &str = "/home/john/.gitconfig-gitid-work";

    fn section(body: &[&str]) -> String {
        let mut lines = vec![SECTION_START];
        lines.extend_from_slice(body);
        lines.push(SECTION_END);
        lines.join("\n") + "\n"
    }

    #[test]
    fn test_locate_absent() {
        assert_eq!(locate(&["[user]", "  name = x"]), Ok(None));
        assert_eq!(locate(&[]), Ok(None));
    }

    #[test]
    fn test_locate_ignores_indentation_and_stray_end() {
        let lines = [SECTION_END, "", "  # GitID Managed Section - Do not edit manually", "x", SECTION_END];
        assert_eq!(locate(&lines), Ok(Some(SectionSpan { start: 2, end: 4 })));
    }

    #[test]
    fn test_locate_unterminated() {
        let lines = ["[core]", SECTION_START, "[includeIf \"gitdir:/w/\"]"];
        assert_eq!(
            locate(&lines),
            Err(Malformed {
                line: 2,
                fault: SectionFault::Unterminated
            })
        );
    }

    #[test]
    fn test_locate_nested_start() {
        let lines = [SECTION_START, SECTION_START, SECTION_END];
        assert_eq!(
            locate(&lines),
            Err(Malformed {
                line: 2,
                fault: SectionFault::NestedStart
            })
        );
    }

    #[test]
    fn test_classify() {
        assert_eq!(
            classify("[includeIf \"gitdir:/home/john/work/\"]"),
            EntryLine::Header("/home/john/work")
        );
        assert_eq!(classify("[includeIf \"gitdir:/\"]"), EntryLine::Header("/"));
        assert_eq!(
            classify("    path = /home/john/.gitconfig-gitid-work"),
            EntryLine::Include { name: "work" }
        );
        assert_eq!(
            classify("\tpath=~/.gitconfig-gitid-oss"),
            EntryLine::Include { name: "oss" }
        );
        assert_eq!(classify("    path = /etc/gitconfig"), EntryLine::Other);
        assert_eq!(classify("    path = /x/.gitconfig-gitid-"), EntryLine::Other);
        assert_eq!(classify(""), EntryLine::Other);
    }

    #[test]
    fn test_parse_groups_pairs() {
        let text = section(&[
            "[includeIf \"gitdir:/home/john/work/\"]",
            "    path = /home/john/.gitconfig-gitid-work",
            "[includeIf \"gitdir:/home/john/oss/\"]",
            "    path = /home/john/.gitconfig-gitid-oss",
        ]);

        let groups = parse_groups(&text).unwrap();
        assert_eq!(
            groups,
            vec![
                IncludeGroup {
                    name: "work".to_string(),
                    paths: vec!["/home/john/work".to_string()],
                },
                IncludeGroup {
                    name: "oss".to_string(),
                    paths: vec!["/home/john/oss".to_string()],
                },
            ]
        );
    }

    #[test]
    fn test_parse_groups_folds_orphan_headers() {
        let text = section(&[
            "[includeIf \"gitdir:/a/\"]",
            "[includeIf \"gitdir:/b/\"]",
            "    path = /h/.gitconfig-gitid-work",
            "[includeIf \"gitdir:/dangling/\"]",
        ]);

        let groups = parse_groups(&text).unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].paths, vec!["/a".to_string(), "/b".to_string()]);
    }

    #[test]
    fn test_parse_groups_without_section() {
        assert!(parse_groups("[user]\n\tname = x\n").unwrap().is_empty());
        assert!(parse_groups("").unwrap().is_empty());
    }

    #[test]
    fn test_render_entries_one_pair_per_prefix() {
        let entries = render_entries(&["/w/".to_string(), "/x/".to_string()], WORK_PATH);
        assert_eq!(
            entries,
            vec![
                "[includeIf \"gitdir:/w/\"]".to_string(),
                format!("    path = {}", WORK_PATH),
                "[includeIf \"gitdir:/x/\"]".to_string(),
                format!("    path = {}", WORK_PATH),
            ]
        );
    }

    #[test]
    fn test_append_creates_section_in_empty_file() {
        let entries = render_entries(&["/home/john/work/".to_string()], WORK_PATH);
        let out = append_entries("", &entries).unwrap();
        assert_eq!(
            out,
            format!(
                "{}\n[includeIf \"gitdir:/home/john/work/\"]\n    path = {}\n{}\n",
                SECTION_START, WORK_PATH, SECTION_END
            )
        );
    }

    #[test]
    fn test_append_after_unterminated_last_line() {
        let out = append_entries("[user]\n\tname = x", &[]).unwrap();
        assert_eq!(
            out,
            format!("[user]\n\tname = x\n{}\n{}", SECTION_START, SECTION_END)
        );
    }

    #[test]
    fn test_strip_restores_missing_final_newline() {
        let original = "[user]\n\tname = x";
        let entries = render_entries(&["/w/".to_string()], WORK_PATH);
        let text = append_entries(original, &entries).unwrap();

        assert_eq!(strip_identity(&text, "work").unwrap(), Some(original.to_string()));
    }

    #[test]
    fn test_append_keeps_surrounding_text() {
        let before = "[core]\r\n\teditor = vim\r\n";
        let after = "[alias]\n\tco = checkout";
        let text = format!(
            "{}{}\n[includeIf \"gitdir:/a/\"]\n    path = /h/.gitconfig-gitid-a\n{}\n{}",
            before, SECTION_START, SECTION_END, after
        );

        let entries = render_entries(&["/b/".to_string()], "/h/.gitconfig-gitid-b");
        let out = append_entries(&text, &entries).unwrap();

        assert!(out.starts_with(before));
        assert!(out.ends_with(&format!("{}\n{}", SECTION_END, after)));
        let groups = parse_groups(&out).unwrap();
        let names: Vec<&str> = groups.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn test_append_refuses_malformed() {
        let text = format!("{}\n[includeIf \"gitdir:/a/\"]\n", SECTION_START);
        assert!(append_entries(&text, &[]).is_err());
    }

    #[test]
    fn test_strip_only_identity_removes_markers() {
        let prefix = "[user]\n\temail = me@home.io\n";
        let entries = render_entries(&["/w/".to_string()], WORK_PATH);
        let text = append_entries(prefix, &entries).unwrap();

        assert_eq!(strip_identity(&text, "work").unwrap(), Some(prefix.to_string()));
    }

    #[test]
    fn test_strip_keeps_other_identities() {
        let text = section(&[
            "[includeIf \"gitdir:/w/\"]",
            "    path = /h/.gitconfig-gitid-work",
            "[includeIf \"gitdir:/w2/\"]",
            "    path = /h/.gitconfig-gitid-work2",
            "[includeIf \"gitdir:/w3/\"]",
            "    path = /h/.gitconfig-gitid-work",
        ]);

        let out = strip_identity(&text, "work").unwrap().unwrap();
        assert_eq!(
            out,
            section(&[
                "[includeIf \"gitdir:/w2/\"]",
                "    path = /h/.gitconfig-gitid-work2",
            ])
        );
    }

    #[test]
    fn test_strip_unknown_name_is_noop() {
        let text = section(&["[includeIf \"gitdir:/w/\"]", "    path = /h/.gitconfig-gitid-work"]);
        assert_eq!(strip_identity(&text, "personal").unwrap(), None);
        assert_eq!(strip_identity("[user]\n", "work").unwrap(), None);
    }

    #[test]
    fn test_strip_refuses_malformed() {
        let text = format!("{}\n    path = /h/.gitconfig-gitid-work\n", SECTION_START);
        assert!(strip_identity(&text, "work").is_err());
    }
}
