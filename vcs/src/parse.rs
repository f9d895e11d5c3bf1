//! Output parsers
//!
//! Pure functions turning text captured from the git CLI into typed values.
//! None of them spawn anything.

use crate::types::{Branch, Commit, ObjectKind};

/// Field template handed to `log --pretty=format:`. Written out readably
/// here; [`log_format`] strips the whitespace before use.
///
/// Free-text fields are not quoted: git emits them between NUL bytes
/// (`%x00`) and [`parse_log`] turns each one into a JSON string.
const LOG_TEMPLATE: &str = r#"
{
    "commit": "%H",
    "abbreviated_commit": "%h",
    "refs": %x00%D%x00,
    "subject": %x00%s%x00,
    "body": %x00%b%x00,
    "author": {
        "name": %x00%aN%x00,
        "email": %x00%aE%x00,
        "date": "%ad"
    },
    "committer": {
        "name": %x00%cN%x00,
        "email": %x00%cE%x00,
        "date": "%cd"
    }
},
"#;

const FIELD_DELIMITER: char = '\0';

/// The log template with every literal whitespace character removed, so
/// that one record per commit comes out followed by a `,` separator.
pub fn log_format() -> String {
    LOG_TEMPLATE.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Parses `log` output produced with [`log_format`].
///
/// Outside the NUL-delimited fields, line breaks the tool inserts between
/// or inside records are dropped, along with the trailing separator. Each
/// delimited field is encoded as a JSON string verbatim, apart from the
/// trailing line break git appends to bodies. Empty output is an empty
/// history.
pub fn parse_log(text: &str) -> Result<Vec<Commit>, serde_json::Error> {
    let mut json = String::with_capacity(text.len());
    for (i, part) in text.split(FIELD_DELIMITER).enumerate() {
        if i % 2 == 0 {
            json.extend(part.chars().filter(|c| !matches!(c, '\n' | '\r')));
        } else {
            json.push_str(&serde_json::to_string(
                part.trim_end_matches(['\n', '\r']),
            )?);
        }
    }
    let records = json.trim().trim_end_matches(',');
    serde_json::from_str(&format!("[{}]", records))
}

fn lines(text: &str) -> impl Iterator<Item = &str> {
    text.split(['\n', '\r']).filter(|line| !line.trim().is_empty())
}

/// Parses a `branch` listing. Every line starts with a two-column marker
/// (`* ` current, `+ ` checked out in another worktree, or blanks) which is
/// cut off; the rest of the line is the name, kept as is apart from
/// trailing whitespace.
pub fn parse_branches(text: &str) -> Vec<Branch> {
    lines(text)
        .map(|line| {
            let is_current = line.starts_with('*');
            let name = match line.get(..2) {
                Some("* " | "+ " | "  ") => &line[2..],
                _ => line.trim_start(),
            };
            Branch::new(name.trim_end(), is_current)
        })
        .collect()
}

/// Parses an `ls-tree -z --name-only` listing into bare entry names. Names
/// are NUL-terminated and taken byte for byte, spaces and all.
pub fn parse_tree_listing(text: &str) -> Vec<String> {
    text.split('\0')
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

/// Interprets the single-word answer of `cat-file -t`.
pub fn parse_object_kind(text: &str) -> Option<ObjectKind> {
    ObjectKind::from_type_name(text.trim())
}

/// Canonical form of a ref before it is handed to a type query.
///
/// Leading slashes and trailing colons or slashes go, runs of `/` collapse,
/// and the path-root forms `:.`, `:./` and `:/` become a bare `:` (which
/// then trails and goes too, so `HEAD:.` is just `HEAD`).
pub fn normalize_ref(reference: &str) -> String {
    let mut normalized = reference.trim().trim_start_matches('/').to_string();
    while normalized.contains("//") {
        normalized = normalized.replace("//", "/");
    }
    normalized = normalized.replace(":./", ":").replace(":/", ":");
    if normalized.ends_with(":.") {
        normalized.pop();
    }
    normalized
        .trim_end_matches('/')
        .trim_end_matches(':')
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_COMMITS: &str = r#"
        {"commit":"12f86dcb791830fd038466b55a16cd0097bc065e","abbreviated_commit":"12f86dc","refs":"HEAD -> dev, origin/dev","subject":"README #7","body":"","author":{"name":"dezmound","email":"dez@example.com","date":"1521968185 +0300"},"committer":{"name":"dezmound","email":"dez@example.com","date":"1521968185 +0300"}},
        {"commit":"dc9dfc4a978cf2fe05ed777c8cffb879da1c1eec","abbreviated_commit":"dc9dfc4","refs":"","subject":"README #6","body":"","author":{"name":"dezmound","email":"dez@example.com","date":"1521967908 +0300"},"committer":{"name":"dezmound","email":"dez@example.com","date":"1521967908 +0300"}},
    "#;

    #[test]
    fn test_log_format_has_no_whitespace() {
        let format = log_format();
        assert!(!format.chars().any(char::is_whitespace));
        assert!(format.starts_with(r#"{"commit":"%H""#));
        assert!(format.contains(r#""subject":%x00%s%x00"#));
        assert!(format.ends_with("}},"));
    }

    #[test]
    fn test_parse_log() {
        let commits = parse_log(TWO_COMMITS).unwrap();
        assert_eq!(commits.len(), 2);
        assert_eq!(commits[0].abbreviated_commit, "12f86dc");
        assert_eq!(commits[0].refs, "HEAD -> dev, origin/dev");
        assert_eq!(commits[1].subject, "README #6");
        assert_eq!(commits[1].committer.date, "1521967908 +0300");
        assert!(commits
            .iter()
            .all(|c| c.commit.starts_with(&c.abbreviated_commit)));
    }

    #[test]
    fn test_parse_log_joins_wrapped_records() {
        let wrapped = "{\"commit\":\"abc123\",\"abbreviated_commit\":\"abc\",\"refs\":\"\",\n\
                       \"subject\":\"Multi\",\"body\":\"first line\nsecond line\r\n\",\n\
                       \"author\":{\"name\":\"A\",\"email\":\"a@x\",\"date\":\"1 +0000\"},\n\
                       \"committer\":{\"name\":\"C\",\"email\":\"c@x\",\"date\":\"2 +0000\"}},";
        let commits = parse_log(wrapped).unwrap();
        assert_eq!(commits.len(), 1);
        assert_eq!(commits[0].body, "first linesecond line");
        assert_eq!(commits[0].committer.name, "C");
    }

    #[test]
    fn test_parse_log_escapes_free_text() {
        let output = "{\"commit\":\"abc123\",\"abbreviated_commit\":\"abc\",\"refs\":\0HEAD -> main\0,\
                      \"subject\":\0Revert \"x\"\0,\"body\":\0path C:\\tmp\tand\nsecond line\n\0,\
                      \"author\":{\"name\":\0O'Brien \"Bo\"\0,\"email\":\0a@x\0,\"date\":\"1 +0000\"},\
                      \"committer\":{\"name\":\0C\0,\"email\":\0c@x\0,\"date\":\"2 +0000\"}},\n\
                      {\"commit\":\"def456\",\"abbreviated_commit\":\"def\",\"refs\":\0\0,\
                      \"subject\":\0x\0,\"body\":\0\0,\
                      \"author\":{\"name\":\0A\0,\"email\":\0a@x\0,\"date\":\"1 +0000\"},\
                      \"committer\":{\"name\":\0C\0,\"email\":\0c@x\0,\"date\":\"2 +0000\"}},";

        let commits = parse_log(output).unwrap();
        assert_eq!(commits.len(), 2);
        assert_eq!(commits[0].subject, "Revert \"x\"");
        assert_eq!(commits[0].body, "path C:\\tmp\tand\nsecond line");
        assert_eq!(commits[0].author.name, "O'Brien \"Bo\"");
        assert_eq!(commits[0].refs, "HEAD -> main");
        assert_eq!(commits[1].subject, "x");
        assert_eq!(commits[1].body, "");
    }

    #[test]
    fn test_parse_log_empty() {
        assert!(parse_log("").unwrap().is_empty());
        assert!(parse_log("\n").unwrap().is_empty());
    }

    #[test]
    fn test_parse_log_malformed() {
        assert!(parse_log("fatal: bad default revision 'HEAD'").is_err());
        assert!(parse_log(r#"{"commit":"abc"},"#).is_err());
    }

    #[test]
    fn test_parse_branches() {
        let branches = parse_branches("  master\r\n* test\n\n  feature/x\n");
        assert_eq!(branches.len(), 3);
        assert_eq!(branches[0], Branch::new("master", false));
        assert_eq!(branches[1], Branch::new("test", true));
        assert_eq!(branches[2], Branch::new("feature/x", false));
    }

    #[test]
    fn test_parse_branches_worktree_marker() {
        let branches = parse_branches("+ other\n* main\n");
        assert_eq!(branches[0], Branch::new("other", false));
        assert_eq!(branches[1], Branch::new("main", true));
    }

    #[test]
    fn test_parse_branches_empty() {
        assert!(parse_branches("").is_empty());
        assert!(parse_branches("\n\n").is_empty());
    }

    #[test]
    fn test_parse_branches_keeps_name_characters() {
        let branches = parse_branches("* main\n  c++\n  fix+\n+ wt+\n");
        let names: Vec<_> = branches.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, vec!["main", "c++", "fix+", "wt+"]);
        assert!(branches[0].is_current);
        assert!(!branches[3].is_current);
    }

    #[test]
    fn test_parse_branches_detached_head() {
        let branches = parse_branches("* (HEAD detached at 12f86dc)\n  master\n");
        assert_eq!(branches[0], Branch::new("(HEAD detached at 12f86dc)", true));
    }

    #[test]
    fn test_parse_tree_listing() {
        let names = parse_tree_listing(".file\0.dir\0");
        assert_eq!(names, vec![".file".to_string(), ".dir".to_string()]);
        assert!(parse_tree_listing("").is_empty());
    }

    #[test]
    fn test_parse_tree_listing_keeps_exact_names() {
        let names = parse_tree_listing("h\u{e9}llo.txt\0 padded \0say \"hi\"\0back\\slash\0");
        assert_eq!(
            names,
            vec!["h\u{e9}llo.txt", " padded ", "say \"hi\"", "back\\slash"]
        );
    }

    #[test]
    fn test_parse_object_kind() {
        assert_eq!(parse_object_kind("blob\n"), Some(ObjectKind::Blob));
        assert_eq!(parse_object_kind("tree"), Some(ObjectKind::Tree));
        assert_eq!(parse_object_kind("commit\n"), Some(ObjectKind::Commit));
        assert_eq!(parse_object_kind("tag\n"), None);
        assert_eq!(parse_object_kind(""), None);
    }

    #[test]
    fn test_normalize_ref() {
        assert_eq!(normalize_ref("HEAD:."), "HEAD");
        assert_eq!(normalize_ref("HEAD:./"), "HEAD");
        assert_eq!(normalize_ref("HEAD:/"), "HEAD");
        assert_eq!(normalize_ref("HEAD::"), "HEAD");
        assert_eq!(normalize_ref("/master:./.dir/"), "master:.dir");
        assert_eq!(normalize_ref("HEAD:.dir//dir1"), "HEAD:.dir/dir1");
        assert_eq!(normalize_ref("HEAD:.0"), "HEAD:.0");
        assert_eq!(normalize_ref("HEAD:./."), "HEAD");
        assert_eq!(normalize_ref("abc1234"), "abc1234");
    }

    #[test]
    fn test_normalize_ref_is_idempotent() {
        for reference in ["HEAD:.", "//HEAD:./.dir//x/", "master", "HEAD:.0"] {
            let once = normalize_ref(reference);
            assert_eq!(normalize_ref(&once), once);
        }
    }
}
