//! Post-processing for raw generated commands.
//!
//! The generation model's tokenizer drops and merges characters in a few
//! well-known ways. [`clean`] collapses whitespace runs to single spaces,
//! then applies a fixed sequence of textual repairs:
//!
//! 1. `find.` becomes `find .`
//! 2. a run-on dot between a letter and an alphanumeric gets a space after it
//!    (see [`split_run_on_dots`] for the extension carve-out)
//! 3. `-Rference` becomes `--reference`
//! 4. ` -ld` becomes ` -l -d`
//! 5. whitespace runs collapse to one space, ends are trimmed
//!
//! Every step is a total string transform; `clean` never fails.

const FIND_RUN_ON: &str = "find.";
const FIND_FIXED: &str = "find .";

const MERGED_REFERENCE: &str = "-Rference";
const REFERENCE_FLAG: &str = "--reference";

const MERGED_LD: &str = " -ld";
const SPLIT_LD: &str = " -l -d";

/// Apply all repairs, in order, to a raw candidate command.
pub fn clean(raw: &str) -> String {
    // the ` -ld` match needs a plain space in front
    let cmd = collapse_whitespace(raw);
    let cmd = cmd.replace(FIND_RUN_ON, FIND_FIXED);
    let cmd = split_run_on_dots(&cmd);
    let cmd = cmd.replace(MERGED_REFERENCE, REFERENCE_FLAG);
    let cmd = cmd.replace(MERGED_LD, SPLIT_LD);
    collapse_whitespace(&cmd)
}

/// Insert a space after a `.` preceded by an ASCII letter and followed by an
/// ASCII alphanumeric, except for the last such dot of each
/// whitespace-delimited token, which is taken to be a file extension.
///
/// `echo done.next` is left alone while `echo done.next.step` becomes
/// `echo done. next.step`. Known limitation: a filename with a dot before its
/// extension is split too (`my.backup.tar` becomes `my. backup.tar`).
pub fn split_run_on_dots(cmd: &str) -> String {
    let mut out = String::with_capacity(cmd.len() + 8);
    let mut token = String::new();

    for c in cmd.chars() {
        if c.is_whitespace() {
            push_token(&mut out, &token);
            token.clear();
            out.push(c);
        } else {
            token.push(c);
        }
    }
    push_token(&mut out, &token);

    out
}

fn push_token(out: &mut String, token: &str) {
    let chars: Vec<char> = token.chars().collect();
    let is_run_on = |i: usize| {
        chars[i] == '.'
            && i > 0
            && chars[i - 1].is_ascii_alphabetic()
            && chars.get(i + 1).is_some_and(|c| c.is_ascii_alphanumeric())
    };
    let extension_dot = (0..chars.len()).rev().find(|&i| is_run_on(i));

    for (i, c) in chars.iter().enumerate() {
        out.push(*c);
        if Some(i) != extension_dot && is_run_on(i) {
            out.push(' ');
        }
    }
}

fn collapse_whitespace(cmd: &str) -> String {
    cmd.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_find_dot_restored() {
        assert_eq!(clean("find. -name '*.txt'"), "find . -name '*.txt'");
    }

    #[test]
    fn test_reference_and_ld_repaired() {
        assert_eq!(
            clean("tar -Rference base.tar -ld"),
            "tar --reference base.tar -l -d"
        );
        assert_eq!(clean("ls -ld /tmp"), "ls -l -d /tmp");
    }

    #[test]
    fn test_ld_after_tab_or_newline_split_in_one_pass() {
        assert_eq!(clean("ls\t-ld /tmp"), "ls -l -d /tmp");
        assert_eq!(clean("ls\n  -ld"), "ls -l -d");
        assert_eq!(clean(&clean("ls\t-ld /tmp")), clean("ls\t-ld /tmp"));
    }

    #[test]
    fn test_ld_at_start_is_not_split() {
        // only the space-prefixed form is a merge artifact
        assert_eq!(clean("-ld"), "-ld");
    }

    #[test]
    fn test_whitespace_collapsed() {
        assert_eq!(clean("  ls  \t -la  "), "ls -la");
        assert_eq!(clean(""), "");
        assert_eq!(clean("   "), "");
    }

    #[test]
    fn test_extension_dot_kept() {
        assert_eq!(clean("cat file.txt"), "cat file.txt");
        assert_eq!(clean("python3 -m http.server"), "python3 -m http.server");
        assert_eq!(clean("tail /var/log/syslog.1"), "tail /var/log/syslog.1");
    }

    #[test]
    fn test_run_on_dots_split() {
        assert_eq!(clean("echo done.next.step"), "echo done. next.step");
        // documented false positive
        assert_eq!(clean("cp my.backup.tar /tmp"), "cp my. backup.tar /tmp");
    }

    #[test]
    fn test_digit_before_dot_left_alone() {
        assert_eq!(clean("ping -c 1 192.168.0.1"), "ping -c 1 192.168.0.1");
        assert_eq!(clean("cargo add serde@1.0.2"), "cargo add serde@1.0.2");
    }

    #[test]
    fn test_dot_at_edges_left_alone() {
        assert_eq!(split_run_on_dots(".hidden"), ".hidden");
        assert_eq!(split_run_on_dots("end."), "end.");
        assert_eq!(split_run_on_dots("a..b.c"), "a..b.c");
    }

    #[test]
    fn test_non_ascii_passes_through() {
        assert_eq!(clean("echo héllo.wörld"), "echo héllo.wörld");
    }

    fn command_word() -> impl Strategy<Value = String> {
        prop_oneof![
            Just("find.".to_string()),
            Just("find".to_string()),
            Just(".".to_string()),
            Just("-Rference".to_string()),
            Just("-ld".to_string()),
            Just("base.tar".to_string()),
            Just("my.backup.tar".to_string()),
            Just("'*.txt'".to_string()),
            "[a-zA-Z0-9.'*-]{1,10}",
        ]
    }

    proptest! {
        #[test]
        fn prop_clean_is_idempotent(
            words in prop::collection::vec(command_word(), 0..8),
            sep in prop_oneof![Just(" "), Just("  "), Just("\t"), Just("\n"), Just(" \t ")],
        ) {
            let raw = words.join(sep);
            let once = clean(&raw);
            prop_assert_eq!(clean(&once), once);
        }
    }
}
