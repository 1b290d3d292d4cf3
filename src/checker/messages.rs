//! User-facing console strings
//!
//! Strings use positional `%N$s` placeholders, the same syntax custom
//! message overrides use.

use regex::Regex;
use std::sync::OnceLock;

const HELP_TEXT: &str = "EPUBCheck v%1$s

When running this tool, the first argument should be the name (with the path)
of the file to check.

To check an expanded EPUB directory, use:
  epubcheck <directory> -mode exp

Options:
  -mode exp                   = check an unpacked EPUB directory
  -c, --customMessages <file> = override message severities and text
  -o <file>                   = write an XML report
  -x <file>                   = write an XMP report
  -j <file>                   = write a JSON report
  -f, --fatal                 = report fatal errors only
  -e, --error                 = report errors and above
  -w, --warn                  = report warnings and above (default)
  -u, --usage                 = report usage information and above
  --failonwarnings            = exit with an error code when warnings are reported
  -l, --listChecks            = list message ids with their severities
  --version                   = print the tool version
  -h, -? or --help            = display this help text
";

const MESSAGES: &[(&str, &str)] = &[
    ("argument_needed", "At least one argument expected"),
    ("no_file_specified", "No file specified in the arguments. Exiting."),
    (
        "output_type_conflict",
        "Only one output format can be specified at a time",
    ),
    ("file_not_found", "File not found: '%1$s'"),
    (
        "mode_required",
        "The path '%1$s' is a directory; use '-mode exp' to check an expanded EPUB",
    ),
    ("mode_unsupported", "Unrecognized mode argument: '%1$s'"),
    ("unrecognized_argument", "Unrecognized argument: '%1$s'"),
    ("missing_value", "Option '%1$s' requires a value"),
    ("validating_version", "Validating using EPUB version 3.3 rules."),
    ("check_errors", "Check finished with errors"),
    ("check_warnings", "Check finished with warnings"),
    ("no_errors", "No errors or warnings detected."),
    (
        "messages_summary",
        "Messages: %1$s fatals / %2$s errors / %3$s warnings / %4$s usages",
    ),
    ("completed", "EPUBCheck completed"),
    ("version", "EPUBCheck v%1$s"),
    ("internal_error", "Internal error: %1$s"),
    ("help_text", HELP_TEXT),
];

/// Raw string for a key
pub fn get(key: &str) -> Option<&'static str> {
    MESSAGES.iter().find(|(k, _)| *k == key).map(|(_, v)| *v)
}

/// String for a key with placeholders filled in. Unknown keys render as the key.
pub fn format(key: &str, args: &[&str]) -> String {
    match get(key) {
        Some(template) => render(template, args),
        None => key.to_string(),
    }
}

/// The help text for a tool version
pub fn help_text(version: &str) -> String {
    render(HELP_TEXT, &[version])
}

fn placeholder() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"%(\d+)\$s").unwrap_or_else(|e| panic!("invalid placeholder regex: {e}"))
    })
}

/// Replace `%N$s` with the N-th argument (1-based); missing arguments render empty
pub fn render<S: AsRef<str>>(template: &str, args: &[S]) -> String {
    placeholder()
        .replace_all(template, |caps: &regex::Captures<'_>| {
            caps[1]
                .parse::<usize>()
                .ok()
                .and_then(|n| n.checked_sub(1))
                .and_then(|i| args.get(i))
                .map(|s| s.as_ref().to_string())
                .unwrap_or_default()
        })
        .into_owned()
}

/// Highest placeholder index used by a template
pub fn parameter_count(template: &str) -> usize {
    placeholder()
        .captures_iter(template)
        .filter_map(|caps| caps[1].parse::<usize>().ok())
        .max()
        .unwrap_or(0)
}
