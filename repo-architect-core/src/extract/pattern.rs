//! Pattern-based extraction for JavaScript and TypeScript.

use std::sync::LazyLock;

use regex::Regex;

use super::Language;
use crate::model::FileRecord;

// import x from "m";  import { a, b } from 'm';  import * as ns from "m"
static ES_IMPORT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"import\s+(?:type\s+)?[\w*{}\s,$]+?\s+from\s+['"]([^'"]+)['"]"#).unwrap()
});

static REQUIRE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"require\(\s*['"]([^'"]+)['"]\s*\)"#).unwrap());

/// (lower-case keyword, hint)
const FRAMEWORK_KEYWORDS: &[(&str, &str)] = &[
    ("react", "Framework: React"),
    ("express", "Framework: Express"),
    ("vue", "Framework: Vue"),
    ("@angular", "Framework: Angular"),
];

pub fn extract(content: &str, path: &str, language: Language) -> FileRecord {
    let mut record = FileRecord::new(path, language.tag());

    for re in [&*ES_IMPORT_RE, &*REQUIRE_RE] {
        record
            .imports
            .extend(re.captures_iter(content).map(|c| c[1].to_owned()));
    }

    let lowered = content.to_lowercase();
    record.framework_hints = FRAMEWORK_KEYWORDS
        .iter()
        .filter(|(keyword, _)| lowered.contains(keyword))
        .map(|(_, hint)| (*hint).to_owned())
        .collect();

    record
}
