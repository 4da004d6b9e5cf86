//! Corpus codec: the canonical publication list is stored as a JavaScript
//! module (`export const publications = [...]`) consumed directly by the
//! website. Parsing accepts the hand-edited file in all its looseness;
//! serialization is deterministic so regeneration produces byte-identical
//! output for unchanged data.

mod lexer;
mod parser;

use std::cmp::Reverse;
use std::collections::BTreeSet;
use std::fmt::Write as _;

use crate::model::Publication;

pub use parser::parse_corpus;

/// Display names for the fixed set of research project ids referenced by
/// `projects` entries. Emitted verbatim into the module for the site's
/// filter UI.
const PROJECT_NAMES: &[(&str, &str)] = &[
    ("hiv-prevention", "HIV Prevention"),
    ("adolescent-health", "Adolescent Health"),
    ("maternal-health", "Maternal Health"),
    ("mental-health", "Mental Health"),
    ("epidemic-modelling", "Epidemic Modelling"),
    ("general-health", "General Health"),
];

const HEADER: &str = "\
// Generated file. Records are sorted newest first; curated fields
// (projects, tags, featured, imageUrl, attentionGrabber) survive
// regeneration. Hand edits to record fields are allowed but keep the
// object-literal shape.\n\n";

/// Render the corpus module. Records are sorted by year descending
/// (non-numeric years sort last, original order preserved among ties),
/// fields appear in a fixed order, and optional fields are omitted when
/// absent.
pub fn serialize_corpus(records: &[Publication]) -> String {
    let mut sorted: Vec<&Publication> = records.iter().collect();
    sorted.sort_by_key(|record| Reverse(record.year_sort_key()));

    let mut out = String::new();
    out.push_str(HEADER);
    out.push_str("export const publications = [\n");
    for record in &sorted {
        write_record(&mut out, record);
    }
    out.push_str("];\n");

    write_all_tags(&mut out, &sorted);
    write_all_years(&mut out, &sorted);
    write_project_names(&mut out);

    out
}

fn write_record(out: &mut String, record: &Publication) {
    out.push_str("  {\n");
    write_str_field(out, "id", &record.id);
    write_str_field(out, "title", &record.title);
    write_str_field(out, "authors", &record.authors);
    write_str_field(out, "journal", &record.journal);
    write_str_field(out, "year", &record.year);
    write_opt_field(out, "doi", record.doi.as_deref());
    write_opt_field(out, "url", record.url.as_deref());
    write_opt_field(out, "abstract", record.abstract_text.as_deref());
    write_list_field(out, "projects", &record.projects);
    write_list_field(out, "tags", &record.tags);
    let _ = writeln!(out, "    featured: {},", record.featured);
    write_opt_field(out, "imageUrl", record.image_url.as_deref());
    write_opt_field(out, "attentionGrabber", record.attention_grabber.as_deref());
    out.push_str("  },\n");
}

fn write_str_field(out: &mut String, key: &str, value: &str) {
    let _ = writeln!(out, "    {key}: \"{}\",", escape_js_string(value));
}

fn write_opt_field(out: &mut String, key: &str, value: Option<&str>) {
    if let Some(value) = value.filter(|v| !v.is_empty()) {
        write_str_field(out, key, value);
    }
}

fn write_list_field(out: &mut String, key: &str, values: &[String]) {
    let items: Vec<String> = values
        .iter()
        .map(|v| format!("\"{}\"", escape_js_string(v)))
        .collect();
    let _ = writeln!(out, "    {key}: [{}],", items.join(", "));
}

fn write_all_tags(out: &mut String, records: &[&Publication]) {
    let tags: BTreeSet<&str> = records
        .iter()
        .flat_map(|record| record.tags.iter())
        .map(String::as_str)
        .collect();

    out.push_str("\nexport const allTags = [\n");
    for tag in tags {
        let _ = writeln!(out, "  \"{}\",", escape_js_string(tag));
    }
    out.push_str("];\n");
}

fn write_all_years(out: &mut String, records: &[&Publication]) {
    let mut years: Vec<&str> = records
        .iter()
        .map(|record| record.year.as_str())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    years.sort_by_key(|year| {
        (
            Reverse(year.trim().parse::<i32>().unwrap_or(0)),
            Reverse(year.to_string()),
        )
    });

    let items: Vec<String> = years
        .iter()
        .map(|year| format!("\"{}\"", escape_js_string(year)))
        .collect();
    let _ = writeln!(out, "\nexport const allYears = [{}];", items.join(", "));
}

fn write_project_names(out: &mut String) {
    out.push_str("\nexport const projectNames = {\n");
    for (id, name) in PROJECT_NAMES {
        let _ = writeln!(out, "  \"{id}\": \"{name}\",");
    }
    out.push_str("};\n");
}

/// Escape one string for embedding in a double-quoted JS literal. The
/// paragraph separators U+2028/U+2029 are line terminators in JS source, so
/// they must be escaped even though JSON allows them raw.
fn escape_js_string(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\'', "\\'")
        .replace('\n', "\\n")
        .replace('\r', "\\r")
        .replace('\t', "\\t")
        .replace('\u{000c}', "\\f")
        .replace('\u{000b}', "\\v")
        .replace('\u{2028}', "\\u2028")
        .replace('\u{2029}', "\\u2029")
        .replace('\0', "\\u0000")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, year: &str) -> Publication {
        Publication {
            id: id.to_string(),
            title: format!("Title for {id}"),
            authors: "Smith J".to_string(),
            journal: "The Lancet".to_string(),
            year: year.to_string(),
            doi: Some("10.1000/x".to_string()),
            url: None,
            abstract_text: None,
            projects: vec!["hiv-prevention".to_string()],
            tags: vec!["HIV".to_string()],
            featured: false,
            image_url: None,
            attention_grabber: None,
        }
    }

    #[test]
    fn serialize_sorts_year_descending_with_unknown_last() {
        let corpus = vec![
            record("a-2019", "2019"),
            record("b-unknown", "unknown"),
            record("c-2024", "2024"),
        ];
        let module = serialize_corpus(&corpus);
        let parsed = parse_corpus(&module).unwrap();
        let ids: Vec<&str> = parsed.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["c-2024", "a-2019", "b-unknown"]);
    }

    #[test]
    fn round_trip_preserves_records() {
        let mut full = record("full-2023", "2023");
        full.url = Some("https://pubmed.ncbi.nlm.nih.gov/1/".to_string());
        full.abstract_text = Some("Line one.\nLine \"two\" with 'quotes'.".to_string());
        full.featured = true;
        full.image_url = Some("/images/full.png".to_string());
        full.attention_grabber = Some("Landmark trial".to_string());
        full.tags = vec!["HIV".to_string(), "Women's Health".to_string()];

        let mut sparse = record("sparse-2020", "2020");
        sparse.doi = None;

        let corpus = vec![full.clone(), sparse.clone()];
        let parsed = parse_corpus(&serialize_corpus(&corpus)).unwrap();
        assert_eq!(parsed, vec![full, sparse]);
    }

    #[test]
    fn serialization_is_byte_stable() {
        let corpus = vec![record("a-2024", "2024"), record("b-2019", "2019")];
        let first = serialize_corpus(&corpus);
        let second = serialize_corpus(&parse_corpus(&first).unwrap());
        assert_eq!(first, second);
    }

    #[test]
    fn stable_order_among_equal_years() {
        let corpus = vec![
            record("first-2024", "2024"),
            record("second-2024", "2024"),
        ];
        let parsed = parse_corpus(&serialize_corpus(&corpus)).unwrap();
        assert_eq!(parsed[0].id, "first-2024");
        assert_eq!(parsed[1].id, "second-2024");
    }

    #[test]
    fn escaping_covers_quotes_and_separators() {
        assert_eq!(escape_js_string(r#"a"b"#), r#"a\"b"#);
        assert_eq!(escape_js_string("a'b"), r"a\'b");
        assert_eq!(escape_js_string("a\\b"), r"a\\b");
        assert_eq!(escape_js_string("a\u{2028}b"), "a\\u2028b");
        assert_eq!(escape_js_string("a\0b"), "a\\u0000b");
    }

    #[test]
    fn derived_exports_are_sorted_and_unique() {
        let mut a = record("a-2024", "2024");
        a.tags = vec!["Modelling".to_string(), "HIV".to_string()];
        let mut b = record("b-2019", "2019");
        b.tags = vec!["HIV".to_string()];

        let module = serialize_corpus(&[a, b]);
        let tags_pos = module.find("export const allTags").unwrap();
        let years_pos = module.find("export const allYears").unwrap();
        let tags_section = &module[tags_pos..years_pos];
        assert!(tags_section.find("\"HIV\"").unwrap() < tags_section.find("\"Modelling\"").unwrap());
        assert_eq!(tags_section.matches("\"HIV\"").count(), 1);
        assert!(module.contains(r#"export const allYears = ["2024", "2019"];"#));
    }
}
