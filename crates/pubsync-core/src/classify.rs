//! Keyword-based project and tag inference for newly merged records.
//!
//! Deliberately crude: case-insensitive substring search over title plus
//! abstract against a fixed vocabulary. Curators refine the result in the
//! corpus file afterwards; the fallback values only guarantee the fields
//! are never empty.

static PROJECT_KEYWORDS: &[(&str, &[&str])] = &[
    (
        "hiv-prevention",
        &["hiv", "aids", "prep", "pre-exposure", "antiretroviral"],
    ),
    (
        "adolescent-health",
        &["adolescent", "young people", "youth", "school-based"],
    ),
    (
        "maternal-health",
        &["maternal", "pregnan", "antenatal", "postnatal", "perinatal"],
    ),
    (
        "mental-health",
        &["mental health", "depression", "anxiety", "psychosocial", "suicide"],
    ),
    (
        "epidemic-modelling",
        &["model", "simulation", "transmission dynamics", "forecast"],
    ),
];

static TAG_KEYWORDS: &[(&str, &[&str])] = &[
    ("HIV", &["hiv", "aids"]),
    ("Tuberculosis", &["tuberculosis", "mycobacterium"]),
    ("Modelling", &["model", "simulation", "forecast"]),
    (
        "Mental Health",
        &["mental health", "depression", "anxiety", "psychosocial"],
    ),
    ("Women's Health", &["women", "maternal", "pregnan"]),
    ("Adolescents", &["adolescent", "young people", "youth"]),
    (
        "Epidemiology",
        &["incidence", "prevalence", "cohort", "surveillance"],
    ),
    ("Policy", &["policy", "guideline", "cost-effectiveness"]),
];

pub fn infer_projects(title: &str, abstract_text: &str, fallback: &str) -> Vec<String> {
    let matched = match_keywords(PROJECT_KEYWORDS, title, abstract_text);
    if matched.is_empty() {
        vec![fallback.to_string()]
    } else {
        matched
    }
}

pub fn infer_tags(title: &str, abstract_text: &str, fallback: &str) -> Vec<String> {
    let matched = match_keywords(TAG_KEYWORDS, title, abstract_text);
    if matched.is_empty() {
        vec![fallback.to_string()]
    } else {
        matched
    }
}

fn match_keywords(vocabulary: &[(&str, &[&str])], title: &str, abstract_text: &str) -> Vec<String> {
    let haystack = format!("{title} {abstract_text}").to_lowercase();
    vocabulary
        .iter()
        .filter(|(_, keywords)| keywords.iter().any(|k| haystack.contains(k)))
        .map(|(label, _)| label.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hiv_title_maps_to_hiv_project_and_tag() {
        let projects = infer_projects("PrEP uptake among young women", "", "general-health");
        assert!(projects.contains(&"hiv-prevention".to_string()));
        let tags = infer_tags("HIV incidence in a cohort", "", "Other");
        assert!(tags.contains(&"HIV".to_string()));
        assert!(tags.contains(&"Epidemiology".to_string()));
    }

    #[test]
    fn abstract_contributes_to_matching() {
        let projects = infer_projects(
            "A cluster randomised trial",
            "We assessed antenatal care coverage.",
            "general-health",
        );
        assert_eq!(projects, vec!["maternal-health"]);
    }

    #[test]
    fn no_match_yields_fallback_only() {
        assert_eq!(
            infer_projects("Soil chemistry of the Andes", "", "general-health"),
            vec!["general-health"]
        );
        assert_eq!(infer_tags("Soil chemistry of the Andes", "", "Other"), vec!["Other"]);
    }

    #[test]
    fn matching_is_case_insensitive() {
        let tags = infer_tags("TUBERCULOSIS TREATMENT OUTCOMES", "", "Other");
        assert!(tags.contains(&"Tuberculosis".to_string()));
    }

    #[test]
    fn vocabulary_order_is_preserved() {
        let tags = infer_tags("HIV transmission model", "", "Other");
        assert_eq!(tags, vec!["HIV", "Modelling"]);
    }
}
