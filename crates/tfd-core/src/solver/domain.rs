use std::sync::LazyLock;

use regex::Regex;

static DOMAIN_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\(\s*domain\s*([^\)\s]+)\s*\)").expect("domain name pattern is valid")
});

/// Pull the declared name out of a PDDL domain's `(domain <name>)` form.
pub fn extract_domain_name(domain: &str) -> Option<&str> {
    DOMAIN_NAME_RE
        .captures(domain)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// An empty problem for `domain_name`.
///
/// The translator insists that the problem references the domain by name,
/// so validation needs a problem built for the specific domain.
pub fn placeholder_problem(domain_name: &str) -> String {
    format!("(define (problem void) (:domain {domain_name}) (:objects) (:init) (:goal none))")
}
