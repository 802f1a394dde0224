//! Line grammar for specialist scoring responses (grammar v1).
//!
//! The model is instructed to answer with one record per line, fields
//! separated by `;` in a fixed positional order:
//!
//! ```text
//! <name>;<score 0-10>;<justification>;<instructions or None>
//! ```
//!
//! The separator and field order are an explicit contract, rendered
//! verbatim into the system prompt and decoded by the same module. Lines
//! that do not contain the separator are silently skipped — models often
//! wrap their answer in prose — as are lines whose score field is not a
//! number in the documented range. The trailing instructions field is
//! optional; a literal `None` (any casing) or an empty field means no
//! instructions. Because fields are positional, the justification must not
//! itself contain the separator; everything after the third separator is
//! taken as instructions.

/// Field separator of grammar v1.
pub const FIELD_SEPARATOR: &str = ";";

const SCORE_MIN: f64 = 0.0;
const SCORE_MAX: f64 = 10.0;

/// One specialist record decoded from a response line.
#[derive(Debug, Clone, PartialEq)]
pub struct SpecialistScore {
    /// Specialist name to validate against the chain registry.
    pub name: String,
    /// Relevance score in `[0, 10]`.
    pub score: f64,
    /// Short explanation of the score.
    pub justification: String,
    /// Execution instructions, when the model provided any.
    pub instructions: Option<String>,
}

/// Grammar description rendered into the system prompt.
pub fn response_grammar() -> String {
    format!(
        "{{name}}{sep}{{score from 0 to 10}}{sep}{{short justification}}{sep}{{instructions, or None}}",
        sep = FIELD_SEPARATOR
    )
}

/// Decode a full response into specialist records, skipping lines that do
/// not match the grammar. An empty result means no line was parsable.
pub fn parse_response(response: &str) -> Vec<SpecialistScore> {
    response.lines().filter_map(parse_line).collect()
}

/// Decode a single line, or `None` if it does not match the grammar.
pub fn parse_line(line: &str) -> Option<SpecialistScore> {
    if !line.contains(FIELD_SEPARATOR) {
        return None;
    }
    let mut fields = line.splitn(4, FIELD_SEPARATOR);
    let name = fields.next()?.trim();
    let score_field = fields.next()?.trim();
    let justification = fields.next().unwrap_or("").trim();
    let instructions = fields.next().map(str::trim);

    if name.is_empty() {
        return None;
    }
    let score: f64 = score_field.parse().ok()?;
    if !score.is_finite() || !(SCORE_MIN..=SCORE_MAX).contains(&score) {
        return None;
    }

    let instructions = instructions.filter(|text| !text.is_empty() && !text.eq_ignore_ascii_case("none"));

    Some(SpecialistScore {
        name: name.to_string(),
        score,
        justification: justification.to_string(),
        instructions: instructions.map(ToString::to_string),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_record() {
        let record = parse_line("web-search;8;directly about current events;look up today's news").unwrap();
        assert_eq!(record.name, "web-search");
        assert_eq!(record.score, 8.0);
        assert_eq!(record.justification, "directly about current events");
        assert_eq!(record.instructions.as_deref(), Some("look up today's news"));
    }

    #[test]
    fn test_parse_without_instructions() {
        let record = parse_line("math;5;some arithmetic involved").unwrap();
        assert_eq!(record.instructions, None);

        let record = parse_line("math;5;some arithmetic involved;None").unwrap();
        assert_eq!(record.instructions, None);

        let record = parse_line("math;5;some arithmetic involved;").unwrap();
        assert_eq!(record.instructions, None);
    }

    #[test]
    fn test_lines_without_separator_are_skipped() {
        assert!(parse_line("Here are my scores:").is_none());
        assert!(parse_line("").is_none());
    }

    #[test]
    fn test_malformed_score_is_skipped() {
        assert!(parse_line("web-search;high;sounds relevant").is_none());
        assert!(parse_line("web-search;11;out of range").is_none());
        assert!(parse_line("web-search;-1;out of range").is_none());
        assert!(parse_line(";8;missing name").is_none());
    }

    #[test]
    fn test_parse_response_filters_prose() {
        let response = "Sure, here is my scoring:\n\
                        web-search;8;current events;None\n\
                        math;2;no arithmetic;None\n\
                        Hope this helps!";
        let records = parse_response(response);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].name, "web-search");
        assert_eq!(records[1].name, "math");
    }

    #[test]
    fn test_instructions_keep_embedded_separators() {
        let record = parse_line("planner;9;fits well;first do A; then do B").unwrap();
        assert_eq!(record.instructions.as_deref(), Some("first do A; then do B"));
    }

    #[test]
    fn test_fields_are_trimmed() {
        let record = parse_line("  planner ; 7 ; fits ; do it ").unwrap();
        assert_eq!(record.name, "planner");
        assert_eq!(record.score, 7.0);
        assert_eq!(record.justification, "fits");
        assert_eq!(record.instructions.as_deref(), Some("do it"));
    }
}
