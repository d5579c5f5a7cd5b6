//! Path template helpers.
//!
//! OpenAPI paths use `{param}` placeholders. The synthesizer needs the
//! parameter names in template order, the literal words for method names,
//! and a `format!` string for the generated client.

/// Extracts parameter names from a path template, in order.
///
/// ## Examples
///
/// ```
/// use remodel_gen::parser::extract_path_params;
///
/// assert_eq!(extract_path_params("/search"), Vec::<&str>::new());
/// assert_eq!(
///     extract_path_params("/datastore/query/{datasetId}/{index}"),
///     vec!["datasetId", "index"]
/// );
/// ```
pub fn extract_path_params(path: &str) -> Vec<&str> {
    let mut params = Vec::new();
    let mut start = None;

    for (idx, c) in path.char_indices() {
        match c {
            '{' => start = Some(idx + 1),
            '}' => {
                if let Some(from) = start.take() {
                    let param = &path[from..idx];
                    if !param.is_empty() {
                        params.push(param);
                    }
                }
            }
            _ => {}
        }
    }

    params
}

/// Splits a path into its non-empty segments with placeholder braces removed.
///
/// ```
/// use remodel_gen::parser::path_words;
///
/// assert_eq!(
///     path_words("/datastore/query/{distributionId}/download"),
///     vec!["datastore", "query", "distributionId", "download"]
/// );
/// ```
pub fn path_words(path: &str) -> Vec<&str> {
    path.split('/')
        .map(|segment| segment.trim_start_matches('{').trim_end_matches('}'))
        .filter(|segment| !segment.is_empty())
        .collect()
}

/// Turns a path template into a `format!` string with one `{}` per parameter.
///
/// Literal braces outside placeholders are escaped.
///
/// ```
/// use remodel_gen::parser::format_template;
///
/// assert_eq!(format_template("/items/{identifier}"), "/items/{}");
/// assert_eq!(format_template("/search"), "/search");
/// ```
pub fn format_template(path: &str) -> String {
    let mut template = String::with_capacity(path.len());
    let mut in_param = false;

    for (idx, c) in path.char_indices() {
        match (c, in_param) {
            ('{', false) if path[idx..].contains('}') => {
                in_param = true;
                template.push_str("{}");
            }
            ('}', true) => in_param = false,
            (_, true) => {}
            ('{', false) => template.push_str("{{"),
            ('}', false) => template.push_str("}}"),
            (other, false) => template.push(other),
        }
    }

    template
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_multiple_params() {
        assert_eq!(
            extract_path_params("/orgs/{org}/repos/{repo}/issues/{issue}"),
            vec!["org", "repo", "issue"]
        );
        assert_eq!(extract_path_params("/{a}/{b}"), vec!["a", "b"]);
    }

    #[test]
    fn extract_ignores_unbalanced_and_empty() {
        assert_eq!(extract_path_params("/a}/b"), Vec::<&str>::new());
        assert_eq!(extract_path_params("/{}/b"), Vec::<&str>::new());
    }

    #[test]
    fn path_words_of_root_is_empty() {
        assert!(path_words("/").is_empty());
    }

    #[test]
    fn format_template_multiple_params() {
        assert_eq!(
            format_template("/datastore/query/{datasetId}/{index}/download"),
            "/datastore/query/{}/{}/download"
        );
    }

    #[test]
    fn format_template_escapes_stray_braces() {
        assert_eq!(format_template("/a}b"), "/a}}b");
    }
}
