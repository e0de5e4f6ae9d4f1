// file: src/query/render.rs
// description: colored find output with grep-style highlight lines
// reference: https://docs.rs/colored

use crate::models::SearchHit;
use colored::Colorize;

const EM_OPEN: &str = "<em>";
const EM_CLOSE: &str = "</em>";

#[derive(Debug, Clone, Default)]
pub struct RenderOptions {
    pub show_score: bool,
    /// Text to mark inside highlight snippets.
    pub grep: Option<String>,
}

pub fn found_header(total: u64) -> String {
    format!("Found: {} entries", total)
}

/// One line per hit, or one `path:snippet` line per highlight snippet.
pub fn render_hit(hit: &SearchHit, options: &RenderOptions) -> String {
    let record = &hit.record;
    let path = if record.is_folder {
        record.full_path.blue()
    } else if record.is_executable() {
        record.full_path.green()
    } else {
        record.full_path.magenta()
    };

    let mut out = String::new();
    if hit.highlights.is_empty() {
        out.push_str(&format!("{}\n", path));
    } else {
        for snippet in &hit.highlights {
            out.push_str(&format!("{}:{}\n", path, mark_snippet(snippet, options.grep.as_deref())));
        }
    }

    if options.show_score {
        out.push_str(&format!("Score: {}\n", hit.score));
    }
    out
}

fn mark_snippet(snippet: &str, grep: Option<&str>) -> String {
    let mut out = String::with_capacity(snippet.len());
    let mut rest = snippet.replace('\n', " ");

    while let Some(start) = rest.find(EM_OPEN) {
        let after_open = &rest[start + EM_OPEN.len()..];
        let Some(len) = after_open.find(EM_CLOSE) else {
            break;
        };
        out.push_str(&rest[..start]);
        out.push_str(&after_open[..len].red().to_string());
        rest = after_open[len + EM_CLOSE.len()..].to_string();
    }
    out.push_str(&rest);

    match grep {
        Some(term) if !term.is_empty() => out.replace(term, &term.red().to_string()),
        _ => out,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FileRecord;

    fn hit(highlights: Vec<&str>) -> SearchHit {
        SearchHit::new(
            1.25,
            FileRecord {
                full_path: "/data/a.txt".to_string(),
                mode: "-rw-r--r--".to_string(),
                ..FileRecord::default()
            },
            highlights.into_iter().map(String::from).collect(),
        )
    }

    #[test]
    fn test_plain_line_and_score() {
        colored::control::set_override(false);
        let options = RenderOptions {
            show_score: true,
            grep: None,
        };
        assert_eq!(render_hit(&hit(vec![]), &options), "/data/a.txt\nScore: 1.25\n");
    }

    #[test]
    fn test_one_line_per_snippet() {
        colored::control::set_override(false);
        let rendered = render_hit(
            &hit(vec!["first <em>needle</em>", "second\nneedle"]),
            &RenderOptions::default(),
        );
        assert_eq!(
            rendered,
            "/data/a.txt:first needle\n/data/a.txt:second needle\n"
        );
    }

    #[test]
    fn test_unterminated_mark_kept_verbatim() {
        colored::control::set_override(false);
        assert_eq!(mark_snippet("a <em>b", None), "a <em>b");
    }

    #[test]
    fn test_found_header() {
        assert_eq!(found_header(3), "Found: 3 entries");
    }
}
