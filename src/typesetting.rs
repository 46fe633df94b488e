/*!
 * Line-level typesetting edits.
 *
 * Small rewrite passes applied to LaTeX sources around translation:
 * - removal of `CJK*` environment markers from text sent for translation
 * - optional reduction of full-line comments to a bare `%`
 * - removal of legacy CJK package lines from the main file
 * - insertion of a font setup block after `\documentclass`
 *
 * All passes work on raw lines that keep their terminators.
 */

use once_cell::sync::Lazy;
use regex::Regex;

use crate::translation::chunker::split_terminator;

static CJK_ENV_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\\begin\{CJK\*\}\{[^}]*\}\{[^}]*\}|\\end\{CJK\*\}").expect("Invalid CJK environment regex")
});

/// Fragments identifying lines of the legacy CJK packages
const CJK_RELATED_KEYWORDS: &[&str] = &[
    r"\usepackage{CJKutf8}",
    r"\usepackage{kotex}",
    r"\begin{CJK}",
    r"\end{CJK}",
    r"\CJKfamily",
    r"\CJK@",
    r"\CJKrmdefault",
    r"\CJKsfdefault",
    r"\CJKttdefault",
];

/// Remove `\begin{CJK*}{..}{..}` and `\end{CJK*}` markers from a line
pub fn strip_cjk_environments(text: &str) -> String {
    CJK_ENV_REGEX.replace_all(text, "").into_owned()
}

/// Reduce a full-line comment to a bare `%`, keeping indentation and terminator
pub fn strip_comment_line(line: &str) -> String {
    let (content, terminator) = split_terminator(line);
    let trimmed = content.trim_start();
    if !trimmed.starts_with('%') {
        return line.to_string();
    }

    let indent = &content[..content.len() - trimmed.len()];
    format!("{}%{}", indent, terminator)
}

/// Apply the pre-translation passes to every line of a document
pub fn prepare_lines(lines: Vec<String>, strip_comments: bool) -> Vec<String> {
    lines.into_iter()
        .map(|line| {
            let line = if line.contains("CJK*") { strip_cjk_environments(&line) } else { line };
            if strip_comments { strip_comment_line(&line) } else { line }
        })
        .collect()
}

/// Drop every line that mentions a legacy CJK package or environment
pub fn remove_cjk_related_lines(lines: Vec<String>) -> Vec<String> {
    lines.into_iter()
        .filter(|line| !CJK_RELATED_KEYWORDS.iter().any(|keyword| line.contains(keyword)))
        .collect()
}

/// Font setup block for a target language
pub fn font_setup_block(is_cjk_target: bool, is_korean: bool, font_name: &str, mono_font_name: &str) -> String {
    if is_cjk_target {
        let mut block = String::new();
        if is_korean {
            block.push_str("\\usepackage{kotex}\n");
        }
        block.push_str("\\usepackage{xeCJK}\n");
        block.push_str(&format!("\\setCJKmainfont{{{}}}\n", font_name));
        block.push_str(&format!("\\setCJKmonofont{{{}}}\n", mono_font_name));
        block.push_str("\\xeCJKsetup{CJKspace=true}\n");
        block
    } else {
        format!(
            "\\usepackage{{fontspec}}\n\\setmainfont{{{}}}\n\\setmonofont{{{}}}\n",
            font_name, mono_font_name
        )
    }
}

/// Insert `block` right after the first line starting with `\documentclass`
///
/// Returns `None` when no such line exists.
pub fn inject_font_setup(lines: Vec<String>, block: &str) -> Option<Vec<String>> {
    let position = lines.iter().position(|line| line.trim_start().starts_with(r"\documentclass"))?;

    let mut result = Vec::with_capacity(lines.len() + 1);
    for (i, mut line) in lines.into_iter().enumerate() {
        if i == position && !line.ends_with('\n') {
            line.push('\n');
        }
        result.push(line);
        if i == position {
            result.push(block.to_string());
        }
    }
    Some(result)
}
