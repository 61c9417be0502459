//! Plain-text normalization for feed fields and generated summaries.
//!
//! Titles, author lists and abstracts in the arXiv feed carry LaTeX markup
//! (`$\alpha$-divergence`, `Schr\"odinger`) and descriptions are HTML. Both are
//! reduced to plain Unicode text before they reach the summarizer or a post.

use regex::{Captures, Regex};
use scraper::Html;
use std::collections::HashSet;
use std::sync::LazyLock;

// Placeholders for escaped characters that later passes would otherwise strip.
const DOLLAR: char = '\u{E000}';
const OPEN_BRACE: char = '\u{E001}';
const CLOSE_BRACE: char = '\u{E002}';

static HTML_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"</?[A-Za-z][A-Za-z0-9]*(?:\s[^<>]*)?/?>").expect("valid tag regex")
});

static SYMBOL_ACCENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\\(["'`^~=.])\s*(?:\{\s*([A-Za-z])\s*\}|([A-Za-z]))"#).expect("valid accent regex")
});

static LETTER_ACCENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\\([cvuHk])\s*\{\s*([A-Za-z])\s*\}").expect("valid accent regex")
});

static ESCAPED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\\([%&_#$\{\}])").expect("valid escape regex"));

static SPACING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\\\\|\\[,;: ]").expect("valid spacing regex"));

static MATH_DELIMITERS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\$?|\\[()\[\]]|\\!").expect("valid math regex"));

static FORMATTING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\\(?:text(?:it|bf|rm|sf|tt|sc|up|normal|sl)?|emph|underline|math(?:rm|bf|it|sf|tt|cal|bb|frak|scr)|boldsymbol|bm|operatorname|mbox|hbox|url)\s*\{([^{}]*)\}",
    )
    .expect("valid formatting regex")
});

static MACRO: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\\([A-Za-z]+)\*?").expect("valid macro regex"));

/// Extract the text content of an HTML fragment, decoding entities and
/// dropping tags.
pub fn html_to_text(html: &str) -> String {
    // A bare `<` (as in `$x<y$`) is not markup and must survive parsing.
    let tag_starts: HashSet<usize> = HTML_TAG.find_iter(html).map(|m| m.start()).collect();
    let mut escaped = String::with_capacity(html.len());
    for (idx, ch) in html.char_indices() {
        if ch == '<' && !tag_starts.contains(&idx) {
            escaped.push_str("&lt;");
        } else {
            escaped.push(ch);
        }
    }

    let fragment = Html::parse_fragment(&escaped);
    fragment.root_element().text().collect()
}

/// Convert LaTeX-flavoured text into plain Unicode text.
///
/// Whitespace runs, including newlines, collapse to a single space so the
/// result is always one line.
pub fn latex_to_text(input: &str) -> String {
    let text = SYMBOL_ACCENT.replace_all(input, |caps: &Captures| {
        let accent = caps[1].chars().next().unwrap_or('"');
        let letter = caps
            .get(2)
            .or_else(|| caps.get(3))
            .and_then(|m| m.as_str().chars().next())
            .unwrap_or_default();
        compose(accent, letter).to_string()
    });

    let text = LETTER_ACCENT.replace_all(&text, |caps: &Captures| {
        let accent = caps[1].chars().next().unwrap_or('c');
        let letter = caps[2].chars().next().unwrap_or_default();
        compose(accent, letter).to_string()
    });

    let text = ESCAPED.replace_all(&text, |caps: &Captures| match &caps[1] {
        "$" => DOLLAR.to_string(),
        "{" => OPEN_BRACE.to_string(),
        "}" => CLOSE_BRACE.to_string(),
        other => other.to_string(),
    });

    let text = SPACING.replace_all(&text, " ");
    let text = MATH_DELIMITERS.replace_all(&text, "");

    let mut text = text.into_owned();
    loop {
        let next = FORMATTING.replace_all(&text, "${1}").into_owned();
        if next == text {
            break;
        }
        text = next;
    }

    let text = MACRO.replace_all(&text, |caps: &Captures| {
        symbol(&caps[1]).unwrap_or_default().to_string()
    });

    let text = text
        .replace("---", "\u{2014}")
        .replace("--", "\u{2013}")
        .replace("``", "\u{201C}")
        .replace("''", "\u{201D}")
        .replace('~', " ");

    let text: String = text
        .chars()
        .filter(|c| *c != '{' && *c != '}')
        .map(|c| match c {
            DOLLAR => '$',
            OPEN_BRACE => '{',
            CLOSE_BRACE => '}',
            other => other,
        })
        .collect();

    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Number of Unicode scalar values in `text`
pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Hard-cut `text` to at most `limit` characters. No reflow, no ellipsis.
pub fn truncate_chars(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((byte_idx, _)) => text[..byte_idx].to_string(),
        None => text.to_string(),
    }
}

/// Split `text` into trimmed lines, dropping blank ones
pub fn nonblank_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

fn compose(accent: char, letter: char) -> char {
    match (accent, letter) {
        ('"', 'a') => 'ä',
        ('"', 'e') => 'ë',
        ('"', 'i') => 'ï',
        ('"', 'o') => 'ö',
        ('"', 'u') => 'ü',
        ('"', 'y') => 'ÿ',
        ('"', 'A') => 'Ä',
        ('"', 'E') => 'Ë',
        ('"', 'I') => 'Ï',
        ('"', 'O') => 'Ö',
        ('"', 'U') => 'Ü',
        ('"', 'Y') => 'Ÿ',
        ('\'', 'a') => 'á',
        ('\'', 'c') => 'ć',
        ('\'', 'e') => 'é',
        ('\'', 'i') => 'í',
        ('\'', 'n') => 'ń',
        ('\'', 'o') => 'ó',
        ('\'', 's') => 'ś',
        ('\'', 'u') => 'ú',
        ('\'', 'y') => 'ý',
        ('\'', 'z') => 'ź',
        ('\'', 'A') => 'Á',
        ('\'', 'C') => 'Ć',
        ('\'', 'E') => 'É',
        ('\'', 'I') => 'Í',
        ('\'', 'N') => 'Ń',
        ('\'', 'O') => 'Ó',
        ('\'', 'S') => 'Ś',
        ('\'', 'U') => 'Ú',
        ('\'', 'Y') => 'Ý',
        ('\'', 'Z') => 'Ź',
        ('`', 'a') => 'à',
        ('`', 'e') => 'è',
        ('`', 'i') => 'ì',
        ('`', 'o') => 'ò',
        ('`', 'u') => 'ù',
        ('`', 'A') => 'À',
        ('`', 'E') => 'È',
        ('`', 'I') => 'Ì',
        ('`', 'O') => 'Ò',
        ('`', 'U') => 'Ù',
        ('^', 'a') => 'â',
        ('^', 'e') => 'ê',
        ('^', 'i') => 'î',
        ('^', 'o') => 'ô',
        ('^', 'u') => 'û',
        ('^', 'A') => 'Â',
        ('^', 'E') => 'Ê',
        ('^', 'I') => 'Î',
        ('^', 'O') => 'Ô',
        ('^', 'U') => 'Û',
        ('~', 'a') => 'ã',
        ('~', 'n') => 'ñ',
        ('~', 'o') => 'õ',
        ('~', 'A') => 'Ã',
        ('~', 'N') => 'Ñ',
        ('~', 'O') => 'Õ',
        ('=', 'a') => 'ā',
        ('=', 'e') => 'ē',
        ('=', 'i') => 'ī',
        ('=', 'o') => 'ō',
        ('=', 'u') => 'ū',
        ('.', 'z') => 'ż',
        ('.', 'Z') => 'Ż',
        ('c', 'c') => 'ç',
        ('c', 's') => 'ş',
        ('c', 'C') => 'Ç',
        ('c', 'S') => 'Ş',
        ('v', 'c') => 'č',
        ('v', 'e') => 'ě',
        ('v', 'n') => 'ň',
        ('v', 'r') => 'ř',
        ('v', 's') => 'š',
        ('v', 'z') => 'ž',
        ('v', 'C') => 'Č',
        ('v', 'R') => 'Ř',
        ('v', 'S') => 'Š',
        ('v', 'Z') => 'Ž',
        ('u', 'a') => 'ă',
        ('u', 'g') => 'ğ',
        ('H', 'o') => 'ő',
        ('H', 'u') => 'ű',
        ('k', 'a') => 'ą',
        ('k', 'e') => 'ę',
        _ => letter,
    }
}

fn symbol(name: &str) -> Option<&'static str> {
    let s = match name {
        // Greek
        "alpha" => "α",
        "beta" => "β",
        "gamma" => "γ",
        "delta" => "δ",
        "epsilon" | "varepsilon" => "ε",
        "zeta" => "ζ",
        "eta" => "η",
        "theta" | "vartheta" => "θ",
        "iota" => "ι",
        "kappa" => "κ",
        "lambda" => "λ",
        "mu" => "μ",
        "nu" => "ν",
        "xi" => "ξ",
        "pi" => "π",
        "rho" | "varrho" => "ρ",
        "sigma" => "σ",
        "tau" => "τ",
        "upsilon" => "υ",
        "phi" | "varphi" => "φ",
        "chi" => "χ",
        "psi" => "ψ",
        "omega" => "ω",
        "Gamma" => "Γ",
        "Delta" => "Δ",
        "Theta" => "Θ",
        "Lambda" => "Λ",
        "Xi" => "Ξ",
        "Pi" => "Π",
        "Sigma" => "Σ",
        "Phi" => "Φ",
        "Psi" => "Ψ",
        "Omega" => "Ω",
        // Relations and operators
        "times" => "×",
        "cdot" => "·",
        "pm" => "±",
        "mp" => "∓",
        "div" => "÷",
        "leq" | "le" => "≤",
        "geq" | "ge" => "≥",
        "neq" | "ne" => "≠",
        "approx" => "≈",
        "sim" => "∼",
        "simeq" => "≃",
        "equiv" => "≡",
        "propto" => "∝",
        "ll" => "≪",
        "gg" => "≫",
        "in" => "∈",
        "notin" => "∉",
        "subset" => "⊂",
        "subseteq" => "⊆",
        "cup" => "∪",
        "cap" => "∩",
        "sum" => "∑",
        "prod" => "∏",
        "int" => "∫",
        "partial" => "∂",
        "nabla" => "∇",
        "infty" => "∞",
        "sqrt" => "√",
        "circ" => "∘",
        "degree" => "°",
        "ell" => "ℓ",
        "hbar" => "ℏ",
        "forall" => "∀",
        "exists" => "∃",
        // Arrows
        "to" | "rightarrow" => "→",
        "leftarrow" | "gets" => "←",
        "leftrightarrow" => "↔",
        "Rightarrow" => "⇒",
        "Leftarrow" => "⇐",
        "Leftrightarrow" | "iff" => "⇔",
        "mapsto" => "↦",
        "uparrow" => "↑",
        "downarrow" => "↓",
        // Text
        "ldots" | "dots" | "cdots" => "…",
        "textendash" => "–",
        "textemdash" => "—",
        "ss" => "ß",
        "o" => "ø",
        "O" => "Ø",
        "ae" => "æ",
        "AE" => "Æ",
        "aa" => "å",
        "AA" => "Å",
        "l" => "ł",
        "L" => "Ł",
        "i" => "ı",
        "LaTeX" => "LaTeX",
        "TeX" => "TeX",
        "quad" | "qquad" => " ",
        // Named operators keep their name
        "log" => "log",
        "ln" => "ln",
        "exp" => "exp",
        "sin" => "sin",
        "cos" => "cos",
        "tan" => "tan",
        "max" => "max",
        "min" => "min",
        "arg" => "arg",
        "lim" => "lim",
        "det" => "det",
        "sup" => "sup",
        "inf" => "inf",
        _ => return None,
    };
    Some(s)
}
