use std::collections::{HashMap, VecDeque};
use std::hash::{Hash, Hasher};
use std::sync::{Mutex, OnceLock, PoisonError};

use syntect::html::{ClassStyle, ClassedHTMLGenerator};
use syntect::parsing::SyntaxSet;
use syntect::util::LinesWithEndings;

// Streaming re-renders the same code blocks on every chunk, so highlighted
// output is kept in a small bounded FIFO cache keyed by (lang_norm, hash).
const CACHE_CAPACITY: usize = 64;

fn hash_code(lang: &str, code: &str) -> u64 {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    lang.hash(&mut hasher);
    code.hash(&mut hasher);
    hasher.finish()
}

struct SimpleCache {
    map: HashMap<(String, u64), String>,
    order: VecDeque<(String, u64)>,
    cap: usize,
}

impl SimpleCache {
    fn new(cap: usize) -> Self {
        Self {
            map: HashMap::new(),
            order: VecDeque::new(),
            cap,
        }
    }
    fn get(&self, k: &(String, u64)) -> Option<String> {
        self.map.get(k).cloned()
    }
    fn put(&mut self, k: (String, u64), v: String) {
        if !self.map.contains_key(&k) {
            self.order.push_back(k.clone());
        }
        self.map.insert(k, v);
        while self.map.len() > self.cap {
            if let Some(old) = self.order.pop_front() {
                self.map.remove(&old);
            } else {
                break;
            }
        }
    }
}

static SYNTAX_CACHE: Mutex<Option<SimpleCache>> = Mutex::new(None);

fn with_cache<R>(f: impl FnOnce(&mut SimpleCache) -> R) -> R {
    let mut guard = SYNTAX_CACHE.lock().unwrap_or_else(PoisonError::into_inner);
    f(guard.get_or_insert_with(|| SimpleCache::new(CACHE_CAPACITY)))
}

pub(crate) fn normalize_lang_hint(s: &str) -> String {
    let t = s.trim().to_ascii_lowercase();
    match t.as_str() {
        "py" | "python" => "python".into(),
        "bash" | "sh" | "zsh" | "shell" => "bash".into(),
        "js" | "javascript" | "jsx" => "javascript".into(),
        "ts" | "tsx" | "typescript" => "typescript".into(),
        "json" => "json".into(),
        "yaml" | "yml" => "yaml".into(),
        "r" => "r".into(),
        "sql" => "sql".into(),
        "html" => "html".into(),
        "css" => "css".into(),
        "rust" | "rs" => "rust".into(),
        other => other.into(),
    }
}

fn syntax_set() -> &'static SyntaxSet {
    static SYNTAX_SET: OnceLock<SyntaxSet> = OnceLock::new();
    SYNTAX_SET.get_or_init(SyntaxSet::load_defaults_newlines)
}

/// Highlights `code` into class-annotated HTML spans (no surrounding
/// `<pre>`). Returns `None` when the language is unknown or highlighting fails.
pub fn highlight_code_block(lang_hint: &str, code: &str) -> Option<String> {
    let lang_norm = normalize_lang_hint(lang_hint);
    if lang_norm.is_empty() {
        return None;
    }

    let key = (lang_norm.clone(), hash_code(&lang_norm, code));
    if let Some(html) = with_cache(|cache| cache.get(&key)) {
        return Some(html);
    }

    let ps = syntax_set();
    let syntax = ps.find_syntax_by_token(&lang_norm)?;
    let mut generator = ClassedHTMLGenerator::new_with_class_style(syntax, ps, ClassStyle::Spaced);
    for line in LinesWithEndings::from(code) {
        generator
            .parse_html_for_line_which_includes_newline(line)
            .ok()?;
    }
    let html = generator.finalize();

    with_cache(|cache| cache.put(key, html.clone()));
    Some(html)
}
