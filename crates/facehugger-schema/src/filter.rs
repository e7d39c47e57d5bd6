use glob::Pattern;

/// Include/exclude predicate over repository file paths.
///
/// A path is selected when it matches at least one include pattern (or no
/// include patterns were given) and matches none of the exclude patterns.
/// `*` also matches `/`, and a pattern ending in `/` selects everything
/// below that directory, mirroring how the hub filters repository files.
/// Any pattern string is accepted: runs of `*` behave like a single `*`, and
/// a pattern `glob` cannot compile only matches a path equal to it.
#[derive(Debug, Clone, Default)]
pub struct FileFilter {
    include: Vec<Matcher>,
    exclude: Vec<Matcher>,
}

#[derive(Debug, Clone)]
enum Matcher {
    Glob(Pattern),
    Literal(String),
}

impl Matcher {
    fn compile(pattern: &str) -> Self {
        let mut normalized = String::with_capacity(pattern.len() + 1);
        for c in pattern.chars() {
            if c == '*' && normalized.ends_with('*') {
                continue;
            }
            normalized.push(c);
        }
        if normalized.ends_with('/') {
            normalized.push('*');
        }
        match Pattern::new(&normalized) {
            Ok(glob) => Matcher::Glob(glob),
            Err(_) => Matcher::Literal(pattern.to_owned()),
        }
    }

    fn matches(&self, path: &str) -> bool {
        match self {
            Matcher::Glob(glob) => glob.matches(path),
            Matcher::Literal(literal) => literal == path,
        }
    }
}

impl FileFilter {
    pub fn new(include: &[String], exclude: &[String]) -> Self {
        Self {
            include: include.iter().map(|p| Matcher::compile(p)).collect(),
            exclude: exclude.iter().map(|p| Matcher::compile(p)).collect(),
        }
    }

    pub fn matches(&self, path: &str) -> bool {
        let included = self.include.is_empty() || self.include.iter().any(|m| m.matches(path));
        included && !self.exclude.iter().any(|m| m.matches(path))
    }

    /// Apply the filter to a list of paths, preserving order.
    pub fn select<'a>(&self, paths: impl IntoIterator<Item = &'a str>) -> Vec<&'a str> {
        paths.into_iter().filter(|p| self.matches(p)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter(include: &[&str], exclude: &[&str]) -> FileFilter {
        let inc: Vec<String> = include.iter().map(ToString::to_string).collect();
        let exc: Vec<String> = exclude.iter().map(ToString::to_string).collect();
        FileFilter::new(&inc, &exc)
    }

    #[test]
    fn empty_filter_selects_everything() {
        let f = FileFilter::default();
        assert!(f.matches("model.safetensors"));
        assert!(f.matches("nested/dir/config.json"));
    }

    #[test]
    fn include_restricts_selection() {
        let f = filter(&["*.gguf"], &[]);
        assert!(f.matches("model-q4.gguf"));
        assert!(!f.matches("README.md"));
    }

    #[test]
    fn exclude_wins_over_include() {
        let f = filter(&["*.gguf"], &["*q8*"]);
        assert!(f.matches("model-q4.gguf"));
        assert!(!f.matches("model-q8.gguf"));
    }

    #[test]
    fn star_crosses_directories() {
        let f = filter(&["*.json"], &[]);
        assert!(f.matches("tokenizer/config.json"));
    }

    #[test]
    fn trailing_slash_selects_directory_contents() {
        let f = filter(&["onnx/"], &[]);
        assert!(f.matches("onnx/model.onnx"));
        assert!(!f.matches("model.onnx"));
    }

    #[test]
    fn any_of_several_includes() {
        let f = filter(&["*.gguf", "*.safetensors"], &["*.ckpt"]);
        let files = ["a.gguf", "b.safetensors", "c.ckpt", "d.md"];
        assert_eq!(f.select(files), vec!["a.gguf", "b.safetensors"]);
    }

    #[test]
    fn doubled_stars_act_as_single_star() {
        let f = filter(&["*Q4_K_M**", "**.gguf"], &[]);
        assert!(f.matches("model-Q4_K_M.bin"));
        assert!(f.matches("nested/model.gguf"));
        assert!(!f.matches("README.md"));

        let shards = filter(&["model-**-of-*.safetensors"], &[]);
        assert!(shards.matches("model-00001-of-00002.safetensors"));
        assert!(!shards.matches("model.safetensors"));
    }

    #[test]
    fn uncompilable_pattern_matches_literally() {
        let f = filter(&["weights["], &[]);
        assert!(f.matches("weights["));
        assert!(!f.matches("weights1"));
        let f = filter(&[], &["weights["]);
        assert!(f.matches("weights1"));
        assert!(!f.matches("weights["));
    }
}
