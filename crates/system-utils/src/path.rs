use std::path::PathBuf;

pub fn expand_tilde(path: &str) -> PathBuf {
    if path == "~" {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home);
        }
    }
    if let Some(rest) = path.strip_prefix("~/") {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join(rest);
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_paths_are_untouched() {
        assert_eq!(expand_tilde("traces"), PathBuf::from("traces"));
        assert_eq!(expand_tilde("/tmp/x~y"), PathBuf::from("/tmp/x~y"));
    }

    #[test]
    fn tilde_prefix_uses_home() {
        let Ok(home) = std::env::var("HOME") else {
            return;
        };
        assert_eq!(expand_tilde("~/traces"), PathBuf::from(&home).join("traces"));
        assert_eq!(expand_tilde("~"), PathBuf::from(home));
    }
}
