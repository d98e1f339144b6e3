use anyhow::{Context, Result};
use std::path::PathBuf;
use url::Url;

/// Cache directory name under the home directory.
const CACHE_DIR_NAME: &str = ".realmgate";

/// Resolve the cache directory, defaulting to ~/.realmgate.
pub fn resolve_cache_dir(cache_dir: Option<String>) -> Result<PathBuf> {
    match cache_dir {
        Some(dir) => Ok(PathBuf::from(dir)),
        None => Ok(dirs::home_dir()
            .context("Could not determine home directory")?
            .join(CACHE_DIR_NAME)),
    }
}

/// Resolve what the user typed into the page URL to load.
///
/// Full URLs (a pasted login redirect) are used as-is; anything else is an
/// in-app path under `origin`.
pub fn resolve_page_url(origin: &str, target: &str) -> Result<Url> {
    if let Ok(url) = Url::parse(target) {
        if url.has_host() {
            return Ok(url);
        }
    }
    let origin = Url::parse(origin).with_context(|| format!("Invalid origin: {}", origin))?;
    origin
        .join(&format!("/{}", target.trim_start_matches('/')))
        .with_context(|| format!("Invalid path: {}", target))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_cache_dir() {
        assert_eq!(
            resolve_cache_dir(Some("/tmp/rg".to_string())).unwrap(),
            PathBuf::from("/tmp/rg")
        );
    }

    #[test]
    fn test_page_url_from_path() {
        let url = resolve_page_url("http://localhost:4200", "user-info?tab=1").unwrap();
        assert_eq!(url.as_str(), "http://localhost:4200/user-info?tab=1");

        let url = resolve_page_url("http://localhost:4200/", "/").unwrap();
        assert_eq!(url.as_str(), "http://localhost:4200/");
    }

    #[test]
    fn test_page_url_from_pasted_redirect() {
        let pasted = "http://localhost:4200/user-info?state=s&code=c";
        assert_eq!(
            resolve_page_url("http://localhost:4200", pasted).unwrap().as_str(),
            pasted
        );
    }
}
